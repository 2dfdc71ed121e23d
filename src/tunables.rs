//! Runtime-tunable presentation parameters.
//!
//! [`Tunables`] is plain state: a control surface writes it, the
//! presentation reads it once per frame. Every write goes through
//! [`Tunables::set`], which clamps to the parameter's range.

use crate::pipeline::bloom::{BloomSettings, LuminositySettings};
use crate::scene::scroll::ScrollSettings;
use crate::scene::transition::TransitionParams;
use serde::{Deserialize, Serialize};
use std::fmt;

/// All parameters that may change while the presentation runs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tunables {
    pub luminosity: LuminositySettings,
    pub bloom: BloomSettings,
    pub transition: TransitionParams,
    pub scroll: ScrollSettings,
}

/// Identifies one tunable parameter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Tunable {
    Threshold,
    Smoothing,
    Strength,
    Radius,
    Size,
    Zoom,
    Chroma,
    Lerp,
}

impl Tunable {
    pub const ALL: [Tunable; 8] = [
        Tunable::Threshold,
        Tunable::Smoothing,
        Tunable::Strength,
        Tunable::Radius,
        Tunable::Size,
        Tunable::Zoom,
        Tunable::Chroma,
        Tunable::Lerp,
    ];

    /// Inclusive `(min, max)` range.
    pub fn range(self) -> (f32, f32) {
        match self {
            Tunable::Zoom => (0.0, 100.0),
            Tunable::Chroma => (0.0, 2.0),
            _ => (0.0, 1.0),
        }
    }

    /// Increment used by [`Tunables::nudge`].
    pub fn step(self) -> f32 {
        match self {
            Tunable::Zoom => 0.2,
            _ => 0.01,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Tunable::Threshold => "Thresh",
            Tunable::Smoothing => "Smooth",
            Tunable::Strength => "Strength",
            Tunable::Radius => "Radius",
            Tunable::Size => "Size",
            Tunable::Zoom => "Zoom",
            Tunable::Chroma => "Chroma",
            Tunable::Lerp => "Lerp",
        }
    }
}

impl fmt::Display for Tunable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Tunables {
    pub fn get(&self, tunable: Tunable) -> f32 {
        match tunable {
            Tunable::Threshold => self.luminosity.threshold,
            Tunable::Smoothing => self.luminosity.smoothing,
            Tunable::Strength => self.bloom.strength,
            Tunable::Radius => self.bloom.radius,
            Tunable::Size => self.transition.size,
            Tunable::Zoom => self.transition.zoom,
            Tunable::Chroma => self.transition.color_separation,
            Tunable::Lerp => self.scroll.lerp,
        }
    }

    /// Set a parameter, clamped to its range. Returns the stored value.
    pub fn set(&mut self, tunable: Tunable, value: f32) -> f32 {
        let (min, max) = tunable.range();
        let value = if value.is_nan() { min } else { value.clamp(min, max) };
        let slot = match tunable {
            Tunable::Threshold => &mut self.luminosity.threshold,
            Tunable::Smoothing => &mut self.luminosity.smoothing,
            Tunable::Strength => &mut self.bloom.strength,
            Tunable::Radius => &mut self.bloom.radius,
            Tunable::Size => &mut self.transition.size,
            Tunable::Zoom => &mut self.transition.zoom,
            Tunable::Chroma => &mut self.transition.color_separation,
            Tunable::Lerp => &mut self.scroll.lerp,
        };
        *slot = value;
        value
    }

    /// Move a parameter by `steps` increments.
    pub fn nudge(&mut self, tunable: Tunable, steps: i32) -> f32 {
        let value = self.get(tunable) + tunable.step() * steps as f32;
        self.set(tunable, value)
    }

    /// A copy with every parameter clamped to its range.
    pub fn clamped(mut self) -> Self {
        for tunable in Tunable::ALL {
            let value = self.get(tunable);
            self.set(tunable, value);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let t = Tunables::default();
        assert_eq!(t.get(Tunable::Threshold), 0.1);
        assert_eq!(t.get(Tunable::Smoothing), 1.0);
        assert_eq!(t.get(Tunable::Strength), 0.3);
        assert_eq!(t.get(Tunable::Radius), 0.75);
        assert_eq!(t.get(Tunable::Size), 0.04);
        assert_eq!(t.get(Tunable::Zoom), 50.0);
        assert_eq!(t.get(Tunable::Chroma), 0.3);
        assert_eq!(t.get(Tunable::Lerp), 0.075);
    }

    #[test]
    fn set_clamps_to_range() {
        let mut t = Tunables::default();
        assert_eq!(t.set(Tunable::Zoom, 250.0), 100.0);
        assert_eq!(t.set(Tunable::Chroma, -1.0), 0.0);
        assert_eq!(t.set(Tunable::Strength, f32::NAN), 0.0);
        assert_eq!(t.transition.zoom, 100.0);
    }

    #[test]
    fn nudge_uses_step() {
        let mut t = Tunables::default();
        let zoom = t.nudge(Tunable::Zoom, 5);
        assert!((zoom - 51.0).abs() < 1e-4);
        let lerp = t.nudge(Tunable::Lerp, -100);
        assert_eq!(lerp, 0.0);
    }

    #[test]
    fn clamped_sanitises_loaded_values() {
        let mut t = Tunables::default();
        t.bloom.radius = 3.0;
        t.scroll.lerp = -0.5;
        let t = t.clamped();
        assert_eq!(t.bloom.radius, 1.0);
        assert_eq!(t.scroll.lerp, 0.0);
        assert_eq!(t.transition.zoom, 50.0);
    }
}
