//! Maps the scroll signal onto the pair of scenes to blend.
//!
//! Scroll is measured in scenes: 0.0 shows the first section, 1.0 the
//! second, 1.5 is halfway between the second and the third.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Frame rate the smoothing rate is expressed against.
const REFERENCE_FPS: f32 = 60.0;

/// Distance below which the smoothed position snaps to the target.
const SNAP_EPSILON: f32 = 1e-4;

/// Scroll smoothing parameters.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrollSettings {
    /// Fraction of the remaining distance covered per 60 Hz frame.
    pub lerp: f32,
}

impl Default for ScrollSettings {
    fn default() -> Self {
        Self { lerp: 0.075 }
    }
}

/// Which two adjacent scenes are blended, and how far.
///
/// `index2` is always `index1 + 1`. Progress 0 shows only `index1`,
/// progress 1 only `index2`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BlendState {
    pub index1: usize,
    pub index2: usize,
    pub progress: f32,
}

impl BlendState {
    /// Map a position in scenes onto a blend pair.
    ///
    /// `position` is clamped to `[0, sections - 1]`; the last position maps
    /// to the final pair at full progress. `sections` must be at least 2.
    pub fn from_position(position: f32, sections: usize) -> Self {
        debug_assert!(sections >= 2);
        let last = sections.saturating_sub(1).max(1);
        let s = if position.is_nan() {
            0.0
        } else {
            position.clamp(0.0, last as f32)
        };

        if s >= last as f32 {
            return Self {
                index1: last - 1,
                index2: last,
                progress: 1.0,
            };
        }

        let index1 = s.floor() as usize;
        Self {
            index1,
            index2: index1 + 1,
            progress: s - index1 as f32,
        }
    }

    pub fn pair(&self) -> (usize, usize) {
        (self.index1, self.index2)
    }
}

/// Smooths the raw scroll target and derives the active blend.
#[derive(Clone, Debug)]
pub struct ScrollCoupler {
    sections: usize,
    target: f32,
    position: f32,
    blend: BlendState,
}

impl ScrollCoupler {
    /// # Errors
    ///
    /// [`Error::TooFewSections`] when `sections < 2`.
    pub fn new(sections: usize) -> Result<Self> {
        if sections < 2 {
            return Err(Error::TooFewSections(sections));
        }
        Ok(Self {
            sections,
            target: 0.0,
            position: 0.0,
            blend: BlendState::from_position(0.0, sections),
        })
    }

    pub fn sections(&self) -> usize {
        self.sections
    }

    fn max_position(&self) -> f32 {
        (self.sections - 1) as f32
    }

    /// Record a new raw scroll target, clamped to `[0, sections - 1]`.
    pub fn set_target(&mut self, scroll: f32) {
        if scroll.is_nan() {
            return;
        }
        self.target = scroll.clamp(0.0, self.max_position());
    }

    pub fn target(&self) -> f32 {
        self.target
    }

    /// The smoothed position.
    pub fn position(&self) -> f32 {
        self.position
    }

    pub fn blend(&self) -> BlendState {
        self.blend
    }

    /// Advance smoothing by `dt` seconds at the given lerp rate.
    ///
    /// Returns true when the active pair changed, so visibility can be
    /// toggled before the frame renders.
    pub fn tick(&mut self, dt: f32, lerp: f32) -> bool {
        let alpha = smoothing_factor(lerp, dt);
        self.position += (self.target - self.position) * alpha;
        if (self.target - self.position).abs() < SNAP_EPSILON {
            self.position = self.target;
        }
        self.position = self.position.clamp(0.0, self.max_position());

        let previous = self.blend.pair();
        self.blend = BlendState::from_position(self.position, self.sections);
        self.blend.pair() != previous
    }
}

/// Frame-rate independent exponential smoothing factor.
///
/// At 60 Hz this is exactly `rate`; other frame times compound it so the
/// motion covers the same distance per second.
pub fn smoothing_factor(rate: f32, dt: f32) -> f32 {
    let rate = if rate.is_nan() { 0.0 } else { rate.clamp(0.0, 1.0) };
    if dt.is_nan() || dt <= 0.0 {
        return 0.0;
    }
    1.0 - (1.0 - rate).powf(dt * REFERENCE_FPS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mapping_inside_range() {
        let b = BlendState::from_position(1.5, 3);
        assert_eq!(b.pair(), (1, 2));
        assert!((b.progress - 0.5).abs() < 1e-6);

        let b = BlendState::from_position(0.0, 3);
        assert_eq!(b.pair(), (0, 1));
        assert_eq!(b.progress, 0.0);

        // Exactly on a section boundary the new pair starts at progress 0.
        let b = BlendState::from_position(1.0, 3);
        assert_eq!(b.pair(), (1, 2));
        assert_eq!(b.progress, 0.0);
    }

    #[test]
    fn top_boundary_clamps_to_last_pair() {
        for s in [2.0, 2.5, 100.0, f32::INFINITY] {
            let b = BlendState::from_position(s, 3);
            assert_eq!(b.pair(), (1, 2));
            assert_eq!(b.progress, 1.0);
        }
    }

    #[test]
    fn negative_and_nan_clamp_to_start() {
        for s in [-3.0, f32::NEG_INFINITY, f32::NAN] {
            let b = BlendState::from_position(s, 4);
            assert_eq!(b.pair(), (0, 1));
            assert_eq!(b.progress, 0.0);
        }
    }

    #[test]
    fn coupler_requires_two_sections() {
        assert!(matches!(ScrollCoupler::new(1), Err(Error::TooFewSections(1))));
        assert!(matches!(ScrollCoupler::new(0), Err(Error::TooFewSections(0))));
        assert!(ScrollCoupler::new(2).is_ok());
    }

    #[test]
    fn set_target_clamps() {
        let mut coupler = ScrollCoupler::new(3).unwrap();
        coupler.set_target(7.0);
        assert_eq!(coupler.target(), 2.0);
        coupler.set_target(-1.0);
        assert_eq!(coupler.target(), 0.0);
        coupler.set_target(f32::NAN);
        assert_eq!(coupler.target(), 0.0);
    }

    #[test]
    fn full_rate_snaps_and_reports_pair_change() {
        let mut coupler = ScrollCoupler::new(3).unwrap();
        coupler.set_target(1.25);
        assert!(coupler.tick(1.0 / 60.0, 1.0));
        assert_eq!(coupler.position(), 1.25);
        assert_eq!(coupler.blend().pair(), (1, 2));

        coupler.set_target(1.75);
        assert!(!coupler.tick(1.0 / 60.0, 1.0));
    }

    #[test]
    fn smoothing_converges() {
        let mut coupler = ScrollCoupler::new(3).unwrap();
        coupler.set_target(1.0);
        coupler.tick(1.0 / 60.0, 0.075);
        assert!((coupler.position() - 0.075).abs() < 1e-6);

        for _ in 0..600 {
            coupler.tick(1.0 / 60.0, 0.075);
        }
        assert_eq!(coupler.position(), 1.0);
    }

    #[test]
    fn smoothing_is_frame_rate_independent() {
        let mut fast = ScrollCoupler::new(2).unwrap();
        let mut slow = ScrollCoupler::new(2).unwrap();
        fast.set_target(1.0);
        slow.set_target(1.0);
        for _ in 0..4 {
            fast.tick(1.0 / 120.0, 0.1);
        }
        for _ in 0..2 {
            slow.tick(1.0 / 60.0, 0.1);
        }
        assert!((fast.position() - slow.position()).abs() < 1e-5);
    }

    #[test]
    fn zero_rate_or_dt_holds_position() {
        let mut coupler = ScrollCoupler::new(2).unwrap();
        coupler.set_target(1.0);
        coupler.tick(1.0 / 60.0, 0.0);
        coupler.tick(0.0, 0.5);
        coupler.tick(-1.0, 0.5);
        assert_eq!(coupler.position(), 0.0);
    }
}
