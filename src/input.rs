use std::collections::HashSet;

use glam::Vec2;
use winit::event::{ElementState, MouseScrollDelta, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

use crate::tunables::Tunable;

/// Sections moved per wheel line.
pub const WHEEL_STEP: f32 = 0.1;

/// Pixels per wheel line for touchpads reporting pixel deltas.
const PIXELS_PER_LINE: f32 = 120.0;

/// Tracks keyboard and wheel input between frames.
#[derive(Default)]
pub struct Input {
    keys_down: HashSet<KeyCode>,
    keys_pressed: HashSet<KeyCode>,
    scroll_delta: Vec2,
}

/// What the user asked the presentation to do this frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Command {
    /// Move the scroll target by this many sections.
    Scroll(f32),
    /// Jump to the section `n` away from the nearest one.
    Step(i32),
    /// Jump to the first section.
    First,
    /// Jump to the last section.
    Last,
    /// Choose which tunable `Nudge` adjusts.
    Select(Tunable),
    /// Adjust the selected tunable by this many steps.
    Nudge(i32),
}

impl Input {
    pub fn new() -> Self {
        Self::default()
    }

    /// Call at the end of each frame to reset per-frame state.
    pub fn begin_frame(&mut self) {
        self.keys_pressed.clear();
        self.scroll_delta = Vec2::ZERO;
    }

    /// Process a window event and update input state.
    pub fn handle_event(&mut self, event: &WindowEvent) {
        match event {
            WindowEvent::KeyboardInput { event, .. } => {
                if let PhysicalKey::Code(key) = event.physical_key {
                    match event.state {
                        ElementState::Pressed => self.press(key),
                        ElementState::Released => self.release(key),
                    }
                }
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let d = match delta {
                    MouseScrollDelta::LineDelta(x, y) => Vec2::new(*x, *y),
                    MouseScrollDelta::PixelDelta(pos) => {
                        Vec2::new(pos.x as f32, pos.y as f32) / PIXELS_PER_LINE
                    }
                };
                self.scroll(d);
            }
            WindowEvent::Focused(false) => self.keys_down.clear(),
            _ => {}
        }
    }

    fn press(&mut self, key: KeyCode) {
        if self.keys_down.insert(key) {
            self.keys_pressed.insert(key);
        }
    }

    fn release(&mut self, key: KeyCode) {
        self.keys_down.remove(&key);
    }

    fn scroll(&mut self, delta: Vec2) {
        self.scroll_delta += delta;
    }

    /// Returns true if the key is currently held down.
    pub fn key_down(&self, key: KeyCode) -> bool {
        self.keys_down.contains(&key)
    }

    /// Returns true if the key was pressed this frame.
    pub fn key_pressed(&self, key: KeyCode) -> bool {
        self.keys_pressed.contains(&key)
    }

    /// Translate this frame's input into commands.
    ///
    /// Wheel down and arrow down move forward through the sections. Shift
    /// makes `+`/`-` adjust ten steps at a time.
    pub fn commands(&self) -> Vec<Command> {
        let mut commands = Vec::new();

        if self.scroll_delta.y != 0.0 {
            commands.push(Command::Scroll(-self.scroll_delta.y * WHEEL_STEP));
        }

        let pressed_any = |keys: &[KeyCode]| keys.iter().any(|k| self.key_pressed(*k));
        if pressed_any(&[KeyCode::ArrowDown, KeyCode::PageDown, KeyCode::Space]) {
            commands.push(Command::Step(1));
        }
        if pressed_any(&[KeyCode::ArrowUp, KeyCode::PageUp]) {
            commands.push(Command::Step(-1));
        }
        if self.key_pressed(KeyCode::Home) {
            commands.push(Command::First);
        }
        if self.key_pressed(KeyCode::End) {
            commands.push(Command::Last);
        }

        for (key, tunable) in DIGITS.iter().zip(Tunable::ALL) {
            if self.key_pressed(*key) {
                commands.push(Command::Select(tunable));
            }
        }

        let steps = if self.key_down(KeyCode::ShiftLeft) || self.key_down(KeyCode::ShiftRight) {
            10
        } else {
            1
        };
        if pressed_any(&[KeyCode::Equal, KeyCode::NumpadAdd]) {
            commands.push(Command::Nudge(steps));
        }
        if pressed_any(&[KeyCode::Minus, KeyCode::NumpadSubtract]) {
            commands.push(Command::Nudge(-steps));
        }

        commands
    }
}

/// Number keys select tunables in panel order.
const DIGITS: [KeyCode; 8] = [
    KeyCode::Digit1,
    KeyCode::Digit2,
    KeyCode::Digit3,
    KeyCode::Digit4,
    KeyCode::Digit5,
    KeyCode::Digit6,
    KeyCode::Digit7,
    KeyCode::Digit8,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn held_keys_fire_once() {
        let mut input = Input::new();
        input.press(KeyCode::ArrowDown);
        assert_eq!(input.commands(), [Command::Step(1)]);

        input.begin_frame();
        input.press(KeyCode::ArrowDown);
        assert!(input.key_down(KeyCode::ArrowDown));
        assert!(input.commands().is_empty());

        input.release(KeyCode::ArrowDown);
        input.press(KeyCode::ArrowDown);
        assert_eq!(input.commands(), [Command::Step(1)]);
    }

    #[test]
    fn wheel_down_scrolls_forward() {
        let mut input = Input::new();
        input.scroll(Vec2::new(0.0, -3.0));
        input.scroll(Vec2::new(0.0, 1.0));
        match input.commands().as_slice() {
            [Command::Scroll(d)] => assert!((d - 0.2).abs() < 1e-6),
            other => panic!("unexpected {other:?}"),
        }
        input.begin_frame();
        assert!(input.commands().is_empty());
    }

    #[test]
    fn digits_select_and_shift_multiplies() {
        let mut input = Input::new();
        input.press(KeyCode::Digit6);
        input.press(KeyCode::ShiftLeft);
        input.press(KeyCode::Equal);
        assert_eq!(
            input.commands(),
            [Command::Select(Tunable::Zoom), Command::Nudge(10)]
        );
    }

    #[test]
    fn page_and_edge_keys() {
        let mut input = Input::new();
        input.press(KeyCode::PageUp);
        input.press(KeyCode::End);
        assert_eq!(input.commands(), [Command::Step(-1), Command::Last]);
    }
}
