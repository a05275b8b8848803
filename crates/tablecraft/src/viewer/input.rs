//! Keyboard and mouse state for the viewer.
//!
//! [`Input`] tracks which keys or buttons are held, just pressed or just
//! released this frame. [`Pointer`] accumulates cursor motion and wheel
//! lines between frames and turns them into orbit camera moves.

use std::collections::HashSet;
use std::hash::Hash;

pub use winit::event::MouseButton;
pub use winit::keyboard::KeyCode;

use super::orbit::OrbitCamera;

/// Wheel lines per pixel of trackpad scrolling.
const PIXELS_PER_LINE: f32 = 50.0;

/// Tracks the state of a set of inputs (keys or mouse buttons).
pub struct Input<T: Eq + Hash + Copy> {
    pressed: HashSet<T>,
    just_pressed: HashSet<T>,
    just_released: HashSet<T>,
}

impl<T: Eq + Hash + Copy> Input<T> {
    pub fn new() -> Self {
        Self {
            pressed: HashSet::new(),
            just_pressed: HashSet::new(),
            just_released: HashSet::new(),
        }
    }

    pub fn pressed(&self, input: T) -> bool {
        self.pressed.contains(&input)
    }

    pub fn just_pressed(&self, input: T) -> bool {
        self.just_pressed.contains(&input)
    }

    pub fn just_released(&self, input: T) -> bool {
        self.just_released.contains(&input)
    }

    pub(crate) fn press(&mut self, input: T) {
        if self.pressed.insert(input) {
            self.just_pressed.insert(input);
        }
    }

    pub(crate) fn release(&mut self, input: T) {
        if self.pressed.remove(&input) {
            self.just_released.insert(input);
        }
    }

    /// Clear per-frame state. Called at the end of each frame.
    pub(crate) fn clear_just(&mut self) {
        self.just_pressed.clear();
        self.just_released.clear();
    }
}

impl<T: Eq + Hash + Copy> Default for Input<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Mouse cursor position in window coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CursorPosition {
    pub x: f32,
    pub y: f32,
}

/// Cursor motion and wheel input gathered since the last frame.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Pointer {
    pub cursor: CursorPosition,
    last: Option<CursorPosition>,
    drag: (f32, f32),
    scroll_lines: f32,
}

impl Pointer {
    pub fn moved_to(&mut self, x: f32, y: f32) {
        let next = CursorPosition { x, y };
        if let Some(last) = self.last {
            self.drag.0 += next.x - last.x;
            self.drag.1 += next.y - last.y;
        }
        self.last = Some(next);
        self.cursor = next;
    }

    pub fn left_window(&mut self) {
        self.last = None;
    }

    pub fn scrolled_lines(&mut self, lines: f32) {
        self.scroll_lines += lines;
    }

    pub fn scrolled_pixels(&mut self, pixels: f32) {
        self.scroll_lines += pixels / PIXELS_PER_LINE;
    }

    /// Apply the gathered motion to `camera` and reset.
    ///
    /// Left drag rotates, right or middle drag pans, the wheel zooms.
    pub fn drive(&mut self, camera: &mut OrbitCamera, buttons: &Input<MouseButton>, viewport_height: f32) {
        let (dx, dy) = std::mem::take(&mut self.drag);
        if buttons.pressed(MouseButton::Left) {
            camera.rotate(dx, dy, viewport_height);
        } else if buttons.pressed(MouseButton::Right) || buttons.pressed(MouseButton::Middle) {
            camera.pan(dx, dy, viewport_height);
        }
        let lines = std::mem::take(&mut self.scroll_lines);
        if lines != 0.0 {
            camera.zoom(lines);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn just_pressed_lasts_one_frame() {
        let mut keys = Input::<KeyCode>::new();
        keys.press(KeyCode::KeyR);
        assert!(keys.just_pressed(KeyCode::KeyR) && keys.pressed(KeyCode::KeyR));
        keys.clear_just();
        assert!(!keys.just_pressed(KeyCode::KeyR), "cleared after the frame");
        assert!(keys.pressed(KeyCode::KeyR), "still held");
        keys.press(KeyCode::KeyR);
        assert!(!keys.just_pressed(KeyCode::KeyR), "key repeat is not a new press");
        keys.release(KeyCode::KeyR);
        assert!(keys.just_released(KeyCode::KeyR));
    }

    #[test]
    fn drag_only_rotates_while_the_button_is_held() {
        let mut camera = OrbitCamera::configurator_default(50.0);
        let start = camera.azimuth;
        let mut buttons = Input::<MouseButton>::new();
        let mut pointer = Pointer::default();

        pointer.moved_to(100.0, 100.0);
        pointer.moved_to(150.0, 100.0);
        pointer.drive(&mut camera, &buttons, 800.0);
        assert_eq!(camera.azimuth, start, "hovering does nothing");

        buttons.press(MouseButton::Left);
        pointer.moved_to(200.0, 100.0);
        pointer.drive(&mut camera, &buttons, 800.0);
        assert!(camera.azimuth < start, "dragging right turns the table");
    }

    #[test]
    fn wheel_lines_zoom_in() {
        let mut camera = OrbitCamera::configurator_default(50.0);
        let before = camera.distance;
        let mut pointer = Pointer::default();
        pointer.scrolled_lines(2.0);
        pointer.drive(&mut camera, &Input::new(), 800.0);
        assert!(camera.distance < before);

        let settled = camera.distance;
        pointer.drive(&mut camera, &Input::new(), 800.0);
        assert_eq!(camera.distance, settled, "scroll is consumed once");
    }
}
