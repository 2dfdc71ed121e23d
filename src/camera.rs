use glam::{Mat4, Vec3};

/// Viewport width in logical pixels below which the narrow framing is used.
pub const BREAKPOINT: f32 = 1000.0;

/// The perspective camera shared by every scene slot.
///
/// All slots render with the same camera so that a transition between two
/// sections reads as one continuous space.
#[derive(Clone, Copy, Debug)]
pub struct Camera {
    pub position: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    /// Vertical field of view in radians.
    pub fov: f32,
    pub near: f32,
    pub far: f32,
    /// Divides the field of view, like a lens zoom.
    pub zoom: f32,
    pub aspect: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 0.0, 8.0),
            target: Vec3::new(0.0, 0.5, -2.0),
            up: Vec3::Y,
            fov: 30f32.to_radians(),
            near: 0.5,
            far: 40.0,
            zoom: 1.0,
            aspect: 1.0,
        }
    }
}

impl Camera {
    pub fn new() -> Self {
        Self::default()
    }

    /// Update aspect and framing for a new logical viewport size.
    ///
    /// Narrow viewports centre the subject; wide ones push it to the right
    /// and zoom in to leave room for page content on the left.
    pub fn resize(&mut self, logical_width: f32, logical_height: f32) {
        self.aspect = logical_width.max(1.0) / logical_height.max(1.0);
        if logical_width < BREAKPOINT {
            self.target = Vec3::new(0.0, 0.5, -2.0);
            self.zoom = 1.0;
        } else {
            self.target = Vec3::new(-1.5, 0.0, -2.0);
            self.zoom = 1.5;
        }
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, self.up)
    }

    pub fn projection_matrix(&self) -> Mat4 {
        let fov = 2.0 * ((self.fov * 0.5).tan() / self.zoom).atan();
        Mat4::perspective_rh(fov, self.aspect, self.near, self.far)
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn narrow_viewport_centres_subject() {
        let mut camera = Camera::new();
        camera.resize(800.0, 600.0);
        assert_eq!(camera.target, Vec3::new(0.0, 0.5, -2.0));
        assert_eq!(camera.zoom, 1.0);
        assert!((camera.aspect - 800.0 / 600.0).abs() < 1e-6);
    }

    #[test]
    fn wide_viewport_zooms_in() {
        let mut camera = Camera::new();
        camera.resize(1600.0, 900.0);
        assert_eq!(camera.target, Vec3::new(-1.5, 0.0, -2.0));
        assert_eq!(camera.zoom, 1.5);
    }

    #[test]
    fn zoom_narrows_projection() {
        let mut camera = Camera::new();
        let wide = camera.projection_matrix();
        camera.zoom = 2.0;
        let narrow = camera.projection_matrix();
        // Larger focal length means a larger y scale term.
        assert!(narrow.y_axis.y > wide.y_axis.y);
    }

    #[test]
    fn degenerate_viewport_keeps_finite_aspect() {
        let mut camera = Camera::new();
        camera.resize(0.0, 0.0);
        assert_eq!(camera.aspect, 1.0);
    }
}
