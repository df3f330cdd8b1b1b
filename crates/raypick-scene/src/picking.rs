//! Screen-space picking: turning a mouse position into a world-space ray.

use glam::{Mat4, Vec2, Vec3, Vec4};

use raypick_spatial::Ray;

/// Unprojects a screen pixel into a world-space picking ray.
///
/// The pixel goes through the usual chain: normalized device coordinates
/// (y flipped), a clip-space point on the near plane, eye space via the
/// inverse projection (with depth and w reset so only the direction
/// survives), then world space via the inverse view. The ray's origin is the
/// camera position. Returns `None` if the matrices collapse the direction to
/// zero.
pub fn screen_ray(screen: Vec2, viewport: Vec2, projection: Mat4, view: Mat4) -> Option<Ray> {
    let x = 2.0 * screen.x / viewport.x - 1.0;
    let y = 1.0 - 2.0 * screen.y / viewport.y;

    let clip = Vec4::new(x, y, -1.0, 1.0);
    let eye = projection.inverse() * clip;
    let eye = Vec4::new(eye.x, eye.y, -1.0, 0.0);

    let inv_view = view.inverse();
    let direction = (inv_view * eye).truncate();
    let origin = inv_view.w_axis.truncate();
    Ray::try_new(origin, direction)
}

/// A camera as the picking code sees it: just the two matrices.
#[derive(Debug, Clone, Copy)]
pub struct Camera {
    /// Projection matrix.
    pub projection: Mat4,
    /// View matrix (world to eye).
    pub view: Mat4,
}

impl Camera {
    /// Creates a camera from projection and view matrices.
    pub fn new(projection: Mat4, view: Mat4) -> Self {
        Self { projection, view }
    }

    /// Returns the camera position in world space.
    pub fn eye(&self) -> Vec3 {
        self.view.inverse().w_axis.truncate()
    }

    /// Unprojects a screen pixel into a world-space picking ray.
    pub fn pick(&self, screen: Vec2, viewport: Vec2) -> Option<Ray> {
        screen_ray(screen, viewport, self.projection, self.view)
    }
}
