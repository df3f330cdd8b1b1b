//! Flythrough camera path: Catmull-Rom positions and SQUAD orientations.

use glam::{Quat, Vec3};

use crate::SceneError;

/// Reference forward axis; a waypoint's orientation rotates this onto its
/// look direction.
pub const FORWARD: Vec3 = Vec3::NEG_Z;

/// A closed loop of camera waypoints with per-waypoint look directions.
///
/// Positions are interpolated with a Catmull-Rom spline (Kochanek-Bartels
/// tangents with tension, bias and continuity all zero, fed into cubic
/// Hermite segments), so the camera passes through every waypoint.
/// Orientations are blended with SQUAD over the quaternions rotating
/// [`FORWARD`] onto each look direction, giving a smooth turn instead of the
/// wobble plain per-segment slerp produces.
///
/// # Example
///
/// ```
/// use raypick_scene::CameraPath;
/// use glam::Vec3;
///
/// let path = CameraPath::new(
///     vec![
///         Vec3::new(0.0, 0.0, 0.0),
///         Vec3::new(4.0, 0.0, 0.0),
///         Vec3::new(4.0, 0.0, 4.0),
///         Vec3::new(0.0, 0.0, 4.0),
///     ],
///     &[Vec3::Z, Vec3::X, Vec3::NEG_Z, Vec3::NEG_X],
/// )
/// .unwrap();
///
/// let (position, _orientation) = path.sample(0.0);
/// assert!((position - Vec3::ZERO).length() < 1e-5);
/// ```
#[derive(Debug, Clone)]
pub struct CameraPath {
    points: Vec<Vec3>,
    orientations: Vec<Quat>,
}

impl CameraPath {
    /// Creates a path from waypoints and matching look directions.
    ///
    /// Needs at least four waypoints (the spline and SQUAD both interpolate
    /// over a window of four keys) and one look direction per waypoint.
    pub fn new(points: Vec<Vec3>, look_dirs: &[Vec3]) -> Result<Self, SceneError> {
        if points.len() < 4 {
            return Err(SceneError::TooFewWaypoints(points.len()));
        }
        if look_dirs.len() != points.len() {
            return Err(SceneError::MismatchedLookDirections {
                points: points.len(),
                look_dirs: look_dirs.len(),
            });
        }

        let mut orientations = Vec::with_capacity(look_dirs.len());
        for (i, dir) in look_dirs.iter().enumerate() {
            let dir = dir
                .try_normalize()
                .ok_or(SceneError::DegenerateLookDirection(i))?;
            orientations.push(Quat::from_rotation_arc(FORWARD, dir));
        }

        Ok(Self {
            points,
            orientations,
        })
    }

    /// Returns the number of waypoints.
    pub fn waypoint_count(&self) -> usize {
        self.points.len()
    }

    /// Samples the path at `u` in `[0, 1)` across the whole loop; values
    /// outside wrap around. Returns the camera position and orientation.
    pub fn sample(&self, u: f32) -> (Vec3, Quat) {
        let n = self.points.len();
        let scaled = u.rem_euclid(1.0) * n as f32;
        let segment = (scaled.floor() as usize).min(n - 1);
        let t = scaled - segment as f32;

        let i0 = (segment + n - 1) % n;
        let i1 = segment;
        let i2 = (segment + 1) % n;
        let i3 = (segment + 2) % n;

        let (m1, m2) = tangents(
            self.points[i0],
            self.points[i1],
            self.points[i2],
            self.points[i3],
        );
        let position = hermite(self.points[i1], self.points[i2], m1, m2, t);

        let a1 = intermediate(
            self.orientations[i0],
            self.orientations[i1],
            self.orientations[i2],
        );
        let a2 = intermediate(
            self.orientations[i1],
            self.orientations[i2],
            self.orientations[i3],
        );
        let orientation = squad(self.orientations[i1], self.orientations[i2], a1, a2, t);

        (position, orientation)
    }

    /// Samples only the camera position.
    pub fn position_at(&self, u: f32) -> Vec3 {
        self.sample(u).0
    }

    /// Samples only the camera orientation.
    pub fn orientation_at(&self, u: f32) -> Quat {
        self.sample(u).1
    }

    /// Samples the world-space view direction (unit length).
    pub fn look_direction_at(&self, u: f32) -> Vec3 {
        self.orientation_at(u) * FORWARD
    }
}

/// Catmull-Rom tangents for the segment from `p1` to `p2`.
fn tangents(p0: Vec3, p1: Vec3, p2: Vec3, p3: Vec3) -> (Vec3, Vec3) {
    let m1 = (p1 - p0) * 0.5 + (p2 - p1) * 0.5;
    let m2 = (p2 - p1) * 0.5 + (p3 - p2) * 0.5;
    (m1, m2)
}

/// Cubic Hermite interpolation between `p1` and `p2` with tangents `m1`, `m2`.
fn hermite(p1: Vec3, p2: Vec3, m1: Vec3, m2: Vec3, t: f32) -> Vec3 {
    let t2 = t * t;
    let t3 = t2 * t;
    let h00 = 2.0 * t3 - 3.0 * t2 + 1.0;
    let h10 = t3 - 2.0 * t2 + t;
    let h01 = -2.0 * t3 + 3.0 * t2;
    let h11 = t3 - t2;
    p1 * h00 + m1 * h10 + p2 * h01 + m2 * h11
}

/// Logarithm of a unit quaternion: the vector `theta * axis` with
/// `q = (cos theta, sin theta * axis)`.
fn quat_ln(q: Quat) -> Vec3 {
    let v = Vec3::new(q.x, q.y, q.z);
    let len = v.length();
    if len < 1e-6 {
        return Vec3::ZERO;
    }
    (v / len) * len.atan2(q.w)
}

/// Exponential of a pure-vector quaternion exponent, inverse of [`quat_ln`].
fn quat_exp(v: Vec3) -> Quat {
    let theta = v.length();
    if theta < 1e-6 {
        return Quat::IDENTITY;
    }
    let (s, c) = theta.sin_cos();
    let axis = v / theta;
    Quat::from_xyzw(axis.x * s, axis.y * s, axis.z * s, c)
}

/// SQUAD inner control quaternion for the key `curr` given its neighbors.
fn intermediate(prev: Quat, curr: Quat, next: Quat) -> Quat {
    let inv = curr.inverse();
    let exponent = -(quat_ln(inv * next) + quat_ln(inv * prev)) / 4.0;
    curr * quat_exp(exponent)
}

/// Spherical quadrangle interpolation between `q1` and `q2` with inner
/// control quaternions `a1` and `a2`.
fn squad(q1: Quat, q2: Quat, a1: Quat, a2: Quat, t: f32) -> Quat {
    let outer = q1.slerp(q2, t);
    let inner = a1.slerp(a2, t);
    outer.slerp(inner, 2.0 * t * (1.0 - t))
}
