//! Host-side glue for the raypick demo: randomized scene generation, mouse
//! picking and the flythrough camera path.
//!
//! The spatial index itself lives in `raypick-spatial`; this crate feeds it.
//!
//! # Example
//!
//! ```
//! use raypick_scene::{build_scene, SceneConfig};
//! use glam::Vec3;
//!
//! let tree = build_scene(&SceneConfig::default()).unwrap();
//! assert_eq!(tree.len(), 40);
//!
//! // Same seed, same scene, same answers.
//! let again = build_scene(&SceneConfig::default()).unwrap();
//! let probe = (Vec3::new(0.0, 0.0, -30.0), Vec3::Z);
//! assert_eq!(
//!     tree.search_hit(probe.0, probe.1, 100.0),
//!     again.search_hit(probe.0, probe.1, 100.0),
//! );
//! ```

use glam::{Mat4, Vec3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;

use raypick_spatial::{KdTree, Triangle};

mod camera_path;
mod picking;

pub use camera_path::*;
pub use picking::*;

/// Errors from scene and camera-path construction.
#[derive(Debug, Error)]
pub enum SceneError {
    /// The cubical world bound must have a positive, finite half-extent.
    #[error("scene extremes must be positive and finite, got {0}")]
    InvalidExtremes(f32),

    /// Spline and SQUAD interpolation need at least four waypoints.
    #[error("camera path needs at least 4 waypoints, got {0}")]
    TooFewWaypoints(usize),

    /// Each waypoint carries exactly one look direction.
    #[error("camera path has {points} waypoints but {look_dirs} look directions")]
    MismatchedLookDirections {
        /// Number of waypoints supplied.
        points: usize,
        /// Number of look directions supplied.
        look_dirs: usize,
    },

    /// A look direction must have a nonzero length to define an orientation.
    #[error("look direction {0} has zero length")]
    DegenerateLookDirection(usize),
}

/// Configuration for the randomized triangle scene.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SceneConfig {
    /// Number of triangles to place.
    pub triangle_count: usize,
    /// Half-extent of the cubical world bound; translations are drawn from
    /// `[-extremes, extremes]` on every axis.
    pub extremes: f32,
    /// Seed for the generator; equal seeds produce equal scenes.
    pub seed: u64,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            triangle_count: 40,
            extremes: 10.0,
            seed: 1234,
        }
    }
}

/// Generates the scene's triangles: for each one a translation uniform in the
/// world cube composed with rotations about the x, y and z axes.
pub fn generate_triangles(config: &SceneConfig) -> Result<Vec<Triangle>, SceneError> {
    if !config.extremes.is_finite() || config.extremes <= 0.0 {
        return Err(SceneError::InvalidExtremes(config.extremes));
    }

    let e = config.extremes;
    let mut rng = StdRng::seed_from_u64(config.seed);
    let triangles = (0..config.triangle_count)
        .map(|_| {
            let translation = Vec3::new(
                rng.gen_range(-e..=e),
                rng.gen_range(-e..=e),
                rng.gen_range(-e..=e),
            );
            let transform = Mat4::from_translation(translation)
                * Mat4::from_rotation_x(rng.gen_range(0.0..std::f32::consts::TAU))
                * Mat4::from_rotation_y(rng.gen_range(0.0..std::f32::consts::TAU))
                * Mat4::from_rotation_z(rng.gen_range(0.0..std::f32::consts::TAU));
            Triangle::new(transform)
        })
        .collect();
    Ok(triangles)
}

/// Generates the scene and builds its kd-tree in one step.
pub fn build_scene(config: &SceneConfig) -> Result<KdTree, SceneError> {
    let triangles = generate_triangles(config)?;
    Ok(KdTree::build(triangles, -config.extremes, config.extremes))
}
