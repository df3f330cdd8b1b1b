//! raypick - build a random triangle scene and pick against its kd-tree.
//!
//! A renderer-free stand-in for the interactive demo: the same scene setup,
//! camera path and picking queries, reporting to stdout instead of a window.

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use glam::Vec3;
use raypick_scene::{build_scene, CameraPath, SceneConfig};

#[derive(Parser)]
#[command(name = "raypick")]
#[command(about = "Ray picking against a kd-tree of random triangles", long_about = None)]
struct Cli {
    #[command(flatten)]
    scene: SceneArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct SceneArgs {
    /// Number of random triangles in the scene
    #[arg(long, default_value_t = 40)]
    triangles: usize,

    /// Half-extent of the cubical world bound
    #[arg(long, default_value_t = 10.0)]
    extremes: f32,

    /// Seed for the scene generator
    #[arg(long, default_value_t = 1234)]
    seed: u64,
}

impl SceneArgs {
    fn config(&self) -> SceneConfig {
        SceneConfig {
            triangle_count: self.triangles,
            extremes: self.extremes,
            seed: self.seed,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Print scene and tree statistics
    Info,
    /// Cast a single ray and print the nearest hit
    Pick {
        /// Ray origin as "x,y,z"
        #[arg(long, value_parser = parse_vec3)]
        origin: Vec3,
        /// Ray direction as "x,y,z" (normalized internally)
        #[arg(long, value_parser = parse_vec3)]
        direction: Vec3,
        /// Maximum travel distance
        #[arg(long, default_value_t = 100.0)]
        max_distance: f32,
    },
    /// Fly the built-in camera path, casting the view ray at each sample
    Fly {
        /// Number of samples along the path
        #[arg(long, default_value_t = 40)]
        steps: usize,
        /// Maximum travel distance per ray
        #[arg(long, default_value_t = 100.0)]
        max_distance: f32,
    },
}

fn parse_vec3(s: &str) -> Result<Vec3, String> {
    let parts: Vec<&str> = s.split(',').collect();
    if parts.len() != 3 {
        return Err(format!("expected \"x,y,z\", got \"{s}\""));
    }
    let mut v = [0.0f32; 3];
    for (slot, part) in v.iter_mut().zip(&parts) {
        *slot = part
            .trim()
            .parse()
            .map_err(|e| format!("bad component \"{part}\": {e}"))?;
    }
    Ok(Vec3::from_array(v))
}

/// Waypoints of the built-in flythrough.
const PATH_POINTS: [Vec3; 20] = [
    Vec3::new(0.0, 5.0, -3.0),
    Vec3::new(1.0, 3.0, -1.0),
    Vec3::new(2.0, 3.0, 1.0),
    Vec3::new(2.0, 3.0, 0.0),
    Vec3::new(4.0, 3.0, 4.0),
    Vec3::new(3.0, 2.0, 8.0),
    Vec3::new(2.0, 1.0, 10.0),
    Vec3::new(1.0, 1.0, 12.0),
    Vec3::new(4.0, 0.0, 14.0),
    Vec3::new(2.0, 2.0, 20.0),
    Vec3::new(0.0, 3.0, 14.0),
    Vec3::new(-2.0, 5.0, 12.0),
    Vec3::new(-2.0, 4.0, 10.0),
    Vec3::new(-2.0, 3.0, 8.0),
    Vec3::new(-2.0, 2.0, 6.0),
    Vec3::new(-2.0, 0.0, 4.0),
    Vec3::new(-2.0, 0.0, 2.0),
    Vec3::new(-2.0, 0.0, 0.0),
    Vec3::new(-2.0, 0.0, -2.0),
    Vec3::new(-1.0, 0.0, -2.0),
];

/// Where the camera looks at each waypoint.
const PATH_LOOK_DIRS: [Vec3; 20] = [
    Vec3::new(0.0, 0.0, 1.0),
    Vec3::new(1.0, 0.0, 1.0),
    Vec3::new(1.0, 0.0, 1.0),
    Vec3::new(0.3, 0.0, 1.0),
    Vec3::new(0.1, 0.0, 1.0),
    Vec3::new(0.1, 0.0, 0.7),
    Vec3::new(0.3, 0.0, 0.5),
    Vec3::new(-1.0, 0.0, -1.0),
    Vec3::new(-0.4, 0.0, 0.0),
    Vec3::new(-0.7, 0.0, -1.0),
    Vec3::new(-1.0, 0.0, -1.0),
    Vec3::new(-1.0, 0.0, -0.8),
    Vec3::new(-1.0, 0.0, -0.5),
    Vec3::new(-1.0, 0.0, -0.3),
    Vec3::new(-1.0, 0.0, 0.0),
    Vec3::new(-1.0, 0.0, 0.1),
    Vec3::new(-1.0, 0.0, 0.5),
    Vec3::new(-1.0, 0.0, 1.0),
    Vec3::new(-1.0, 0.0, 1.0),
    Vec3::new(0.0, 0.0, 1.0),
];

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = cli.scene.config();
    let tree = build_scene(&config)?;

    match cli.command {
        Command::Info => {
            let bounds = tree.bounds();
            println!("triangles:   {}", tree.len());
            println!("tree nodes:  {}", tree.boxes().len());
            println!(
                "world bound: ({:.2}, {:.2}, {:.2}) .. ({:.2}, {:.2}, {:.2})",
                bounds.min.x, bounds.min.y, bounds.min.z, bounds.max.x, bounds.max.y, bounds.max.z
            );
        }
        Command::Pick {
            origin,
            direction,
            max_distance,
        } => {
            report_hit(&tree, origin, direction, max_distance);
        }
        Command::Fly {
            steps,
            max_distance,
        } => {
            let path = CameraPath::new(PATH_POINTS.to_vec(), &PATH_LOOK_DIRS)?;
            for step in 0..steps {
                let u = step as f32 / steps as f32;
                let (position, _) = path.sample(u);
                let direction = path.look_direction_at(u);
                print!(
                    "u={:.3} pos=({:.2}, {:.2}, {:.2}) ",
                    u, position.x, position.y, position.z
                );
                report_hit(&tree, position, direction, max_distance);
            }
        }
    }

    Ok(())
}

fn report_hit(tree: &raypick_spatial::KdTree, origin: Vec3, direction: Vec3, max_distance: f32) {
    match tree.search_hit(origin, direction, max_distance) {
        Some(hit) => println!(
            "hit triangle {} at t={:.4}, point=({:.3}, {:.3}, {:.3})",
            hit.index, hit.t, hit.point.x, hit.point.y, hit.point.z
        ),
        None => println!("no hit"),
    }
}
