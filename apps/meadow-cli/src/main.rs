use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use glam::Vec2;
use meadow_common::{BoundingSphere, PlacementPolicy, SceneConfig};
use meadow_field::GrassField;
use meadow_input::Action;
use meadow_render::{DebugTextRenderer, Renderer};
use meadow_scene::SceneContext;
use meadow_tools::{SceneInspector, placement_stats};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "meadow-cli", about = "Headless tools for the meadow scene")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print version and crate info
    Info,
    /// Run the scene headless and describe the final frame
    Simulate {
        /// Scene config (YAML)
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Number of frames to run
        #[arg(short, long, default_value = "120")]
        frames: u32,
        /// Frame rate used to derive the frame delta
        #[arg(long, default_value = "60")]
        fps: f32,
        /// Pointer position in normalized device coordinates
        #[arg(long, num_args = 2, value_names = ["X", "Y"], allow_negative_numbers = true, default_values_t = [0.0, 0.0])]
        pointer: Vec<f32>,
        /// Override the grass placement seed
        #[arg(long)]
        seed: Option<u64>,
        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },
    /// Build a field and report how blades are distributed
    Placement {
        /// projected_sphere, ring or area_uniform
        #[arg(short, long, default_value = "projected_sphere", value_parser = parse_policy)]
        policy: PlacementPolicy,
        #[arg(short, long, default_value = "10000")]
        count: usize,
        #[arg(short, long, default_value = "10")]
        radius: f32,
        #[arg(short, long)]
        seed: Option<u64>,
        /// Print the statistics as JSON
        #[arg(long)]
        json: bool,
    },
    /// Inspect or check scene configs
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the default config as YAML
    Default,
    /// Load a config file and report whether it is valid
    Validate { path: PathBuf },
}

fn parse_policy(s: &str) -> Result<PlacementPolicy, String> {
    match s {
        "projected_sphere" | "projected-sphere" => Ok(PlacementPolicy::ProjectedSphere),
        "ring" => Ok(PlacementPolicy::Ring),
        "area_uniform" | "area-uniform" => Ok(PlacementPolicy::AreaUniform),
        other => Err(format!(
            "unknown placement policy '{other}' (expected projected_sphere, ring or area_uniform)"
        )),
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<SceneConfig> {
    match path {
        Some(path) => SceneConfig::load(path)
            .with_context(|| format!("loading config {}", path.display())),
        None => Ok(SceneConfig::default()),
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match cli.command {
        Commands::Info => {
            println!("meadow-cli v{}", env!("CARGO_PKG_VERSION"));
            println!("common: {}", meadow_common::crate_info());
            println!("input: {}", meadow_input::crate_info());
            println!("assets: {}", meadow_assets::crate_info());
            println!("field: {}", meadow_field::crate_info());
            println!("player: {}", meadow_player::crate_info());
            println!("render: {}", meadow_render::crate_info());
            println!("scene: {}", meadow_scene::crate_info());
            println!("tools: {}", meadow_tools::crate_info());
        }
        Commands::Simulate {
            config,
            frames,
            fps,
            pointer,
            seed,
            json,
        } => {
            if fps <= 0.0 {
                bail!("--fps must be positive");
            }
            let mut config = load_config(config.as_deref())?;
            if let Some(seed) = seed {
                config.grass.seed = seed;
            }

            let mut scene = SceneContext::new(config)?;
            let loaded = scene.load_all_blocking();
            tracing::info!(assets = loaded.len(), "assets applied");

            let ndc = Vec2::new(
                pointer.first().copied().unwrap_or(0.0),
                pointer.get(1).copied().unwrap_or(0.0),
            );
            scene.apply(Action::Point(ndc));
            let dt = 1.0 / fps;
            for _ in 0..frames {
                scene.frame(dt);
            }

            let summary = SceneInspector::summary(&scene);
            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                let text = DebugTextRenderer::new()
                    .render(&scene.render_scene(), &scene.render_view());
                print!("{text}");
                println!("{summary}");
            }
        }
        Commands::Placement {
            policy,
            count,
            radius,
            seed,
            json,
        } => {
            let mut grass = SceneConfig::default().grass;
            grass.placement = policy;
            grass.count = count;
            grass.capacity = count;
            grass.radius = radius;
            if let Some(seed) = seed {
                grass.seed = seed;
            }
            let field = GrassField::build(&grass, BoundingSphere::new(glam::Vec3::Y, 1.0))?;
            let stats = placement_stats(&field, radius);

            if json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                println!("Placement: policy={policy:?} count={} radius={radius}", stats.count);
                println!(
                    "Distance: min={:.3} mean={:.3} max={:.3}",
                    stats.min_distance, stats.mean_distance, stats.max_distance
                );
                println!("Equal-area rings (inner to outer):");
                for (i, share) in stats.ring_histogram.iter().enumerate() {
                    let bar = "#".repeat((share * 100.0).round() as usize);
                    println!("  {i}: {:>5.1}% {bar}", share * 100.0);
                }
                println!("Rim bias: {:.2}", stats.rim_bias());
            }
        }
        Commands::Config { action } => match action {
            ConfigAction::Default => {
                print!("{}", SceneConfig::default().to_yaml()?);
            }
            ConfigAction::Validate { path } => {
                let config = load_config(Some(&path))?;
                println!(
                    "{}: valid (grass {}/{}, {} lights)",
                    path.display(),
                    config.grass.count,
                    config.grass.capacity,
                    config.lighting.lights.len()
                );
            }
        },
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn policy_names_parse() {
        assert_eq!(parse_policy("ring"), Ok(PlacementPolicy::Ring));
        assert_eq!(parse_policy("area-uniform"), Ok(PlacementPolicy::AreaUniform));
        assert!(parse_policy("spiral").is_err());
    }

    #[test]
    fn simulate_pointer_accepts_negative_values() {
        let cli = Cli::try_parse_from(["meadow-cli", "simulate", "--pointer", "-0.5", "0.25"]).unwrap();
        match cli.command {
            Commands::Simulate { pointer, .. } => assert_eq!(pointer, vec![-0.5, 0.25]),
            _ => panic!("expected simulate"),
        }
    }
}
