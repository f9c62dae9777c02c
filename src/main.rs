//! arb-replay - Render a scene file through the viewport adapter headlessly.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use arbalest_viewport::{replay_scene_file, ReplayOptions};

/// Replay an Arbalest scene through a recording graphics context.
#[derive(Parser, Debug)]
#[command(name = "arb-replay")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Input scene JSON file
    #[arg(short, long)]
    input: PathBuf,

    /// Number of frames to render (defaults to the scene's own count)
    #[arg(short, long)]
    frames: Option<usize>,

    /// Maximum number of display lists the context may hold
    #[arg(long)]
    list_limit: Option<usize>,

    /// Draw everything immediately, without display lists
    #[arg(long)]
    no_cache: bool,

    /// Print the last frame's command log as JSON
    #[arg(long)]
    json: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let filter = if args.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    if args.frames == Some(0) {
        warn!("Zero frames requested, nothing will be drawn");
    }

    info!("Replaying: {}", args.input.display());

    let options = ReplayOptions {
        frames: args.frames,
        list_limit: args.list_limit,
        no_cache: args.no_cache,
    };
    let replay = replay_scene_file(&args.input, &options)
        .with_context(|| format!("Failed to replay {}", args.input.display()))?;

    for (i, (report, commands)) in replay
        .frames
        .iter()
        .zip(&replay.command_counts)
        .enumerate()
    {
        info!(
            "Frame {}: {} compiled, {} replayed, {} immediate, {} commands",
            i, report.compiled, report.replayed, report.immediate, commands
        );
    }

    if args.json {
        let json = serde_json::to_string_pretty(&replay.last_frame)?;
        println!("{}", json);
    }

    Ok(())
}
