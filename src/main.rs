// SPDX-License-Identifier: GPL-3.0-only

use camera_pipeline::config::Config;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cli;

#[derive(Parser)]
#[command(name = "camera-pipeline")]
#[command(about = "Real-time camera frame pipeline with on-demand GPU display")]
#[command(version = env!("GIT_VERSION"))]
struct Cli {
    /// Configuration file (default: ~/.config/camera-pipeline/config.json)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Stream the synthetic camera through the pipeline and renderer
    Run {
        /// Stop after this many captured frames (default: until Ctrl+C)
        #[arg(short = 'n', long)]
        frames: Option<u64>,

        /// Capture width
        #[arg(long)]
        width: Option<u32>,

        /// Capture height
        #[arg(long)]
        height: Option<u32>,

        /// Capture rate in frames per second
        #[arg(long)]
        fps: Option<u32>,

        /// Processing stage (edges, grayscale, blank)
        #[arg(short, long)]
        processor: Option<String>,

        /// Save the final surface as PNG (directory or file path)
        #[arg(short, long, num_args = 0..=1, default_missing_value = "")]
        snapshot: Option<PathBuf>,
    },

    /// Convert a raw I420 file to NV21
    Convert {
        /// Input file (tightly packed Y, U, V planes)
        input: PathBuf,

        /// Frame width
        #[arg(long)]
        width: u32,

        /// Frame height
        #[arg(long)]
        height: u32,

        /// Output file (default: input with .nv21 extension)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print the effective configuration as JSON
    Config {
        /// Write the defaults to the configuration file
        #[arg(long)]
        init: bool,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    // Initialize logging
    // Set RUST_LOG environment variable to control log level
    // Examples: RUST_LOG=debug, RUST_LOG=camera_pipeline=trace
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_filter)),
        )
        .with_target(true)
        .with_level(true)
        .init();

    match cli.command {
        Commands::Run {
            frames,
            width,
            height,
            fps,
            processor,
            snapshot,
        } => cli::run(
            config,
            cli::RunOptions {
                frames,
                width,
                height,
                fps,
                processor,
                snapshot,
            },
        ),
        Commands::Convert {
            input,
            width,
            height,
            output,
        } => cli::convert(&input, width, height, output),
        Commands::Config { init } => cli::print_config(&config, cli.config.as_deref(), init),
    }
}
