// SPDX-License-Identifier: GPL-3.0-only

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cli;

#[derive(Parser)]
#[command(name = "frame-monitor")]
#[command(about = "Visualize color, depth and confidence frames")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert frames from a source into PNG files
    Run {
        /// "synthetic" or a capture directory (color.png, depth.png, confidence.png)
        #[arg(short, long, default_value = "synthetic")]
        source: String,

        /// Number of frames to publish
        #[arg(short = 'n', long, default_value = "30")]
        frames: u64,

        /// Source frame rate (default from config)
        #[arg(long)]
        fps: Option<u32>,

        /// Near clip in meters for the grayscale depth view
        #[arg(long)]
        near: Option<f32>,

        /// Far clip in meters for the grayscale depth view
        #[arg(long)]
        far: Option<f32>,

        /// Output directory (default: ./frame-monitor/run_TIMESTAMP)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Config file (default: ~/.config/frame-monitor/config.toml)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Overwrite one file per view instead of numbering them
        #[arg(long)]
        latest_only: bool,

        /// Mirror all views vertically
        #[arg(long)]
        flip: bool,
    },

    /// Live viewer rendering the views to the terminal
    Terminal {
        /// "synthetic" or a capture directory
        #[arg(short, long, default_value = "synthetic")]
        source: String,

        /// Config file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Print the effective configuration as TOML
    Config {
        /// Config file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Set RUST_LOG to control log level
    // Examples: RUST_LOG=debug, RUST_LOG=frame_monitor=trace
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(true)
        .with_level(true)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            source,
            frames,
            fps,
            near,
            far,
            output,
            config,
            latest_only,
            flip,
        } => cli::run_monitor(cli::RunOptions {
            source,
            frames,
            fps,
            near,
            far,
            output,
            config,
            latest_only,
            flip,
        }),
        Commands::Terminal { source, config } => {
            let config = frame_monitor::Config::load(config.as_deref())?;
            frame_monitor::terminal::run(&source, config)
        }
        Commands::Config { config } => cli::print_config(config),
    }
}
