// SPDX-License-Identifier: GPL-3.0-only

//! CLI commands
//!
//! - `run`: drive a source for a number of frames and write every view as PNG
//! - `config`: print the effective configuration

use chrono::Local;
use frame_monitor::backends::camera::frame_loop::Ticker;
use frame_monitor::{
    AppError, AppResult, Config, FrameMonitor, FrameSource, MonitorSettings, MonitorStats,
    PngSink, PngSinkMode, SyntheticConfig, VirtualSource,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Options of the `run` subcommand
pub struct RunOptions {
    pub source: String,
    pub frames: u64,
    pub fps: Option<u32>,
    pub near: Option<f32>,
    pub far: Option<f32>,
    pub output: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub latest_only: bool,
    pub flip: bool,
}

/// Written to `summary.json` in the output directory
#[derive(Serialize)]
struct RunSummary<'a> {
    source: &'a str,
    started_at: String,
    finished_at: String,
    frames_published: u64,
    depth_near: f32,
    depth_far: f32,
    files_written: u64,
    stats: MonitorStats,
}

fn load_config(opts: &RunOptions) -> AppResult<Config> {
    let mut config = Config::load(opts.config.as_deref())?;
    if let Some(fps) = opts.fps {
        config.fps = fps;
    }
    if let Some(near) = opts.near {
        config.depth.near = near;
    }
    if let Some(far) = opts.far {
        config.depth.far = far;
    }
    if opts.flip {
        config.flip_vertical = true;
    }
    config.validate()?;
    Ok(config)
}

fn default_output_dir() -> PathBuf {
    let timestamp = Local::now().format("%Y%m%d_%H%M%S");
    PathBuf::from("frame-monitor").join(format!("run_{}", timestamp))
}

/// Resolve configuration, open the source and create the PNG sink
fn prepare(opts: &RunOptions) -> AppResult<(Config, MonitorSettings, VirtualSource, PngSink)> {
    let config = load_config(opts)?;
    let settings = MonitorSettings::from_config(&config)?;
    let source = VirtualSource::open(&opts.source, SyntheticConfig::default())?;

    let output_dir = opts.output.clone().unwrap_or_else(default_output_dir);
    let mode = if opts.latest_only {
        PngSinkMode::LatestOnly
    } else {
        PngSinkMode::Sequence
    };
    let sink = PngSink::new(&output_dir, mode)?;
    Ok((config, settings, source, sink))
}

/// Publish `frames` frame sets from the source and write every view as PNG
pub fn run_monitor(opts: RunOptions) -> Result<(), Box<dyn std::error::Error>> {
    let started_at = Local::now();
    let (config, settings, source, sink) = prepare(&opts)?;
    let source = Arc::new(source);
    println!("Source: {}", source.name());
    let mut monitor = FrameMonitor::new(settings, sink);

    // Set up Ctrl+C handler
    let stop_flag = Arc::new(AtomicBool::new(false));
    let stop_flag_clone = stop_flag.clone();
    ctrlc::set_handler(move || {
        stop_flag_clone.store(true, Ordering::SeqCst);
    })?;

    println!(
        "Converting {} frames at {} fps... (press Ctrl+C to stop early)",
        opts.frames, config.fps
    );

    let published = {
        let mut session = monitor.start(&*source);
        let ticker_source = Arc::clone(&source);
        let mut ticker = Ticker::start("source", config.fps, Some(opts.frames), move || {
            ticker_source.tick()
        });

        let mut cycles = 0u64;
        loop {
            if stop_flag.load(Ordering::SeqCst) {
                println!();
                println!("Stopped early.");
                break;
            }
            let ran = session.pump_timeout(Duration::from_millis(100));
            cycles += ran as u64;
            if ran == 0 && !ticker.is_running() {
                // Ticker done and nothing pending
                break;
            }
            print!("\rFrames: {}/{}", cycles, opts.frames);
            std::io::Write::flush(&mut std::io::stdout())?;
        }
        println!();

        ticker.stop();
        session.stop();
        ticker.ticks()
    };

    let stats = monitor.stats();
    let sink = monitor.into_sink();
    let range = settings.depth_range;
    let summary = RunSummary {
        source: source.name(),
        started_at: started_at.to_rfc3339(),
        finished_at: Local::now().to_rfc3339(),
        frames_published: published,
        depth_near: range.near(),
        depth_far: range.far(),
        files_written: sink.files_written(),
        stats,
    };
    let summary_path = write_summary(sink.dir(), &summary)?;

    println!(
        "Processed {} cycles, {} files in {}",
        stats.cycles,
        sink.files_written(),
        sink.dir().display()
    );
    if stats.sink_errors > 0 {
        println!("Warning: {} textures failed to write", stats.sink_errors);
    }
    println!("Summary: {}", summary_path.display());

    Ok(())
}

fn write_summary(dir: &Path, summary: &RunSummary<'_>) -> AppResult<PathBuf> {
    let path = dir.join("summary.json");
    let json = serde_json::to_string_pretty(summary)
        .map_err(|e| AppError::Other(format!("Failed to serialize summary: {}", e)))?;
    std::fs::write(&path, json)?;
    Ok(path)
}

/// Print the effective configuration
pub fn print_config(path: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load(path.as_deref())?;
    match path.or_else(|| Config::default_path().filter(|p| p.is_file())) {
        Some(path) => println!("# Loaded from {}", path.display()),
        None => println!("# Defaults (no config file)"),
    }
    print!("{}", config.to_toml_string()?);
    Ok(())
}
