// src/main.rs

use anyhow::{Context, Result};
use barbell_tracker::driver::{HighGuiDisplay, WINDOW_NAME};
use barbell_tracker::{default_output_path, BarbellTracker, Config, Detector};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "barbell-tracker", about = "Track and draw the bar path in lift videos")]
struct Args {
    /// YAML config file; built-in defaults when omitted
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// ONNX model path, overrides model.path
    #[arg(long, global = true, env = "BARBELL_MODEL")]
    model: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Process one video file headless and print the result as JSON
    Process {
        input: String,
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Show tracking live in a window ('q' quits, 'c' clears the path)
    Live {
        /// Video file or camera index
        input: String,
        #[arg(long)]
        save: bool,
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Process every video in a directory
    Batch {
        #[arg(long)]
        input_dir: Option<PathBuf>,
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
}

fn main() -> Result<ExitCode> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => Config::default(),
    };
    if let Some(model) = &args.model {
        config.model.path = model.clone();
    }
    config.validate()?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("barbell_tracker={},ort=warn", config.logging.level))
    });
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("🏋 Barbell Tracker starting");
    let detector = load_detector(&config)?;
    let output_dir = PathBuf::from(&config.video.output_dir);
    let mut tracker = BarbellTracker::new(detector, config);

    match args.command {
        Command::Process { input, output } => {
            let output = output.unwrap_or_else(|| default_output_path(&output_dir));
            let result = tracker.process_video_headless(&input, &output);
            println!("{}", serde_json::to_string_pretty(&result)?);
            Ok(if result.success {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }

        Command::Live {
            input,
            save,
            output,
        } => {
            let output = match output {
                Some(path) => Some(path),
                None if save => Some(default_output_path(&output_dir)),
                None => None,
            };
            let mut display = HighGuiDisplay::new(WINDOW_NAME)?;
            let summary = tracker.process_video(&mut display, &input, output.as_deref())?;
            info!(
                "✓ Live session ended: {} frames, {} clears",
                summary.frames, summary.clears
            );
            Ok(ExitCode::SUCCESS)
        }

        Command::Batch {
            input_dir,
            output_dir: batch_output,
        } => {
            let input_dir =
                input_dir.unwrap_or_else(|| PathBuf::from(&tracker.config().video.input_dir));
            let batch_output = batch_output.unwrap_or(output_dir);

            let entries = tracker.process_directory(&input_dir, &batch_output)?;
            let failed = entries.iter().filter(|e| !e.result.success).count();
            if failed > 0 {
                error!("{} of {} videos failed", failed, entries.len());
                return Ok(ExitCode::FAILURE);
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

#[cfg(feature = "onnx")]
fn load_detector(config: &Config) -> Result<Box<dyn Detector>> {
    let detector = barbell_tracker::YoloDetector::new(&config.model)?;
    Ok(Box::new(detector))
}

#[cfg(not(feature = "onnx"))]
fn load_detector(_config: &Config) -> Result<Box<dyn Detector>> {
    anyhow::bail!("built without the `onnx` feature, no detector available")
}
