mod analyze;
mod calibrate;
mod record;

use anyhow::{anyhow, Result};
use chrono::FixedOffset;
use clap::{Parser, Subcommand};
use falcon_config::AppConfig;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "falcon", version)]
#[command(about = "Accelerometer calibration and displacement estimation", long_about = None)]
struct Cli {
    /// Config file to use instead of the default location.
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fit per-axis scale and offset from three gravity orientations.
    Calibrate,
    /// Record accelerations (and camera frames) until Ctrl-C.
    Record {
        /// Store sensor units as received, without calibration.
        #[arg(long, default_value_t = false)]
        raw: bool,
    },
    /// Estimate velocity, position and distance from a recording.
    Analyze {
        /// Acceleration CSV. Defaults to the newest one in the accelerations folder.
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
    },
    /// Write the default config file.
    InitConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "falcon_odometry=info,falcon_imu=info,falcon_calib=info,falcon_motion=info,falcon_store=info,falcon_capture=info"
                    .into()
            }),
        )
        .init();

    let cli = Cli::parse();
    let config_file = cli.config.as_deref();

    match cli.command {
        Command::InitConfig => init_config(config_file),
        Command::Calibrate => calibrate::run(&load_config(config_file)).await,
        Command::Record { raw } => record::run(&load_config(config_file), raw).await,
        Command::Analyze { file } => analyze::run(&load_config(config_file), file),
    }
}

/// Load config, falling back to defaults when it cannot be read.
fn load_config(path: Option<&Path>) -> AppConfig {
    let loaded = match path {
        Some(path) => falcon_config::load_config_from(path),
        None => falcon_config::load_config(),
    };
    let config = loaded.unwrap_or_else(|e| {
        warn!(?e, "Failed to load config, using defaults");
        AppConfig::default()
    });
    info!(port = config.imu.port, motion = ?config.motion, "Config loaded");
    config
}

fn init_config(path: Option<&Path>) -> Result<()> {
    let config = AppConfig::default();
    let path = match path {
        Some(path) => {
            falcon_config::save_config_to(&config, path)?;
            path.to_path_buf()
        }
        None => falcon_config::save_config(&config)?,
    };
    println!("Wrote default config to {}", path.display());
    Ok(())
}

/// Fixed offset used for wall-clock timestamps and file names.
pub(crate) fn utc_offset(config: &AppConfig) -> Result<FixedOffset> {
    let minutes = config.recording.utc_offset_minutes;
    minutes
        .checked_mul(60)
        .and_then(FixedOffset::east_opt)
        .ok_or_else(|| anyhow!("UTC offset of {minutes} minutes is out of range"))
}
