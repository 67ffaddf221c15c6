use anyhow::{anyhow, Result};
use chrono::Utc;
use falcon_config::AppConfig;
use falcon_motion::{estimate_motion, STANDARD_GRAVITY};
use std::path::PathBuf;
use tracing::{info, warn};

/// Run the motion pipeline on a recording and save velocity, position and
/// the position chart.
pub fn run(config: &AppConfig, file: Option<PathBuf>) -> Result<()> {
    let path = match file {
        Some(path) => path,
        None => {
            let dir = config.storage.accel_path();
            falcon_store::latest_csv(&dir)?
                .ok_or_else(|| anyhow!("No acceleration CSV found in {}", dir.display()))?
        }
    };
    info!(?path, "Analyzing recording");

    let recording = falcon_store::read_accel_csv(&path)?;
    // Recordings are in g; integrate in m/s² so distance is in meters.
    let accel = recording.trace.scaled(STANDARD_GRAVITY)?;
    let estimate = estimate_motion(&accel, &config.motion)?;
    for warning in &estimate.warnings {
        warn!(%warning, "Motion estimate degraded");
    }
    info!(
        samples = recording.trace.len(),
        total_distance = estimate.total_distance,
        "Motion estimated"
    );

    let now = Utc::now().with_timezone(&crate::utc_offset(config)?);
    let velocity_path = falcon_store::write_velocity_csv(
        &config.storage.velocity_path(),
        now,
        &recording,
        &estimate.velocity,
    )?;
    let position_path = falcon_store::write_position_csv(
        &config.storage.position_path(),
        estimate.total_distance,
        &recording,
        &estimate.position,
    )?;
    let chart_path = falcon_store::write_position_chart(
        &config.storage.position_path(),
        estimate.total_distance,
        &estimate.position,
    )?;

    println!("Total distance traveled: {:.2} meters", estimate.total_distance);
    println!("Velocity data saved to {}", velocity_path.display());
    println!("Position data saved to {}", position_path.display());
    println!("Position chart saved to {}", chart_path.display());
    Ok(())
}
