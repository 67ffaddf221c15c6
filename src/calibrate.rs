use anyhow::{Context, Result};
use falcon_calib::{calibrate_all, Orientation};
use falcon_config::AppConfig;
use falcon_imu::{Axis, ImuClient, RawSample};
use std::io::BufRead;
use tracing::info;

/// Interactive three-orientation calibration. Coefficients are saved to the
/// configured file.
pub async fn run(config: &AppConfig) -> Result<()> {
    let (imu, mut stream) = ImuClient::bind(
        config.imu.socket_addr(),
        config.imu.packet_format,
        config.imu.queue_capacity,
    )
    .await
    .context("Failed to open accelerometer socket")?;
    info!(addr = %imu.local_addr(), "Waiting for accelerometer");

    let batch_size = config.calibration.batch_size;
    let calibration = tokio::task::spawn_blocking(move || {
        let stdin = std::io::stdin();
        calibrate_all(
            |axis: Axis, orientation: Orientation| -> Result<Vec<RawSample>> {
                println!(
                    "Press Enter and keep the sensor steady with the {axis}-axis pointed {orientation}"
                );
                let mut line = String::new();
                stdin.lock().read_line(&mut line)?;
                info!(%axis, %orientation, batch_size, "Collecting calibration batch");
                stream.collect_batch(batch_size)
            },
        )
    })
    .await??;

    for axis in Axis::ALL {
        let fit = calibration.axis(axis);
        println!("{axis}: scale = {}, offset = {}", fit.scale, fit.offset);
    }

    let path = &config.calibration.coefficients_path;
    falcon_store::save_calibration(path, &calibration)?;
    println!("Calibration saved to {}", path.display());
    Ok(())
}
