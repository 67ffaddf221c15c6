use anyhow::{anyhow, ensure, Context, Result};
use chrono::{NaiveDateTime, Utc};
use falcon_calib::CalibrationSet;
use falcon_capture::{FrameSource, FrameStore, TestPatternCamera};
use falcon_config::AppConfig;
use falcon_imu::{ImuClient, RawSample};
use falcon_store::{AccelRow, TIMESTAMP_FORMAT};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Camera and the folder its frames go to.
struct FramePairing {
    camera: Box<dyn FrameSource>,
    store: FrameStore,
}

impl FramePairing {
    /// Capture and save one frame named after `timestamp`. `None` when the
    /// camera has nothing or the frame cannot be saved.
    fn capture(&mut self, timestamp: &str) -> Option<String> {
        let frame = match self.camera.try_capture() {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                debug!(camera_id = self.camera.camera_id(), "No frame available");
                return None;
            }
            Err(e) => {
                warn!(?e, camera_id = self.camera.camera_id(), "Frame capture failed");
                return None;
            }
        };
        let name = FrameStore::frame_name(timestamp);
        match self.store.save(&frame, &name) {
            Ok(_) => Some(name),
            Err(e) => {
                warn!(?e, "Failed to save frame");
                None
            }
        }
    }
}

/// Build the CSV row for one sample. With a camera attached the sample is
/// kept only together with its frame.
fn record_sample(
    sample: RawSample,
    timestamp: NaiveDateTime,
    calibration: Option<&CalibrationSet>,
    pairing: Option<&mut FramePairing>,
) -> Option<AccelRow> {
    let accel = match calibration {
        Some(set) => set.apply(sample.accel),
        None => sample.accel.as_dvec3(),
    };
    let frame_name = match pairing {
        Some(pairing) => {
            let stamp = timestamp.format(TIMESTAMP_FORMAT).to_string();
            Some(pairing.capture(&stamp)?)
        }
        None => None,
    };
    Some(AccelRow {
        timestamp,
        accel,
        frame_name,
    })
}

/// Interval between ticks for a rate in Hz.
fn tick_period(tick_hz: f64) -> Result<Duration> {
    ensure!(
        tick_hz.is_finite() && tick_hz > 0.0,
        "recording.tick_hz must be a positive finite rate, got {tick_hz}"
    );
    Duration::try_from_secs_f64(1.0 / tick_hz)
        .ok()
        .filter(|period| !period.is_zero())
        .ok_or_else(|| anyhow!("recording.tick_hz {tick_hz} is out of range"))
}

/// Record the newest sample on every tick until Ctrl-C, then write the
/// acceleration CSV.
pub async fn run(config: &AppConfig, raw: bool) -> Result<()> {
    let offset = crate::utc_offset(config)?;
    let period = tick_period(config.recording.tick_hz)?;

    let calibration = if raw {
        None
    } else {
        let path = &config.calibration.coefficients_path;
        let set = falcon_store::load_calibration(path).with_context(|| {
            format!(
                "No usable calibration at {}; run `falcon calibrate` or pass --raw",
                path.display()
            )
        })?;
        Some(set)
    };

    let mut pairing = if config.recording.camera.enabled {
        let cam = &config.recording.camera;
        Some(FramePairing {
            camera: Box::new(TestPatternCamera::new(cam.device, cam.width, cam.height)?),
            store: FrameStore::open(config.storage.pics_path())?,
        })
    } else {
        None
    };

    let (imu, mut stream) = ImuClient::bind(
        config.imu.socket_addr(),
        config.imu.packet_format,
        config.imu.queue_capacity,
    )
    .await
    .context("Failed to open accelerometer socket")?;

    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    info!(addr = %imu.local_addr(), raw, "Recording, press Ctrl-C to stop");
    let mut rows = Vec::new();
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let Some(sample) = stream.drain_latest() else {
                    continue;
                };
                let timestamp = Utc::now().with_timezone(&offset).naive_local();
                match record_sample(sample, timestamp, calibration.as_ref(), pairing.as_mut()) {
                    Some(row) => {
                        debug!(
                            %timestamp,
                            accel = ?row.accel,
                            frame = ?row.frame_name,
                            "Sample recorded"
                        );
                        rows.push(row);
                    }
                    None => debug!(%timestamp, "Sample dropped without a frame"),
                }
            }
            res = &mut ctrl_c => {
                res.context("Failed to listen for Ctrl-C")?;
                break;
            }
        }
    }

    if rows.is_empty() {
        warn!("No samples received, nothing to save");
        return Ok(());
    }

    let stop_time = Utc::now().with_timezone(&offset);
    let path = falcon_store::write_accel_csv(&config.storage.accel_path(), stop_time, &rows)?;
    println!("Saved {} samples to {}", rows.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use falcon_calib::AxisCalibration;
    use falcon_capture::CapturedFrame;
    use glam::DVec3;
    use std::path::{Path, PathBuf};

    struct UnpluggedCamera;

    impl FrameSource for UnpluggedCamera {
        fn try_capture(&mut self) -> Result<Option<CapturedFrame>> {
            anyhow::bail!("device unplugged")
        }

        fn camera_id(&self) -> u32 {
            7
        }
    }

    struct IdleCamera;

    impl FrameSource for IdleCamera {
        fn try_capture(&mut self) -> Result<Option<CapturedFrame>> {
            Ok(None)
        }

        fn camera_id(&self) -> u32 {
            8
        }
    }

    fn frames_dir(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("falcon-record-{name}-{}", std::process::id()))
    }

    fn pairing(camera: Box<dyn FrameSource>, dir: &Path) -> FramePairing {
        FramePairing {
            camera,
            store: FrameStore::open(dir).unwrap(),
        }
    }

    fn noon() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_milli_opt(12, 0, 5, 250)
            .unwrap()
    }

    #[test]
    fn failed_capture_drops_sample() {
        let dir = frames_dir("unplugged");
        let mut pairing = pairing(Box::new(UnpluggedCamera), &dir);
        let row = record_sample(RawSample::new(1.0, 2.0, 3.0), noon(), None, Some(&mut pairing));
        assert!(row.is_none());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn missing_frame_drops_sample() {
        let dir = frames_dir("idle");
        let mut pairing = pairing(Box::new(IdleCamera), &dir);
        let row = record_sample(RawSample::new(1.0, 2.0, 3.0), noon(), None, Some(&mut pairing));
        assert!(row.is_none());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn captured_frame_is_saved_and_named() {
        let dir = frames_dir("pattern");
        let camera = TestPatternCamera::new(0, 8, 8).unwrap();
        let mut pairing = pairing(Box::new(camera), &dir);

        let row = record_sample(RawSample::new(1.0, 2.0, 3.0), noon(), None, Some(&mut pairing))
            .unwrap();
        let name = row.frame_name.unwrap();
        assert_eq!(name, "2024-03-01 12-00-05.250.ppm");
        assert!(dir.join(&name).exists());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn without_camera_sample_is_calibrated_and_kept() {
        let set = CalibrationSet::new(
            AxisCalibration {
                scale: 2.0,
                offset: 0.0,
            },
            AxisCalibration::IDENTITY,
            AxisCalibration {
                scale: 1.0,
                offset: -1.0,
            },
        );
        let row = record_sample(RawSample::new(1.0, 2.0, 3.0), noon(), Some(&set), None).unwrap();
        assert_eq!(row.accel, DVec3::new(2.0, 2.0, 2.0));
        assert_eq!(row.frame_name, None);
        assert_eq!(row.timestamp, noon());

        let raw = record_sample(RawSample::new(1.0, 2.0, 3.0), noon(), None, None).unwrap();
        assert_eq!(raw.accel, DVec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn tick_period_rejects_unusable_rates() {
        assert_eq!(tick_period(20.0).unwrap(), Duration::from_millis(50));
        for bad in [0.0, -5.0, f64::INFINITY, f64::NAN, 1e-320] {
            assert!(tick_period(bad).is_err(), "accepted {bad}");
        }
    }
}
