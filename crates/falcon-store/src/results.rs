use crate::{AccelRecording, StoreError, TIMESTAMP_FORMAT};
use chrono::{DateTime, FixedOffset};
use falcon_motion::{MotionError, PositionTrace, Trace, VelocityTrace};
use std::path::{Path, PathBuf};
use tracing::info;

/// Write `dir/velocity_data_<now>.csv`, one row per source timestamp.
pub fn write_velocity_csv(
    dir: &Path,
    now: DateTime<FixedOffset>,
    source: &AccelRecording,
    velocity: &VelocityTrace,
) -> Result<PathBuf, StoreError> {
    let name = format!("velocity_data_{}.csv", now.format("%Y-%m-%d_%H-%M-%S"));
    write_table(dir, &name, source, velocity, ["Vel_X", "Vel_Y", "Vel_Z"])
}

/// Write `dir/position_data_<distance>_meters.csv`. `position` is in meters
/// when the pipeline was fed m/s².
pub fn write_position_csv(
    dir: &Path,
    total_distance: f64,
    source: &AccelRecording,
    position: &PositionTrace,
) -> Result<PathBuf, StoreError> {
    let name = format!("position_data_{total_distance:.2}_meters.csv");
    write_table(
        dir,
        &name,
        source,
        position,
        ["Filtered_Pos_X", "Filtered_Pos_Y", "Filtered_Pos_Z"],
    )
}

fn write_table(
    dir: &Path,
    name: &str,
    source: &AccelRecording,
    trace: &Trace,
    columns: [&str; 3],
) -> Result<PathBuf, StoreError> {
    if trace.len() != source.timestamps.len() {
        return Err(MotionError::MalformedTrace(format!(
            "{} rows for {} timestamps",
            trace.len(),
            source.timestamps.len()
        ))
        .into());
    }

    crate::create_dir(dir)?;
    let path = dir.join(name);
    let mut writer = csv::Writer::from_path(&path)?;
    writer.write_record([source.timestamp_header.as_str(), columns[0], columns[1], columns[2]])?;
    for (timestamp, point) in source.timestamps.iter().zip(trace.points()) {
        writer.write_record([
            timestamp.format(TIMESTAMP_FORMAT).to_string(),
            point.value.x.to_string(),
            point.value.y.to_string(),
            point.value.z.to_string(),
        ])?;
    }
    writer.flush().map_err(StoreError::io(&path))?;

    info!(?path, rows = trace.len(), "Saved results table");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{read_accel_csv, write_accel_csv, AccelRow};
    use chrono::NaiveDate;
    use falcon_motion::{estimate_motion, FilterSpec};
    use glam::DVec3;

    fn recording(dir: &Path, n: usize) -> AccelRecording {
        let start = NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap();
        let rows: Vec<AccelRow> = (0..n)
            .map(|i| AccelRow {
                timestamp: start + chrono::Duration::milliseconds(50 * i as i64),
                accel: DVec3::new((i as f64 * 0.7).sin() * 0.1, 0.0, 1.0),
                frame_name: None,
            })
            .collect();
        let offset = FixedOffset::east_opt(330 * 60).unwrap();
        let stop = rows[n - 1].timestamp.and_local_timezone(offset).unwrap();
        let path = write_accel_csv(dir, stop, &rows).unwrap();
        read_accel_csv(&path).unwrap()
    }

    #[test]
    fn writes_velocity_and_position_tables() {
        let dir = crate::scratch_dir("results");
        let source = recording(&dir, 60);
        let estimate = estimate_motion(&source.trace, &FilterSpec::default()).unwrap();
        let now = source.timestamps[0]
            .and_local_timezone(FixedOffset::east_opt(0).unwrap())
            .unwrap();

        let vel_path = write_velocity_csv(&dir, now, &source, &estimate.velocity).unwrap();
        assert_eq!(
            vel_path.file_name().unwrap().to_str().unwrap(),
            "velocity_data_2024-03-01_09-30-00.csv"
        );
        let text = std::fs::read_to_string(&vel_path).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("Timestamp (UTC+05:30),Vel_X,Vel_Y,Vel_Z"));
        assert!(lines.next().unwrap().starts_with("2024-03-01 09:30:00.000,0,"));
        assert_eq!(text.lines().count(), 61);

        let pos_path =
            write_position_csv(&dir, estimate.total_distance, &source, &estimate.position)
                .unwrap();
        let expected = format!("position_data_{:.2}_meters.csv", estimate.total_distance);
        assert_eq!(pos_path.file_name().unwrap().to_str().unwrap(), expected);
        let text = std::fs::read_to_string(&pos_path).unwrap();
        assert!(text.starts_with(
            "Timestamp (UTC+05:30),Filtered_Pos_X,Filtered_Pos_Y,Filtered_Pos_Z\n"
        ));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn rejects_length_mismatch() {
        let dir = crate::scratch_dir("results-mismatch");
        let long = recording(&dir, 30);
        let short = recording(&dir, 20);
        let estimate = estimate_motion(&short.trace, &FilterSpec::default()).unwrap();
        assert!(matches!(
            write_position_csv(&dir, 0.0, &long, &estimate.position),
            Err(StoreError::Trace(MotionError::MalformedTrace(_)))
        ));
        std::fs::remove_dir_all(&dir).ok();
    }
}
