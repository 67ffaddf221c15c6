//! Files produced and consumed by the odometry tools: calibration
//! coefficients, recorded accelerations and the derived velocity and
//! position tables and the position chart.

pub mod accel;
pub mod calibration;
pub mod plot;
pub mod results;

pub use accel::{read_accel_csv, write_accel_csv, AccelRecording, AccelRow};
pub use calibration::{load_calibration, save_calibration};
pub use plot::write_position_chart;
pub use results::{write_position_csv, write_velocity_csv};

use falcon_motion::MotionError;
use std::path::{Path, PathBuf};

/// Wall-clock format used in every CSV timestamp column.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error on {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Malformed calibration file: {0}")]
    TomlDecode(#[from] toml::de::Error),

    #[error("Failed to encode calibration: {0}")]
    TomlEncode(#[from] toml::ser::Error),

    #[error("Row {row}: cannot parse {column} value {value:?}")]
    BadField {
        row: usize,
        column: String,
        value: String,
    },

    #[error("Failed to draw chart: {0}")]
    Plot(String),

    #[error(transparent)]
    Trace(#[from] MotionError),
}

impl StoreError {
    pub(crate) fn io(path: &Path) -> impl FnOnce(std::io::Error) -> StoreError + '_ {
        move |source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Newest `*.csv` in `dir` by modification time, if any.
pub fn latest_csv(dir: &Path) -> Result<Option<PathBuf>, StoreError> {
    let mut newest: Option<(std::time::SystemTime, PathBuf)> = None;
    for entry in std::fs::read_dir(dir).map_err(StoreError::io(dir))? {
        let entry = entry.map_err(StoreError::io(dir))?;
        let path = entry.path();
        if path.extension().map_or(true, |ext| ext != "csv") {
            continue;
        }
        let modified = entry
            .metadata()
            .and_then(|m| m.modified())
            .map_err(StoreError::io(&path))?;
        if newest.as_ref().map_or(true, |(t, _)| modified > *t) {
            newest = Some((modified, path));
        }
    }
    Ok(newest.map(|(_, path)| path))
}

pub(crate) fn create_dir(dir: &Path) -> Result<(), StoreError> {
    std::fs::create_dir_all(dir).map_err(StoreError::io(dir))
}

#[cfg(test)]
pub(crate) fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("falcon-store-{name}-{}", std::process::id()));
    std::fs::remove_dir_all(&dir).ok();
    std::fs::create_dir_all(&dir).unwrap();
    dir
}
