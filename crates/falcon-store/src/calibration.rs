use crate::StoreError;
use falcon_calib::CalibrationSet;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// On-disk layout: one `[scale, offset]` pair per axis, x first.
#[derive(Debug, Serialize, Deserialize)]
struct CoefficientsFile {
    coefficients: [[f64; 2]; 3],
}

pub fn save_calibration(path: &Path, calibration: &CalibrationSet) -> Result<(), StoreError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        crate::create_dir(parent)?;
    }
    let file = CoefficientsFile {
        coefficients: calibration.as_array(),
    };
    let contents = toml::to_string_pretty(&file)?;
    std::fs::write(path, contents).map_err(StoreError::io(path))?;
    info!(?path, "Saved calibration coefficients");
    Ok(())
}

pub fn load_calibration(path: &Path) -> Result<CalibrationSet, StoreError> {
    let contents = std::fs::read_to_string(path).map_err(StoreError::io(path))?;
    let file: CoefficientsFile = toml::from_str(&contents)?;
    info!(?path, "Loaded calibration coefficients");
    Ok(CalibrationSet::from_array(file.coefficients))
}
