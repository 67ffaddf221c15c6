use crate::{AxisCalibration, CalibrationError, Orientation};

/// Fewest readings a single orientation batch may contain.
pub const MIN_BATCH_LEN: usize = 2;

/// Fit `physical = scale * raw + offset` for one axis.
///
/// The three batches are readings along the axis while it pointed up (+1 g),
/// down (-1 g) and perpendicular to gravity (0 g). All readings are pooled
/// and solved by ordinary least squares on centered sums.
pub fn fit_axis(
    samples_up: &[f64],
    samples_down: &[f64],
    samples_perp: &[f64],
) -> Result<AxisCalibration, CalibrationError> {
    let batches = [
        (Orientation::Up, samples_up),
        (Orientation::Down, samples_down),
        (Orientation::Perpendicular, samples_perp),
    ];

    for (orientation, batch) in batches {
        if batch.len() < MIN_BATCH_LEN {
            return Err(CalibrationError::InsufficientData {
                orientation,
                len: batch.len(),
                required: MIN_BATCH_LEN,
            });
        }
        if batch.iter().any(|v| !v.is_finite()) {
            return Err(CalibrationError::NonFiniteSample { orientation });
        }
    }

    let pairs = || {
        batches
            .iter()
            .flat_map(|&(orientation, batch)| {
                batch.iter().map(move |&raw| (raw, orientation.gravity()))
            })
    };

    let (min, max) = pairs().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), (raw, _)| {
        (lo.min(raw), hi.max(raw))
    });
    if max <= min {
        return Err(CalibrationError::FitDiverged {
            reason: "raw readings have zero dynamic range",
        });
    }

    let n = pairs().count() as f64;
    let (sum_raw, sum_g) = pairs().fold((0.0, 0.0), |(sr, sg), (raw, g)| (sr + raw, sg + g));
    let mean_raw = sum_raw / n;
    let mean_g = sum_g / n;

    let (sxx, sxy) = pairs().fold((0.0, 0.0), |(sxx, sxy), (raw, g)| {
        let dx = raw - mean_raw;
        (sxx + dx * dx, sxy + dx * (g - mean_g))
    });
    if !(sxx > 0.0) {
        return Err(CalibrationError::FitDiverged {
            reason: "singular normal equations",
        });
    }

    let scale = sxy / sxx;
    let offset = mean_g - scale * mean_raw;
    if !scale.is_finite() || !offset.is_finite() || scale == 0.0 {
        return Err(CalibrationError::FitDiverged {
            reason: "non-finite or zero coefficients",
        });
    }

    Ok(AxisCalibration { scale, offset })
}
