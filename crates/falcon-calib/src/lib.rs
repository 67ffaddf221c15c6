//! Gravity-referenced linear calibration for a 3-axis accelerometer.
//!
//! Each axis is held pointing up, down, and perpendicular to gravity while a
//! batch of raw readings is collected. A least-squares line through the
//! pooled (raw, +1/-1/0 g) pairs gives that axis's scale and offset.

pub mod fit;

use falcon_imu::{Axis, RawSample};
use glam::{DVec3, Vec3};
use thiserror::Error;

pub use fit::{fit_axis, MIN_BATCH_LEN};

/// Error type returned by sample collectors.
pub type CollectorError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Order in which axes are calibrated.
pub const AXIS_ORDER: [Axis; 3] = [Axis::Z, Axis::Y, Axis::X];

/// Reference orientation of the axis under calibration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Orientation {
    /// Axis aligned with gravity.
    Up,
    /// Axis anti-aligned with gravity.
    Down,
    /// Axis perpendicular to gravity.
    Perpendicular,
}

impl Orientation {
    pub const ALL: [Orientation; 3] = [
        Orientation::Up,
        Orientation::Down,
        Orientation::Perpendicular,
    ];

    /// Known physical value along the axis, in g.
    pub fn gravity(self) -> f64 {
        match self {
            Orientation::Up => 1.0,
            Orientation::Down => -1.0,
            Orientation::Perpendicular => 0.0,
        }
    }
}

impl std::fmt::Display for Orientation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Orientation::Up => "upward",
            Orientation::Down => "downward",
            Orientation::Perpendicular => "perpendicular to gravity",
        })
    }
}

#[derive(Debug, Error)]
pub enum CalibrationError {
    #[error("{orientation} batch has {len} samples, need at least {required}")]
    InsufficientData {
        orientation: Orientation,
        len: usize,
        required: usize,
    },
    #[error("{orientation} batch contains a non-finite reading")]
    NonFiniteSample { orientation: Orientation },
    #[error("Least-squares fit diverged: {reason}")]
    FitDiverged { reason: &'static str },
    #[error("Sample collection failed with the {axis}-axis pointed {orientation}")]
    Collection {
        axis: Axis,
        orientation: Orientation,
        #[source]
        source: CollectorError,
    },
}

/// Linear map from raw sensor units to g for one axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisCalibration {
    pub scale: f64,
    pub offset: f64,
}

impl AxisCalibration {
    pub const IDENTITY: AxisCalibration = AxisCalibration {
        scale: 1.0,
        offset: 0.0,
    };

    pub fn apply(&self, raw: f64) -> f64 {
        self.scale * raw + self.offset
    }
}

/// Fitted calibration for all three axes. Immutable once produced.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibrationSet {
    axes: [AxisCalibration; 3],
}

impl CalibrationSet {
    pub fn new(x: AxisCalibration, y: AxisCalibration, z: AxisCalibration) -> Self {
        Self { axes: [x, y, z] }
    }

    /// Build from `[[scale, offset]; 3]`, indexed x, y, z.
    pub fn from_array(coefficients: [[f64; 2]; 3]) -> Self {
        Self {
            axes: coefficients.map(|[scale, offset]| AxisCalibration { scale, offset }),
        }
    }

    pub fn as_array(&self) -> [[f64; 2]; 3] {
        self.axes.map(|a| [a.scale, a.offset])
    }

    pub fn axis(&self, axis: Axis) -> AxisCalibration {
        self.axes[axis.index()]
    }

    /// Map a raw triple into g.
    pub fn apply(&self, raw: Vec3) -> DVec3 {
        DVec3::new(
            self.axes[0].apply(raw.x as f64),
            self.axes[1].apply(raw.y as f64),
            self.axes[2].apply(raw.z as f64),
        )
    }

    /// Fit all three axes from already collected batches, one thread per axis.
    ///
    /// `batches[axis]` holds that axis's up, down and perpendicular readings.
    pub fn from_batches(batches: &[[Vec<f64>; 3]; 3]) -> Result<Self, CalibrationError> {
        let results: Vec<Result<AxisCalibration, CalibrationError>> = std::thread::scope(|s| {
            let handles: Vec<_> = batches
                .iter()
                .map(|[up, down, perp]| s.spawn(move || fit_axis(up, down, perp)))
                .collect();
            handles
                .into_iter()
                .map(|h| match h.join() {
                    Ok(result) => result,
                    Err(panic) => std::panic::resume_unwind(panic),
                })
                .collect()
        });

        let mut axes = [AxisCalibration::IDENTITY; 3];
        for (slot, result) in axes.iter_mut().zip(results) {
            *slot = result?;
        }
        Ok(Self { axes })
    }
}

/// Source of raw calibration batches, one per (axis, orientation).
///
/// Implementations block until the batch is complete: prompting the operator,
/// flushing stale packets and reading the sensor are their business.
pub trait OrientationCollector {
    fn collect(
        &mut self,
        axis: Axis,
        orientation: Orientation,
    ) -> Result<Vec<RawSample>, CollectorError>;
}

impl<F, E> OrientationCollector for F
where
    F: FnMut(Axis, Orientation) -> Result<Vec<RawSample>, E>,
    E: Into<CollectorError>,
{
    fn collect(
        &mut self,
        axis: Axis,
        orientation: Orientation,
    ) -> Result<Vec<RawSample>, CollectorError> {
        self(axis, orientation).map_err(Into::into)
    }
}

/// Calibrate every axis in [`AXIS_ORDER`], orientations in [`Orientation::ALL`] order.
///
/// All three batches of an axis are collected and fitted before the next
/// axis is requested.
pub fn calibrate_all<C: OrientationCollector>(
    mut collector: C,
) -> Result<CalibrationSet, CalibrationError> {
    let mut axes = [AxisCalibration::IDENTITY; 3];

    for axis in AXIS_ORDER {
        let mut batches: [Vec<f64>; 3] = Default::default();
        for (slot, orientation) in batches.iter_mut().zip(Orientation::ALL) {
            let samples = collector.collect(axis, orientation).map_err(|source| {
                CalibrationError::Collection {
                    axis,
                    orientation,
                    source,
                }
            })?;
            tracing::debug!(
                %axis,
                %orientation,
                samples = samples.len(),
                "Calibration batch collected"
            );
            *slot = samples.iter().map(|s| s.component(axis)).collect();
        }

        let [up, down, perp] = &batches;
        let fit = fit_axis(up, down, perp)?;
        tracing::info!(%axis, scale = fit.scale, offset = fit.offset, "Axis calibrated");
        axes[axis.index()] = fit;
    }

    tracing::info!("Accelerometer calibration complete");
    Ok(CalibrationSet { axes })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    const TRUE_COEFFS: [[f64; 2]; 3] = [[0.0040, 0.02], [-0.0039, -0.01], [0.0041, 0.05]];

    /// Batch the sensor would report for `axis` held in `orientation`.
    fn simulated_batch(axis: Axis, orientation: Orientation, n: usize) -> Vec<RawSample> {
        let mut physical = [0.0f64; 3];
        physical[axis.index()] = orientation.gravity();
        let raw: [f64; 3] = std::array::from_fn(|i| {
            let [scale, offset] = TRUE_COEFFS[i];
            (physical[i] - offset) / scale
        });
        vec![RawSample::new(raw[0] as f32, raw[1] as f32, raw[2] as f32); n]
    }

    #[test]
    fn calibrates_every_axis_in_order() {
        let mut calls = Vec::new();
        let set = calibrate_all(|axis, orientation| -> Result<_, std::io::Error> {
            calls.push((axis, orientation));
            Ok(simulated_batch(axis, orientation, 100))
        })
        .unwrap();

        let expected: Vec<_> = AXIS_ORDER
            .iter()
            .flat_map(|&a| Orientation::ALL.map(|o| (a, o)))
            .collect();
        assert_eq!(calls, expected);

        for axis in Axis::ALL {
            let [scale, offset] = TRUE_COEFFS[axis.index()];
            let fit = set.axis(axis);
            // Raw values went through f32, so allow for that rounding.
            assert_abs_diff_eq!(fit.scale, scale, epsilon = 1e-6);
            assert_abs_diff_eq!(fit.offset, offset, epsilon = 1e-4);
        }
    }

    #[test]
    fn collector_failure_is_wrapped() {
        let err = calibrate_all(|axis, orientation| {
            if axis == Axis::Y && orientation == Orientation::Down {
                Err(std::io::Error::new(std::io::ErrorKind::TimedOut, "sensor went quiet"))
            } else {
                Ok(simulated_batch(axis, orientation, 10))
            }
        })
        .unwrap_err();

        match err {
            CalibrationError::Collection {
                axis, orientation, ..
            } => {
                assert_eq!(axis, Axis::Y);
                assert_eq!(orientation, Orientation::Down);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn empty_batch_stops_calibration() {
        let err = calibrate_all(|axis, orientation| -> Result<_, std::io::Error> {
            if orientation == Orientation::Perpendicular {
                Ok(Vec::new())
            } else {
                Ok(simulated_batch(axis, orientation, 10))
            }
        })
        .unwrap_err();
        assert!(matches!(err, CalibrationError::InsufficientData { len: 0, .. }));
    }

    #[test]
    fn apply_maps_raw_to_g() {
        let set = CalibrationSet::from_array([[-1.0 / 1024.0, 1.0], [0.5, 0.0], [1.0, -0.25]]);
        let g = set.apply(Vec3::new(2048.0, 2.0, 0.25));
        assert_abs_diff_eq!(g.x, -1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(g.y, 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(g.z, 0.0, epsilon = 1e-12);
        assert_eq!(CalibrationSet::from_array(set.as_array()), set);
    }

    #[test]
    fn parallel_fit_matches_sequential() {
        let batches: [[Vec<f64>; 3]; 3] = std::array::from_fn(|i| {
            let [scale, offset] = TRUE_COEFFS[i];
            Orientation::ALL.map(|o| vec![(o.gravity() - offset) / scale; 50])
        });

        let set = CalibrationSet::from_batches(&batches).unwrap();
        for axis in Axis::ALL {
            let [up, down, perp] = &batches[axis.index()];
            assert_eq!(set.axis(axis), fit_axis(up, down, perp).unwrap());
        }
    }
}
