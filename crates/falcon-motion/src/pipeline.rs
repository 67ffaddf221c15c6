use crate::filter::SosFilter;
use crate::integrate::{cumulative_trapezoid, path_length};
use crate::trace::{AccelerationTrace, PositionTrace, Trace, VelocityTrace};
use crate::{MotionError, Stage, AXIS_LABELS};
use serde::{Deserialize, Serialize};

/// Filter parameters for the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FilterSpec {
    /// Nominal sample rate of the trace. The trace is not resampled.
    pub sample_rate_hz: f64,
    /// Low-pass cutoff, removes sensor noise.
    pub low_cutoff_hz: f64,
    /// High-pass cutoff, removes bias and drift.
    pub high_cutoff_hz: f64,
    /// Butterworth order of both filters.
    pub order: usize,
}

impl Default for FilterSpec {
    fn default() -> Self {
        Self {
            sample_rate_hz: 20.0,
            low_cutoff_hz: 6.9,
            high_cutoff_hz: 2.5,
            order: 5,
        }
    }
}

impl FilterSpec {
    /// Checks `0 < high < low < Nyquist` and `order >= 1`.
    pub fn validate(&self) -> Result<(), MotionError> {
        let invalid = |msg: String| Err(MotionError::InvalidFilterSpec(msg));
        let nyquist = self.sample_rate_hz / 2.0;

        if !(self.sample_rate_hz.is_finite() && self.sample_rate_hz > 0.0) {
            return invalid(format!("sample rate {} Hz must be positive", self.sample_rate_hz));
        }
        if self.order == 0 {
            return invalid("filter order must be at least 1".into());
        }
        if !(self.high_cutoff_hz.is_finite() && self.high_cutoff_hz > 0.0) {
            return invalid(format!(
                "high-pass cutoff {} Hz must be positive",
                self.high_cutoff_hz
            ));
        }
        if !(self.low_cutoff_hz > self.high_cutoff_hz) {
            return invalid(format!(
                "low-pass cutoff {} Hz must be above high-pass cutoff {} Hz",
                self.low_cutoff_hz, self.high_cutoff_hz
            ));
        }
        if !(self.low_cutoff_hz < nyquist) {
            return invalid(format!(
                "low-pass cutoff {} Hz must be below Nyquist ({nyquist} Hz)",
                self.low_cutoff_hz
            ));
        }
        Ok(())
    }
}

/// Non-fatal conditions that degrade the estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionWarning {
    /// Too few samples for full zero-phase padding; edges are unreliable.
    InsufficientSamples { samples: usize, recommended: usize },
}

impl std::fmt::Display for MotionWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MotionWarning::InsufficientSamples {
                samples,
                recommended,
            } => write!(
                f,
                "trace has {samples} samples, at least {recommended} recommended for zero-phase filtering"
            ),
        }
    }
}

/// Pipeline output.
#[derive(Debug, Clone, PartialEq)]
pub struct MotionEstimate {
    /// Once-integrated acceleration. No drift removal is applied here.
    pub velocity: VelocityTrace,
    /// Twice-integrated acceleration with drift removed.
    pub position: PositionTrace,
    /// Path length of `position`.
    pub total_distance: f64,
    pub warnings: Vec<MotionWarning>,
}

/// Filter, double-integrate and measure an acceleration trace.
///
/// Per axis: zero-phase low-pass, zero-phase high-pass, trapezoidal
/// integration to velocity and again to position, then a second zero-phase
/// high-pass on position to strip drift accumulated by the integrations.
pub fn estimate_motion(
    trace: &AccelerationTrace,
    spec: &FilterSpec,
) -> Result<MotionEstimate, MotionError> {
    spec.validate()?;
    let lowpass = SosFilter::lowpass(spec.order, spec.low_cutoff_hz, spec.sample_rate_hz)?;
    let highpass = SosFilter::highpass(spec.order, spec.high_cutoff_hz, spec.sample_rate_hz)?;

    let mut warnings = Vec::new();
    let recommended = (3 * spec.order).max(lowpass.padlen().max(highpass.padlen()) + 1);
    if trace.len() < recommended {
        let warning = MotionWarning::InsufficientSamples {
            samples: trace.len(),
            recommended,
        };
        tracing::debug!(%warning, "Short trace");
        warnings.push(warning);
    }

    let times = trace.elapsed();
    let mut velocity: [Vec<f64>; 3] = Default::default();
    let mut position: [Vec<f64>; 3] = Default::default();

    for axis in 0..3 {
        let label = AXIS_LABELS[axis];
        let accel = trace.column(axis);

        let smoothed = check_finite(lowpass.filtfilt(&accel), Stage::LowPass, label)?;
        let detrended = check_finite(highpass.filtfilt(&smoothed), Stage::HighPass, label)?;
        let vel = check_finite(cumulative_trapezoid(&detrended, &times), Stage::Velocity, label)?;
        let raw_pos = check_finite(cumulative_trapezoid(&vel, &times), Stage::Position, label)?;
        let pos = check_finite(highpass.filtfilt(&raw_pos), Stage::DriftRemoval, label)?;

        velocity[axis] = vel;
        position[axis] = pos;
    }

    let timestamps = trace.timestamps();
    let velocity = Trace::from_columns(&timestamps, velocity);
    let position = Trace::from_columns(&timestamps, position);

    let total_distance = path_length(&position.values());
    if !total_distance.is_finite() {
        return Err(MotionError::NumericInstability {
            stage: Stage::Distance,
            axis: "xyz",
        });
    }

    tracing::debug!(samples = trace.len(), total_distance, "Motion estimated");
    Ok(MotionEstimate {
        velocity,
        position,
        total_distance,
        warnings,
    })
}

/// [`estimate_motion`] with the filter parameters passed individually.
pub fn estimate_motion_with(
    trace: &AccelerationTrace,
    sample_rate_hz: f64,
    low_cutoff_hz: f64,
    high_cutoff_hz: f64,
    filter_order: usize,
) -> Result<MotionEstimate, MotionError> {
    estimate_motion(
        trace,
        &FilterSpec {
            sample_rate_hz,
            low_cutoff_hz,
            high_cutoff_hz,
            order: filter_order,
        },
    )
}

fn check_finite(
    values: Vec<f64>,
    stage: Stage,
    axis: &'static str,
) -> Result<Vec<f64>, MotionError> {
    if values.iter().all(|v| v.is_finite()) {
        Ok(values)
    } else {
        Err(MotionError::NumericInstability { stage, axis })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::TracePoint;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::PI;

    const FS: f64 = 20.0;

    fn uniform_trace(n: usize, accel: impl Fn(f64) -> [f64; 3]) -> AccelerationTrace {
        let points = (0..n)
            .map(|i| {
                let t = i as f64 / FS;
                let [x, y, z] = accel(t);
                TracePoint::new(t, x, y, z)
            })
            .collect();
        Trace::new(points).unwrap()
    }

    #[test]
    fn zero_motion_stays_zero() {
        let trace = uniform_trace(200, |_| [0.0; 3]);
        let est = estimate_motion(&trace, &FilterSpec::default()).unwrap();

        assert!(est.velocity.points().iter().all(|p| p.value == glam::DVec3::ZERO));
        assert!(est.position.points().iter().all(|p| p.value == glam::DVec3::ZERO));
        assert_eq!(est.total_distance, 0.0);
        assert!(est.warnings.is_empty());
    }

    #[test]
    fn outputs_align_with_input() {
        let trace = uniform_trace(64, |t| [t.sin(), 0.0, 0.0]);
        let est = estimate_motion(&trace, &FilterSpec::default()).unwrap();
        assert_eq!(est.velocity.len(), trace.len());
        assert_eq!(est.position.len(), trace.len());
        assert_eq!(est.velocity.timestamps(), trace.timestamps());
        assert_eq!(est.position.timestamps(), trace.timestamps());
    }

    #[test]
    fn single_sample_is_zero_distance() {
        let trace = Trace::new(vec![TracePoint::new(5.0, 0.3, -0.2, 1.0)]).unwrap();
        let est = estimate_motion(&trace, &FilterSpec::default()).unwrap();

        assert_eq!(est.total_distance, 0.0);
        assert_eq!(est.velocity.first().value, glam::DVec3::ZERO);
        assert_eq!(est.position.first().value, glam::DVec3::ZERO);
        assert!(matches!(
            est.warnings[..],
            [MotionWarning::InsufficientSamples { samples: 1, .. }]
        ));
    }

    #[test]
    fn short_trace_warns_but_succeeds() {
        let trace = uniform_trace(10, |t| [(2.0 * PI * 4.0 * t).sin(), 0.0, 0.0]);
        let est = estimate_motion(&trace, &FilterSpec::default()).unwrap();
        assert_eq!(
            est.warnings,
            vec![MotionWarning::InsufficientSamples {
                samples: 10,
                recommended: 19,
            }]
        );
        assert!(est.total_distance.is_finite());
    }

    #[test]
    fn rejects_bad_cutoffs() {
        let trace = uniform_trace(100, |_| [0.0; 3]);
        let cases = [
            (FS, 2.5, 2.5, 5),  // high == low
            (FS, 2.0, 3.0, 5),  // high > low
            (FS, 10.0, 2.5, 5), // low at Nyquist
            (FS, 12.0, 2.5, 5), // low above Nyquist
            (FS, 6.9, 0.0, 5),  // high not positive
            (FS, 6.9, 2.5, 0),  // no order
            (0.0, 6.9, 2.5, 5), // no sample rate
            (FS, f64::NAN, 2.5, 5),
        ];
        for (fs, low, high, order) in cases {
            let result = estimate_motion_with(&trace, fs, low, high, order);
            assert!(
                matches!(result, Err(MotionError::InvalidFilterSpec(_))),
                "fs={fs} low={low} high={high} order={order} was accepted"
            );
        }
    }

    #[test]
    fn constant_bias_does_not_drift() {
        // 10 s at 20 Hz with a 0.5 g bias on x. Naive double integration
        // would reach 25 units by the end.
        let trace = uniform_trace(200, |_| [0.5, 0.0, 0.0]);
        let est = estimate_motion(&trace, &FilterSpec::default()).unwrap();

        let max_pos = est
            .position
            .points()
            .iter()
            .map(|p| p.value.length())
            .fold(0.0, f64::max);
        assert!(max_pos < 1e-6, "position drifted to {max_pos}");
        assert!(est.total_distance < 1e-6);
    }

    #[test]
    fn bias_plus_motion_stays_bounded() {
        // A passband oscillation riding on a bias: position must stay near
        // the oscillation amplitude instead of ramping.
        let f = 4.0;
        let amplitude = 0.01;
        let w = 2.0 * PI * f;
        let trace = uniform_trace(200, |t| [0.5 - amplitude * w * w * (w * t).sin(), 0.0, 0.0]);
        let est = estimate_motion(&trace, &FilterSpec::default()).unwrap();

        let tail_max = est.position.points()[20..180]
            .iter()
            .map(|p| p.value.x.abs())
            .fold(0.0, f64::max);
        assert!(tail_max < 10.0 * amplitude, "position grew to {tail_max}");
    }

    #[test]
    fn path_length_at_least_displacement() {
        let traces = [
            uniform_trace(120, |t| [(2.0 * PI * 3.0 * t).sin(), (2.0 * PI * 4.5 * t).cos(), 0.1]),
            uniform_trace(80, |t| [0.0, 0.0, (2.0 * PI * 5.0 * t).sin() * t]),
            uniform_trace(300, |t| [(t * 7.0).sin(), (t * 3.0).cos(), (t * 11.0).sin()]),
        ];
        for trace in &traces {
            let est = estimate_motion(trace, &FilterSpec::default()).unwrap();
            let displacement = est.position.last().value.distance(est.position.first().value);
            assert!(est.total_distance >= 0.0);
            assert!(est.total_distance + 1e-12 >= displacement);
        }
    }

    #[test]
    fn distance_scales_with_units() {
        let trace = uniform_trace(120, |t| [(t * 9.0).sin(), 0.2 * (t * 5.0).cos(), 0.0]);
        let in_g = estimate_motion(&trace, &FilterSpec::default()).unwrap();
        let in_si = estimate_motion(
            &trace.scaled(crate::STANDARD_GRAVITY).unwrap(),
            &FilterSpec::default(),
        )
        .unwrap();
        assert!(in_g.total_distance > 0.0);
        assert_abs_diff_eq!(
            in_si.total_distance,
            in_g.total_distance * crate::STANDARD_GRAVITY,
            epsilon = 1e-9 * in_si.total_distance.max(1.0)
        );
    }

    #[test]
    fn deterministic_output() {
        let trace = uniform_trace(150, |t| [(t * 9.0).sin(), (t * 13.0).cos(), t]);
        let a = estimate_motion(&trace, &FilterSpec::default()).unwrap();
        let b = estimate_motion(&trace, &FilterSpec::default()).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.total_distance.to_bits(), b.total_distance.to_bits());
    }

    #[test]
    fn overflow_is_reported() {
        let trace = uniform_trace(50, |_| [1e308, 0.0, 0.0]);
        let err = estimate_motion(&trace, &FilterSpec::default()).unwrap_err();
        assert!(matches!(
            err,
            MotionError::NumericInstability { axis: "x", .. }
        ));
    }

    #[test]
    fn velocity_is_integral_of_filtered_acceleration() {
        let trace = uniform_trace(100, |t| [0.0, (2.0 * PI * 4.0 * t).sin(), 0.0]);
        let est = estimate_motion(&trace, &FilterSpec::default()).unwrap();
        assert_abs_diff_eq!(est.velocity.first().value.y, 0.0);
        assert!(est.velocity.points().iter().any(|p| p.value.y.abs() > 1e-3));
    }
}
