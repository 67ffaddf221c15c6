use glam::DVec3;

/// Running trapezoidal integral of `values` over `times`, starting at 0.
///
/// Output has the same length as the input. `times` must be the same
/// length as `values`.
pub fn cumulative_trapezoid(values: &[f64], times: &[f64]) -> Vec<f64> {
    debug_assert_eq!(values.len(), times.len());

    let mut out = Vec::with_capacity(values.len());
    let mut total = 0.0;
    if !values.is_empty() {
        out.push(total);
    }
    for i in 1..values.len().min(times.len()) {
        total += (times[i] - times[i - 1]) * (values[i] + values[i - 1]) / 2.0;
        out.push(total);
    }
    out
}

/// Sum of point-to-point distances along a trajectory (odometer reading).
pub fn path_length(points: &[DVec3]) -> f64 {
    points.windows(2).map(|w| w[1].distance(w[0])).sum()
}
