use crate::StoreError;
use falcon_motion::PositionTrace;
use plotters::prelude::*;
use std::ops::Range;
use std::path::{Path, PathBuf};
use tracing::info;

const CHART_SIZE: (u32, u32) = (1000, 600);

/// Draw X, Y and Z position against elapsed time to
/// `dir/position_data_<distance>_meters.svg`, next to the position CSV.
pub fn write_position_chart(
    dir: &Path,
    total_distance: f64,
    position: &PositionTrace,
) -> Result<PathBuf, StoreError> {
    crate::create_dir(dir)?;
    let path = dir.join(format!("position_data_{total_distance:.2}_meters.svg"));

    let elapsed = position.elapsed();
    let time_range = padded(elapsed.iter().copied());
    let value_range = padded(position.points().iter().flat_map(|p| p.value.to_array()));

    let root = SVGBackend::new(&path, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(plot_error)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Filtered Position Data", ("sans-serif", 24))
        .margin(16)
        .x_label_area_size(40)
        .y_label_area_size(70)
        .build_cartesian_2d(time_range, value_range)
        .map_err(plot_error)?;
    chart
        .configure_mesh()
        .x_desc("Time (s)")
        .y_desc("Position (m)")
        .draw()
        .map_err(plot_error)?;

    let axes = [("X", RED), ("Y", GREEN), ("Z", BLUE)];
    for (axis, (label, color)) in axes.into_iter().enumerate() {
        let series = elapsed.iter().copied().zip(position.column(axis));
        chart
            .draw_series(LineSeries::new(series, color))
            .map_err(plot_error)?
            .label(format!("Filtered Pos {label}"))
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));
    }
    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()
        .map_err(plot_error)?;
    root.present().map_err(plot_error)?;
    drop(chart);
    drop(root);

    info!(?path, samples = position.len(), "Saved position chart");
    Ok(path)
}

/// Min..max of `values`, widened so a flat series still has a visible span.
fn padded(values: impl Iterator<Item = f64>) -> Range<f64> {
    let (lo, hi) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    if !lo.is_finite() || !hi.is_finite() {
        return 0.0..1.0;
    }
    let pad = ((hi - lo) * 0.05).max(1e-3);
    (lo - pad)..(hi + pad)
}

fn plot_error(e: impl std::fmt::Display) -> StoreError {
    StoreError::Plot(e.to_string())
}
