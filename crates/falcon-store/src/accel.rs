use crate::{StoreError, TIMESTAMP_FORMAT};
use chrono::{DateTime, FixedOffset, NaiveDateTime};
use falcon_motion::{AccelerationTrace, MotionError, Trace, TracePoint};
use glam::DVec3;
use std::path::{Path, PathBuf};
use tracing::info;

/// One recorded sample, in g.
#[derive(Debug, Clone, PartialEq)]
pub struct AccelRow {
    pub timestamp: NaiveDateTime,
    pub accel: DVec3,
    /// Image saved alongside the sample, if any.
    pub frame_name: Option<String>,
}

/// Acceleration file read back for analysis.
#[derive(Debug, Clone)]
pub struct AccelRecording {
    /// Header of the timestamp column, e.g. `Timestamp (UTC+05:30)`.
    pub timestamp_header: String,
    /// Wall-clock time of each row.
    pub timestamps: Vec<NaiveDateTime>,
    /// Same rows with time in seconds since the first row.
    pub trace: AccelerationTrace,
}

pub fn timestamp_header(offset: FixedOffset) -> String {
    format!("Timestamp (UTC{offset})")
}

/// Write a recording to `dir/accel_data_<stop time>.csv` and return the path.
pub fn write_accel_csv(
    dir: &Path,
    stop_time: DateTime<FixedOffset>,
    rows: &[AccelRow],
) -> Result<PathBuf, StoreError> {
    crate::create_dir(dir)?;
    let path = dir.join(format!("accel_data_{}.csv", stop_time.format("%Y-%m-%d %H-%M-%S")));

    let mut writer = csv::Writer::from_path(&path)?;
    let header = timestamp_header(*stop_time.offset());
    writer.write_record([header.as_str(), "X", "Y", "Z", "Frame Name"])?;
    for row in rows {
        writer.write_record([
            row.timestamp.format(TIMESTAMP_FORMAT).to_string(),
            row.accel.x.to_string(),
            row.accel.y.to_string(),
            row.accel.z.to_string(),
            row.frame_name.clone().unwrap_or_default(),
        ])?;
    }
    writer.flush().map_err(StoreError::io(&path))?;

    info!(?path, rows = rows.len(), "Saved acceleration data");
    Ok(path)
}

/// Read an acceleration CSV. Columns are found by header name, so extra
/// columns and any column order are accepted.
pub fn read_accel_csv(path: &Path) -> Result<AccelRecording, StoreError> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_path(path)?;
    let headers = reader.headers()?.clone();

    let ts_col = headers
        .iter()
        .position(|h| h.starts_with("Timestamp"))
        .ok_or_else(|| missing_column("Timestamp"))?;
    let column = |name: &str| {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| missing_column(name))
    };
    let axis_cols = [column("X")?, column("Y")?, column("Z")?];

    let mut timestamps = Vec::new();
    let mut values = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let record = record?;
        let row = i + 1;
        let field = |col: usize| record.get(col).unwrap_or("");

        let raw_ts = field(ts_col);
        timestamps.push(parse_timestamp(raw_ts).ok_or_else(|| StoreError::BadField {
            row,
            column: headers[ts_col].to_string(),
            value: raw_ts.to_string(),
        })?);

        let mut v = DVec3::ZERO;
        for (axis, &col) in axis_cols.iter().enumerate() {
            let raw = field(col);
            v[axis] = raw.parse().map_err(|_| StoreError::BadField {
                row,
                column: headers[col].to_string(),
                value: raw.to_string(),
            })?;
        }
        values.push(v);
    }

    let Some(&origin) = timestamps.first() else {
        return Err(MotionError::MalformedTrace(format!("{} has no rows", path.display())).into());
    };
    let points = timestamps
        .iter()
        .zip(&values)
        .map(|(t, v)| {
            let secs = (*t - origin).num_milliseconds() as f64 / 1000.0;
            TracePoint::new(secs, v.x, v.y, v.z)
        })
        .collect();
    let trace = Trace::new(points)?;

    info!(?path, rows = trace.len(), "Loaded acceleration data");
    Ok(AccelRecording {
        timestamp_header: headers[ts_col].to_string(),
        timestamps,
        trace,
    })
}

fn missing_column(name: &str) -> StoreError {
    MotionError::MalformedTrace(format!("missing column {name:?}")).into()
}

/// Accepts millisecond and whole-second timestamps.
fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S"))
        .ok()
}
