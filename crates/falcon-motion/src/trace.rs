use crate::MotionError;
use glam::DVec3;

/// One timestamped 3-axis value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TracePoint {
    /// Seconds. Only differences between timestamps are used.
    pub timestamp: f64,
    pub value: DVec3,
}

impl TracePoint {
    pub fn new(timestamp: f64, x: f64, y: f64, z: f64) -> Self {
        Self {
            timestamp,
            value: DVec3::new(x, y, z),
        }
    }
}

/// Ordered, non-empty sequence of samples with finite values and
/// non-decreasing timestamps.
#[derive(Debug, Clone, PartialEq)]
pub struct Trace {
    points: Vec<TracePoint>,
}

/// Calibrated acceleration, input to the pipeline. Distances come out in
/// meters when the values are in m/s².
pub type AccelerationTrace = Trace;
pub type VelocityTrace = Trace;
pub type PositionTrace = Trace;

impl Trace {
    pub fn new(points: Vec<TracePoint>) -> Result<Self, MotionError> {
        if points.is_empty() {
            return Err(MotionError::MalformedTrace("trace has no samples".into()));
        }
        for (i, p) in points.iter().enumerate() {
            if !p.timestamp.is_finite() {
                return Err(MotionError::MalformedTrace(format!(
                    "sample {i} has a non-finite timestamp"
                )));
            }
            if !p.value.is_finite() {
                return Err(MotionError::MalformedTrace(format!(
                    "sample {i} has a non-finite value"
                )));
            }
        }
        if let Some(i) = points
            .windows(2)
            .position(|w| w[1].timestamp < w[0].timestamp)
        {
            return Err(MotionError::MalformedTrace(format!(
                "timestamp goes backwards at sample {}",
                i + 1
            )));
        }
        Ok(Self { points })
    }

    /// Assemble a derived trace from per-axis columns sharing `timestamps`.
    pub(crate) fn from_columns(timestamps: &[f64], [x, y, z]: [Vec<f64>; 3]) -> Self {
        let points = timestamps
            .iter()
            .zip(x.into_iter().zip(y).zip(z))
            .map(|(&timestamp, ((x, y), z))| TracePoint::new(timestamp, x, y, z))
            .collect();
        Self { points }
    }

    /// Same timestamps with every value multiplied by `factor`, e.g.
    /// [`STANDARD_GRAVITY`](crate::STANDARD_GRAVITY) to go from g to m/s².
    pub fn scaled(&self, factor: f64) -> Result<Self, MotionError> {
        Self::new(
            self.points
                .iter()
                .map(|p| TracePoint {
                    timestamp: p.timestamp,
                    value: p.value * factor,
                })
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Always false for a constructed trace.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[TracePoint] {
        &self.points
    }

    pub fn timestamps(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.timestamp).collect()
    }

    /// Seconds since the first sample.
    pub fn elapsed(&self) -> Vec<f64> {
        let origin = self.points[0].timestamp;
        self.points.iter().map(|p| p.timestamp - origin).collect()
    }

    pub fn values(&self) -> Vec<DVec3> {
        self.points.iter().map(|p| p.value).collect()
    }

    /// One axis (0 = x, 1 = y, 2 = z) as a column.
    pub fn column(&self, axis: usize) -> Vec<f64> {
        self.points.iter().map(|p| p.value[axis]).collect()
    }

    pub fn first(&self) -> &TracePoint {
        &self.points[0]
    }

    pub fn last(&self) -> &TracePoint {
        &self.points[self.points.len() - 1]
    }
}
