//! Motion estimation from a recorded acceleration trace.
//!
//! Band-limits each axis with zero-phase Butterworth filters, integrates
//! twice, removes integration drift from the position, and reports the path
//! length of the result. Pure computation over in-memory traces.

pub mod filter;
pub mod integrate;
pub mod pipeline;
pub mod trace;

use thiserror::Error;

pub use filter::{FilterKind, Section, SosFilter};
pub use integrate::{cumulative_trapezoid, path_length};
pub use pipeline::{
    estimate_motion, estimate_motion_with, FilterSpec, MotionEstimate, MotionWarning,
};
pub use trace::{AccelerationTrace, PositionTrace, Trace, TracePoint, VelocityTrace};

/// Standard gravity, m/s² per g.
pub const STANDARD_GRAVITY: f64 = 9.806_65;

pub(crate) const AXIS_LABELS: [&str; 3] = ["x", "y", "z"];

/// Pipeline step, for locating numeric failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    LowPass,
    HighPass,
    Velocity,
    Position,
    DriftRemoval,
    Distance,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Stage::LowPass => "low-pass filtering",
            Stage::HighPass => "high-pass filtering",
            Stage::Velocity => "velocity integration",
            Stage::Position => "position integration",
            Stage::DriftRemoval => "position drift removal",
            Stage::Distance => "distance summation",
        })
    }
}

#[derive(Debug, Error)]
pub enum MotionError {
    #[error("Invalid filter specification: {0}")]
    InvalidFilterSpec(String),
    #[error("Malformed trace: {0}")]
    MalformedTrace(String),
    #[error("Non-finite values produced during {stage} on the {axis} axis")]
    NumericInstability { stage: Stage, axis: &'static str },
}
