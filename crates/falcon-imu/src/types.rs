use glam::Vec3;

/// Sensor axis, indexed x=0, y=1, z=2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Axis::X => "x",
            Axis::Y => "y",
            Axis::Z => "z",
        }
    }
}

impl std::fmt::Display for Axis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Raw accelerometer reading in sensor units, as received on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RawSample {
    pub accel: Vec3,
}

impl RawSample {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self {
            accel: Vec3::new(x, y, z),
        }
    }

    /// Component along a single axis, widened for fitting.
    pub fn component(&self, axis: Axis) -> f64 {
        self.accel[axis.index()] as f64
    }
}
