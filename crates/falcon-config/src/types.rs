use falcon_imu::PacketFormat;
use falcon_motion::FilterSpec;
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Accelerometer link.
    pub imu: ImuConfig,
    /// Gravity calibration.
    pub calibration: CalibrationConfig,
    /// Post-processing filter parameters.
    pub motion: FilterSpec,
    /// Output folders.
    pub storage: StorageConfig,
    /// Real-time acquisition.
    pub recording: RecordingConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            imu: ImuConfig::default(),
            calibration: CalibrationConfig::default(),
            motion: FilterSpec::default(),
            storage: StorageConfig::default(),
            recording: RecordingConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImuConfig {
    /// Local address to receive sensor datagrams on.
    pub bind_addr: IpAddr,
    pub port: u16,
    /// Datagram layout sent by the sensor.
    pub packet_format: PacketFormat,
    /// Samples buffered between the socket task and the consumer.
    pub queue_capacity: usize,
}

impl ImuConfig {
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_addr, self.port)
    }
}

impl Default for ImuConfig {
    fn default() -> Self {
        Self {
            bind_addr: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 8888,
            packet_format: PacketFormat::Binary,
            queue_capacity: 4096,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationConfig {
    /// Readings collected per orientation.
    pub batch_size: usize,
    /// Where fitted coefficients are written and read.
    pub coefficients_path: PathBuf,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            batch_size: 1000,
            coefficients_path: PathBuf::from("calibration_coeffs.toml"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    pub base_dir: PathBuf,
    pub accel_dir: String,
    pub velocity_dir: String,
    pub position_dir: String,
    pub pics_dir: String,
}

impl StorageConfig {
    pub fn accel_path(&self) -> PathBuf {
        self.base_dir.join(&self.accel_dir)
    }

    pub fn velocity_path(&self) -> PathBuf {
        self.base_dir.join(&self.velocity_dir)
    }

    pub fn position_path(&self) -> PathBuf {
        self.base_dir.join(&self.position_dir)
    }

    pub fn pics_path(&self) -> PathBuf {
        self.base_dir.join(&self.pics_dir)
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("falcon-data"),
            accel_dir: "1. Accelerations".into(),
            velocity_dir: "2. Velocities".into(),
            position_dir: "3. Positions".into(),
            pics_dir: "pics".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordingConfig {
    /// Offset of recorded wall-clock timestamps from UTC, in minutes (IST = 330).
    pub utc_offset_minutes: i32,
    /// How often the newest queued sample is taken.
    pub tick_hz: f64,
    pub camera: CameraConfig,
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            utc_offset_minutes: 330,
            tick_hz: 20.0,
            camera: CameraConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraConfig {
    /// Pair each sample with a frame. When off, samples are recorded alone.
    pub enabled: bool,
    pub device: u32,
    pub width: u32,
    pub height: u32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            device: 0,
            width: 640,
            height: 480,
        }
    }
}
