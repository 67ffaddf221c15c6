use crate::types::RawSample;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Length of one binary sensor frame: 1 tag byte + 3 x f32.
pub const BINARY_PACKET_LEN: usize = 13;

/// Byte offsets of the little-endian x, y, z values inside a binary frame.
const AXIS_OFFSETS: [usize; 3] = [1, 5, 9];

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Packet too short: {len} bytes, expected {BINARY_PACKET_LEN}")]
    PacketTooShort { len: usize },
    #[error("Invalid JSON sensor packet: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("Packet carries a non-finite acceleration value")]
    NonFinite,
}

/// Datagram layout emitted by the sensor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PacketFormat {
    /// 13-byte frame from the microcontroller.
    #[default]
    Binary,
    /// JSON object from phone sensor apps (`accelX`, `accelY`, `accelZ`).
    Json,
}

impl PacketFormat {
    pub fn parse(self, datagram: &[u8]) -> Result<RawSample, ProtocolError> {
        let sample = match self {
            PacketFormat::Binary => parse_binary(datagram)?,
            PacketFormat::Json => parse_json(datagram)?,
        };
        if !sample.accel.is_finite() {
            return Err(ProtocolError::NonFinite);
        }
        Ok(sample)
    }
}

/// Decode a binary frame. Bytes past the first frame are ignored.
pub fn parse_binary(datagram: &[u8]) -> Result<RawSample, ProtocolError> {
    if datagram.len() < BINARY_PACKET_LEN {
        return Err(ProtocolError::PacketTooShort {
            len: datagram.len(),
        });
    }

    let f = |offset: usize| -> f32 {
        let mut bytes = [0u8; 4];
        bytes.copy_from_slice(&datagram[offset..offset + 4]);
        f32::from_le_bytes(bytes)
    };

    let [x, y, z] = AXIS_OFFSETS.map(f);
    Ok(RawSample::new(x, y, z))
}

#[derive(Debug, Deserialize)]
struct JsonPacket {
    #[serde(rename = "accelX", default)]
    accel_x: f32,
    #[serde(rename = "accelY", default)]
    accel_y: f32,
    #[serde(rename = "accelZ", default)]
    accel_z: f32,
}

/// Decode a JSON packet. Missing axes read as zero.
pub fn parse_json(datagram: &[u8]) -> Result<RawSample, ProtocolError> {
    let packet: JsonPacket = serde_json::from_slice(datagram)?;
    Ok(RawSample::new(packet.accel_x, packet.accel_y, packet.accel_z))
}
