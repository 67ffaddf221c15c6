pub mod store;
pub mod test_pattern;

use anyhow::Result;

pub use store::FrameStore;
pub use test_pattern::TestPatternCamera;

/// A captured camera frame.
pub struct CapturedFrame {
    /// RGB8 pixel data, row-major.
    pub data: Vec<u8>,
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
}

/// Camera paired with accelerometer samples during recording.
pub trait FrameSource: Send {
    /// Grab the current frame.
    /// Returns `None` if the camera has no frame to give right now.
    fn try_capture(&mut self) -> Result<Option<CapturedFrame>>;

    /// Identifier of the device behind this source.
    fn camera_id(&self) -> u32;
}
