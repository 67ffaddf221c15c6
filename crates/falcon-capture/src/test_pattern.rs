use crate::{CapturedFrame, FrameSource};
use anyhow::{ensure, Result};
use tracing::info;

/// Synthetic camera producing a moving checkerboard.
///
/// Stands in for a real device on machines without one; each frame is
/// shifted by one cell so consecutive saved images differ.
pub struct TestPatternCamera {
    camera_id: u32,
    width: u32,
    height: u32,
    frame_index: u32,
}

const CHECKER_SIZE: u32 = 16;

impl TestPatternCamera {
    pub fn new(camera_id: u32, width: u32, height: u32) -> Result<Self> {
        ensure!(width > 0 && height > 0, "Frame size must be non-zero, got {width}x{height}");
        info!(camera_id, width, height, "Test pattern camera initialized");
        Ok(Self {
            camera_id,
            width,
            height,
            frame_index: 0,
        })
    }
}

impl FrameSource for TestPatternCamera {
    fn try_capture(&mut self) -> Result<Option<CapturedFrame>> {
        let shift = self.frame_index;
        self.frame_index = self.frame_index.wrapping_add(1);

        let mut data = Vec::with_capacity((self.width * self.height * 3) as usize);
        for y in 0..self.height {
            for x in 0..self.width {
                let is_light = ((x / CHECKER_SIZE) + (y / CHECKER_SIZE) + shift) % 2 == 0;
                let v = if is_light { 200 } else { 40 };
                data.extend_from_slice(&[v, v, v]);
            }
        }

        Ok(Some(CapturedFrame {
            data,
            width: self.width,
            height: self.height,
        }))
    }

    fn camera_id(&self) -> u32 {
        self.camera_id
    }
}
