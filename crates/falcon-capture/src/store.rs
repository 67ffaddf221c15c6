use crate::CapturedFrame;
use anyhow::{ensure, Context, Result};
use std::io::Write;
use std::path::PathBuf;

/// Writes frames into a folder, one binary PPM per frame.
pub struct FrameStore {
    dir: PathBuf,
}

impl FrameStore {
    /// Create the folder if needed.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create frame folder {}", dir.display()))?;
        Ok(Self { dir })
    }

    /// File name for a frame taken at `timestamp` (colons are not portable).
    pub fn frame_name(timestamp: &str) -> String {
        format!("{}.ppm", timestamp.replace(':', "-"))
    }

    /// Save `frame` under `name` and return the full path.
    pub fn save(&self, frame: &CapturedFrame, name: &str) -> Result<PathBuf> {
        let expected = frame.width as usize * frame.height as usize * 3;
        ensure!(
            frame.data.len() == expected,
            "Frame holds {} bytes, expected {} for {}x{} RGB",
            frame.data.len(),
            expected,
            frame.width,
            frame.height
        );

        let path = self.dir.join(name);
        let mut file = std::io::BufWriter::new(
            std::fs::File::create(&path)
                .with_context(|| format!("Failed to create {}", path.display()))?,
        );
        write!(file, "P6\n{} {}\n255\n", frame.width, frame.height)?;
        file.write_all(&frame.data)?;
        file.flush()?;
        Ok(path)
    }
}
