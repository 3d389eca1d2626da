use image::RgbImage;

use crate::light_probe::capture::types::ExposureSettings;
use crate::light_probe::common::error::{ProbeError, Result};

/// A camera, or anything that can stand in for one.
pub trait FrameSource {
    /// Applies `settings` if needed and returns the next frame.
    fn capture(&mut self, settings: &ExposureSettings) -> Result<RgbImage>;
}

/// Replays one fixed frame regardless of the requested settings.
#[derive(Debug, Clone)]
pub struct StillFrameSource {
    frame: RgbImage,
}

impl StillFrameSource {
    pub fn new(frame: RgbImage) -> Self {
        Self { frame }
    }

    pub fn open<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let frame = image::open(path)
            .map_err(|e| ProbeError::CaptureError(format!("{}: {e}", path.display())))?
            .to_rgb8();
        Ok(Self::new(frame))
    }

    pub fn frame(&self) -> &RgbImage {
        &self.frame
    }
}

impl FrameSource for StillFrameSource {
    fn capture(&mut self, _settings: &ExposureSettings) -> Result<RgbImage> {
        Ok(self.frame.clone())
    }
}
