use crate::light_probe::common::error::{ProbeError, Result};

/// Camera exposure parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExposureSettings {
    /// f-number
    pub aperture: f32,
    /// Inverse exposure time: 60 means 1/60 s
    pub shutter_speed: f32,
    pub iso: f32,
    /// Sensor gain in dB, 6 dB per stop
    pub gain_db: f32,
}

impl Default for ExposureSettings {
    fn default() -> Self {
        Self {
            aperture: 5.6,
            shutter_speed: 1.0,
            iso: 100.0,
            gain_db: 0.0,
        }
    }
}

impl ExposureSettings {
    /// Exposure value of these settings, normalized to ISO 100.
    ///
    /// Brighter exposures get lower values, so `2^ev` scales pixel values
    /// back to scene radiance.
    pub fn ev(&self) -> f32 {
        (self.aperture * self.aperture * self.shutter_speed * 100.0 / self.iso).log2() - self.gain_db / 6.0
    }

    pub fn with_shutter_speed(self, shutter_speed: f32) -> Self {
        Self { shutter_speed, ..self }
    }

    /// Same settings, `stops` darker through a faster shutter.
    pub fn stopped(self, stops: f32) -> Self {
        self.with_shutter_speed(self.shutter_speed * stops.exp2())
    }

    pub fn validate(&self) -> Result<()> {
        let positive = |v: f32| v.is_finite() && v > 0.0;
        if !positive(self.aperture) || !positive(self.shutter_speed) || !positive(self.iso) {
            return Err(ProbeError::InvalidConfig(format!(
                "aperture, shutter speed and ISO must be positive, got {self:?}"
            )));
        }
        if !self.gain_db.is_finite() {
            return Err(ProbeError::InvalidConfig(format!("gain must be finite, got {}", self.gain_db)));
        }
        Ok(())
    }
}

/// Bracketed capture plan.
#[derive(Debug, Clone)]
pub struct BracketConfig {
    /// Number of captures in the bracket
    pub exposure_count: usize,
    /// Stops between consecutive captures
    pub stop_step: f32,
    /// Settings of the first, brightest capture
    pub base: ExposureSettings,
    /// Frames dropped after each settings change, stale from the camera buffer
    pub flush_frames: usize,
}

impl Default for BracketConfig {
    fn default() -> Self {
        Self {
            exposure_count: 3,
            stop_step: 1.0,
            base: ExposureSettings::default(),
            flush_frames: 5,
        }
    }
}

impl BracketConfig {
    pub fn builder() -> BracketConfigBuilder {
        BracketConfigBuilder::default()
    }

    /// Settings of the `index`-th capture.
    pub fn settings_at(&self, index: usize) -> ExposureSettings {
        self.base.stopped(index as f32 * self.stop_step)
    }

    pub fn validate(&self) -> Result<()> {
        if self.exposure_count == 0 {
            return Err(ProbeError::InvalidConfig("exposure_count must be at least 1".to_string()));
        }
        if !self.stop_step.is_finite() {
            return Err(ProbeError::InvalidConfig(format!("stop_step must be finite, got {}", self.stop_step)));
        }
        self.base.validate()
    }
}

#[derive(Default)]
pub struct BracketConfigBuilder {
    exposure_count: Option<usize>,
    stop_step: Option<f32>,
    base: Option<ExposureSettings>,
    flush_frames: Option<usize>,
}

impl BracketConfigBuilder {
    pub fn exposure_count(mut self, count: usize) -> Self {
        self.exposure_count = Some(count);
        self
    }

    pub fn stop_step(mut self, stops: f32) -> Self {
        self.stop_step = Some(stops);
        self
    }

    pub fn base(mut self, settings: ExposureSettings) -> Self {
        self.base = Some(settings);
        self
    }

    pub fn flush_frames(mut self, frames: usize) -> Self {
        self.flush_frames = Some(frames);
        self
    }

    pub fn build(self) -> Result<BracketConfig> {
        let default = BracketConfig::default();
        let config = BracketConfig {
            exposure_count: self.exposure_count.unwrap_or(default.exposure_count),
            stop_step: self.stop_step.unwrap_or(default.stop_step),
            base: self.base.unwrap_or(default.base),
            flush_frames: self.flush_frames.unwrap_or(default.flush_frames),
        };
        config.validate()?;
        Ok(config)
    }
}
