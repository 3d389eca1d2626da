//! Sphere location types and configuration

use crate::light_probe::common::error::{ProbeError, Result};

/// Image-space position and radius of the sphere silhouette, in pixels.
///
/// A zero radius means no sphere.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SphereObservation {
    pub center_x: f32,
    pub center_y: f32,
    pub radius: f32,
}

impl SphereObservation {
    pub fn new(center_x: f32, center_y: f32, radius: f32) -> Self {
        Self { center_x, center_y, radius }
    }

    pub fn none() -> Self {
        Self::default()
    }

    pub fn is_detected(&self) -> bool {
        self.radius > 0.0
    }

    /// Whether the full circle lies within a `width` x `height` frame.
    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        self.center_x - self.radius >= 0.0
            && self.center_y - self.radius >= 0.0
            && self.center_x + self.radius <= width as f32
            && self.center_y + self.radius <= height as f32
    }
}

/// Locator state, derived from its history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackingState {
    /// No reliable sphere known
    Searching,
    /// History holds at least one observation
    Tracking,
}

/// Circle detector parameters.
#[derive(Debug, Clone)]
pub struct DetectorConfig {
    /// Gaussian pre-blur applied to the grayscale frame
    pub blur_sigma: f32,
    /// Edge threshold, as a fraction of the strongest gradient
    pub gradient_threshold: f32,
    /// Image pixels per accumulator cell
    pub accumulator_scale: u32,
    /// Smallest radius searched, as a fraction of the frame height
    pub min_radius_fraction: f32,
    /// Largest radius searched, as a fraction of the frame height
    pub max_radius_fraction: f32,
    /// Accumulator peaks below this fraction of the best one are ignored
    pub min_vote_fraction: f32,
    /// Number of accumulator peaks examined
    pub max_candidates: usize,
    /// Minimum radial edge pixels per unit of circumference
    pub min_edge_support: f32,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            blur_sigma: 2.0,
            gradient_threshold: 0.25,
            accumulator_scale: 2,
            min_radius_fraction: 1.0 / 8.0,
            max_radius_fraction: 1.0,
            min_vote_fraction: 0.3,
            max_candidates: 5,
            min_edge_support: 0.4,
        }
    }
}

impl DetectorConfig {
    fn validate(&self) -> Result<()> {
        if !(self.blur_sigma > 0.0) {
            return Err(ProbeError::InvalidConfig("blur_sigma must be positive".to_string()));
        }
        if !(self.gradient_threshold > 0.0 && self.gradient_threshold < 1.0) {
            return Err(ProbeError::InvalidConfig(
                "gradient_threshold must lie in (0, 1)".to_string(),
            ));
        }
        if self.accumulator_scale == 0 {
            return Err(ProbeError::InvalidConfig("accumulator_scale must be at least 1".to_string()));
        }
        if !(self.min_radius_fraction > 0.0 && self.max_radius_fraction >= self.min_radius_fraction) {
            return Err(ProbeError::InvalidConfig(format!(
                "invalid radius range {}..{}",
                self.min_radius_fraction, self.max_radius_fraction
            )));
        }
        if self.max_candidates == 0 {
            return Err(ProbeError::InvalidConfig("max_candidates must be at least 1".to_string()));
        }
        Ok(())
    }
}

/// Sphere locator parameters.
#[derive(Debug, Clone)]
pub struct LocatorConfig {
    /// Number of recent observations averaged. Scene cuts can only trigger
    /// once more than five observations are held.
    pub window_length: usize,
    /// A new observation farther than `threshold` sigmas from the mean resets
    /// the history. Zero disables the check.
    pub threshold: f32,
    pub detector: DetectorConfig,
}

impl Default for LocatorConfig {
    fn default() -> Self {
        Self {
            window_length: 10,
            threshold: 2.0,
            detector: DetectorConfig::default(),
        }
    }
}

impl LocatorConfig {
    pub fn builder() -> LocatorConfigBuilder {
        LocatorConfigBuilder::default()
    }

    pub fn validate(&self) -> Result<()> {
        if self.window_length == 0 {
            return Err(ProbeError::InvalidConfig("window_length must be at least 1".to_string()));
        }
        if !(self.threshold >= 0.0) {
            return Err(ProbeError::InvalidConfig(format!(
                "threshold must be non-negative, got {}",
                self.threshold
            )));
        }
        self.detector.validate()
    }
}

#[derive(Default)]
pub struct LocatorConfigBuilder {
    window_length: Option<usize>,
    threshold: Option<f32>,
    detector: Option<DetectorConfig>,
}

impl LocatorConfigBuilder {
    pub fn window_length(mut self, length: usize) -> Self {
        self.window_length = Some(length);
        self
    }

    pub fn threshold(mut self, threshold: f32) -> Self {
        self.threshold = Some(threshold);
        self
    }

    pub fn detector(mut self, detector: DetectorConfig) -> Self {
        self.detector = Some(detector);
        self
    }

    pub fn build(self) -> Result<LocatorConfig> {
        let default = LocatorConfig::default();
        let config = LocatorConfig {
            window_length: self.window_length.unwrap_or(default.window_length),
            threshold: self.threshold.unwrap_or(default.threshold),
            detector: self.detector.unwrap_or(default.detector),
        };
        config.validate()?;
        Ok(config)
    }
}
