//! Exposure fusion data types

use image::{Rgb, Rgb32FImage, RgbImage};

use crate::light_probe::common::error::{ProbeError, Result};

/// Sample value treated as the reflectance unit when normalizing exposures.
pub const MID_GRAY: f32 = 127.0;

/// One LDR capture and its exposure value.
///
/// The exposure value follows the capture collaborator's convention, see
/// [`ExposureSettings::ev`](crate::light_probe::capture::ExposureSettings::ev).
#[derive(Debug, Clone)]
pub struct Exposure {
    pub image: RgbImage,
    pub exposure_value: f32,
}

impl Exposure {
    pub fn new(image: RgbImage, exposure_value: f32) -> Self {
        Self { image, exposure_value }
    }

    /// Linear factor bringing this exposure's samples into the shared radiance unit.
    pub fn radiance_scale(&self) -> f32 {
        self.exposure_value.exp2() / MID_GRAY
    }
}

/// Fused floating-point radiance, one per batch.
#[derive(Debug, Clone)]
pub struct RadianceImage {
    image: Rgb32FImage,
    unreliable_samples: usize,
}

impl RadianceImage {
    pub(crate) fn new(image: Rgb32FImage, unreliable_samples: usize) -> Self {
        Self { image, unreliable_samples }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    pub fn pixel(&self, x: u32, y: u32) -> [f32; 3] {
        let Rgb(rgb) = *self.image.get_pixel(x, y);
        rgb
    }

    /// Channel samples whose exposures all carried zero weight. They hold 0.0.
    pub fn unreliable_samples(&self) -> usize {
        self.unreliable_samples
    }

    pub fn as_image(&self) -> &Rgb32FImage {
        &self.image
    }

    pub fn into_image(self) -> Rgb32FImage {
        self.image
    }
}

/// Parameters of the confidence Gaussian.
#[derive(Debug, Clone)]
pub struct FusionConfig {
    /// Standard deviation, in sample units
    pub sigma: f32,
    /// Sample value receiving full confidence
    pub mu: f32,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            sigma: 40.0,
            mu: MID_GRAY,
        }
    }
}

impl FusionConfig {
    pub fn builder() -> FusionConfigBuilder {
        FusionConfigBuilder::default()
    }
}

#[derive(Default)]
pub struct FusionConfigBuilder {
    sigma: Option<f32>,
    mu: Option<f32>,
}

impl FusionConfigBuilder {
    pub fn sigma(mut self, sigma: f32) -> Self {
        self.sigma = Some(sigma);
        self
    }

    pub fn mu(mut self, mu: f32) -> Self {
        self.mu = Some(mu);
        self
    }

    pub fn build(self) -> Result<FusionConfig> {
        let default = FusionConfig::default();
        let config = FusionConfig {
            sigma: self.sigma.unwrap_or(default.sigma),
            mu: self.mu.unwrap_or(default.mu),
        };

        if !(config.sigma.is_finite() && config.sigma > 0.0) {
            return Err(ProbeError::InvalidConfig(format!(
                "fusion sigma must be positive, got {}",
                config.sigma
            )));
        }
        if !config.mu.is_finite() {
            return Err(ProbeError::InvalidConfig("fusion mu must be finite".to_string()));
        }

        Ok(config)
    }
}
