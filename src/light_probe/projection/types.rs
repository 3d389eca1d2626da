//! Projection configuration and derived geometry

use crate::light_probe::common::error::{ProbeError, Result};
use crate::light_probe::sphere::LocatorConfig;

/// Layout of the output panorama.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Projection {
    /// Columns proportional to yaw, rows to pitch
    #[default]
    Equirectangular,
}

/// Outcome of setting a probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeStatus {
    /// A sphere is known and the panorama map is built
    Ready,
    /// No sphere in the frame; the panorama is a black placeholder
    NoSphere,
}

/// Camera-relative placement of the sphere.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SphereGeometry {
    /// Angle subtended by the sphere silhouette, in radians
    pub cropped_fov: f32,
    /// Camera to sphere center distance, in the diameter's unit
    pub camera_distance: f32,
}

/// Sphere and output settings, fixed for the projector's lifetime.
#[derive(Debug, Clone)]
pub struct ProjectorConfig {
    /// Physical sphere diameter, in millimeters
    pub sphere_diameter_mm: f32,
    /// Fraction of incident light the sphere reflects
    pub reflectance: f32,
    pub projection: Projection,
    pub panorama_width: u32,
    pub panorama_height: u32,
    /// Used when a probe is set without a known sphere position
    pub locator: LocatorConfig,
}

impl Default for ProjectorConfig {
    fn default() -> Self {
        Self {
            sphere_diameter_mm: 50.8,
            reflectance: 1.0,
            projection: Projection::Equirectangular,
            panorama_width: 512,
            panorama_height: 256,
            locator: LocatorConfig::default(),
        }
    }
}

impl ProjectorConfig {
    pub fn builder() -> ProjectorConfigBuilder {
        ProjectorConfigBuilder::default()
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.sphere_diameter_mm.is_finite() && self.sphere_diameter_mm > 0.0) {
            return Err(ProbeError::InvalidConfig(format!(
                "sphere diameter must be positive, got {}",
                self.sphere_diameter_mm
            )));
        }
        if !(self.reflectance.is_finite() && self.reflectance > 0.0) {
            return Err(ProbeError::InvalidConfig(format!(
                "sphere reflectance must be positive, got {}",
                self.reflectance
            )));
        }
        if self.panorama_width == 0 || self.panorama_height == 0 {
            return Err(ProbeError::InvalidConfig(format!(
                "panorama size must be non-zero, got {}x{}",
                self.panorama_width, self.panorama_height
            )));
        }
        self.locator.validate()
    }
}

#[derive(Default)]
pub struct ProjectorConfigBuilder {
    sphere_diameter_mm: Option<f32>,
    reflectance: Option<f32>,
    projection: Option<Projection>,
    panorama_size: Option<(u32, u32)>,
    locator: Option<LocatorConfig>,
}

impl ProjectorConfigBuilder {
    pub fn sphere_diameter_mm(mut self, diameter: f32) -> Self {
        self.sphere_diameter_mm = Some(diameter);
        self
    }

    pub fn reflectance(mut self, reflectance: f32) -> Self {
        self.reflectance = Some(reflectance);
        self
    }

    pub fn projection(mut self, projection: Projection) -> Self {
        self.projection = Some(projection);
        self
    }

    pub fn panorama_size(mut self, width: u32, height: u32) -> Self {
        self.panorama_size = Some((width, height));
        self
    }

    pub fn locator(mut self, locator: LocatorConfig) -> Self {
        self.locator = Some(locator);
        self
    }

    pub fn build(self) -> Result<ProjectorConfig> {
        let default = ProjectorConfig::default();
        let (panorama_width, panorama_height) = self
            .panorama_size
            .unwrap_or((default.panorama_width, default.panorama_height));
        let config = ProjectorConfig {
            sphere_diameter_mm: self.sphere_diameter_mm.unwrap_or(default.sphere_diameter_mm),
            reflectance: self.reflectance.unwrap_or(default.reflectance),
            projection: self.projection.unwrap_or(default.projection),
            panorama_width,
            panorama_height,
            locator: self.locator.unwrap_or(default.locator),
        };
        config.validate()?;
        Ok(config)
    }
}
