use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage};
use tracing::{debug, info, info_span, instrument, warn};

use crate::light_probe::common::error::{ProbeError, Result};
use crate::light_probe::projection::geometry::estimate_geometry;
use crate::light_probe::projection::reflection_map::ReflectionMap;
use crate::light_probe::projection::sampling::{remap_rows, to_rgb8};
use crate::light_probe::projection::types::{ProbeStatus, Projection, ProjectorConfig, SphereGeometry};
use crate::light_probe::sphere::{SphereLocator, SphereObservation};

/// Everything derived from one sphere placement.
#[derive(Debug, Clone)]
struct Probe {
    sphere: SphereObservation,
    fov_radians: f32,
    geometry: SphereGeometry,
    origin: (u32, u32),
    crop: RgbImage,
    map: ReflectionMap,
}

/// Square crop `(x, y, side)` around the sphere, kept inside the frame.
fn crop_region(sphere: &SphereObservation, width: u32, height: u32) -> Result<(u32, u32, u32)> {
    let side = (2.0 * sphere.radius).round() as u32;
    if side < 4 {
        return Err(ProbeError::InvalidProbeInput(format!(
            "sphere radius {} is too small",
            sphere.radius
        )));
    }
    if side > width || side > height || !sphere.fits_within(width, height) {
        return Err(ProbeError::InvalidProbeInput(format!(
            "sphere {sphere:?} does not fit in a {width}x{height} frame"
        )));
    }
    let x = ((sphere.center_x - sphere.radius).round().max(0.0) as u32).min(width - side);
    let y = ((sphere.center_y - sphere.radius).round().max(0.0) as u32).min(height - side);
    Ok((x, y, side))
}

fn check_frame(frame: &RgbImage) -> Result<()> {
    if frame.width() == 0 || frame.height() == 0 {
        return Err(ProbeError::InvalidProbeInput(format!(
            "empty frame {}x{}",
            frame.width(),
            frame.height()
        )));
    }
    Ok(())
}

/// Converts photographs of a chromed sphere into panoramas.
///
/// Set a probe with [`set_probe`](Self::set_probe), then fetch the panorama
/// with [`converted_probe`](Self::converted_probe). The map is only rebuilt
/// when the sphere placement or field of view changes.
#[derive(Debug)]
pub struct SphereProjector {
    config: ProjectorConfig,
    locator: SphereLocator,
    probe: Option<Probe>,
}

impl SphereProjector {
    /// Fails when the configuration is malformed.
    pub fn new(config: ProjectorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            locator: SphereLocator::new(config.locator.clone()),
            config,
            probe: None,
        })
    }

    pub fn config(&self) -> &ProjectorConfig {
        &self.config
    }

    pub fn locator(&self) -> &SphereLocator {
        &self.locator
    }

    pub fn locator_mut(&mut self) -> &mut SphereLocator {
        &mut self.locator
    }

    pub fn status(&self) -> ProbeStatus {
        if self.probe.is_some() {
            ProbeStatus::Ready
        } else {
            ProbeStatus::NoSphere
        }
    }

    pub fn sphere(&self) -> Option<SphereObservation> {
        self.probe.as_ref().map(|p| p.sphere)
    }

    pub fn geometry(&self) -> Option<SphereGeometry> {
        self.probe.as_ref().map(|p| p.geometry)
    }

    pub fn map(&self) -> Option<&ReflectionMap> {
        self.probe.as_ref().map(|p| &p.map)
    }

    /// Cropped sphere image of the current probe.
    pub fn sphere_image(&self) -> Option<&RgbImage> {
        self.probe.as_ref().map(|p| &p.crop)
    }

    /// Sets a new probe frame.
    ///
    /// Without a known `sphere` (or with a zero-radius one) the sphere is
    /// located in the frame. Finding none is not an error: the status turns
    /// to [`ProbeStatus::NoSphere`] and the panorama becomes a black placeholder.
    #[instrument(skip(self, frame), fields(width = frame.width(), height = frame.height()))]
    pub fn set_probe(
        &mut self,
        frame: &RgbImage,
        fov_degrees: f32,
        sphere: Option<SphereObservation>,
    ) -> Result<ProbeStatus> {
        check_frame(frame)?;
        if !(fov_degrees.is_finite() && fov_degrees > 0.0 && fov_degrees < 180.0) {
            return Err(ProbeError::InvalidProbeInput(format!(
                "field of view must lie in (0, 180) degrees, got {fov_degrees}"
            )));
        }

        let sphere = match sphere {
            Some(s) if s.is_detected() => s,
            _ => self.locator.locate(frame),
        };
        if !sphere.is_detected() {
            debug!("No sphere in frame");
            self.probe = None;
            return Ok(ProbeStatus::NoSphere);
        }

        let (x, y, side) = crop_region(&sphere, frame.width(), frame.height())?;
        let crop = imageops::crop_imm(frame, x, y, side, side).to_image();
        let fov_radians = fov_degrees.to_radians();

        // Same placement as before: only the pixels changed
        if let Some(probe) = self.probe.as_mut() {
            if probe.sphere == sphere && probe.fov_radians == fov_radians && probe.map.size() == side as usize {
                probe.origin = (x, y);
                probe.crop = crop;
                return Ok(ProbeStatus::Ready);
            }
        }

        let geometry = estimate_geometry(&sphere, frame.width(), fov_radians, self.config.sphere_diameter_mm);
        debug!(
            cropped_fov = geometry.cropped_fov,
            camera_distance = geometry.camera_distance,
            "Sphere geometry"
        );

        let map = {
            let _span = info_span!("build_map", side).entered();
            ReflectionMap::build(
                side as usize,
                &geometry,
                self.config.sphere_diameter_mm,
                self.config.projection,
            )
        };
        if map.degenerate_pixels() > 0 {
            warn!(degenerate = map.degenerate_pixels(), "Degenerate sphere pixels");
        }

        info!(?sphere, side, "Probe set");
        self.probe = Some(Probe {
            sphere,
            fov_radians,
            geometry,
            origin: (x, y),
            crop,
            map,
        });
        Ok(ProbeStatus::Ready)
    }

    /// Takes a new frame while the sphere is known not to have moved.
    ///
    /// Keeps the sphere placement and the map, only the crop is refreshed.
    pub fn refresh_probe(&mut self, frame: &RgbImage) -> Result<()> {
        check_frame(frame)?;
        let probe = self
            .probe
            .as_mut()
            .ok_or_else(|| ProbeError::InvalidProbeInput("no probe to refresh".to_string()))?;

        let side = probe.map.size() as u32;
        let (x, y) = probe.origin;
        if x + side > frame.width() || y + side > frame.height() {
            return Err(ProbeError::InvalidProbeInput(format!(
                "frame {}x{} too small for the kept sphere crop",
                frame.width(),
                frame.height()
            )));
        }
        probe.crop = imageops::crop_imm(frame, x, y, side, side).to_image();
        Ok(())
    }

    /// Panorama of the current probe, scaled by the inverse reflectance.
    ///
    /// A black image of the configured size when there is no sphere.
    #[instrument(skip(self))]
    pub fn converted_probe(&self) -> RgbImage {
        let (width, height) = (self.config.panorama_width, self.config.panorama_height);
        let Some(probe) = self.probe.as_ref() else {
            return RgbImage::from_pixel(width, height, Rgb([0, 0, 0]));
        };

        let side = probe.map.size();
        let resampled = match self.config.projection {
            // Pitch only spans half the grid height; the rest is never reached
            Projection::Equirectangular => remap_rows(&probe.crop, &probe.map, side / 4, side / 2),
        };

        let resized = if resampled.dimensions() == (width, height) {
            resampled
        } else {
            imageops::resize(&resampled, width, height, FilterType::Triangle)
        };

        to_rgb8(&resized, self.config.reflectance)
    }
}
