use image::{Rgb32FImage, RgbImage};
use rayon::prelude::*;
use tracing::{debug, info, instrument, warn};

use crate::light_probe::common::error::{ProbeError, Result};
use crate::light_probe::fusion::types::{Exposure, FusionConfig, RadianceImage};
use crate::light_probe::fusion::weighting::RadianceWeighting;

/// Accumulates one batch of exposures and fuses it into radiance.
///
/// The first exposure of a batch fixes the dimensions every later one must
/// match. A successful [`compute_radiance`](Self::compute_radiance) consumes
/// the batch, so the engine is immediately ready for the next one.
#[derive(Debug, Default)]
pub struct ExposureFusionEngine {
    weighting: RadianceWeighting,
    batch: Vec<Exposure>,
}

impl ExposureFusionEngine {
    pub fn new(config: FusionConfig) -> Self {
        Self {
            weighting: RadianceWeighting::from_config(&config),
            batch: Vec::new(),
        }
    }

    pub fn weighting(&self) -> &RadianceWeighting {
        &self.weighting
    }

    pub fn len(&self) -> usize {
        self.batch.len()
    }

    pub fn is_empty(&self) -> bool {
        self.batch.is_empty()
    }

    /// Reference dimensions of the current batch, if any.
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        self.batch.first().map(|e| e.image.dimensions())
    }

    pub fn add_exposure(&mut self, image: RgbImage, exposure_value: f32) -> Result<()> {
        let found = image.dimensions();

        if let Some(expected) = self.dimensions() {
            if expected != found {
                warn!(?expected, ?found, "Rejecting exposure with mismatched dimensions");
                return Err(ProbeError::InputMismatch { expected, found });
            }
        } else if found.0 == 0 || found.1 == 0 {
            return Err(ProbeError::InvalidDimensions(found.0, found.1));
        }

        debug!(ev = exposure_value, index = self.batch.len(), "Exposure added");
        self.batch.push(Exposure::new(image, exposure_value));
        Ok(())
    }

    /// Drops the pending batch without fusing it.
    pub fn clear(&mut self) {
        self.batch.clear();
    }

    #[instrument(skip(self), fields(exposures = self.batch.len()))]
    pub fn compute_radiance(&mut self) -> Result<RadianceImage> {
        let (width, height) = self.dimensions().ok_or(ProbeError::EmptyBatch)?;

        let weights = self.weighting.table();
        let scales: Vec<f32> = self.batch.iter().map(Exposure::radiance_scale).collect();
        let sources: Vec<&[u8]> = self.batch.iter().map(|e| e.image.as_raw().as_slice()).collect();

        let row_len = width as usize * 3;
        let mut data = vec![0.0f32; row_len * height as usize];

        let unreliable: usize = data
            .par_chunks_mut(row_len)
            .enumerate()
            .map(|(y, row)| {
                let offset = y * row_len;
                let mut unreliable = 0;
                for (i, out) in row.iter_mut().enumerate() {
                    let mut weighted = 0.0f32;
                    let mut total = 0.0f32;
                    for (source, scale) in sources.iter().zip(&scales) {
                        let sample = source[offset + i];
                        let w = weights[sample as usize];
                        weighted += w * f32::from(sample) * scale;
                        total += w;
                    }
                    // Every exposure saturated or black: no trustworthy estimate
                    if total > f32::MIN_POSITIVE {
                        *out = weighted / total;
                    } else {
                        unreliable += 1;
                    }
                }
                unreliable
            })
            .sum();

        let image = Rgb32FImage::from_raw(width, height, data)
            .ok_or(ProbeError::InvalidDimensions(width, height))?;

        if unreliable > 0 {
            warn!(unreliable, "Samples without usable weight were set to zero");
        }
        info!(width, height, exposures = self.batch.len(), "Radiance computed");

        self.batch.clear();
        Ok(RadianceImage::new(image, unreliable))
    }
}
