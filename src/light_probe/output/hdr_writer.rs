use std::io::Write;

use image::Rgb;
use image::codecs::hdr::HdrEncoder;
use tracing::debug;

use crate::light_probe::common::error::{ProbeError, Result};
use crate::light_probe::fusion::RadianceImage;
use crate::light_probe::output::writer::RadianceWriter;

/// Radiance RGBE (`.hdr`) encoder.
#[derive(Debug, Clone, Copy, Default)]
pub struct HdrRadianceWriter;

impl RadianceWriter for HdrRadianceWriter {
    fn write_radiance(&self, radiance: &RadianceImage, output: &mut dyn Write) -> Result<()> {
        let (width, height) = radiance.dimensions();
        if width == 0 || height == 0 {
            return Err(ProbeError::InvalidDimensions(width, height));
        }
        debug!("Encoding radiance image: {}x{}", width, height);

        let pixels: Vec<Rgb<f32>> = radiance.as_image().pixels().copied().collect();
        let mut buffer = Vec::new();
        HdrEncoder::new(&mut buffer)
            .encode(&pixels, width as usize, height as usize)
            .map_err(|e| ProbeError::EncodeError(e.to_string()))?;

        output.write_all(&buffer)?;
        Ok(())
    }
}
