use std::io::Write;

use image::RgbImage;
use tiff::encoder::compression::DeflateLevel;
use tiff::encoder::{Compression, TiffEncoder, colortype};
use tracing::debug;

use crate::light_probe::common::error::{ProbeError, Result};
use crate::light_probe::output::types::{TiffCompression, TiffOptions};
use crate::light_probe::output::writer::PanoramaWriter;

#[derive(Debug, Clone, Copy, Default)]
pub struct TiffPanoramaWriter {
    options: TiffOptions,
}

impl TiffPanoramaWriter {
    pub fn new(options: TiffOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &TiffOptions {
        &self.options
    }
}

impl PanoramaWriter for TiffPanoramaWriter {
    fn write_panorama(&self, panorama: &RgbImage, output: &mut dyn Write) -> Result<()> {
        let (width, height) = panorama.dimensions();
        if width == 0 || height == 0 {
            return Err(ProbeError::InvalidDimensions(width, height));
        }
        debug!("Encoding panorama TIFF: {}x{}", width, height);

        let compression = match self.options.compression {
            TiffCompression::None => Compression::Uncompressed,
            TiffCompression::Lzw => Compression::Lzw,
            TiffCompression::DeflateFast => Compression::Deflate(DeflateLevel::Fast),
            TiffCompression::DeflateBalanced => Compression::Deflate(DeflateLevel::Balanced),
            TiffCompression::DeflateBest => Compression::Deflate(DeflateLevel::Best),
        };

        // The encoder needs Seek, so encode in memory first
        let mut buffer = Vec::new();
        let mut encoder = TiffEncoder::new(std::io::Cursor::new(&mut buffer))
            .map_err(|e| ProbeError::EncodeError(e.to_string()))?
            .with_compression(compression);

        if self.options.horizontal_predictor && self.options.compression != TiffCompression::None {
            encoder = encoder.with_predictor(tiff::tags::Predictor::Horizontal);
        }

        encoder
            .write_image::<colortype::RGB8>(width, height, panorama.as_raw())
            .map_err(|e| ProbeError::EncodeError(e.to_string()))?;

        output.write_all(&buffer)?;

        debug!("TIFF encoding complete, {} bytes", buffer.len());
        Ok(())
    }
}
