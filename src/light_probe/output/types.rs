//! Output encoding options

/// TIFF compression methods
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TiffCompression {
    /// No compression (fastest, largest file)
    #[default]
    None,
    /// LZW compression
    Lzw,
    /// Deflate compression - fast level
    DeflateFast,
    /// Deflate compression - balanced
    DeflateBalanced,
    /// Deflate compression - best compression (slower)
    DeflateBest,
}

/// Panorama TIFF encoding options
#[derive(Debug, Clone, Copy, Default)]
pub struct TiffOptions {
    pub compression: TiffCompression,
    /// Horizontal differencing before compression; ignored when uncompressed
    pub horizontal_predictor: bool,
}

impl TiffOptions {
    pub fn builder() -> TiffOptionsBuilder {
        TiffOptionsBuilder::default()
    }
}

#[derive(Default)]
pub struct TiffOptionsBuilder {
    compression: Option<TiffCompression>,
    horizontal_predictor: Option<bool>,
}

impl TiffOptionsBuilder {
    pub fn compression(mut self, compression: TiffCompression) -> Self {
        self.compression = Some(compression);
        self
    }

    pub fn horizontal_predictor(mut self, enable: bool) -> Self {
        self.horizontal_predictor = Some(enable);
        self
    }

    pub fn build(self) -> TiffOptions {
        let default = TiffOptions::default();
        TiffOptions {
            compression: self.compression.unwrap_or(default.compression),
            horizontal_predictor: self.horizontal_predictor.unwrap_or(default.horizontal_predictor),
        }
    }
}
