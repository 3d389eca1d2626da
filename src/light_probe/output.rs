//! Panorama and radiance persistence
//!
//! Panoramas go out as 8-bit RGB TIFF, radiance images as Radiance RGBE.

mod hdr_writer;
mod tiff_writer;
mod writer;
pub mod types;


pub use hdr_writer::HdrRadianceWriter;
pub use tiff_writer::TiffPanoramaWriter;
pub use types::{TiffCompression, TiffOptions, TiffOptionsBuilder};
pub use writer::{PanoramaWriter, RadianceWriter, save_panorama, save_radiance};
