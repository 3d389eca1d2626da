//! Exposure fusion module
//!
//! Merges a batch of differently exposed 8-bit captures of the same scene
//! into a single floating-point radiance image.

mod weighting;
mod engine;
pub mod types;

#[cfg(test)]
mod tests;

pub use weighting::RadianceWeighting;
pub use engine::ExposureFusionEngine;
pub use types::{Exposure, FusionConfig, FusionConfigBuilder, RadianceImage};
