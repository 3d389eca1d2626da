//! Mirror sphere location
//!
//! Per-frame circle detection plus a short temporal filter that smooths jitter
//! and re-locks immediately when the sphere really moves.

mod detector;
mod locator;
pub mod types;


pub use detector::SphereDetector;
pub use locator::SphereLocator;
pub use types::{DetectorConfig, LocatorConfig, LocatorConfigBuilder, SphereObservation, TrackingState};
