//! Frame acquisition seams
//!
//! The camera driver lives outside this crate. What is here drives it through
//! [`FrameSource`]: bracketed captures for exposure fusion, and a tracking
//! loop that turns the live frame stream into panoramas. Both loops meet in a
//! [`SharedFrame`] slot.

mod bracketing;
mod shared_frame;
mod source;
mod tracking;
pub mod types;

#[cfg(test)]
mod tests;

pub use bracketing::BracketedCapture;
pub use shared_frame::{FrameSnapshot, SharedFrame, StopFlag};
pub use source::{FrameSource, StillFrameSource};
pub use tracking::ProbeTracker;
pub use types::{BracketConfig, BracketConfigBuilder, ExposureSettings};
