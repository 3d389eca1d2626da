//! Chromed sphere to panorama projection
//!
//! The sphere is modelled as a curved mirror seen from a finite distance.
//! Every pixel of the cropped sphere image is traced to the environment
//! direction it reflects, the directions are laid out in the target
//! projection, and the resulting forward map is inverted for resampling.

mod geometry;
mod reflection_map;
mod sampling;
mod projector;
pub mod types;


pub use geometry::{Direction, ReflectionSolver, estimate_geometry};
pub use reflection_map::{MapPhase, ReflectionMap};
pub use projector::SphereProjector;
pub use types::{ProbeStatus, Projection, ProjectorConfig, ProjectorConfigBuilder, SphereGeometry};
