//! Light probe processing
//!
//! Two independent engines live here: exposure fusion, which merges bracketed
//! LDR captures into one radiance image, and the chromed-sphere projector, which
//! turns a photograph of a mirror ball into an equirectangular panorama.
//! The capture and output modules are thin seams around them.

pub mod common;
pub mod fusion;
pub mod sphere;
pub mod projection;
pub mod capture;
pub mod output;

pub use common::{
    ProbeError,
    Result,
};

pub use fusion::{
    Exposure,
    ExposureFusionEngine,
    FusionConfig,
    FusionConfigBuilder,
    RadianceImage,
    RadianceWeighting,
};

pub use sphere::{
    DetectorConfig,
    LocatorConfig,
    LocatorConfigBuilder,
    SphereDetector,
    SphereLocator,
    SphereObservation,
    TrackingState,
};

pub use projection::{
    ProbeStatus,
    Projection,
    ProjectorConfig,
    ProjectorConfigBuilder,
    ReflectionMap,
    SphereGeometry,
    SphereProjector,
};

pub use capture::{
    BracketConfig,
    BracketConfigBuilder,
    BracketedCapture,
    ExposureSettings,
    FrameSource,
    FrameSnapshot,
    ProbeTracker,
    SharedFrame,
    StillFrameSource,
    StopFlag,
};

pub use output::{
    HdrRadianceWriter,
    PanoramaWriter,
    RadianceWriter,
    TiffCompression,
    TiffOptions,
    TiffOptionsBuilder,
    TiffPanoramaWriter,
    save_panorama,
    save_radiance,
};
