use tracing::{debug, info, instrument};

use crate::light_probe::capture::shared_frame::SharedFrame;
use crate::light_probe::capture::source::FrameSource;
use crate::light_probe::capture::types::BracketConfig;
use crate::light_probe::common::error::Result;
use crate::light_probe::fusion::{ExposureFusionEngine, RadianceImage};

/// Captures an exposure bracket and fuses it.
#[derive(Debug, Clone, Default)]
pub struct BracketedCapture {
    config: BracketConfig,
}

impl BracketedCapture {
    pub fn new(config: BracketConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &BracketConfig {
        &self.config
    }

    /// Runs the whole bracket through `engine`.
    ///
    /// Every kept capture is published to `shared` along with its exposure
    /// value. The slot's HDR flag is raised for the duration of the run,
    /// failed runs included. The engine starts from an empty batch.
    #[instrument(skip_all, fields(exposures = self.config.exposure_count, stop_step = self.config.stop_step))]
    pub fn run<S: FrameSource + ?Sized>(
        &self,
        source: &mut S,
        engine: &mut ExposureFusionEngine,
        shared: &SharedFrame,
    ) -> Result<RadianceImage> {
        self.config.validate()?;
        engine.clear();
        shared.set_hdr_in_progress(true);
        let result = self.capture_and_fuse(source, engine, shared);
        shared.set_hdr_in_progress(false);
        if result.is_err() {
            engine.clear();
        }
        result
    }

    fn capture_and_fuse<S: FrameSource + ?Sized>(
        &self,
        source: &mut S,
        engine: &mut ExposureFusionEngine,
        shared: &SharedFrame,
    ) -> Result<RadianceImage> {
        for index in 0..self.config.exposure_count {
            let settings = self.config.settings_at(index);
            let ev = settings.ev();

            for _ in 0..self.config.flush_frames {
                source.capture(&settings)?;
            }
            let frame = source.capture(&settings)?;

            debug!(index, shutter_speed = settings.shutter_speed, ev, "Exposure captured");
            engine.add_exposure(frame.clone(), ev)?;
            shared.set_exposure_value(ev);
            shared.publish(frame);
        }

        let radiance = engine.compute_radiance()?;
        info!(
            width = radiance.width(),
            height = radiance.height(),
            unreliable = radiance.unreliable_samples(),
            "Bracket fused"
        );
        Ok(radiance)
    }
}
