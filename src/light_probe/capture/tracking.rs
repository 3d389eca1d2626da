use std::time::Duration;

use image::RgbImage;
use tracing::{debug, info, instrument, warn};

use crate::light_probe::capture::shared_frame::{FrameSnapshot, SharedFrame, StopFlag};
use crate::light_probe::common::error::Result;
use crate::light_probe::projection::{ProbeStatus, SphereProjector};

/// Live panorama loop over a [`SharedFrame`].
#[derive(Debug)]
pub struct ProbeTracker {
    projector: SphereProjector,
    fov_degrees: f32,
    poll_interval: Duration,
}

impl ProbeTracker {
    pub fn new(projector: SphereProjector, fov_degrees: f32) -> Self {
        Self {
            projector,
            fov_degrees,
            poll_interval: Duration::from_millis(100),
        }
    }

    /// Longest wait for a new frame before checking the stop flag again.
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn projector(&self) -> &SphereProjector {
        &self.projector
    }

    pub fn into_projector(self) -> SphereProjector {
        self.projector
    }

    /// Converts one snapshot.
    ///
    /// With the sphere fixed and a probe in place only the crop is refreshed,
    /// otherwise the sphere is located again.
    pub fn process(&mut self, snapshot: &FrameSnapshot) -> Result<RgbImage> {
        if snapshot.fix_sphere && self.projector.status() == ProbeStatus::Ready {
            self.projector.refresh_probe(&snapshot.frame)?;
        } else {
            self.projector.set_probe(&snapshot.frame, self.fov_degrees, None)?;
        }
        Ok(self.projector.converted_probe())
    }

    /// Feeds every new frame of `shared` to `sink` as a panorama until `stop`
    /// is raised.
    ///
    /// A frame that fails to convert is logged and skipped. Returns the number
    /// of panoramas delivered.
    #[instrument(skip_all, fields(fov = self.fov_degrees))]
    pub fn run<F>(&mut self, shared: &SharedFrame, stop: &StopFlag, mut sink: F) -> usize
    where
        F: FnMut(RgbImage),
    {
        let mut last_sequence = 0;
        let mut delivered = 0;

        while !stop.is_stopped() {
            let Some(snapshot) = shared.snapshot_after(last_sequence, self.poll_interval) else {
                continue;
            };
            if snapshot.sequence > last_sequence + 1 {
                debug!(skipped = snapshot.sequence - last_sequence - 1, "Frames overwritten before processing");
            }
            last_sequence = snapshot.sequence;

            match self.process(&snapshot) {
                Ok(panorama) => {
                    sink(panorama);
                    delivered += 1;
                }
                Err(e) => warn!(sequence = snapshot.sequence, "Frame skipped: {e}"),
            }
        }

        info!(delivered, "Tracking stopped");
        delivered
    }
}
