use std::collections::VecDeque;

use image::RgbImage;
use tracing::{debug, instrument};

use crate::light_probe::sphere::detector::SphereDetector;
use crate::light_probe::sphere::types::{LocatorConfig, SphereObservation, TrackingState};

/// Per-axis mean and population standard deviation of the history.
#[derive(Debug, Clone, Copy, Default)]
struct Moments {
    mean: [f64; 3],
    sigma: [f64; 3],
}

fn components(obs: &SphereObservation) -> [f64; 3] {
    [f64::from(obs.center_x), f64::from(obs.center_y), f64::from(obs.radius)]
}

fn moments<'a>(observations: impl Iterator<Item = &'a SphereObservation>) -> Option<Moments> {
    let mut count = 0usize;
    let mut sum = [0.0f64; 3];
    let mut sum_sq = [0.0f64; 3];
    for obs in observations {
        count += 1;
        for (axis, v) in components(obs).into_iter().enumerate() {
            sum[axis] += v;
            sum_sq[axis] += v * v;
        }
    }
    if count == 0 {
        return None;
    }

    let n = count as f64;
    let mut m = Moments::default();
    for axis in 0..3 {
        m.mean[axis] = sum[axis] / n;
        m.sigma[axis] = (sum_sq[axis] / n - m.mean[axis] * m.mean[axis]).max(0.0).sqrt();
    }
    Some(m)
}

/// Detects the sphere and filters detections over a sliding window.
///
/// Small frame-to-frame jitter is averaged away. A jump larger than
/// `threshold` standard deviations is taken as a real move: the window is
/// reseeded with the new observation so tracking does not lag behind.
#[derive(Debug, Clone)]
pub struct SphereLocator {
    detector: SphereDetector,
    window_length: usize,
    threshold: f32,
    history: VecDeque<SphereObservation>,
}

impl Default for SphereLocator {
    fn default() -> Self {
        Self::new(LocatorConfig::default())
    }
}

impl SphereLocator {
    pub fn new(config: LocatorConfig) -> Self {
        Self {
            detector: SphereDetector::new(config.detector),
            window_length: config.window_length.max(1),
            threshold: config.threshold,
            history: VecDeque::with_capacity(config.window_length),
        }
    }

    pub fn state(&self) -> TrackingState {
        if self.history.is_empty() {
            TrackingState::Searching
        } else {
            TrackingState::Tracking
        }
    }

    pub fn history(&self) -> impl ExactSizeIterator<Item = &SphereObservation> {
        self.history.iter()
    }

    pub fn window_length(&self) -> usize {
        self.window_length
    }

    /// Forgets all past observations.
    pub fn reset(&mut self) {
        self.history.clear();
    }

    pub fn detect(&self, frame: &RgbImage) -> SphereObservation {
        self.detector.detect(frame)
    }

    /// Detects in `frame` and filters the result.
    pub fn locate(&mut self, frame: &RgbImage) -> SphereObservation {
        let observation = self.detect(frame);
        self.filter(observation)
    }

    #[instrument(level = "trace", skip(self))]
    pub fn filter(&mut self, observation: SphereObservation) -> SphereObservation {
        let detected = observation.is_detected();
        if detected {
            if self.history.len() == self.window_length {
                self.history.pop_front();
            }
            self.history.push_back(observation);
        }

        let Some(stats) = moments(self.history.iter()) else {
            return SphereObservation::none();
        };

        // Drop glitches farther than 2 sigma from the mean on any axis
        let before = self.history.len();
        self.history.retain(|obs| {
            components(obs)
                .into_iter()
                .zip(stats.mean)
                .zip(stats.sigma)
                .all(|((v, mean), sigma)| (v - mean).abs() <= 2.0 * sigma)
        });
        if self.history.len() < before {
            debug!(dropped = before - self.history.len(), "Pruned outlying observations");
        }

        let Some(pruned) = moments(self.history.iter()) else {
            return SphereObservation::none();
        };

        if detected && self.threshold > 0.0 {
            let [x, y, _] = components(&observation);
            let distance = (x - pruned.mean[0]).hypot(y - pruned.mean[1]);
            // Radius is left out: detection is not precise enough in radius
            let sigma_distance = stats.sigma[0].hypot(stats.sigma[1]);
            if distance > f64::from(self.threshold) * sigma_distance {
                debug!(distance, sigma_distance, "Sphere moved, restarting average");
                self.history.clear();
                self.history.push_back(observation);
                return observation;
            }
        }

        SphereObservation::new(
            pruned.mean[0] as f32,
            pruned.mean[1] as f32,
            pruned.mean[2] as f32,
        )
    }
}
