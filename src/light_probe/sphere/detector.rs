//! Gradient-voting circle detection.
//!
//! Every strong edge pixel votes along its gradient line at all radii in the
//! search range. Circle centers collect votes from the whole silhouette, so
//! accumulator peaks are center candidates. Each candidate then gets the
//! radius whose ring is best supported by radially oriented edges.

use image::{GrayImage, ImageBuffer, Luma, RgbImage};
use imageproc::{contrast, filter, gradients};
use tracing::{debug, instrument, trace};

use crate::light_probe::sphere::types::{DetectorConfig, SphereObservation};

/// Gradient must point within this cosine of the radial direction to count as ring support.
const RADIAL_ALIGNMENT: f32 = 0.9;

/// Radial profile bins weaker than this fraction of the peak end the edge band.
const PROFILE_FLOOR: f32 = 0.25;
const MAX_PROFILE_HALF_WIDTH: usize = 6;

#[derive(Debug, Clone, Copy)]
struct Candidate {
    x: f32,
    y: f32,
    votes: f32,
}

/// Edge map of a prepared grayscale frame.
struct EdgeField {
    width: usize,
    height: usize,
    gx: Vec<f32>,
    gy: Vec<f32>,
    magnitude: Vec<f32>,
    threshold: f32,
}

impl EdgeField {
    fn from_gray(gray: &GrayImage, relative_threshold: f32) -> Option<Self> {
        let (w, h) = gray.dimensions();
        let gx: Vec<f32> = gradients::horizontal_scharr(gray).pixels().map(|p| f32::from(p[0])).collect();
        let gy: Vec<f32> = gradients::vertical_scharr(gray).pixels().map(|p| f32::from(p[0])).collect();
        let magnitude: Vec<f32> = gx.iter().zip(&gy).map(|(x, y)| x.hypot(*y)).collect();

        let max_mag = magnitude.iter().copied().fold(0.0f32, f32::max);
        if max_mag < 1e-6 {
            return None;
        }

        Some(Self {
            width: w as usize,
            height: h as usize,
            gx,
            gy,
            magnitude,
            threshold: relative_threshold * max_mag,
        })
    }

    /// Edge pixels above threshold as `(x, y, unit_gx, unit_gy, magnitude)`.
    fn edges(&self) -> impl Iterator<Item = (usize, usize, f32, f32, f32)> + '_ {
        (0..self.height).flat_map(move |y| {
            (0..self.width).filter_map(move |x| {
                let idx = y * self.width + x;
                let mag = self.magnitude[idx];
                (mag >= self.threshold).then(|| (x, y, self.gx[idx] / mag, self.gy[idx] / mag, mag))
            })
        })
    }
}

/// Finds the mirror sphere silhouette in a frame.
#[derive(Debug, Clone, Default)]
pub struct SphereDetector {
    config: DetectorConfig,
}

impl SphereDetector {
    pub fn new(config: DetectorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Strongest circle lying fully inside the frame, or a zero-radius observation.
    #[instrument(skip(self, frame), fields(width = frame.width(), height = frame.height()))]
    pub fn detect(&self, frame: &RgbImage) -> SphereObservation {
        let (width, height) = frame.dimensions();
        if width < 8 || height < 8 {
            return SphereObservation::none();
        }

        let (blurred, equalized) = self.prepare(frame);
        let Some(edges) = EdgeField::from_gray(&equalized, self.config.gradient_threshold) else {
            debug!("Frame has no edges");
            return SphereObservation::none();
        };
        // Equalization flattens the edge profile across the transition band,
        // so radii are measured on the merely blurred frame
        let Some(profile) = EdgeField::from_gray(&blurred, self.config.gradient_threshold) else {
            return SphereObservation::none();
        };

        let r_min = (self.config.min_radius_fraction * height as f32).max(2.0);
        let r_max = (self.config.max_radius_fraction * height as f32)
            .min(width.min(height) as f32 / 2.0);
        if r_max < r_min {
            return SphereObservation::none();
        }

        let candidates = self.vote(&edges, r_min, r_max);
        trace!(count = candidates.len(), "Center candidates");

        for candidate in candidates {
            let Some((radius, support)) = self.best_radius(&profile, &candidate, r_min, r_max) else {
                continue;
            };
            let observation = SphereObservation::new(candidate.x, candidate.y, radius);
            if !observation.fits_within(width, height) {
                trace!(?observation, "Candidate extends past the frame");
                continue;
            }
            debug!(?observation, votes = candidate.votes, support, "Sphere detected");
            return observation;
        }

        debug!("No circle qualified");
        SphereObservation::none()
    }

    /// Smoothed grayscale frame, and its histogram-equalized version.
    fn prepare(&self, frame: &RgbImage) -> (GrayImage, GrayImage) {
        let gray = image::imageops::grayscale(frame);
        let blurred = filter::gaussian_blur_f32(&gray, self.config.blur_sigma);
        let equalized = contrast::equalize_histogram(&blurred);
        (blurred, equalized)
    }

    fn vote(&self, edges: &EdgeField, r_min: f32, r_max: f32) -> Vec<Candidate> {
        let scale = self.config.accumulator_scale as f32;
        let acc_w = (edges.width as f32 / scale).ceil() as usize;
        let acc_h = (edges.height as f32 / scale).ceil() as usize;
        if acc_w < 3 || acc_h < 3 {
            return Vec::new();
        }
        let mut accum = vec![0.0f32; acc_w * acc_h];
        let x_limit = (acc_w - 1) as f32;
        let y_limit = (acc_h - 1) as f32;

        let mut radii = Vec::new();
        let mut r = r_min;
        while r <= r_max {
            radii.push(r / scale);
            r += scale;
        }

        for (x, y, dx, dy, _) in edges.edges() {
            let ax = x as f32 / scale;
            let ay = y as f32 / scale;
            for &r in &radii {
                for sign in [1.0f32, -1.0] {
                    let vx = ax + sign * dx * r;
                    let vy = ay + sign * dy * r;
                    if vx >= 0.0 && vx < x_limit && vy >= 0.0 && vy < y_limit {
                        deposit(&mut accum, acc_w, vx, vy);
                    }
                }
            }
        }

        let Some(accum) = ImageBuffer::<Luma<f32>, Vec<f32>>::from_raw(acc_w as u32, acc_h as u32, accum) else {
            return Vec::new();
        };
        let smoothed = filter::gaussian_blur_f32(&accum, 1.0);
        let values = smoothed.as_raw();

        let best = values.iter().copied().fold(0.0f32, f32::max);
        if best < 1e-6 {
            return Vec::new();
        }
        let floor = self.config.min_vote_fraction * best;

        // Local maxima over a 5x5 neighbourhood
        let mut peaks = Vec::new();
        for y in 2..acc_h.saturating_sub(2) {
            for x in 2..acc_w.saturating_sub(2) {
                let idx = y * acc_w + x;
                let v = values[idx];
                if v < floor {
                    continue;
                }
                let is_max = (-2isize..=2).all(|oy| {
                    (-2isize..=2).all(|ox| {
                        let n = idx.wrapping_add_signed(oy * acc_w as isize + ox);
                        n == idx || values[n] < v || (values[n] == v && n > idx)
                    })
                });
                if is_max {
                    peaks.push((x, y, v));
                }
            }
        }
        peaks.sort_by(|a, b| b.2.total_cmp(&a.2));
        peaks.truncate(self.config.max_candidates);

        peaks
            .into_iter()
            .map(|(x, y, votes)| {
                let (cx, cy) = refine_peak(values, acc_w, x, y);
                Candidate {
                    x: cx * scale,
                    y: cy * scale,
                    votes,
                }
            })
            .collect()
    }

    /// Radius of the strongest ring of radial edges around `candidate`.
    ///
    /// Rings are scored by gradient magnitude per unit of circumference, so a
    /// blurred silhouette edge peaks at its middle rather than its inner side.
    /// Returns the sub-pixel radius and the ring's edge support.
    fn best_radius(&self, edges: &EdgeField, candidate: &Candidate, r_min: f32, r_max: f32) -> Option<(f32, f32)> {
        let bins = r_max.ceil() as usize + 3;
        let mut counts = vec![0.0f32; bins];
        let mut strength = vec![0.0f32; bins];

        for (x, y, dx, dy, mag) in edges.edges() {
            let ox = x as f32 - candidate.x;
            let oy = y as f32 - candidate.y;
            let dist = ox.hypot(oy);
            if dist < 1.0 || dist > r_max + 2.0 {
                continue;
            }
            let alignment = (ox * dx + oy * dy) / dist;
            if alignment.abs() < RADIAL_ALIGNMENT {
                continue;
            }
            let bin = dist.round() as usize;
            if bin < bins {
                counts[bin] += 1.0;
                strength[bin] += mag;
            }
        }

        let lo = (r_min.floor() as usize).max(2);
        let hi = (r_max.floor() as usize).min(bins - 3);
        let mut best: Option<(usize, f32)> = None;
        for r in lo..=hi {
            let score = (strength[r - 1] + strength[r] + strength[r + 1]) / r as f32;
            if best.is_none_or(|(_, s)| score > s) {
                best = Some((r, score));
            }
        }

        let (r, _) = best?;
        let support = (counts[r - 1] + counts[r] + counts[r + 1]) / (std::f32::consts::TAU * r as f32);
        if support < self.config.min_edge_support {
            return None;
        }

        // Magnitude-weighted centroid over the contiguous band around the
        // peak; an off-center candidate smears the edge over several bins
        let density = |bin: usize| strength[bin] / bin as f32;
        let floor = PROFILE_FLOOR * density(r);
        let mut first = r;
        while first > 1 && r - first < MAX_PROFILE_HALF_WIDTH && density(first - 1) >= floor {
            first -= 1;
        }
        let mut last = r;
        while last + 1 < bins && last - r < MAX_PROFILE_HALF_WIDTH && density(last + 1) >= floor {
            last += 1;
        }
        let (sum, weighted) = (first..=last).fold((0.0f32, 0.0f32), |(sum, weighted), bin| {
            let w = density(bin);
            (sum + w, weighted + w * bin as f32)
        });
        let radius = if sum > 0.0 { weighted / sum } else { r as f32 };
        Some((radius, support))
    }
}

/// Spreads one vote over the four cells around `(x, y)`.
#[inline]
fn deposit(accum: &mut [f32], stride: usize, x: f32, y: f32) {
    let x0 = x as usize;
    let y0 = y as usize;
    let fx = x - x0 as f32;
    let fy = y - y0 as f32;
    let base = y0 * stride + x0;
    accum[base] += (1.0 - fx) * (1.0 - fy);
    accum[base + 1] += fx * (1.0 - fy);
    accum[base + stride] += (1.0 - fx) * fy;
    accum[base + stride + 1] += fx * fy;
}

/// Weighted centroid of the 3x3 window around an accumulator peak.
fn refine_peak(values: &[f32], stride: usize, x: usize, y: usize) -> (f32, f32) {
    let mut sum = 0.0f32;
    let mut sx = 0.0f32;
    let mut sy = 0.0f32;
    for yy in y - 1..=y + 1 {
        for xx in x - 1..=x + 1 {
            let v = values[yy * stride + xx];
            sum += v;
            sx += v * xx as f32;
            sy += v * yy as f32;
        }
    }
    if sum > 0.0 {
        (sx / sum, sy / sum)
    } else {
        (x as f32, y as f32)
    }
}
