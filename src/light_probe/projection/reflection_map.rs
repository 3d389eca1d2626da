use std::f32::consts::PI;

use rayon::prelude::*;
use tracing::{debug, instrument, warn};

use crate::light_probe::projection::geometry::{Direction, ReflectionSolver};
use crate::light_probe::projection::types::{Projection, SphereGeometry};

/// What the coordinates of a [`ReflectionMap`] currently hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapPhase {
    /// (yaw, pitch) per sphere pixel
    Directions,
    /// Panorama grid (column, row) per sphere pixel
    Forward,
    /// Sphere pixel (x, y) to sample per panorama grid cell
    Backward,
}

/// Square per-pixel map between the cropped sphere image and the panorama grid.
///
/// The grid has the side of the sphere crop. Each cell carries a coordinate
/// pair and a validity flag; the meaning of both depends on the [`MapPhase`].
/// Invalid cells are off-sphere or degenerate pixels in the first two phases
/// and holes in the last one.
#[derive(Debug, Clone)]
pub struct ReflectionMap {
    size: usize,
    coords: Vec<[f32; 2]>,
    valid: Vec<bool>,
    phase: MapPhase,
    degenerate: usize,
    filled: usize,
    holes: usize,
}

impl ReflectionMap {
    /// Runs every phase and returns the resampling map.
    #[instrument(skip(geometry))]
    pub fn build(size: usize, geometry: &SphereGeometry, diameter: f32, projection: Projection) -> Self {
        let mut map = Self::directions(size, geometry, diameter);
        map.project(projection);
        map.invert();
        map
    }

    /// Reflected direction of every pixel of a `size` x `size` sphere crop.
    pub fn directions(size: usize, geometry: &SphereGeometry, diameter: f32) -> Self {
        let solver = ReflectionSolver::new(geometry.camera_distance, diameter);
        let half = size as f32 / 2.0;
        let mm_per_pixel = diameter / size as f32;
        let distance = geometry.camera_distance;

        let mut coords = vec![[0.0f32; 2]; size * size];
        let mut valid = vec![false; size * size];

        let degenerate: usize = coords
            .par_chunks_mut(size.max(1))
            .zip(valid.par_chunks_mut(size.max(1)))
            .enumerate()
            .map(|(y, (row, row_valid))| {
                let dy = y as f32 + 0.5 - half;
                let mut degenerate = 0;
                for (x, (cell, ok)) in row.iter_mut().zip(row_valid.iter_mut()).enumerate() {
                    let dx = x as f32 + 0.5 - half;
                    if dx.hypot(dy) > half {
                        let Direction { yaw, pitch } = Direction::BEHIND;
                        *cell = [yaw, pitch];
                        continue;
                    }

                    let alpha = (dx * mm_per_pixel / distance).atan();
                    let beta = -(dy * mm_per_pixel / distance).atan();
                    match solver.direction_from_angles(alpha, beta) {
                        Some(d) => {
                            *cell = [d.yaw, d.pitch];
                            *ok = true;
                        }
                        None => degenerate += 1,
                    }
                }
                degenerate
            })
            .sum();

        if degenerate > 0 {
            warn!(degenerate, "Sphere pixels missed by their camera ray, left empty");
        }

        Self {
            size,
            coords,
            valid,
            phase: MapPhase::Directions,
            degenerate,
            filled: 0,
            holes: 0,
        }
    }

    /// Turns directions into panorama grid positions.
    pub fn project(&mut self, projection: Projection) {
        debug_assert_eq!(self.phase, MapPhase::Directions);
        let side = self.size as f32;

        match projection {
            Projection::Equirectangular => {
                let coeff = side / (2.0 * PI);
                for (cell, _) in self.coords.iter_mut().zip(&self.valid).filter(|(_, ok)| **ok) {
                    let [yaw, pitch] = *cell;
                    *cell = [(yaw + PI) * coeff, side / 2.0 - pitch * coeff];
                }
            }
        }

        self.phase = MapPhase::Forward;
    }

    /// Replaces the forward map by its inverse.
    ///
    /// Each sphere pixel is scattered to its panorama cell. Cells nobody
    /// landed on take the mean of their covered neighbours; what is still
    /// empty after that stays invalid and renders black.
    #[instrument(level = "debug", skip(self), fields(size = self.size))]
    pub fn invert(&mut self) {
        debug_assert_eq!(self.phase, MapPhase::Forward);
        let n = self.size;
        let mut back = vec![[0.0f32; 2]; n * n];
        let mut covered = vec![false; n * n];

        for (idx, (cell, ok)) in self.coords.iter().zip(&self.valid).enumerate() {
            if !*ok {
                continue;
            }
            let col = (cell[0].round() as isize).rem_euclid(n as isize) as usize;
            let row = cell[1].round() as isize;
            if row < 0 || row >= n as isize {
                continue;
            }
            let target = row as usize * n + col;
            back[target] = [(idx % n) as f32, (idx / n) as f32];
            covered[target] = true;
        }

        let (filled_cells, filled, holes) = fill_holes(&mut back, &covered, n);

        debug!(filled, holes, "Backward map built");
        self.coords = back;
        self.valid = filled_cells;
        self.filled = filled;
        self.holes = holes;
        self.phase = MapPhase::Backward;
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn phase(&self) -> MapPhase {
        self.phase
    }

    /// Coordinates at grid cell `(x, y)`, if valid.
    pub fn get(&self, x: usize, y: usize) -> Option<[f32; 2]> {
        let idx = y * self.size + x;
        (x < self.size && self.valid.get(idx).copied().unwrap_or(false)).then(|| self.coords[idx])
    }

    /// Sphere pixels whose ray missed the sphere despite the silhouette test.
    pub fn degenerate_pixels(&self) -> usize {
        self.degenerate
    }

    /// Cells recovered by neighbour averaging during inversion.
    pub fn filled_cells(&self) -> usize {
        self.filled
    }

    /// Grid cells without a source pixel, including the unreachable bands.
    pub fn holes(&self) -> usize {
        self.holes
    }
}

/// One pass of 8-neighbour averaging over the uncovered cells of an `n` x `n`
/// grid. Columns wrap around, rows do not.
///
/// Returns the new coverage mask with the filled and remaining hole counts.
pub(crate) fn fill_holes(back: &mut [[f32; 2]], covered: &[bool], n: usize) -> (Vec<bool>, usize, usize) {
    let mut resolved = covered.to_vec();
    let mut filled = 0;
    let mut holes = 0;
    for row in 0..n {
        for col in 0..n {
            let idx = row * n + col;
            if covered[idx] {
                continue;
            }
            let mut sum = [0.0f32; 2];
            let mut count = 0;
            for nr in row.saturating_sub(1)..=(row + 1).min(n - 1) {
                for step in [n - 1, 0, 1] {
                    let nidx = nr * n + (col + step) % n;
                    if nidx != idx && covered[nidx] {
                        sum[0] += back[nidx][0];
                        sum[1] += back[nidx][1];
                        count += 1;
                    }
                }
            }
            if count > 0 {
                back[idx] = [sum[0] / count as f32, sum[1] / count as f32];
                resolved[idx] = true;
                filled += 1;
            } else {
                holes += 1;
            }
        }
    }
    (resolved, filled, holes)
}
