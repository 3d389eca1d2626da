//! Sphere distance estimation and mirror reflection.
//!
//! Coordinates: the sphere center is the origin, the camera sits on the
//! negative x axis looking toward +x, y points to the image right and z to
//! the image top.

use std::f64::consts::PI;

use crate::light_probe::projection::types::SphereGeometry;
use crate::light_probe::sphere::SphereObservation;

/// Environment direction seen in a sphere pixel.
///
/// `yaw` lies in (-pi, pi], zero pointing back at the camera. `pitch` lies in
/// [-pi/2, pi/2], positive upward.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Direction {
    pub yaw: f32,
    pub pitch: f32,
}

impl Direction {
    /// Marker for pixels outside the silhouette: straight behind the sphere.
    pub const BEHIND: Direction = Direction {
        yaw: std::f32::consts::PI,
        pitch: std::f32::consts::PI,
    };

    /// Unit vector in sphere coordinates.
    pub fn to_vector(self) -> [f32; 3] {
        let (sy, cy) = self.yaw.sin_cos();
        let (sp, cp) = self.pitch.sin_cos();
        [-cp * cy, cp * sy, sp]
    }
}

/// Angle between the rays through two horizontal image positions.
fn horizontal_span(left: f32, right: f32, half_width: f32, coeff: f32) -> f32 {
    let a = ((left - half_width) * coeff).atan();
    let b = ((right - half_width) * coeff).atan();
    (b - a).abs()
}

/// Places the sphere relative to the camera from its apparent size.
///
/// The silhouette of a sphere is smaller than its equator seen flat, and the
/// near face is closer than the center, so both the radius and the distance
/// get a first order correction. Good enough for normal lenses.
pub fn estimate_geometry(
    sphere: &SphereObservation,
    frame_width: u32,
    fov_radians: f32,
    diameter: f32,
) -> SphereGeometry {
    let half_width = frame_width as f32 / 2.0;
    let coeff = (fov_radians / 2.0).tan() / half_width;

    let alpha = horizontal_span(
        sphere.center_x - sphere.radius,
        sphere.center_x + sphere.radius,
        half_width,
        coeff,
    );

    let equatorial_radius = sphere.radius / (alpha / 2.0).cos();
    let correction = diameter / 2.0 * (alpha / 2.0).sin();

    let alpha_equator = horizontal_span(
        sphere.center_x - equatorial_radius,
        sphere.center_x + equatorial_radius,
        half_width,
        coeff,
    );

    let distance = diameter / (2.0 * (alpha_equator / 2.0).tan()) + correction;

    SphereGeometry {
        cropped_fov: alpha,
        camera_distance: if distance.is_finite() { distance.max(0.0) } else { 0.0 },
    }
}

fn dot(a: [f64; 3], b: [f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

fn cross(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

fn scale(a: [f64; 3], s: f64) -> [f64; 3] {
    [a[0] * s, a[1] * s, a[2] * s]
}

fn normalize(a: [f64; 3]) -> Option<[f64; 3]> {
    let n = dot(a, a).sqrt();
    (n > 1e-12).then(|| scale(a, 1.0 / n))
}

/// Traces camera rays onto the mirror sphere.
#[derive(Debug, Clone, Copy)]
pub struct ReflectionSolver {
    camera_distance: f64,
    radius: f64,
}

impl ReflectionSolver {
    pub fn new(camera_distance: f32, diameter: f32) -> Self {
        Self {
            camera_distance: f64::from(camera_distance),
            radius: f64::from(diameter) / 2.0,
        }
    }

    /// Direction reflected toward the camera along the ray with horizontal
    /// angle `alpha` and vertical angle `beta`.
    ///
    /// `None` when the ray misses the sphere.
    pub fn direction_from_angles(&self, alpha: f32, beta: f32) -> Option<Direction> {
        let c = self.camera_distance;
        let r = self.radius;
        let ta = f64::from(alpha).tan();
        let tb = f64::from(beta).tan();

        // |(-c, 0, 0) + t (1, ta, tb)|^2 = r^2
        let q = 1.0 + ta * ta + tb * tb;
        let discriminant = c * c - q * (c * c - r * r);
        if discriminant < 0.0 {
            return None;
        }
        let t = (c - discriminant.sqrt()) / q;

        let hit = [t - c, t * ta, t * tb];
        let incoming = normalize([1.0, ta, tb])?;

        // Orthonormal frame whose first axis is the surface normal
        let u = normalize(hit)?;
        let v = normalize([u[1], -u[0], 0.0]).unwrap_or([0.0, 1.0, 0.0]);
        let w = cross(u, v);

        let along_normal = -dot(incoming, u);
        let along_v = dot(incoming, v);
        let along_w = dot(incoming, w);

        let out = [
            along_normal * u[0] + along_v * v[0] + along_w * w[0],
            along_normal * u[1] + along_v * v[1] + along_w * w[1],
            along_normal * u[2] + along_v * v[2] + along_w * w[2],
        ];
        let out = normalize(out)?;

        let mut yaw = out[1].atan2(-out[0]);
        if yaw <= -PI {
            yaw += 2.0 * PI;
        }
        let pitch = out[2].clamp(-1.0, 1.0).asin();

        Some(Direction {
            yaw: yaw as f32,
            pitch: pitch as f32,
        })
    }
}
