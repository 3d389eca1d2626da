use image::{Rgb, Rgb32FImage, RgbImage};

use crate::light_probe::projection::reflection_map::ReflectionMap;

/// Bilinear sample of `src` at `(x, y)`. Pixels outside the image count as black.
fn sample_bilinear(src: &RgbImage, x: f32, y: f32) -> [f32; 3] {
    let (w, h) = (src.width() as i64, src.height() as i64);
    let x0 = x.floor();
    let y0 = y.floor();
    let a = x - x0;
    let b = y - y0;
    let (x0, y0) = (x0 as i64, y0 as i64);

    let texel = |px: i64, py: i64| -> [f32; 3] {
        if px < 0 || py < 0 || px >= w || py >= h {
            return [0.0; 3];
        }
        let Rgb(p) = *src.get_pixel(px as u32, py as u32);
        [f32::from(p[0]), f32::from(p[1]), f32::from(p[2])]
    };

    let p00 = texel(x0, y0);
    let p10 = texel(x0 + 1, y0);
    let p01 = texel(x0, y0 + 1);
    let p11 = texel(x0 + 1, y0 + 1);

    let mut out = [0.0f32; 3];
    for c in 0..3 {
        out[c] = p00[c] * (1.0 - a) * (1.0 - b)
            + p10[c] * a * (1.0 - b)
            + p01[c] * (1.0 - a) * b
            + p11[c] * a * b;
    }
    out
}

/// Resamples rows `first_row..first_row + rows` of the map's grid from `src`.
///
/// Samples are normalized to [0, 1], the range `image` filters keep intact.
/// Cells without a source coordinate come out black.
pub(crate) fn remap_rows(src: &RgbImage, map: &ReflectionMap, first_row: usize, rows: usize) -> Rgb32FImage {
    let width = map.size();
    Rgb32FImage::from_fn(width as u32, rows as u32, |x, y| {
        match map.get(x as usize, first_row + y as usize) {
            Some([sx, sy]) => Rgb(sample_bilinear(src, sx, sy).map(|v| v / 255.0)),
            None => Rgb([0.0; 3]),
        }
    })
}

/// Quantizes normalized samples to 8 bits after dividing by `reflectance`.
pub(crate) fn to_rgb8(image: &Rgb32FImage, reflectance: f32) -> RgbImage {
    let gain = 255.0 / reflectance;
    RgbImage::from_fn(image.width(), image.height(), |x, y| {
        let Rgb(p) = *image.get_pixel(x, y);
        Rgb(p.map(|v| (v * gain).round().clamp(0.0, 255.0) as u8))
    })
}
