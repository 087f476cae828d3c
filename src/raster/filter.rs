//! Color conversion and neighborhood filters.
//!
//! Conversions follow ITU-R BT.601 (full range), which is what JPEG/JFIF and
//! most imaging toolkits use for `RGB -> YCbCr`. Neighborhood filters use
//! explicit border modes so results do not depend on image size:
//!
//! - Gaussian blur mirrors the border without repeating the edge sample
//!   (`dcb|abcd|cba`)
//! - Median filtering replicates the edge sample (`aaa|abcd|ddd`)

use image::{GrayImage, Luma, Rgb, RgbImage};

use crate::error::SegmentError;

use super::{BACKGROUND, FOREGROUND};

/// Luma weights for R, G and B.
const LUMA_WEIGHTS: [f32; 3] = [0.299, 0.587, 0.114];

// =============================================================================
// Color Conversion
// =============================================================================

/// Convert a color image to grayscale using BT.601 luma weights.
pub fn to_grayscale(image: &RgbImage) -> GrayImage {
    let (width, height) = image.dimensions();
    GrayImage::from_fn(width, height, |x, y| {
        let Rgb([r, g, b]) = *image.get_pixel(x, y);
        let luma = LUMA_WEIGHTS[0] * r as f32 + LUMA_WEIGHTS[1] * g as f32 + LUMA_WEIGHTS[2] * b as f32;
        Luma([clamp_u8(luma)])
    })
}

/// Convert a color image to YCbCr.
///
/// The result is stored in an `RgbImage` whose channels are `(Y, Cb, Cr)`.
pub fn to_ycbcr(image: &RgbImage) -> RgbImage {
    let (width, height) = image.dimensions();
    RgbImage::from_fn(width, height, |x, y| {
        let Rgb([r, g, b]) = *image.get_pixel(x, y);
        let (r, g, b) = (r as f32, g as f32, b as f32);

        let luma = 0.299 * r + 0.587 * g + 0.114 * b;
        let cb = 128.0 - 0.168736 * r - 0.331264 * g + 0.5 * b;
        let cr = 128.0 + 0.5 * r - 0.418688 * g - 0.081312 * b;

        Rgb([clamp_u8(luma), clamp_u8(cb), clamp_u8(cr)])
    })
}

/// Extract one channel of a 3-channel image.
///
/// # Errors
///
/// Returns `InvalidParameter` if `index` is not 0, 1 or 2.
pub fn extract_channel(image: &RgbImage, index: usize) -> Result<GrayImage, SegmentError> {
    if index > 2 {
        return Err(SegmentError::InvalidParameter(format!(
            "channel index {} out of range 0..3",
            index
        )));
    }
    let (width, height) = image.dimensions();
    Ok(GrayImage::from_fn(width, height, |x, y| {
        Luma([image.get_pixel(x, y)[index]])
    }))
}

/// Invert every channel of a color image (`255 - v`).
pub fn invert_rgb(image: &RgbImage) -> RgbImage {
    let mut out = image.clone();
    for sample in out.iter_mut() {
        *sample = 255 - *sample;
    }
    out
}

// =============================================================================
// Point Operations
// =============================================================================

/// Invert a single-channel buffer (`255 - v`).
pub fn invert(image: &GrayImage) -> GrayImage {
    let mut out = image.clone();
    for sample in out.iter_mut() {
        *sample = 255 - *sample;
    }
    out
}

/// Binary threshold: samples `>= level` become foreground, all others background.
pub fn threshold(image: &GrayImage, level: u8) -> GrayImage {
    let mut out = image.clone();
    for sample in out.iter_mut() {
        *sample = if *sample >= level { FOREGROUND } else { BACKGROUND };
    }
    out
}

/// Stretch the buffer so its minimum maps to 0 and its maximum to 255.
///
/// A constant buffer maps to all zeros.
pub fn min_max_normalize(image: &GrayImage) -> GrayImage {
    let (min, max) = image
        .as_raw()
        .iter()
        .fold((u8::MAX, u8::MIN), |(lo, hi), &v| (lo.min(v), hi.max(v)));

    let mut out = image.clone();
    if max <= min {
        out.iter_mut().for_each(|v| *v = 0);
        return out;
    }

    let scale = 255.0 / (max - min) as f32;
    let lut: Vec<u8> = (0..=255u8)
        .map(|v| clamp_u8((v.saturating_sub(min)) as f32 * scale))
        .collect();
    for sample in out.iter_mut() {
        *sample = lut[*sample as usize];
    }
    out
}

// =============================================================================
// Gaussian Blur
// =============================================================================

/// Standard deviation derived from the kernel size when none is given.
pub fn auto_sigma(ksize: u32) -> f64 {
    0.3 * ((ksize as f64 - 1.0) * 0.5 - 1.0) + 0.8
}

/// Normalized 1-D Gaussian kernel of odd length `ksize`.
fn gaussian_kernel(ksize: u32, sigma: f64) -> Vec<f32> {
    let radius = (ksize / 2) as i64;
    let two_sigma_sq = 2.0 * sigma * sigma;
    let raw: Vec<f64> = (-radius..=radius)
        .map(|i| (-((i * i) as f64) / two_sigma_sq).exp())
        .collect();
    let sum: f64 = raw.iter().sum();
    raw.iter().map(|v| (v / sum) as f32).collect()
}

/// Reflect an index into `0..len` without repeating the edge sample.
fn reflect_101(index: i64, len: i64) -> usize {
    if len == 1 {
        return 0;
    }
    let period = 2 * (len - 1);
    let mut i = index.rem_euclid(period);
    if i >= len {
        i = period - i;
    }
    i as usize
}

/// Separable Gaussian blur.
///
/// `sigma <= 0` derives the standard deviation from `ksize` (see [`auto_sigma`]).
///
/// # Errors
///
/// Returns `InvalidParameter` if `ksize` is even or zero.
pub fn gaussian_blur(image: &GrayImage, ksize: u32, sigma: f64) -> Result<GrayImage, SegmentError> {
    if ksize == 0 || ksize % 2 == 0 {
        return Err(SegmentError::InvalidParameter(format!(
            "Gaussian kernel size must be odd, got {}",
            ksize
        )));
    }
    let sigma = if sigma > 0.0 { sigma } else { auto_sigma(ksize) };
    let kernel = gaussian_kernel(ksize, sigma);
    let radius = (ksize / 2) as i64;

    let (width, height) = image.dimensions();
    let (w, h) = (width as i64, height as i64);
    let src = image.as_raw();

    // Horizontal pass into a float buffer
    let mut horizontal = vec![0f32; src.len()];
    for y in 0..h {
        let row = (y * w) as usize;
        for x in 0..w {
            let mut acc = 0f32;
            for (k, weight) in kernel.iter().enumerate() {
                let sx = reflect_101(x + k as i64 - radius, w);
                acc += weight * src[row + sx] as f32;
            }
            horizontal[row + x as usize] = acc;
        }
    }

    // Vertical pass
    let mut out = GrayImage::new(width, height);
    for y in 0..h {
        for x in 0..w {
            let mut acc = 0f32;
            for (k, weight) in kernel.iter().enumerate() {
                let sy = reflect_101(y + k as i64 - radius, h);
                acc += weight * horizontal[sy * w as usize + x as usize];
            }
            out.put_pixel(x as u32, y as u32, Luma([clamp_u8(acc)]));
        }
    }

    Ok(out)
}

// =============================================================================
// Median Filter
// =============================================================================

/// Median filter over a square `ksize x ksize` window.
///
/// # Errors
///
/// Returns `InvalidParameter` if `ksize` is even or zero.
pub fn median_filter(image: &GrayImage, ksize: u32) -> Result<GrayImage, SegmentError> {
    if ksize == 0 || ksize % 2 == 0 {
        return Err(SegmentError::InvalidParameter(format!(
            "median kernel size must be odd, got {}",
            ksize
        )));
    }
    let radius = (ksize / 2) as i64;
    let (width, height) = image.dimensions();
    let (w, h) = (width as i64, height as i64);

    let mut window = Vec::with_capacity((ksize * ksize) as usize);
    let mut out = GrayImage::new(width, height);
    for y in 0..h {
        for x in 0..w {
            window.clear();
            for dy in -radius..=radius {
                let sy = (y + dy).clamp(0, h - 1) as u32;
                for dx in -radius..=radius {
                    let sx = (x + dx).clamp(0, w - 1) as u32;
                    window.push(image.get_pixel(sx, sy)[0]);
                }
            }
            let mid = window.len() / 2;
            let (_, median, _) = window.select_nth_unstable(mid);
            out.put_pixel(x as u32, y as u32, Luma([*median]));
        }
    }
    Ok(out)
}

#[inline]
fn clamp_u8(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

// =============================================================================
// Tests
// =============================================================================
