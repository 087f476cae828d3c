//! Contrast normalization.
//!
//! Two flavors of linear contrast stretching are used by the pipeline:
//!
//! - [`normalize_percentile`]: the bounds are percentiles of the buffer itself,
//!   which makes the stretch robust to illumination changes between tiles.
//! - [`rescale_band`]: the bounds are fixed intensities calibrated per stain.
//!
//! Percentiles use linear interpolation between the two closest ranks, the
//! same definition as `numpy.percentile`. Because samples are 8-bit, they are
//! computed from a 256-bin histogram in a single pass.

use image::GrayImage;

use crate::error::SegmentError;

/// Number of distinct 8-bit sample values.
const BINS: usize = 256;

/// Compute the 256-bin histogram of a buffer.
pub fn histogram(image: &GrayImage) -> [u64; BINS] {
    let mut hist = [0u64; BINS];
    for &v in image.as_raw() {
        hist[v as usize] += 1;
    }
    hist
}

/// Return the sample value at 0-based `rank` in sorted order.
fn value_at_rank(hist: &[u64; BINS], rank: u64) -> u8 {
    let mut seen = 0u64;
    for (value, &count) in hist.iter().enumerate() {
        seen += count;
        if seen > rank {
            return value as u8;
        }
    }
    u8::MAX
}

/// Compute the `p`-th percentile (0-100) of a buffer.
///
/// # Errors
///
/// Returns `InvalidParameter` if the buffer is empty or `p` is outside 0-100.
pub fn percentile(image: &GrayImage, p: f64) -> Result<f64, SegmentError> {
    let total = image.as_raw().len() as u64;
    if total == 0 {
        return Err(SegmentError::InvalidParameter(
            "percentile of an empty buffer".to_string(),
        ));
    }
    if !(0.0..=100.0).contains(&p) {
        return Err(SegmentError::InvalidParameter(format!(
            "percentile {} outside 0..=100",
            p
        )));
    }

    let hist = histogram(image);
    let position = p / 100.0 * (total - 1) as f64;
    let lower_rank = position.floor() as u64;
    let upper_rank = (lower_rank + 1).min(total - 1);
    let fraction = position - lower_rank as f64;

    let lower = value_at_rank(&hist, lower_rank) as f64;
    let upper = value_at_rank(&hist, upper_rank) as f64;
    Ok(lower + fraction * (upper - lower))
}

/// Percentile-based linear contrast stretch.
///
/// Computes `lower = percentile(p_low)` and `upper = percentile(p_high)`, then
/// maps each sample to `clip((v - lower) / (upper - lower) * 255, 0, 255)`,
/// truncated to 8 bits.
///
/// # Errors
///
/// - `InvalidParameter` if `p_low >= p_high` or either is outside 0-100
/// - `DegenerateRange` if both percentiles are equal (no dynamic range)
pub fn normalize_percentile(
    image: &GrayImage,
    p_low: f64,
    p_high: f64,
) -> Result<GrayImage, SegmentError> {
    if p_low >= p_high {
        return Err(SegmentError::InvalidParameter(format!(
            "percentile bounds must satisfy low < high, got {} and {}",
            p_low, p_high
        )));
    }

    let lower = percentile(image, p_low)?;
    let upper = percentile(image, p_high)?;
    if upper <= lower {
        return Err(SegmentError::DegenerateRange { lower, upper });
    }

    Ok(apply_stretch(image, lower, upper))
}

/// Clip a buffer to the `[lower, upper]` band and stretch the band to 0-255.
///
/// # Errors
///
/// Returns `InvalidParameter` if `lower >= upper`.
pub fn rescale_band(image: &GrayImage, lower: u8, upper: u8) -> Result<GrayImage, SegmentError> {
    if lower >= upper {
        return Err(SegmentError::InvalidParameter(format!(
            "band bounds must satisfy lower < upper, got {} and {}",
            lower, upper
        )));
    }
    Ok(apply_stretch(image, lower as f64, upper as f64))
}

/// Apply `clip((v - lower) / (upper - lower) * 255, 0, 255)` through a lookup table.
fn apply_stretch(image: &GrayImage, lower: f64, upper: f64) -> GrayImage {
    let range = upper - lower;
    let lut: Vec<u8> = (0..BINS)
        .map(|v| ((v as f64 - lower) / range * 255.0).clamp(0.0, 255.0) as u8)
        .collect();

    let mut out = image.clone();
    for sample in out.iter_mut() {
        *sample = lut[*sample as usize];
    }
    out
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn ramp() -> GrayImage {
        // 0, 1, ..., 100
        GrayImage::from_fn(101, 1, |x, _| Luma([x as u8]))
    }

    #[test]
    fn test_percentile_exact_ranks() {
        let img = ramp();
        assert_eq!(percentile(&img, 0.0).unwrap(), 0.0);
        assert_eq!(percentile(&img, 50.0).unwrap(), 50.0);
        assert_eq!(percentile(&img, 100.0).unwrap(), 100.0);
    }

    #[test]
    fn test_percentile_interpolates() {
        let img = GrayImage::from_raw(4, 1, vec![10, 20, 30, 40]).unwrap();
        // position = 0.5 * 3 = 1.5 -> halfway between 20 and 30
        assert!((percentile(&img, 50.0).unwrap() - 25.0).abs() < 1e-9);
        // position = 0.995 * 3 = 2.985
        assert!((percentile(&img, 99.5).unwrap() - 39.85).abs() < 1e-9);
    }

    #[test]
    fn test_percentile_invalid() {
        let img = ramp();
        assert!(percentile(&img, -1.0).is_err());
        assert!(percentile(&img, 100.5).is_err());
        assert!(percentile(&GrayImage::new(0, 0), 50.0).is_err());
    }

    #[test]
    fn test_normalize_percentile_stretches() {
        let img = ramp();
        let out = normalize_percentile(&img, 0.0, 100.0).unwrap();
        assert_eq!(out.get_pixel(0, 0)[0], 0);
        assert_eq!(out.get_pixel(50, 0)[0], 127);
        assert_eq!(out.get_pixel(100, 0)[0], 255);
    }

    #[test]
    fn test_normalize_percentile_clips() {
        let img = ramp();
        let out = normalize_percentile(&img, 10.0, 90.0).unwrap();
        assert_eq!(out.get_pixel(5, 0)[0], 0);
        assert_eq!(out.get_pixel(95, 0)[0], 255);
    }

    #[test]
    fn test_normalize_percentile_degenerate() {
        let img = GrayImage::from_pixel(10, 10, Luma([77]));
        match normalize_percentile(&img, 1.0, 99.0) {
            Err(SegmentError::DegenerateRange { lower, upper }) => {
                assert_eq!(lower, 77.0);
                assert_eq!(upper, 77.0);
            }
            other => panic!("Expected DegenerateRange, got {:?}", other),
        }
    }

    #[test]
    fn test_normalize_percentile_bad_bounds() {
        let img = ramp();
        assert!(matches!(
            normalize_percentile(&img, 90.0, 10.0),
            Err(SegmentError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_rescale_band() {
        let img = GrayImage::from_raw(4, 1, vec![0, 92, 156, 250]).unwrap();
        let out = rescale_band(&img, 92, 221).unwrap();
        assert_eq!(out.as_raw(), &vec![0, 0, 126, 255]);
        assert!(rescale_band(&img, 10, 10).is_err());
    }

    #[test]
    fn test_rescale_band_every_band() {
        let img = GrayImage::from_raw(256, 1, (0..=255).collect()).unwrap();
        for lower in 0..=254u8 {
            for upper in lower + 1..=255u8 {
                let out = rescale_band(&img, lower, upper).unwrap();
                for v in 0..=255u8 {
                    let expected = ((v as f64 - lower as f64) / (upper as f64 - lower as f64) * 255.0)
                        .clamp(0.0, 255.0) as u8;
                    assert_eq!(
                        out.get_pixel(v as u32, 0)[0],
                        expected,
                        "band ({}, {}) at {}",
                        lower,
                        upper,
                        v
                    );
                }
                assert_eq!(out.get_pixel(upper as u32, 0)[0], 255);
            }
        }
    }
}
