use image::{GrayImage, Rgb, RgbImage};

use super::config::StressConfig;
use super::mask::DiseaseMask;

pub struct StressDetection {
    pub stress_percentage: f64,
    pub mask: DiseaseMask,
}

/// Thresholds the enhanced image, closes the mask and reports the flagged share
/// of the canvas as a percentage rounded to two decimals.
pub fn detect_stress(enhanced: &GrayImage, config: &StressConfig) -> StressDetection {
    let mask = DiseaseMask::threshold(enhanced, config.threshold()).close(config.closing_kernel as usize);

    let total = mask.pixel_count();
    let stress_percentage = if total == 0 {
        0.0
    } else {
        round2(mask.flagged_count() as f64 / total as f64 * 100.0)
    };

    StressDetection {
        stress_percentage,
        mask,
    }
}

/// Paints flagged pixels of `mask` onto a copy of the thermal image.
pub fn overlay_stress(thermal: &RgbImage, mask: &DiseaseMask, color: [u8; 3]) -> RgbImage {
    let mut overlay = thermal.clone();
    for (x, y, pixel) in overlay.enumerate_pixels_mut() {
        if mask.is_flagged(y as usize, x as usize) {
            *pixel = Rgb(color);
        }
    }
    overlay
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
