use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::{DynamicImage, GrayImage, ImageFormat, Luma, RgbImage};
use std::io::Cursor;

use super::config::AnalysisConfig;
use super::enhance::equalize_adaptive;
use super::error::AnalysisError;
use super::palette::Palette;

/// Output of the preprocessing stage: the contrast-enhanced grayscale canvas
/// and its false-colour rendering.
#[derive(Debug)]
pub struct ThermalFrames {
    pub enhanced: GrayImage,
    pub thermal: RgbImage,
}

pub fn decode_image(image_data: &[u8]) -> Result<DynamicImage, AnalysisError> {
    if image_data.is_empty() {
        return Err(AnalysisError::ImageDecode("no image data".into()));
    }
    image::load_from_memory(image_data).map_err(|e| AnalysisError::ImageDecode(e.to_string()))
}

/// Decode, resize to the configured canvas, convert to luma, enhance and colour-map.
pub fn rgb_to_pseudo_thermal(
    image_data: &[u8],
    config: &AnalysisConfig,
    palette: &Palette,
) -> Result<ThermalFrames, AnalysisError> {
    let decoded = decode_image(image_data)?;
    if decoded.width() == 0 || decoded.height() == 0 {
        return Err(AnalysisError::EmptyImage);
    }

    let [width, height] = config.image.size;
    let resized = image::imageops::resize(
        &decoded.to_rgb8(),
        width,
        height,
        config.image.resize_method.filter(),
    );

    let gray = to_luma(&resized);
    let enhanced = equalize_adaptive(&gray, &config.enhancement);
    let thermal = palette.apply(&enhanced);

    Ok(ThermalFrames { enhanced, thermal })
}

/// ITU-R BT.601 luma (0.299 R + 0.587 G + 0.114 B).
pub fn to_luma(rgb: &RgbImage) -> GrayImage {
    let (width, height) = rgb.dimensions();
    GrayImage::from_fn(width, height, |x, y| {
        let [r, g, b] = rgb.get_pixel(x, y).0;
        let luma = 0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32;
        Luma([luma.round().clamp(0.0, 255.0) as u8])
    })
}

pub fn encode_png_base64(image: &DynamicImage) -> Result<String, AnalysisError> {
    let mut buffer = Vec::new();
    image.write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)?;
    Ok(STANDARD.encode(buffer))
}
