pub mod config;
pub mod enhance;
pub mod error;
pub mod mask;
pub mod palette;
pub mod stats;
pub mod stress;
pub mod thermal;

use image::DynamicImage;
use shared::{AnalysisImages, StatsReport, ThermalSummary};

use self::config::AnalysisConfig;
use self::error::AnalysisError;
use self::palette::Palette;

#[derive(Debug)]
pub struct PlantAnalysis {
    pub report: StatsReport,
    pub thermal_summary: ThermalSummary,
    pub images: AnalysisImages,
}

/// Holds the pipeline parameters and the precomputed palette; shared read-only across workers.
pub struct Analyzer {
    config: AnalysisConfig,
    palette: Palette,
}

impl Analyzer {
    pub fn new(config: AnalysisConfig) -> Self {
        Self {
            config,
            palette: Palette::inferno(),
        }
    }

    /// Runs the full image pipeline. The stress mask doubles as the disease mask.
    pub fn analyze(&self, image_data: &[u8]) -> Result<PlantAnalysis, AnalysisError> {
        let frames = thermal::rgb_to_pseudo_thermal(image_data, &self.config, &self.palette)?;
        let detection = stress::detect_stress(&frames.enhanced, &self.config.stress);

        let report =
            stats::generate_plant_stats(&frames.enhanced, &detection.mask, detection.stress_percentage)?;
        let thermal_summary = stats::summarize_thermal(&frames.enhanced, detection.stress_percentage);

        let overlay =
            stress::overlay_stress(&frames.thermal, &detection.mask, self.config.stress.overlay_color);
        let images = AnalysisImages {
            enhanced: thermal::encode_png_base64(&DynamicImage::ImageLuma8(frames.enhanced))?,
            thermal: thermal::encode_png_base64(&DynamicImage::ImageRgb8(frames.thermal))?,
            stress_mask: thermal::encode_png_base64(&DynamicImage::ImageLuma8(
                detection.mask.to_image(),
            ))?,
            stress_overlay: thermal::encode_png_base64(&DynamicImage::ImageRgb8(overlay))?,
        };

        Ok(PlantAnalysis {
            report,
            thermal_summary,
            images,
        })
    }
}
