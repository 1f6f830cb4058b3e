use image::GrayImage;
use shared::{
    CareUrgency, DiseaseStage, ImageAnalysis, LifeExpectancyBand, PlantHealth, RecoveryPotential,
    StatsReport, StressLevel, ThermalSummary,
};

use super::error::AnalysisError;
use super::mask::DiseaseMask;
use super::stress::round2;

const INFECTED_WEIGHT: f64 = 0.6;
const STRESS_WEIGHT: f64 = 0.4;
const SURVIVABILITY_FLOOR: f64 = 0.2;

pub fn severity(infected_ratio: f64, stress_percentage: f64) -> f64 {
    infected_ratio * 100.0 * INFECTED_WEIGHT + stress_percentage * STRESS_WEIGHT
}

/// Derives the verified analytics for one image. Pure: identical inputs give identical reports.
pub fn generate_plant_stats(
    gray: &GrayImage,
    disease_mask: &DiseaseMask,
    stress_percentage: f64,
) -> Result<StatsReport, AnalysisError> {
    let (width, height) = gray.dimensions();
    let (width, height) = (width as usize, height as usize);
    if width == 0 || height == 0 {
        return Err(AnalysisError::EmptyImage);
    }

    let (mask_height, mask_width) = disease_mask.shape();
    if (mask_height, mask_width) != (height, width) {
        return Err(AnalysisError::ShapeMismatch {
            height,
            width,
            mask_height,
            mask_width,
        });
    }

    let total = (width * height) as f64;
    let infected_ratio = disease_mask.flagged_count() as f64 / total;

    let severity = severity(infected_ratio, stress_percentage);
    let health_score = (100.0 - severity).max(0.0);
    let survivability_score = round2((health_score / 100.0).max(SURVIVABILITY_FLOOR));

    let (mean_intensity, std_intensity) = mean_and_std(gray);

    Ok(StatsReport {
        image_analysis: ImageAnalysis {
            mean_intensity,
            std_intensity,
            entropy: histogram_entropy(gray),
            infected_area_percent: round2(infected_ratio * 100.0),
        },
        plant_health: PlantHealth {
            stress_percentage,
            disease_stage: DiseaseStage::from_severity(severity),
            health_score: round2(health_score),
            survivability_score,
            life_expectancy_band: LifeExpectancyBand::from_health_score(health_score),
            recovery_potential: RecoveryPotential::from_health_score(health_score),
            care_urgency: CareUrgency::from_health_score(health_score),
        },
    })
}

/// Quick intensity summary that accompanies the verified report.
pub fn summarize_thermal(gray: &GrayImage, stress_percentage: f64) -> ThermalSummary {
    let (mean_intensity, _) = mean_and_std(gray);
    let max_intensity = gray.pixels().map(|p| p[0]).max().unwrap_or(0);
    let min_intensity = gray.pixels().map(|p| p[0]).min().unwrap_or(0);
    ThermalSummary {
        mean_intensity,
        max_intensity,
        min_intensity,
        stress_percentage,
        stress_level: StressLevel::from_percentage(stress_percentage),
    }
}

// Population standard deviation.
fn mean_and_std(gray: &GrayImage) -> (f64, f64) {
    let n = (gray.width() as usize * gray.height() as usize) as f64;
    if n == 0.0 {
        return (0.0, 0.0);
    }
    let mean = gray.pixels().map(|p| p[0] as f64).sum::<f64>() / n;
    let variance = gray
        .pixels()
        .map(|p| {
            let d = p[0] as f64 - mean;
            d * d
        })
        .sum::<f64>()
        / n;
    (mean, variance.sqrt())
}

/// Shannon entropy (nats) of the 256-bin intensity histogram with one pseudo-count per bin.
pub fn histogram_entropy(gray: &GrayImage) -> f64 {
    let mut counts = [1u64; 256];
    for pixel in gray.pixels() {
        counts[pixel[0] as usize] += 1;
    }
    let total = counts.iter().sum::<u64>() as f64;
    counts
        .iter()
        .map(|&c| {
            let p = c as f64 / total;
            -p * p.ln()
        })
        .sum()
}
