use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::config::ConfigError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    pub version: f32,
    pub image: ImageConfig,
    pub enhancement: EnhancementConfig,
    pub stress: StressConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageConfig {
    pub size: [u32; 2],
    #[serde(default)]
    pub resize_method: ResizeMethod,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResizeMethod {
    Nearest,
    #[default]
    Bilinear,
}

impl ResizeMethod {
    pub fn filter(self) -> image::imageops::FilterType {
        match self {
            ResizeMethod::Nearest => image::imageops::FilterType::Nearest,
            ResizeMethod::Bilinear => image::imageops::FilterType::Triangle,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnhancementConfig {
    pub clip_limit: f32,
    pub tile_grid: [u32; 2],
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StressConfig {
    pub threshold_ratio: f32,
    pub closing_kernel: u32,
    pub overlay_color: [u8; 3],
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            version: 1.0,
            image: ImageConfig {
                size: [512, 512],
                resize_method: ResizeMethod::Bilinear,
            },
            enhancement: EnhancementConfig {
                clip_limit: 3.0,
                tile_grid: [8, 8],
            },
            stress: StressConfig {
                threshold_ratio: 0.65,
                closing_kernel: 5,
                overlay_color: [255, 0, 0],
            },
        }
    }
}

impl AnalysisConfig {
    /// Loads the pipeline parameters from a YAML file, or the built-in defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => {
                let config_str = std::fs::read_to_string(path).map_err(|e| {
                    ConfigError::Invalid(format!("cannot read {}: {}", path.display(), e))
                })?;
                Self::from_yaml(&config_str)?
            }
            None => Self::default(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml(config_str: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(config_str).map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let [width, height] = self.image.size;
        if width == 0 || height == 0 {
            return Err(ConfigError::Invalid("image.size must be non-zero".into()));
        }
        let [tiles_x, tiles_y] = self.enhancement.tile_grid;
        if tiles_x == 0 || tiles_y == 0 {
            return Err(ConfigError::Invalid("enhancement.tile_grid must be non-zero".into()));
        }
        if self.enhancement.clip_limit <= 0.0 {
            return Err(ConfigError::Invalid("enhancement.clip_limit must be positive".into()));
        }
        let ratio = self.stress.threshold_ratio;
        if !(ratio > 0.0 && ratio <= 1.0) {
            return Err(ConfigError::Invalid(format!(
                "stress.threshold_ratio must be in (0, 1], got {}",
                ratio
            )));
        }
        if self.stress.closing_kernel == 0 || self.stress.closing_kernel % 2 == 0 {
            return Err(ConfigError::Invalid("stress.closing_kernel must be odd".into()));
        }
        Ok(())
    }
}

impl StressConfig {
    /// Intensity above which a sample counts as stressed, truncated like an integer cast.
    pub fn threshold(&self) -> u8 {
        (self.threshold_ratio * 255.0) as u8
    }
}
