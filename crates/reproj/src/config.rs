//! Configuration for raster reprojection.

use reproj_common::{ReprojError, ReprojResult};
use serde::{Deserialize, Serialize};

/// Default maximum mesh error, in source pixels.
pub const DEFAULT_ERROR_THRESHOLD: f64 = 0.5;

/// Configuration for raster reprojection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReprojConfig {
    /// Reproject rasters whose projection differs from the view's.
    /// When disabled, images are always served in the source projection.
    pub enabled: bool,

    /// Maximum error of the triangle mesh, in source pixels.
    pub error_threshold: f64,

    /// Border pixels dropped from each side of a source tile when stitching.
    pub gutter: u32,

    /// Force bilinear (`true`) or nearest (`false`) resampling.
    /// `None` uses the source's own setting.
    pub interpolate: Option<bool>,
}

impl Default for ReprojConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            error_threshold: DEFAULT_ERROR_THRESHOLD,
            gutter: 0,
            interpolate: None,
        }
    }
}

impl ReprojConfig {
    /// Load configuration from environment variables.
    ///
    /// Unset variables keep their defaults; malformed values are an error.
    pub fn from_env() -> ReprojResult<Self> {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("REPROJ_ENABLED") {
            config.enabled = parse_bool("REPROJ_ENABLED", &val)?;
        }

        if let Ok(val) = std::env::var("REPROJ_ERROR_THRESHOLD") {
            config.error_threshold = val.trim().parse().map_err(|_| {
                ReprojError::Config(format!("REPROJ_ERROR_THRESHOLD is not a number: {}", val))
            })?;
        }

        if let Ok(val) = std::env::var("REPROJ_GUTTER") {
            config.gutter = val.trim().parse().map_err(|_| {
                ReprojError::Config(format!("REPROJ_GUTTER is not a pixel count: {}", val))
            })?;
        }

        if let Ok(val) = std::env::var("REPROJ_INTERPOLATE") {
            config.interpolate = Some(parse_bool("REPROJ_INTERPOLATE", &val)?);
        }

        config.validate()?;
        Ok(config)
    }

    /// Parse a JSON document; missing fields take their defaults.
    pub fn from_json(json: &str) -> ReprojResult<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| ReprojError::Config(format!("invalid reprojection config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> ReprojResult<()> {
        if !self.error_threshold.is_finite() || self.error_threshold <= 0.0 {
            return Err(ReprojError::Config(format!(
                "error_threshold must be > 0, got {}",
                self.error_threshold
            )));
        }
        Ok(())
    }

    /// Resampling mode for a source with the given preference.
    pub fn interpolate_for(&self, source_interpolate: bool) -> bool {
        self.interpolate.unwrap_or(source_interpolate)
    }
}

fn parse_bool(name: &str, val: &str) -> ReprojResult<bool> {
    match val.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ReprojError::Config(format!("{} is not a boolean: {}", name, val))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ReprojConfig::default();
        assert!(config.enabled);
        assert_eq!(config.error_threshold, 0.5);
        assert_eq!(config.gutter, 0);
        assert_eq!(config.interpolate, None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = ReprojConfig::default();
        config.error_threshold = 0.0;
        assert!(config.validate().is_err());

        config.error_threshold = f64::NAN;
        assert!(config.validate().is_err());

        config.error_threshold = 2.0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_json_partial() {
        let config = ReprojConfig::from_json(r#"{"enabled": false, "gutter": 2}"#).unwrap();
        assert!(!config.enabled);
        assert_eq!(config.gutter, 2);
        assert_eq!(config.error_threshold, DEFAULT_ERROR_THRESHOLD);

        assert!(ReprojConfig::from_json(r#"{"error_threshold": -1}"#).is_err());
        assert!(ReprojConfig::from_json("not json").is_err());
    }

    #[test]
    fn test_interpolate_override() {
        let mut config = ReprojConfig::default();
        assert!(config.interpolate_for(true));
        assert!(!config.interpolate_for(false));

        config.interpolate = Some(false);
        assert!(!config.interpolate_for(true));
    }

    #[test]
    fn test_parse_bool() {
        assert!(parse_bool("X", "TRUE").unwrap());
        assert!(parse_bool("X", "1").unwrap());
        assert!(!parse_bool("X", "off").unwrap());
        assert!(matches!(parse_bool("X", "maybe"), Err(ReprojError::Config(_))));
    }
}
