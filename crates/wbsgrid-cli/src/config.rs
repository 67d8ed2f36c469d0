//! TOML view configuration
//!
//! ```toml
//! [output]
//! width = 1600
//! background = "#ffffff"
//!
//! [view]
//! granularity = "monthly"
//!
//! [view.grid]
//! row-height = 28
//! period-width = 64
//! ```
//!
//! Every key is optional; missing keys keep their defaults.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use wbsgrid_render::CoordinatorConfig;

/// Host container simulated by the exporter
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct OutputConfig {
    pub width: f64,
    pub height: f64,
    /// `None` leaves the SVG transparent
    pub background: Option<String>,
    pub font_family: Option<String>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            width: 1280.0,
            height: 720.0,
            background: Some("#ffffff".into()),
            font_family: None,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ViewConfig {
    pub output: OutputConfig,
    pub view: CoordinatorConfig,
}

impl ViewConfig {
    /// Load from `path`, or defaults when no file is given
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("Invalid config {}", path.display()))
    }

    pub fn parse(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use wbsgrid_render::CurveGranularity;

    #[test]
    fn missing_file_means_defaults() {
        assert_eq!(ViewConfig::load(None).unwrap(), ViewConfig::default());
    }

    #[test]
    fn partial_tables_merge_over_defaults() {
        let config = ViewConfig::parse(
            r#"
            [output]
            width = 1600

            [view]
            granularity = "monthly"

            [view.grid]
            row-height = 28
            "#,
        )
        .unwrap();
        assert_eq!(config.output.width, 1600.0);
        assert_eq!(config.output.height, 720.0);
        assert_eq!(config.view.granularity, CurveGranularity::Monthly);
        assert_eq!(config.view.grid.row_height, 28.0);
        assert_eq!(config.view.grid.period_width, 72.0);
    }

    #[test]
    fn unknown_granularity_is_an_error() {
        let err = ViewConfig::parse("[view]\ngranularity = \"daily\"").unwrap_err();
        assert!(err.to_string().contains("daily"));
    }
}
