use std::path::Path;

use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};

use crate::data::normalize::{Stretch, StretchMode};

/// Environment variable naming an optional JSON configuration file.
pub const CONFIG_ENV: &str = "ASTRO_GLANCE_CONFIG";

// ---------------------------------------------------------------------------
// Viewer configuration
// ---------------------------------------------------------------------------

/// A header keyword shown in the "Basic information" column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeaderField {
    pub keyword: String,
    pub label: String,
    #[serde(default)]
    pub unit: Option<String>,
}

impl HeaderField {
    fn new(keyword: &str, label: &str, unit: Option<&str>) -> Self {
        Self {
            keyword: keyword.to_string(),
            label: label.to_string(),
            unit: unit.map(str::to_string),
        }
    }
}

/// Every setting has a default, so a config file only needs the keys it
/// changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub window_size: [f32; 2],
    /// Extensions accepted by the dialog and by drops, without the dot.
    pub accepted_extensions: Vec<String>,
    pub default_stretch: StretchMode,
    pub lower_percentile: f64,
    pub upper_percentile: f64,
    pub header_fields: Vec<HeaderField>,
    /// Draw row 0 at the bottom, as sky viewers usually do.
    pub origin_lower: bool,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            window_size: [1200.0, 850.0],
            accepted_extensions: ["fits", "fit", "fts", "fz", "gz"]
                .into_iter()
                .map(String::from)
                .collect(),
            default_stretch: StretchMode::Percentile,
            lower_percentile: 5.0,
            upper_percentile: 99.5,
            header_fields: vec![
                HeaderField::new("OBJECT", "Object", None),
                HeaderField::new("TELESCOP", "Telescope", None),
                HeaderField::new("EXPTIME", "Exposure time", Some("s")),
            ],
            origin_lower: false,
        }
    }
}

impl ViewerConfig {
    /// Load from the file named by `ASTRO_GLANCE_CONFIG`, or use defaults.
    pub fn from_env() -> Result<Self> {
        match std::env::var_os(CONFIG_ENV) {
            Some(path) => Self::load(Path::new(&path)),
            None => Ok(Self::default()),
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: ViewerConfig = serde_json::from_str(&text)
            .with_context(|| format!("parsing config {}", path.display()))?;
        config.validate()?;
        log::info!("loaded viewer config from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(
            (0.0..=100.0).contains(&self.lower_percentile)
                && (0.0..=100.0).contains(&self.upper_percentile),
            "percentiles must lie in 0..=100"
        );
        ensure!(
            self.lower_percentile < self.upper_percentile,
            "lower_percentile ({}) must be below upper_percentile ({})",
            self.lower_percentile,
            self.upper_percentile
        );
        ensure!(
            !self.accepted_extensions.is_empty(),
            "accepted_extensions must not be empty"
        );
        Ok(())
    }

    /// The concrete stretch for a mode under this configuration.
    pub fn stretch(&self, mode: StretchMode) -> Stretch {
        match mode {
            StretchMode::Linear => Stretch::Linear,
            StretchMode::Percentile => Stretch::Percentile {
                lower: self.lower_percentile,
                upper: self.upper_percentile,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = ViewerConfig::default();
        config.validate().unwrap();
        assert_eq!(
            config.stretch(StretchMode::Percentile),
            Stretch::Percentile {
                lower: 5.0,
                upper: 99.5
            }
        );
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("viewer.json");
        std::fs::write(
            &path,
            r#"{ "default_stretch": "linear", "upper_percentile": 99.9, "origin_lower": true }"#,
        )
        .unwrap();

        let config = ViewerConfig::load(&path).unwrap();
        assert_eq!(config.default_stretch, StretchMode::Linear);
        assert_eq!(config.upper_percentile, 99.9);
        assert!(config.origin_lower);
        assert_eq!(config.lower_percentile, 5.0);
        assert_eq!(config.header_fields.len(), 3);
    }

    #[test]
    fn inverted_percentiles_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(
            &path,
            r#"{ "lower_percentile": 90, "upper_percentile": 10 }"#,
        )
        .unwrap();

        let err = ViewerConfig::load(&path).unwrap_err();
        assert!(err.to_string().contains("lower_percentile"));
    }

    #[test]
    fn missing_file_names_the_path() {
        let err = ViewerConfig::load(Path::new("/nonexistent/viewer.json")).unwrap_err();
        assert!(format!("{err:#}").contains("/nonexistent/viewer.json"));
    }
}
