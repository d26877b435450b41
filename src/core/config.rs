//! Layered configuration
//!
//! Built-in defaults, then the user config file, then `./erw.yaml`. Each
//! layer only needs the keys it overrides; CLI flags are applied on top by
//! the caller.

use directories::ProjectDirs;
use miette::{Diagnostic, NamedSource, SourceSpan};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::core::kde::DEFAULT_KDE_POINTS;
use crate::core::simulate::DepthFloorPolicy;
use crate::entities::distribution::DEFAULT_SAMPLE_COUNT;

/// Project-local config file name
pub const LOCAL_CONFIG_FILE: &str = "erw.yaml";

/// Config file name inside the user config directory
pub const USER_CONFIG_FILE: &str = "config.yaml";

/// Errors loading or validating configuration
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("cannot read config file {path}")]
    #[diagnostic(code(erw::config::io))]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid YAML in {path}: {message}")]
    #[diagnostic(code(erw::config::syntax))]
    Syntax {
        path: PathBuf,
        message: String,
        #[source_code]
        src: NamedSource<String>,
        #[label("here")]
        span: Option<SourceSpan>,
    },

    #[error("invalid configuration: {0}")]
    #[diagnostic(code(erw::config::invalid), help("check the values in erw.yaml"))]
    Invalid(String),
}

/// Standard-mode soil depth range (m), sampled uniformly
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DepthRange {
    pub min: f64,
    pub max: f64,
}

impl Default for DepthRange {
    fn default() -> Self {
        Self {
            min: 0.05,
            max: 0.3,
        }
    }
}

/// Standard-mode bulk density (kg/m³), truncated normal
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BulkDensityModel {
    pub mean: f64,
    pub std_dev: f64,
    pub lower: f64,
    pub upper: f64,
}

impl Default for BulkDensityModel {
    fn default() -> Self {
        Self {
            mean: 1250.0,
            std_dev: 250.0,
            lower: 800.0,
            upper: 1700.0,
        }
    }
}

/// Simulation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Samples per distribution
    pub sample_count: usize,

    /// Evaluation points per density curve
    pub kde_points: usize,

    pub depth_floor_policy: DepthFloorPolicy,

    pub soil_depth: DepthRange,

    pub bulk_density: BulkDensityModel,

    /// Fixed seed for reproducible runs
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            sample_count: DEFAULT_SAMPLE_COUNT,
            kde_points: DEFAULT_KDE_POINTS,
            depth_floor_policy: DepthFloorPolicy::default(),
            soil_depth: DepthRange::default(),
            bulk_density: BulkDensityModel::default(),
            seed: None,
        }
    }
}

/// Where the reference tables live
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    pub dir: PathBuf,
    pub soil_file: String,
    pub basalt_file: String,
    pub peridotite_file: String,
    pub thresholds_file: String,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("data"),
            soil_file: "cleaned_soil_data.csv".to_string(),
            basalt_file: "cleaned_feedstock_data_basalt.csv".to_string(),
            peridotite_file: "cleaned_feedstock_data_peridotite.csv".to_string(),
            thresholds_file: "model_thresholds.csv".to_string(),
        }
    }
}

/// Complete configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub simulation: SimulationConfig,
    pub data: DataConfig,
}

impl Config {
    /// Load defaults, the user config file and `./erw.yaml`, in that order
    pub fn load() -> Result<Self, ConfigError> {
        let mut paths = Vec::new();
        if let Some(user) = user_config_path() {
            paths.push(user);
        }
        paths.push(PathBuf::from(LOCAL_CONFIG_FILE));
        Self::load_layers(&paths)
    }

    /// Layer the given files over the defaults; missing files are skipped
    pub fn load_layers(paths: &[PathBuf]) -> Result<Self, ConfigError> {
        let mut merged = serde_yml::to_value(Config::default())
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;

        for path in paths.iter().filter(|p| p.is_file()) {
            log::debug!("loading config layer {}", path.display());
            let layer = read_layer(path)?;
            merge_yaml(&mut merged, layer);
        }

        let config: Config = serde_yml::from_value(merged)
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Parse one YAML document over the defaults
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let layer = parse_layer(content, Path::new("<inline>"))?;
        let mut merged = serde_yml::to_value(Config::default())
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        merge_yaml(&mut merged, layer);
        let config: Config = serde_yml::from_value(merged)
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let sim = &self.simulation;
        if sim.sample_count < 2 {
            return Err(ConfigError::Invalid(format!(
                "sample_count must be at least 2, got {}",
                sim.sample_count
            )));
        }
        if sim.kde_points < 2 {
            return Err(ConfigError::Invalid(format!(
                "kde_points must be at least 2, got {}",
                sim.kde_points
            )));
        }

        let depth = sim.soil_depth;
        if !(depth.min.is_finite() && depth.max.is_finite() && depth.min < depth.max) {
            return Err(ConfigError::Invalid(format!(
                "soil_depth.min ({}) must be below soil_depth.max ({})",
                depth.min, depth.max
            )));
        }

        let dbd = sim.bulk_density;
        if !(dbd.std_dev.is_finite() && dbd.std_dev > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "bulk_density.std_dev must be positive, got {}",
                dbd.std_dev
            )));
        }
        if !(dbd.lower.is_finite() && dbd.upper.is_finite() && dbd.lower < dbd.upper) {
            return Err(ConfigError::Invalid(format!(
                "bulk_density.lower ({}) must be below bulk_density.upper ({})",
                dbd.lower, dbd.upper
            )));
        }
        if dbd.lower <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "bulk_density.lower must be positive, got {}",
                dbd.lower
            )));
        }

        Ok(())
    }

    pub fn soil_path(&self) -> PathBuf {
        self.data.dir.join(&self.data.soil_file)
    }

    pub fn basalt_path(&self) -> PathBuf {
        self.data.dir.join(&self.data.basalt_file)
    }

    pub fn peridotite_path(&self) -> PathBuf {
        self.data.dir.join(&self.data.peridotite_file)
    }

    pub fn thresholds_path(&self) -> PathBuf {
        self.data.dir.join(&self.data.thresholds_file)
    }
}

/// `<config dir>/erw/config.yaml`, if the platform has a config dir
pub fn user_config_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "erw").map(|dirs| dirs.config_dir().join(USER_CONFIG_FILE))
}

fn read_layer(path: &Path) -> Result<serde_yml::Value, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_layer(&content, path)
}

fn parse_layer(content: &str, path: &Path) -> Result<serde_yml::Value, ConfigError> {
    let value: serde_yml::Value =
        serde_yml::from_str(content).map_err(|e| ConfigError::Syntax {
            path: path.to_path_buf(),
            message: e.to_string(),
            span: e.location().map(|loc| SourceSpan::from((loc.index(), 1))),
            src: NamedSource::new(path.display().to_string(), content.to_string()),
        })?;

    // An empty file parses as null
    Ok(match value {
        serde_yml::Value::Null => serde_yml::Value::Mapping(Default::default()),
        other => other,
    })
}

/// Recursively overlay mappings; any other value replaces the base
fn merge_yaml(base: &mut serde_yml::Value, overlay: serde_yml::Value) {
    match (base, overlay) {
        (serde_yml::Value::Mapping(base_map), serde_yml::Value::Mapping(overlay_map)) => {
            for (key, value) in overlay_map {
                match base_map.get_mut(&key) {
                    Some(existing) => merge_yaml(existing, value),
                    None => {
                        base_map.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.simulation.sample_count, 10_000);
        assert_eq!(config.simulation.kde_points, 200);
        assert_eq!(
            config.simulation.depth_floor_policy,
            DepthFloorPolicy::Unconditional
        );
        assert_eq!(config.simulation.soil_depth, DepthRange { min: 0.05, max: 0.3 });
        assert_eq!(config.simulation.bulk_density.mean, 1250.0);
        assert_eq!(config.thresholds_path(), PathBuf::from("data/model_thresholds.csv"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_override() {
        let yaml = "simulation:\n  sample_count: 500\n  depth_floor_policy: non-positive-only\n";
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.simulation.sample_count, 500);
        assert_eq!(
            config.simulation.depth_floor_policy,
            DepthFloorPolicy::NonPositiveOnly
        );
        // Untouched keys keep their defaults
        assert_eq!(config.simulation.kde_points, 200);
        assert_eq!(config.data, DataConfig::default());
    }

    #[test]
    fn test_nested_override_keeps_siblings() {
        let config = Config::from_yaml("simulation:\n  bulk_density:\n    mean: 1400\n").unwrap();
        assert_eq!(config.simulation.bulk_density.mean, 1400.0);
        assert_eq!(config.simulation.bulk_density.upper, 1700.0);
    }

    #[test]
    fn test_empty_document_is_defaults() {
        assert_eq!(Config::from_yaml("").unwrap(), Config::default());
    }

    #[test]
    fn test_layers_apply_in_order() {
        let tmp = TempDir::new().unwrap();
        let first = tmp.path().join("first.yaml");
        let second = tmp.path().join("second.yaml");
        std::fs::write(&first, "simulation:\n  sample_count: 100\n  seed: 7\n").unwrap();
        std::fs::write(&second, "simulation:\n  sample_count: 200\n").unwrap();

        let missing = tmp.path().join("missing.yaml");
        let config = Config::load_layers(&[first, missing, second]).unwrap();
        assert_eq!(config.simulation.sample_count, 200);
        assert_eq!(config.simulation.seed, Some(7));
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(matches!(
            Config::from_yaml("simulation:\n  sample_count: 1\n"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(Config::from_yaml("simulation:\n  soil_depth:\n    min: 0.5\n    max: 0.1\n").is_err());
        assert!(Config::from_yaml("simulation:\n  bulk_density:\n    std_dev: 0\n").is_err());
    }

    #[test]
    fn test_syntax_error_reported() {
        let err = Config::from_yaml("simulation: [unclosed").unwrap_err();
        assert!(matches!(err, ConfigError::Syntax { .. }));
    }
}
