//! Configuration for PCBCam
//!
//! Configuration is organized into logical sections:
//! - Gerber export format
//! - Excellon export format and import fallbacks
//! - Geometry resolution
//! - Isolation routing defaults
//! - CNC job defaults (machining parameters, dialect, preamble/postamble)
//!
//! Files are JSON or TOML, chosen by extension.

use crate::error::{SettingsError, SettingsResult};
use pcbcam_camtools::cncjob::{AssemblerOptions, PathOrdering};
use pcbcam_camtools::excellon::{ExcellonExportSettings, ExcellonParseOptions};
use pcbcam_camtools::gerber::GerberParseOptions;
use pcbcam_camtools::isolation::IsolationParams;
use pcbcam_core::{
    FormatConfig, IsolationType, MachiningParams, MillingDirection, ToolShape, Units,
    ZeroSuppression,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

const CONFIG_FILE: &str = "config.toml";

/// Format assumed for drill files that do not declare one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExcellonImportDefaults {
    pub units: Units,
    /// Integer and decimal digits for inch files
    pub inch_digits: (u8, u8),
    /// Integer and decimal digits for metric files
    pub metric_digits: (u8, u8),
    pub zeros: ZeroSuppression,
}

impl Default for ExcellonImportDefaults {
    fn default() -> Self {
        Self {
            units: Units::Inch,
            inch_digits: (2, 4),
            metric_digits: (3, 3),
            zeros: ZeroSuppression::Trailing,
        }
    }
}

impl ExcellonImportDefaults {
    pub fn to_parse_options(&self, steps_per_circle: usize) -> ExcellonParseOptions {
        ExcellonParseOptions {
            default_units: self.units,
            inch_digits: self.inch_digits,
            metric_digits: self.metric_digits,
            zeros: self.zeros,
            steps_per_circle,
        }
    }
}

/// Geometry resolution
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeometrySettings {
    /// Segments per full circle when flattening arcs
    pub steps_per_circle: usize,
    /// Decimals tool diameters are rounded to
    pub decimals: u8,
    /// Units assumed for Gerber files without `%MO`
    pub gerber_default_units: Units,
}

impl Default for GeometrySettings {
    fn default() -> Self {
        Self {
            steps_per_circle: 64,
            decimals: 4,
            gerber_default_units: Units::Inch,
        }
    }
}

impl GeometrySettings {
    pub fn gerber_parse_options(&self) -> GerberParseOptions {
        GerberParseOptions {
            steps_per_circle: self.steps_per_circle,
            default_units: self.gerber_default_units,
        }
    }
}

/// Isolation routing defaults
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IsolationDefaults {
    pub tool_diameter: f64,
    pub passes: usize,
    pub overlap: f64,
    pub direction: MillingDirection,
    pub isolation_type: IsolationType,
    pub combine_passes: bool,
    pub tool_shape: ToolShape,
}

impl Default for IsolationDefaults {
    fn default() -> Self {
        Self {
            tool_diameter: 0.1,
            passes: 1,
            overlap: 0.1,
            direction: MillingDirection::Climb,
            isolation_type: IsolationType::Both,
            combine_passes: true,
            tool_shape: ToolShape::C1,
        }
    }
}

/// CNC job defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CncDefaults {
    pub preprocessor: String,
    pub preamble: String,
    pub postamble: String,
    pub drill_ordering: PathOrdering,
    pub coord_decimals: u8,
    pub feed_decimals: u8,
    pub milling: MachiningParams,
    pub drilling: MachiningParams,
}

impl Default for CncDefaults {
    fn default() -> Self {
        Self {
            preprocessor: "default".to_string(),
            preamble: String::new(),
            postamble: String::new(),
            drill_ordering: PathOrdering::AsDrawn,
            coord_decimals: 4,
            feed_decimals: 3,
            milling: MachiningParams::default(),
            drilling: MachiningParams {
                cut_z: -1.7,
                feedrate_z: 60.0,
                ..Default::default()
            },
        }
    }
}

impl CncDefaults {
    fn with_dialect(&self, params: &MachiningParams) -> MachiningParams {
        MachiningParams {
            preprocessor: self.preprocessor.clone(),
            ..params.clone()
        }
    }

    /// Milling parameters with the configured dialect.
    pub fn milling_params(&self) -> MachiningParams {
        self.with_dialect(&self.milling)
    }

    /// Drilling parameters with the configured dialect.
    pub fn drilling_params(&self) -> MachiningParams {
        self.with_dialect(&self.drilling)
    }

    pub fn assembler_options(&self, name: &str, units: Units) -> AssemblerOptions {
        AssemblerOptions {
            name: name.to_string(),
            units,
            preamble: self.preamble.clone(),
            postamble: self.postamble.clone(),
            ordering: self.drill_ordering,
            force_toolchange: false,
            coord_decimals: self.coord_decimals,
            feed_decimals: self.feed_decimals,
        }
    }
}

/// Complete PCBCam configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub gerber_export: FormatConfig,
    pub excellon_export: ExcellonExportSettings,
    pub excellon_import: ExcellonImportDefaults,
    pub geometry: GeometrySettings,
    pub isolation: IsolationDefaults,
    pub cnc: CncDefaults,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            gerber_export: FormatConfig::default(),
            excellon_export: ExcellonExportSettings::default(),
            excellon_import: ExcellonImportDefaults::default(),
            geometry: GeometrySettings::default(),
            isolation: IsolationDefaults::default(),
            cnc: CncDefaults::default(),
        }
    }
}

enum FileFormat {
    Json,
    Toml,
}

fn file_format(path: &Path) -> SettingsResult<FileFormat> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("json") => Ok(FileFormat::Json),
        Some("toml") => Ok(FileFormat::Toml),
        other => Err(SettingsError::UnsupportedFormat(
            other.unwrap_or("<none>").to_string(),
        )),
    }
}

fn check_params(key: &str, params: &MachiningParams) -> SettingsResult<()> {
    if params.multidepth && params.depth_per_pass <= 0.0 {
        return Err(SettingsError::invalid(
            &format!("{}.depth_per_pass", key),
            "must be > 0",
        ));
    }
    if params.feedrate <= 0.0 || params.feedrate_z <= 0.0 || params.feedrate_rapid <= 0.0 {
        return Err(SettingsError::invalid(
            &format!("{}.feedrate", key),
            "feed rates must be > 0",
        ));
    }
    if params.travel_z < params.cut_z {
        return Err(SettingsError::invalid(
            &format!("{}.travel_z", key),
            "travel height is below the cut depth",
        ));
    }
    Ok(())
}

impl Config {
    /// Create new config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Default location of the config file.
    pub fn default_path() -> SettingsResult<PathBuf> {
        dirs::config_dir()
            .map(|dir| dir.join("pcbcam").join(CONFIG_FILE))
            .ok_or_else(|| SettingsError::ConfigDirectory("no configuration directory".to_string()))
    }

    /// Load config from file (JSON or TOML)
    pub fn load_from_file(path: &Path) -> SettingsResult<Self> {
        let format = file_format(path)?;
        let content = std::fs::read_to_string(path)?;
        let config: Self = match format {
            FileFormat::Json => serde_json::from_str(&content)?,
            FileFormat::Toml => toml::from_str(&content)?,
        };
        config.validate()?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Save config to file (JSON or TOML)
    pub fn save_to_file(&self, path: &Path) -> SettingsResult<()> {
        self.validate()?;
        let content = match file_format(path)? {
            FileFormat::Json => serde_json::to_string_pretty(self)?,
            FileFormat::Toml => toml::to_string_pretty(self)?,
        };
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> SettingsResult<()> {
        self.gerber_export
            .validate()
            .map_err(|e| SettingsError::invalid("gerber_export", e.to_string()))?;
        self.excellon_export
            .format
            .validate()
            .map_err(|e| SettingsError::invalid("excellon_export.format", e.to_string()))?;

        let import = &self.excellon_import;
        for (key, (int, _)) in [
            ("excellon_import.inch_digits", import.inch_digits),
            ("excellon_import.metric_digits", import.metric_digits),
        ] {
            if int == 0 {
                return Err(SettingsError::invalid(key, "integer digits must be > 0"));
            }
        }

        if self.geometry.steps_per_circle < 8 {
            return Err(SettingsError::invalid(
                "geometry.steps_per_circle",
                "must be at least 8",
            ));
        }

        let iso = &self.isolation;
        if iso.tool_diameter <= 0.0 {
            return Err(SettingsError::invalid("isolation.tool_diameter", "must be > 0"));
        }
        if iso.passes == 0 {
            return Err(SettingsError::invalid("isolation.passes", "must be > 0"));
        }
        if !(0.0..1.0).contains(&iso.overlap) {
            return Err(SettingsError::invalid("isolation.overlap", "must be in [0, 1)"));
        }

        check_params("cnc.milling", &self.cnc.milling)?;
        check_params("cnc.drilling", &self.cnc.drilling)?;
        Ok(())
    }

    /// Isolation request built from the defaults.
    pub fn isolation_params(&self) -> IsolationParams {
        let iso = &self.isolation;
        IsolationParams {
            tool_diameter: iso.tool_diameter,
            passes: iso.passes,
            overlap: iso.overlap,
            direction: iso.direction,
            isolation_type: iso.isolation_type,
            follow: false,
            combine_passes: iso.combine_passes,
            tool_shape: iso.tool_shape,
            machining: self.cnc.milling_params(),
            steps_per_circle: self.geometry.steps_per_circle,
            decimals: self.geometry.decimals,
        }
    }

    pub fn excellon_parse_options(&self) -> ExcellonParseOptions {
        self.excellon_import
            .to_parse_options(self.geometry.steps_per_circle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = Config::new();
        assert!(config.validate().is_ok());
        assert_eq!(config.gerber_export.units, Units::Inch);
        assert_eq!(config.excellon_import.zeros, ZeroSuppression::Trailing);
    }

    #[test]
    fn test_validation_rejects_bad_overlap() {
        let mut config = Config::new();
        config.isolation.overlap = 1.0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("isolation.overlap"));
    }

    #[test]
    fn test_validation_rejects_zero_digits() {
        let mut config = Config::new();
        config.gerber_export.int_digits = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_depth_per_pass() {
        let mut config = Config::new();
        config.cnc.milling.multidepth = true;
        config.cnc.milling.depth_per_pass = 0.0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("cnc.milling.depth_per_pass"));
    }

    #[test]
    fn test_isolation_params_carry_dialect() {
        let mut config = Config::new();
        config.cnc.preprocessor = "grbl_11".to_string();
        config.geometry.steps_per_circle = 32;
        let params = config.isolation_params();
        assert_eq!(params.machining.preprocessor, "grbl_11");
        assert_eq!(params.steps_per_circle, 32);
        assert_eq!(config.cnc.drilling_params().preprocessor, "grbl_11");
    }

    #[test]
    fn test_unsupported_extension() {
        let config = Config::new();
        let err = config.save_to_file(Path::new("settings.yaml")).unwrap_err();
        assert!(matches!(err, SettingsError::UnsupportedFormat(_)));
    }
}
