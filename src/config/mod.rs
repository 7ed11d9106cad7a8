//! Pipeline configuration loaded from YAML.
//!
//! The document is parsed leniently (required sections are `Option`s) and then
//! validated, so a missing section is reported by name rather than as a
//! generic deserialization failure. Validation also checks that every plot
//! refers to a data source the configuration can actually produce.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::domain::{ConditionSet, PlotSource, RenameMap, SheetLayout};
use crate::error::AppError;
use crate::plot::parse_color;

/// Sheet names inside the workbook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetsConfig {
    pub od600: String,
    pub fluorescence: String,
}

/// Fluorescein dilution series used to convert RFU to MEFL.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CalibrationConfig {
    pub fluorescein_calibration_wells: Vec<String>,
    pub fluorescein_micromolar_concentration: Vec<f64>,
    pub microliters_in_wells: f64,
    #[serde(default)]
    pub background_well: Option<String>,
    /// File name of the regression plot.
    pub calibration_plot: String,
}

/// One requested line plot.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PlotSpec {
    pub source: PlotSource,
    pub columns: Vec<String>,
    pub title: String,
    pub units: String,
    pub filename: String,
    #[serde(default)]
    pub colors: Option<Vec<String>>,
    #[serde(default)]
    pub labels: Option<Vec<String>>,
    #[serde(default)]
    pub name: Option<String>,
}

impl PlotSpec {
    /// Name used in messages: `name` if given, else the file name.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.filename)
    }
}

/// Fully validated configuration of one run.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub file_path: PathBuf,
    pub sheets: SheetsConfig,
    pub rename_map: RenameMap,
    pub plots: Vec<PlotSpec>,
    pub output_folder: PathBuf,
    pub overflow_replacement: Option<f64>,
    pub calibration: Option<CalibrationConfig>,
    pub conditions: Option<ConditionSet>,
    pub layout: SheetLayout,
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    file_path: Option<PathBuf>,
    sheets: Option<RawSheets>,
    rename_map: Option<RenameMap>,
    plotting: Option<RawPlotting>,
    #[serde(default)]
    output_folder: Option<PathBuf>,
    #[serde(default)]
    clean: RawClean,
    #[serde(default)]
    calibration: Option<CalibrationConfig>,
    #[serde(default)]
    conditions: Option<RawConditions>,
    #[serde(default)]
    layout: SheetLayout,
}

#[derive(Debug, Deserialize)]
struct RawSheets {
    od600: Option<String>,
    fluorescence: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawPlotting {
    #[serde(default)]
    plots: Vec<PlotSpec>,
}

#[derive(Debug, Default, Deserialize)]
struct RawClean {
    #[serde(default)]
    replacement: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawConditions {
    List(Vec<String>),
    Keyword(ConditionsKeyword),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
enum ConditionsKeyword {
    /// Derive conditions from the rename map's target names.
    Auto,
}

/// Default for `output_folder`.
pub const DEFAULT_OUTPUT_FOLDER: &str = "results";

impl PipelineConfig {
    /// Read and validate a YAML config file.
    ///
    /// Relative `file_path` / `output_folder` resolve against the file's directory.
    pub fn from_yaml_file(path: &Path) -> Result<Self, AppError> {
        let text = std::fs::read_to_string(path).map_err(|e| AppError::io("Failed to read config", path, e))?;
        let base = path.parent().unwrap_or_else(|| Path::new(""));
        Self::from_yaml_str(&text, base)
            .map_err(|e| AppError::config(format!("Invalid config '{}': {e}", path.display())))
    }

    /// Parse and validate YAML text; relative paths resolve against `base_dir`.
    pub fn from_yaml_str(text: &str, base_dir: &Path) -> Result<Self, AppError> {
        let raw: RawConfig = serde_yaml::from_str(text).map_err(|e| AppError::config(e.to_string()))?;
        let config = Self::from_raw(raw, base_dir)?;
        config.validate()?;
        Ok(config)
    }

    fn from_raw(raw: RawConfig, base_dir: &Path) -> Result<Self, AppError> {
        let file_path = raw.file_path.ok_or_else(|| missing_section("file_path"))?;
        let sheets = raw.sheets.ok_or_else(|| missing_section("sheets"))?;
        let rename_map = raw.rename_map.ok_or_else(|| missing_section("rename_map"))?;
        let plotting = raw.plotting.ok_or_else(|| missing_section("plotting"))?;

        let sheets = SheetsConfig {
            od600: sheets.od600.ok_or_else(|| missing_key("sheets.od600"))?,
            fluorescence: sheets.fluorescence.ok_or_else(|| missing_key("sheets.fluorescence"))?,
        };

        let conditions = match raw.conditions {
            None => None,
            Some(RawConditions::List(names)) if names.is_empty() => None,
            Some(RawConditions::List(names)) => Some(ConditionSet::from_names(names)),
            Some(RawConditions::Keyword(ConditionsKeyword::Auto)) => Some(ConditionSet::from_rename_map(&rename_map)),
        };

        let output_folder = raw
            .output_folder
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_FOLDER));

        Ok(Self {
            file_path: resolve(base_dir, file_path),
            sheets,
            rename_map,
            plots: plotting.plots,
            output_folder: resolve(base_dir, output_folder),
            overflow_replacement: raw.clean.replacement,
            calibration: raw.calibration,
            conditions,
            layout: raw.layout,
        })
    }

    fn validate(&self) -> Result<(), AppError> {
        if self.layout.metadata_columns == 0 {
            return Err(AppError::config(
                "layout.metadata_columns must be at least 1 (the time column).",
            ));
        }
        if let Some(r) = self.overflow_replacement {
            if !r.is_finite() {
                return Err(AppError::config("clean.replacement must be a finite number."));
            }
        }
        for plot in &self.plots {
            self.validate_plot(plot)?;
        }
        Ok(())
    }

    fn validate_plot(&self, plot: &PlotSpec) -> Result<(), AppError> {
        let name = plot.display_name();
        if plot.source.needs_calibration() && self.calibration.is_none() {
            return Err(AppError::config(format!(
                "Plot '{name}': source '{}' requires a `calibration` section.",
                plot.source
            )));
        }
        if plot.source.needs_conditions() && self.conditions.is_none() {
            return Err(AppError::config(format!(
                "Plot '{name}': source '{}' requires `conditions`.",
                plot.source
            )));
        }
        if plot.columns.is_empty() {
            return Err(AppError::config(format!("Plot '{name}': `columns` is empty.")));
        }
        if let Some(labels) = &plot.labels {
            if labels.len() != plot.columns.len() {
                return Err(AppError::config(format!(
                    "Plot '{name}': {} labels for {} columns.",
                    labels.len(),
                    plot.columns.len()
                )));
            }
        }
        if let Some(colors) = &plot.colors {
            if colors.len() < plot.columns.len() {
                return Err(AppError::config(format!(
                    "Plot '{name}': {} colors for {} columns.",
                    colors.len(),
                    plot.columns.len()
                )));
            }
            for color in colors {
                parse_color(color)
                    .ok_or_else(|| AppError::config(format!("Plot '{name}': unknown color '{color}'.")))?;
            }
        }
        Ok(())
    }

    /// Names of the sources this configuration makes available.
    pub fn available_sources(&self) -> Vec<PlotSource> {
        PlotSource::ALL
            .into_iter()
            .filter(|s| !s.needs_calibration() || self.calibration.is_some())
            .filter(|s| !s.needs_conditions() || self.conditions.is_some())
            .collect()
    }
}

fn missing_section(name: &str) -> AppError {
    AppError::config(format!("Missing required config section: {name}"))
}

fn missing_key(name: &str) -> AppError {
    AppError::config(format!("Missing required config key: {name}"))
}

fn resolve(base: &Path, path: PathBuf) -> PathBuf {
    if path.is_absolute() { path } else { base.join(path) }
}
