//! Terminal summaries of a run.
//!
//! Formatting lives here so the pipeline returns plain data and the CLI only prints.

use crate::app::pipeline::PipelineOutput;
use crate::config::PipelineConfig;
use crate::domain::MeasurementTable;

/// Format the summary printed after `wellplate run`.
pub fn format_run_summary(output: &PipelineOutput, config: &PipelineConfig) -> String {
    let mut out = String::new();
    let stats = &output.stats;

    out.push_str("=== wellplate - plate reader analysis ===\n");
    out.push_str(&format!("Input: {}\n", config.file_path.display()));
    out.push_str(&format!(
        "Sheets: OD600='{}' ({} columns) | fluorescence='{}' ({} columns)\n",
        config.sheets.od600, stats.od_columns, config.sheets.fluorescence, stats.fluorescence_columns
    ));
    out.push_str(&format!(
        "Timepoints: {} (dropped {} incomplete rows) | overflow cells: {}\n",
        stats.timepoints, stats.dropped_rows, stats.overflow_cells
    ));

    match &output.calibration {
        Some(curve) => {
            out.push_str("\nCalibration (RFU -> MEFL):\n");
            out.push_str(&format!("- slope    : {:.4e}\n", curve.slope));
            out.push_str(&format!("- intercept: {:.4e}\n", curve.intercept));
            out.push_str(&format!("- R²       : {:.6}\n", curve.r_squared));
        }
        None => out.push_str("\nCalibration: none (raw RFU)\n"),
    }

    if let Some(conditions) = &config.conditions {
        let names: Vec<&str> = conditions.iter().collect();
        out.push_str(&format!("\nConditions: {}\n", names.join(", ")));
    }

    if let Some(table) = &output.normalized_mefl_average {
        out.push_str("\nNormalized MEFL at last timepoint:\n");
        out.push_str(&format_last_row(table));
    }

    out.push_str(&format!("\nOutputs ({}):\n", output.artifacts.len()));
    for path in &output.artifacts {
        out.push_str(&format!("- {}\n", path.display()));
    }

    out
}

/// Format the result of `wellplate validate`.
pub fn format_validation(config: &PipelineConfig) -> String {
    let mut out = String::new();
    out.push_str("Config OK\n");
    out.push_str(&format!("- input        : {}\n", config.file_path.display()));
    out.push_str(&format!("- output folder: {}\n", config.output_folder.display()));
    out.push_str(&format!(
        "- calibration  : {}\n",
        if config.calibration.is_some() { "yes" } else { "no" }
    ));
    out.push_str(&format!(
        "- conditions   : {}\n",
        config.conditions.as_ref().map_or(0, |c| c.len())
    ));
    out.push_str(&format!("- plots        : {}\n", config.plots.len()));
    let sources: Vec<&str> = config.available_sources().into_iter().map(|s| s.name()).collect();
    out.push_str(&format!("- sources      : {}\n", sources.join(", ")));
    out
}

fn format_last_row(table: &MeasurementTable) -> String {
    let mut out = String::new();
    let Some(row) = table.n_rows().checked_sub(1) else {
        return out;
    };
    out.push_str(&format!("{:<24} {:>14}\n", "condition", format!("t={:.2}h", table.index()[row])));
    out.push_str(&format!("{:-<24} {:-<14}\n", "", ""));
    for column in table.columns() {
        let value = column.values[row].map_or_else(|| "-".to_string(), |v| format!("{v:.4e}"));
        out.push_str(&format!("{:<24} {:>14}\n", truncate(&column.name, 24), value));
    }
    out
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('.');
    out
}
