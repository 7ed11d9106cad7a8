//! The end-to-end analysis run.
//!
//! load -> validate-alignment -> clean-overflow -> index-time -> [calibrate] ->
//! rename -> normalize -> [average] -> export -> plot -> publish
//!
//! This is the only place that knows about configuration and paths; every
//! transform it calls is a pure function over tables. Files are written to a
//! staging directory and published together at the end, so a failed run leaves
//! the output folder untouched.

use std::path::PathBuf;

use crate::app::progress::{ProgressSink, Stage};
use crate::calibration::{CalibrationInputs, apply_calibration, fit_calibration};
use crate::config::{PipelineConfig, PlotSpec};
use crate::domain::{CalibrationCurve, MeasurementTable, PlotSource, RawSheet};
use crate::error::AppError;
use crate::io::{SheetSource, StagedOutputs, open_source, write_calibration_json, write_table_csv};
use crate::plot::{CalibrationChart, LineChart, LineSpec, parse_color, render};
use crate::processing::{
    attach_time_index, average_replicates, clean_overflow, count_overflow, index_by_time, normalize_by,
    rename_columns,
};

/// What a completed run returns.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    /// Per-well fluorescence divided by OD, after renaming.
    pub normalized_rfu_replicates: Option<MeasurementTable>,
    pub normalized_mefl_replicates: Option<MeasurementTable>,
    pub normalized_mefl_average: Option<MeasurementTable>,
    pub calibration: Option<CalibrationCurve>,
    /// Published files, in the order they were written.
    pub artifacts: Vec<PathBuf>,
    pub stats: RunStats,
}

/// Output names owned by the pipeline. A run that does not produce one of
/// these removes the copy left by an earlier run.
const MANAGED_OUTPUTS: [&str; 8] = [
    "MEFL.csv",
    "normalized_MEFL_replicates.csv",
    "OD_replicate_averages.csv",
    "RFU_replicate_averages.csv",
    "normalized_RFU_replicate_averages.csv",
    "MEFL_replicate_averages.csv",
    "normalized_MEFL_replicate_averages.csv",
    "calibration.json",
];

/// Bookkeeping about the input, for the run summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunStats {
    pub timepoints: usize,
    pub dropped_rows: usize,
    pub overflow_cells: usize,
    pub od_columns: usize,
    pub fluorescence_columns: usize,
}

/// Every table a plot may draw from; `None` when the run did not produce it.
#[derive(Debug, Default)]
struct Tables {
    od: Option<MeasurementTable>,
    rfu: Option<MeasurementTable>,
    normalized_rfu: Option<MeasurementTable>,
    mefl: Option<MeasurementTable>,
    normalized_mefl: Option<MeasurementTable>,
    od_average: Option<MeasurementTable>,
    rfu_average: Option<MeasurementTable>,
    normalized_rfu_average: Option<MeasurementTable>,
    mefl_average: Option<MeasurementTable>,
    normalized_mefl_average: Option<MeasurementTable>,
}

impl Tables {
    fn source(&self, source: PlotSource) -> Option<&MeasurementTable> {
        match source {
            PlotSource::NormalizedMeflAverage => self.normalized_mefl_average.as_ref(),
            PlotSource::NormalizedMeflReplicates => self.normalized_mefl.as_ref(),
            PlotSource::MeflAverage => self.mefl_average.as_ref(),
            PlotSource::MeflReplicates => self.mefl.as_ref(),
            PlotSource::NormalizedRfuAverage => self.normalized_rfu_average.as_ref(),
            PlotSource::NormalizedRfuReplicates => self.normalized_rfu.as_ref(),
            PlotSource::RfuAverage => self.rfu_average.as_ref(),
            PlotSource::RfuReplicates => self.rfu.as_ref(),
            PlotSource::OdAverage => self.od_average.as_ref(),
            PlotSource::OdReplicates => self.od.as_ref(),
        }
    }
}

/// Run the pipeline on the workbook or CSV directory named by `config.file_path`.
pub fn run_pipeline(config: &PipelineConfig, progress: &dyn ProgressSink) -> Result<PipelineOutput, AppError> {
    let mut source = open_source(&config.file_path)?;
    run_with_source(config, source.as_mut(), progress)
}

/// Run the pipeline reading sheets from `source`.
pub fn run_with_source(
    config: &PipelineConfig,
    source: &mut dyn SheetSource,
    progress: &dyn ProgressSink,
) -> Result<PipelineOutput, AppError> {
    let layout = &config.layout;
    let mut stats = RunStats::default();

    // 1) Load.
    let od_sheet = source.read_sheet(&config.sheets.od600)?;
    let fl_sheet = source.read_sheet(&config.sheets.fluorescence)?;
    progress.stage(
        Stage::Load,
        &format!(
            "Loaded '{}' ({} rows) and '{}' ({} rows).",
            od_sheet.name,
            od_sheet.n_rows(),
            fl_sheet.name,
            fl_sheet.n_rows()
        ),
    );

    // 2) Both sheets must describe the same reading cycles.
    validate_alignment(&od_sheet, &fl_sheet)?;
    progress.stage(Stage::ValidateAlignment, "Sheets have matching reading cycles.");

    // 3) Overflow markers only occur in fluorescence.
    stats.overflow_cells = count_overflow(&fl_sheet, layout);
    let fl_sheet = clean_overflow(&fl_sheet, layout, config.overflow_replacement);
    progress.stage(
        Stage::CleanOverflow,
        &format!("Replaced {} overflow cells in '{}'.", stats.overflow_cells, fl_sheet.name),
    );

    // 4) OD defines the time index; fluorescence reuses it.
    let indexed = index_by_time(&od_sheet, layout)?;
    if let Some((row, prev, cur)) = indexed.index.first_decrease() {
        return Err(AppError::Alignment(format!(
            "Sheet '{}', row {}: time goes backwards ({prev:.4} h -> {cur:.4} h).",
            od_sheet.name,
            row + 2
        )));
    }
    let od = indexed.table;
    let rfu = attach_time_index(&fl_sheet, layout, &indexed.index)?;
    stats.timepoints = od.n_rows();
    stats.dropped_rows = indexed.index.dropped_rows();
    stats.od_columns = od.n_columns();
    stats.fluorescence_columns = rfu.n_columns();
    if stats.dropped_rows > 0 {
        progress.warn(&format!(
            "Dropped {} incomplete rows from '{}'.",
            stats.dropped_rows, od_sheet.name
        ));
    }
    progress.stage(Stage::IndexTime, &format!("Indexed {} timepoints.", stats.timepoints));

    // 5) Optional RFU -> MEFL conversion, on well names.
    let calibrated = match &config.calibration {
        Some(cal) => {
            let inputs = CalibrationInputs {
                wells: &cal.fluorescein_calibration_wells,
                concentrations_um: &cal.fluorescein_micromolar_concentration,
                volume_ul: cal.microliters_in_wells,
                background_well: cal.background_well.as_deref(),
            };
            let curve = fit_calibration(&rfu, &inputs)?;
            let mefl = apply_calibration(&rfu, &curve);
            progress.stage(
                Stage::Calibrate,
                &format!(
                    "Calibration fitted: slope {:.3e}, intercept {:.3e}, R² {:.6}.",
                    curve.slope, curve.intercept, curve.r_squared
                ),
            );
            if curve.r_squared < 0.95 {
                progress.warn(&format!("Calibration R² is low ({:.4}).", curve.r_squared));
            }
            Some((curve, mefl))
        }
        None => {
            progress.stage(Stage::Calibrate, "No calibration configured; using raw RFU values.");
            None
        }
    };

    // 6) Independent renamed copies.
    let od_named = rename_columns(&od, &config.rename_map);
    let rfu_named = rename_columns(&rfu, &config.rename_map);
    let mefl_named = calibrated
        .as_ref()
        .map(|(_, mefl)| rename_columns(mefl, &config.rename_map));
    progress.stage(
        Stage::Rename,
        &format!("Renamed columns using {} rename_map entries.", config.rename_map.len()),
    );

    // 7) Per-cell division by OD.
    let normalized_rfu = normalize_by(&rfu_named, &od_named)?;
    let normalized_mefl = mefl_named.as_ref().map(|m| normalize_by(m, &od_named)).transpose()?;
    progress.stage(Stage::Normalize, "Normalized fluorescence by optical density.");

    let mut tables = Tables {
        od: Some(od_named),
        rfu: Some(rfu_named),
        normalized_rfu: Some(normalized_rfu),
        mefl: mefl_named,
        normalized_mefl,
        ..Tables::default()
    };

    // 8) Optional replicate averages.
    match &config.conditions {
        Some(conditions) => {
            for (shorter, longer) in conditions.prefix_overlaps() {
                progress.warn(&format!(
                    "Condition '{shorter}' is a prefix of '{longer}'; its average includes '{longer}' columns."
                ));
            }
            let average = |t: &Option<MeasurementTable>| t.as_ref().map(|t| average_replicates(t, conditions));
            tables.od_average = average(&tables.od);
            tables.rfu_average = average(&tables.rfu);
            tables.normalized_rfu_average = average(&tables.normalized_rfu);
            tables.mefl_average = average(&tables.mefl);
            tables.normalized_mefl_average = average(&tables.normalized_mefl);
            progress.stage(
                Stage::Average,
                &format!("Averaged technical replicates for {} conditions.", conditions.len()),
            );
        }
        None => progress.stage(Stage::Average, "No conditions configured; skipping averages."),
    }

    // Plot columns are checked before anything is written.
    let plots = config
        .plots
        .iter()
        .map(|plot| resolve_plot(plot, &tables))
        .collect::<Result<Vec<_>, _>>()?;

    // 9) Export.
    let mut staged = StagedOutputs::new(&config.output_folder)?;
    let mut exported = 0usize;
    let calibration = calibrated.as_ref().map(|(curve, _)| curve);
    let csv_outputs = [
        ("MEFL.csv", calibrated.as_ref().map(|(_, mefl)| mefl)),
        ("normalized_MEFL_replicates.csv", tables.normalized_mefl.as_ref()),
        ("OD_replicate_averages.csv", tables.od_average.as_ref()),
        ("RFU_replicate_averages.csv", tables.rfu_average.as_ref()),
        ("normalized_RFU_replicate_averages.csv", tables.normalized_rfu_average.as_ref()),
        ("MEFL_replicate_averages.csv", tables.mefl_average.as_ref()),
        ("normalized_MEFL_replicate_averages.csv", tables.normalized_mefl_average.as_ref()),
    ];
    for (file_name, table) in csv_outputs {
        if let Some(table) = table {
            write_table_csv(&staged.path_for(file_name)?, table)?;
            exported += 1;
        }
    }
    if let Some(curve) = calibration {
        write_calibration_json(&staged.path_for("calibration.json")?, curve)?;
        exported += 1;
    }
    progress.stage(Stage::Export, &format!("Wrote {exported} data files."));

    // 10) Plot.
    if let (Some(curve), Some(cal)) = (calibration, &config.calibration) {
        render(&staged.path_for(&cal.calibration_plot)?, &CalibrationChart { curve })?;
    }
    for &(plot, table) in &plots {
        let chart = LineChart {
            table,
            lines: line_specs(plot)?,
            title: &plot.title,
            units: &plot.units,
        };
        render(&staged.path_for(&plot.filename)?, &chart)?;
    }
    progress.stage(Stage::Plot, &format!("Rendered {} plots.", plots.len()));

    // 11) Publish.
    let artifacts = staged.publish(&MANAGED_OUTPUTS)?;
    progress.stage(
        Stage::Publish,
        &format!("Published {} files to {}.", artifacts.len(), config.output_folder.display()),
    );

    Ok(PipelineOutput {
        calibration: calibrated.map(|(curve, _)| curve),
        normalized_rfu_replicates: tables.normalized_rfu,
        normalized_mefl_replicates: tables.normalized_mefl,
        normalized_mefl_average: tables.normalized_mefl_average,
        artifacts,
        stats,
    })
}

fn validate_alignment(od: &RawSheet, fluorescence: &RawSheet) -> Result<(), AppError> {
    if od.n_rows() != fluorescence.n_rows() {
        return Err(AppError::Alignment(format!(
            "OD600 and fluorescence time axes do not match: '{}' has {} rows, '{}' has {}.",
            od.name,
            od.n_rows(),
            fluorescence.name,
            fluorescence.n_rows()
        )));
    }
    Ok(())
}

/// Find the table for `plot` and check every requested column is in it.
fn resolve_plot<'t>(plot: &'t PlotSpec, tables: &'t Tables) -> Result<(&'t PlotSpec, &'t MeasurementTable), AppError> {
    let table = tables.source(plot.source).ok_or_else(|| {
        AppError::config(format!(
            "Plot source '{}' requested but data not available.",
            plot.source
        ))
    })?;
    let missing: Vec<&str> = plot
        .columns
        .iter()
        .map(String::as_str)
        .filter(|c| !table.has_column(c))
        .collect();
    if !missing.is_empty() {
        return Err(AppError::config(format!(
            "Columns {missing:?} not found in table for plot '{}'.",
            plot.display_name()
        )));
    }
    Ok((plot, table))
}

fn line_specs(plot: &PlotSpec) -> Result<Vec<LineSpec>, AppError> {
    let colors = plot
        .colors
        .as_ref()
        .map(|names| {
            names
                .iter()
                .map(|name| {
                    parse_color(name).ok_or_else(|| {
                        AppError::config(format!("Plot '{}': unknown color '{name}'.", plot.display_name()))
                    })
                })
                .collect::<Result<Vec<_>, _>>()
        })
        .transpose()?;
    Ok(LineSpec::for_columns(&plot.columns, plot.labels.as_deref(), colors.as_deref()))
}
