//! Time-course line plots of table columns.

use plotters::coord::Shift;
use plotters::prelude::*;

use super::{Figure, TAB10, draw_err, padded_range};
use crate::domain::MeasurementTable;

/// One line: which column to draw, its legend label and color.
#[derive(Debug, Clone)]
pub struct LineSpec {
    pub column: String,
    pub label: String,
    pub color: RGBColor,
}

impl LineSpec {
    /// Specs for `columns`, falling back to column names and the `tab10` palette.
    pub fn for_columns(columns: &[String], labels: Option<&[String]>, colors: Option<&[RGBColor]>) -> Vec<LineSpec> {
        columns
            .iter()
            .enumerate()
            .map(|(i, column)| LineSpec {
                column: column.clone(),
                label: labels
                    .and_then(|l| l.get(i))
                    .cloned()
                    .unwrap_or_else(|| column.clone()),
                color: colors
                    .and_then(|c| c.get(i))
                    .copied()
                    .unwrap_or(TAB10[i % TAB10.len()]),
            })
            .collect()
    }
}

pub struct LineChart<'a> {
    pub table: &'a MeasurementTable,
    pub lines: Vec<LineSpec>,
    pub title: &'a str,
    pub units: &'a str,
}

impl LineChart<'_> {
    /// Runs of consecutive present values for one column; missing cells split runs.
    fn segments(&self, column: &str) -> Vec<Vec<(f64, f64)>> {
        let Some(series) = self.table.column(column) else {
            return Vec::new();
        };
        let mut out = vec![Vec::new()];
        for (&x, value) in self.table.index().iter().zip(&series.values) {
            match value.filter(|v| v.is_finite()) {
                Some(y) => {
                    if let Some(run) = out.last_mut() {
                        run.push((x, y));
                    }
                }
                None if out.last().is_some_and(|run| !run.is_empty()) => out.push(Vec::new()),
                None => {}
            }
        }
        if out.len() > 1 && out.last().is_some_and(Vec::is_empty) {
            out.pop();
        }
        out
    }
}

impl Figure for LineChart<'_> {
    fn draw<DB: DrawingBackend>(&self, root: &DrawingArea<DB, Shift>) -> Result<(), String> {
        root.fill(&WHITE).map_err(draw_err)?;

        let (x0, x1) = padded_range(self.table.index().iter().copied());
        let (y0, y1) = padded_range(
            self.lines
                .iter()
                .filter_map(|l| self.table.column(&l.column))
                .flat_map(|s| s.values.iter().flatten().copied()),
        );

        let mut chart = ChartBuilder::on(root)
            .caption(self.title, ("sans-serif", 20).into_font())
            .margin(10)
            .set_label_area_size(LabelAreaPosition::Left, 70)
            .set_label_area_size(LabelAreaPosition::Bottom, 40)
            .build_cartesian_2d(x0..x1, y0..y1)
            .map_err(draw_err)?;

        chart
            .configure_mesh()
            .x_desc("Time (hours)")
            .y_desc(self.units)
            .y_label_formatter(&|v| format_tick(*v))
            .draw()
            .map_err(draw_err)?;

        for line in &self.lines {
            let color = line.color;
            let style = color.stroke_width(2);
            for (i, run) in self.segments(&line.column).into_iter().enumerate() {
                let mut series = chart
                    .draw_series(LineSeries::new(run, style))
                    .map_err(draw_err)?;
                if i == 0 {
                    series
                        .label(line.label.as_str())
                        .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2)));
                }
            }
        }

        chart
            .configure_series_labels()
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .position(SeriesLabelPosition::UpperLeft)
            .draw()
            .map_err(draw_err)?;

        Ok(())
    }
}

/// Ticks switch to scientific notation for molecule-scale values.
pub(crate) fn format_tick(v: f64) -> String {
    if v != 0.0 && (v.abs() >= 1e5 || v.abs() < 1e-3) {
        format!("{v:.1e}")
    } else {
        format!("{v:.3}")
            .trim_end_matches('0')
            .trim_end_matches('.')
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Series;
    use crate::plot::render;

    fn table() -> MeasurementTable {
        MeasurementTable::from_columns(
            vec![0.0, 0.5, 1.0, 1.5, 2.0],
            vec![
                Series::new("wt", vec![Some(1.0), Some(2.0), None, Some(4.0), Some(5.0)]),
                Series::new("ko", vec![None, None, None, None, None]),
            ],
        )
        .unwrap()
    }

    #[test]
    fn missing_cells_split_lines() {
        let table = table();
        let chart = LineChart {
            table: &table,
            lines: Vec::new(),
            title: "t",
            units: "u",
        };
        let runs = chart.segments("wt");
        assert_eq!(runs, vec![vec![(0.0, 1.0), (0.5, 2.0)], vec![(1.5, 4.0), (2.0, 5.0)]]);
        // An all-missing column still yields one (empty) run, so it keeps its legend entry.
        assert_eq!(chart.segments("ko"), vec![Vec::<(f64, f64)>::new()]);
    }

    #[test]
    fn specs_fall_back_to_names_and_palette() {
        let cols = vec!["a".to_string(), "b".to_string()];
        let labels = vec!["Alpha".to_string(), "Beta".to_string()];
        let specs = LineSpec::for_columns(&cols, Some(&labels), None);
        assert_eq!(specs[1].label, "Beta");
        assert_eq!(specs[1].color, TAB10[1]);
        let bare = LineSpec::for_columns(&cols, None, Some(&[BLACK]));
        assert_eq!(bare[0].label, "a");
        assert_eq!(bare[0].color, BLACK);
        assert_eq!(bare[1].color, TAB10[1]);
    }

    #[test]
    fn tick_labels_are_compact() {
        assert_eq!(format_tick(0.5), "0.5");
        assert_eq!(format_tick(2.0), "2");
        assert_eq!(format_tick(1.2e14), "1.2e14");
    }

    #[test]
    fn renders_svg_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("growth.svg");
        let table = table();
        let chart = LineChart {
            table: &table,
            lines: LineSpec::for_columns(&["wt".to_string(), "ko".to_string()], None, None),
            title: "Growth curve",
            units: "OD600",
        };
        render(&path, &chart).unwrap();
        let svg = std::fs::read_to_string(&path).unwrap();
        assert!(svg.contains("<svg"));
        assert!(svg.contains("Growth curve"));
    }

    #[test]
    fn renders_png_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("growth.png");
        let table = table();
        let chart = LineChart {
            table: &table,
            lines: LineSpec::for_columns(&["wt".to_string(), "ko".to_string()], None, None),
            title: "Growth curve",
            units: "OD600",
        };
        render(&path, &chart).unwrap();
        let bytes = std::fs::read(&path).unwrap();
        assert!(bytes.starts_with(b"\x89PNG"), "not a PNG file");
    }
}
