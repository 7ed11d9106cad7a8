//! Scatter of the fluorescein standards with the fitted RFU → MEFL line.

use plotters::coord::Shift;
use plotters::prelude::*;

use super::lines::format_tick;
use super::{Figure, draw_err, padded_range};
use crate::domain::CalibrationCurve;

pub struct CalibrationChart<'a> {
    pub curve: &'a CalibrationCurve,
}

impl CalibrationChart<'_> {
    fn annotation(&self) -> [String; 3] {
        [
            format!("Slope = {:.2e}", self.curve.slope),
            format!("Intercept = {:.2e}", self.curve.intercept),
            format!("R² = {:.6}", self.curve.r_squared),
        ]
    }
}

impl Figure for CalibrationChart<'_> {
    fn draw<DB: DrawingBackend>(&self, root: &DrawingArea<DB, Shift>) -> Result<(), String> {
        root.fill(&WHITE).map_err(draw_err)?;

        let curve = self.curve;
        // The line is drawn from x = 0 so the intercept is visible.
        let (x0, x1) = padded_range(curve.signals.iter().copied().chain([0.0]));
        let fitted = [(x0, curve.convert(x0)), (x1, curve.convert(x1))];
        let (y0, y1) = padded_range(curve.molecules.iter().copied().chain(fitted.iter().map(|p| p.1)));

        let mut chart = ChartBuilder::on(root)
            .caption("RFU to MEFL Linear Regression", ("sans-serif", 20).into_font())
            .margin(10)
            .set_label_area_size(LabelAreaPosition::Left, 70)
            .set_label_area_size(LabelAreaPosition::Bottom, 40)
            .build_cartesian_2d(x0..x1, y0..y1)
            .map_err(draw_err)?;

        chart
            .configure_mesh()
            .x_desc("Relative fluorescence units (RFU)")
            .y_desc("Molecules of equivalent fluorescein (MEFL)")
            .x_label_formatter(&|v| format_tick(*v))
            .y_label_formatter(&|v| format_tick(*v))
            .draw()
            .map_err(draw_err)?;

        chart
            .draw_series(LineSeries::new(fitted, BLACK.mix(0.7).stroke_width(1)))
            .map_err(draw_err)?;
        chart
            .draw_series(
                curve
                    .signals
                    .iter()
                    .zip(&curve.molecules)
                    .map(|(&x, &y)| Circle::new((x, y), 4, BLUE.filled())),
            )
            .map_err(draw_err)?;

        let style = ("sans-serif", 14).into_font();
        for (i, line) in self.annotation().iter().enumerate() {
            root.draw(&Text::new(line.as_str(), (100, 50 + 18 * i as i32), style.clone()))
                .map_err(draw_err)?;
        }

        Ok(())
    }
}
