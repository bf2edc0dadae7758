//! Pelagic Chl-a along the lake centerline in the last year of each decade,
//! one line per month from July to October (Fig. 3).

use super::{basin_lines, grid_shape, load_centerline, CENTERLINE_KM};
use crate::{Settings, TaskReport};
use chla_analysis::spatial::{profile, Zone};
use chla_chart::draw::{self, Area};
use chla_chart::palette::COLORBLIND;
use chla_chart::{write_png, Canvas, Frame};
use chla_obs::{CenterlineTable, ChlaError, Result};
use log::info;

pub const FIGURE_FILE: &str = "MonthlyCenterlineComparison_Fig3.png";
pub const MONTHS: [u32; 4] = [7, 8, 9, 10];

/// One panel: the profile of each month of `year`.
struct YearPanel {
    year: i32,
    months: Vec<Vec<(f64, f64)>>,
}

pub fn run(settings: &Settings) -> Result<TaskReport> {
    let table = load_centerline(settings)?;
    let mut report = TaskReport::default();

    let panels: Vec<YearPanel> = settings
        .config
        .trend
        .decades
        .spans()
        .iter()
        .map(|span| year_panel(&table, span.end))
        .collect();
    for panel in &panels {
        let counts: Vec<usize> = panel.months.iter().map(Vec::len).collect();
        info!("{}: July-October profile points {:?}", panel.year, counts);
        if counts.iter().all(|n| *n == 0) {
            report.skip(format!("centerline {}", panel.year), "no July-October pelagic values");
        }
    }
    if panels.iter().all(|p| p.months.iter().all(Vec::is_empty)) {
        return Err(ChlaError::insufficient(
            "centerline-months",
            "no pelagic values in the plotted years",
        ));
    }

    let (rows, cols) = grid_shape(panels.len());
    let figure = write_png(
        &settings.output(FIGURE_FILE),
        Canvas::grid(rows as u32, cols as u32),
        |area| draw_panels(area, &panels, (rows, cols)),
    )?;
    report.output(figure);
    Ok(report)
}

fn year_panel(table: &CenterlineTable, year: i32) -> YearPanel {
    YearPanel {
        year,
        months: MONTHS
            .iter()
            .map(|m| profile(table.for_year_month(year, *m), Zone::Pelagic))
            .collect(),
    }
}

fn draw_panels(area: &Area, panels: &[YearPanel], shape: (usize, usize)) -> anyhow::Result<()> {
    for (cell, panel) in area.split_evenly(shape).iter().zip(panels) {
        let frame = Frame::around(panel.months.iter().flatten().copied(), 0.05)
            .unwrap_or_else(|| Frame::new(CENTERLINE_KM, 0.0..1.0))
            .with_x(CENTERLINE_KM);
        let mut chart = frame.build(cell)?;
        basin_lines(&mut chart, &frame)?;
        for (points, color) in panel.months.iter().zip(COLORBLIND.iter()) {
            draw::line(&mut chart, points, color, 3)?;
        }
    }
    Ok(())
}
