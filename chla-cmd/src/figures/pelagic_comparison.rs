//! August Chl-a profiles along the north coast, the south coast and the
//! pelagic centerline, one panel per year (Fig. 7).

use super::{basin_lines, grid_shape, load_centerline, CENTERLINE_KM};
use crate::{Settings, TaskReport};
use chla_analysis::spatial::{profile, Zone};
use chla_chart::draw::{self, Area};
use chla_chart::palette::ZONE_COLORS;
use chla_chart::{write_png, Canvas, Frame};
use chla_obs::{CenterlineTable, ChlaError, Result};
use log::info;

pub const FIGURE_FILE: &str = "SouthNorthPelagicComparison_Fig7.png";
pub const MONTH: u32 = 8;

/// Profiles of one year in [`Zone::ALL`] order.
struct YearProfiles {
    year: i32,
    zones: Vec<Vec<(f64, f64)>>,
}

pub fn run(settings: &Settings) -> Result<TaskReport> {
    let table = load_centerline(settings)?;
    let mut report = TaskReport::default();

    let years: Vec<YearProfiles> = table
        .years()
        .into_iter()
        .map(|year| year_profiles(&table, year))
        .filter(|p| p.zones.iter().any(|z| !z.is_empty()))
        .collect();
    if years.is_empty() {
        return Err(ChlaError::insufficient("pelagic-comparison", "no August records"));
    }
    for profiles in &years {
        for (zone, points) in Zone::ALL.iter().zip(&profiles.zones) {
            if points.is_empty() {
                report.skip(format!("{} {}", profiles.year, zone.name()), "no August values");
            }
        }
        info!(
            "{}: {} August points per zone",
            profiles.year,
            profiles.zones.iter().map(Vec::len).max().unwrap_or(0)
        );
    }

    let (rows, cols) = grid_shape(years.len());
    let figure = write_png(
        &settings.output(FIGURE_FILE),
        Canvas::grid(rows as u32, cols as u32),
        |area| draw_profiles(area, &years, (rows, cols)),
    )?;
    report.output(figure);
    Ok(report)
}

fn year_profiles(table: &CenterlineTable, year: i32) -> YearProfiles {
    YearProfiles {
        year,
        zones: Zone::ALL
            .iter()
            .map(|zone| profile(table.for_year_month(year, MONTH), *zone))
            .collect(),
    }
}

fn draw_profiles(area: &Area, years: &[YearProfiles], shape: (usize, usize)) -> anyhow::Result<()> {
    for (panel, profiles) in area.split_evenly(shape).iter().zip(years) {
        let frame = Frame::around(profiles.zones.iter().flatten().copied(), 0.05)
            .unwrap_or_else(|| Frame::new(CENTERLINE_KM, 0.0..1.0))
            .with_x(CENTERLINE_KM);
        let mut chart = frame.build(panel)?;
        basin_lines(&mut chart, &frame)?;
        for (points, color) in profiles.zones.iter().zip(ZONE_COLORS.iter()) {
            draw::line(&mut chart, points, color, 3)?;
        }
    }
    Ok(())
}
