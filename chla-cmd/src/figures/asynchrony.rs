//! Spatio-temporal asynchrony: July-September pelagic Chl-a in 2 km
//! centerline bins as a log-scaled heat map, with the September minus
//! August difference per bin drawn over it (Fig. 4).

use super::load_centerline;
use crate::{Settings, TaskReport};
use chla_analysis::spatial::BinnedMonthly;
use chla_chart::draw::{self, Area};
use chla_chart::palette::{plasma, LogNorm};
use chla_chart::{write_png, Canvas, Frame};
use chla_obs::{ChlaError, Result};
use log::{debug, info};
use plotters::style::{BLACK, RGBColor};

pub const FIGURE_FILE: &str = "SpatioTemporalAsynchrony_Fig4.png";
pub const MONTHS: [u32; 3] = [7, 8, 9];
pub const BIN_KM: f64 = 2.0;

pub fn run(settings: &Settings) -> Result<TaskReport> {
    let table = load_centerline(settings)?;
    let mut report = TaskReport::default();

    let binned = BinnedMonthly::from_records(&table.records, BIN_KM, &MONTHS);
    let (vmin, vmax) = binned.value_range().ok_or_else(|| {
        ChlaError::insufficient("asynchrony", "no July-September pelagic values")
    })?;
    let norm = LogNorm::new(vmin, vmax);
    info!(
        "{} distance bins, Chl-a range {:.2}-{:.2} (colour scale from {:.2})",
        binned.bins.len(),
        vmin,
        vmax,
        norm.vmin
    );

    let difference = binned.difference(9, 8);
    for (bin, diff) in binned.bins.iter().zip(&difference) {
        match diff {
            Some(d) => debug!("bin {:>4.0} km: Sep - Aug = {:+.2}", bin, d),
            None => report.skip(format!("bin {bin:.0} km"), "August or September has no data"),
        }
    }
    let later = difference.iter().flatten().filter(|d| **d > 0.0).count();
    info!(
        "September above August in {} of {} bins",
        later,
        difference.iter().flatten().count()
    );

    let figure = write_png(
        &settings.output(FIGURE_FILE),
        Canvas {
            width: 2400,
            height: 900,
        },
        |area| draw_heat_map(area, &binned, &difference, &norm),
    )?;
    report.output(figure);
    Ok(report)
}

fn draw_heat_map(
    area: &Area,
    binned: &BinnedMonthly,
    difference: &[Option<f64>],
    norm: &LogNorm,
) -> anyhow::Result<()> {
    let width = binned.bin_width;
    let (Some(first), Some(last)) = (binned.bins.first(), binned.bins.last()) else {
        anyhow::bail!("no distance bins to draw");
    };
    let x = *first..*last + width;

    // one row per month, July at the bottom
    let heat = Frame::new(x.clone(), 0.0..binned.months.len() as f64);
    let mut chart = heat.build(area)?;
    let cells: Vec<(f64, f64, f64, f64, RGBColor)> = binned
        .bins
        .iter()
        .zip(&binned.means)
        .flat_map(|(left, row)| {
            row.iter().enumerate().filter_map(move |(m, v)| {
                v.map(|v| (*left, left + width, m as f64, m as f64 + 1.0, plasma(norm.normalize(v))))
            })
        })
        .collect();
    draw::cells(&mut chart, cells)?;
    draw::outline(&mut chart, &heat)?;

    let points: Vec<(f64, f64)> = binned
        .bins
        .iter()
        .zip(difference)
        .filter_map(|(left, d)| d.map(|d| (left + width / 2.0, d)))
        .collect();
    let Some(diff_frame) = Frame::around(points.iter().copied(), 0.1) else {
        return Ok(());
    };
    let diff_frame = diff_frame.with_x(x);
    let mut overlay = diff_frame.overlay(area)?;
    if diff_frame.y.contains(&0.0) {
        draw::hline(&mut overlay, 0.0, &diff_frame.x, &BLACK)?;
    }
    draw::line(&mut overlay, &points, &BLACK, 3)?;
    draw::scatter(&mut overlay, &points, &BLACK, 5)?;
    Ok(())
}
