//! Chl-a and lake depth along the five south-north transects, with the
//! littoral boundaries where the depth crosses -2 m (Fig. 8).

use crate::{Settings, TaskReport};
use chla_analysis::spatial::littoral_boundaries;
use chla_chart::draw::{self, Area};
use chla_chart::palette::{CHLA_RED, DEPTH_BLUE, LITTORAL_GREY};
use chla_chart::{write_png, Canvas, Frame};
use chla_obs::{Result, Transect, TRANSECT_NAMES};
use chla_utils::stats;
use log::info;
use std::ops::Range;

pub const FIGURE_FILE: &str = "TransectionalOverlay_Fig8.png";
/// Depth of the littoral boundary, m (negative below the surface).
pub const LITTORAL_DEPTH_M: f64 = -2.0;
const DEPTH_RANGE: Range<f64> = -4.8..0.0;

/// The two western transects sit higher on the Chl-a scale.
fn chla_range(name: &str) -> Range<f64> {
    match name {
        "I" | "II" => 10.0..45.0,
        _ => 0.0..40.0,
    }
}

pub fn run(settings: &Settings) -> Result<TaskReport> {
    let mut report = TaskReport::default();
    let transects = TRANSECT_NAMES
        .iter()
        .map(|name| Transect::load(&settings.data_dir, name))
        .collect::<Result<Vec<_>>>()?;

    let mut boundaries = Vec::with_capacity(transects.len());
    for transect in &transects {
        let found = littoral_boundaries(&transect.points, LITTORAL_DEPTH_M);
        if found.is_empty() {
            report.skip(
                format!("transect {}", transect.name),
                "depth never crosses the littoral threshold",
            );
        }
        info!(
            "transect {}: {} points, littoral boundaries at {:?} km",
            transect.name,
            transect.points.len(),
            found
        );
        boundaries.push(found);
    }

    let distances: Vec<f64> = transects.iter().flat_map(|t| t.distances()).collect();
    let x = stats::min_max(&distances).map(|(lo, hi)| lo..hi).unwrap_or(0.0..1.0);

    let figure = write_png(
        &settings.output(FIGURE_FILE),
        Canvas {
            width: 1800,
            height: 2400,
        },
        |area| draw_transects(area, &transects, &boundaries, x),
    )?;
    report.output(figure);
    Ok(report)
}

/// One row per transect, all sharing the distance axis.
fn draw_transects(
    area: &Area,
    transects: &[Transect],
    boundaries: &[Vec<f64>],
    x: Range<f64>,
) -> anyhow::Result<()> {
    let rows = area.split_evenly((transects.len().max(1), 1));
    for ((panel, transect), bounds) in rows.iter().zip(transects).zip(boundaries) {
        let chla = Frame::new(x.clone(), chla_range(&transect.name));
        let mut chart = chla.build(panel)?;
        for km in bounds {
            draw::vline(&mut chart, *km, &chla.y, &LITTORAL_GREY, 10)?;
        }
        let points: Vec<(f64, f64)> = transect.points.iter().map(|p| (p.distance, p.chla)).collect();
        draw::line(&mut chart, &chla.clamp_points(&points), &CHLA_RED, 3)?;

        let depth = Frame::new(x.clone(), DEPTH_RANGE);
        let mut overlay = depth.overlay(panel)?;
        let points: Vec<(f64, f64)> = transect.points.iter().map(|p| (p.distance, p.depth)).collect();
        draw::line(&mut overlay, &depth.clamp_points(&points), &DEPTH_BLUE, 3)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chla_range_per_transect() {
        assert_eq!(chla_range("I"), 10.0..45.0);
        assert_eq!(chla_range("II"), 10.0..45.0);
        assert_eq!(chla_range("IV-2"), 0.0..40.0);
    }
}
