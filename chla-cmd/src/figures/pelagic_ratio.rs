//! August littoral/pelagic Chl-a ratios along the north and south shores,
//! by decade and centerline basin (Fig. 6).

use super::load_centerline;
use crate::{Settings, TaskReport};
use chla_analysis::spatial::{littoral_ratios, LittoralRatios, RatioSamples};
use chla_chart::draw::{self, bar_center, Area, BoxStats};
use chla_chart::palette::COLORBLIND;
use chla_chart::{write_png, Canvas, Frame};
use chla_obs::{CenterlineBasin, ChlaError, Result};
use chla_utils::stats;
use log::{info, warn};

pub const FIGURE_FILE: &str = "SouthNorthPelagicRatio_Fig6.png";
pub const MONTH: u32 = 8;

pub fn run(settings: &Settings) -> Result<TaskReport> {
    let table = load_centerline(settings)?;
    let scheme = &settings.config.trend.decades;
    let mut report = TaskReport::default();

    let ratios = littoral_ratios(&table.records, MONTH, scheme);
    if ratios.skipped_zero_pelagic > 0 {
        warn!(
            "{} August records with zero pelagic Chl-a left out of the ratios",
            ratios.skipped_zero_pelagic
        );
    }
    if ratios.groups.is_empty() {
        return Err(ChlaError::insufficient(
            "pelagic-ratio",
            "no August records with both littoral and pelagic values",
        ));
    }

    for (d, span) in scheme.spans().iter().enumerate() {
        for basin in CenterlineBasin::ALL {
            match ratios.get(basin, d) {
                Some(samples) => info!(
                    "{} basin {}: north/pelagic {} south/pelagic {}",
                    span.label,
                    basin.label(),
                    mean_text(&samples.north),
                    mean_text(&samples.south)
                ),
                None => report.skip(
                    format!("{} basin {}", span.label, basin.label()),
                    "no August ratios",
                ),
            }
        }
    }

    let decades = scheme.spans().len();
    let figure = write_png(&settings.output(FIGURE_FILE), Canvas::grid(1, 2), |area| {
        draw_ratios(area, &ratios, decades)
    })?;
    report.output(figure);
    Ok(report)
}

fn mean_text(values: &[f64]) -> String {
    match stats::mean(values) {
        Some(mean) => format!("{:.3} (n={})", mean, values.len()),
        None => "-".to_string(),
    }
}

/// North shore on the left, south shore on the right; decades along x and
/// one box per basin within each decade.
fn draw_ratios(area: &Area, ratios: &LittoralRatios, decades: usize) -> anyhow::Result<()> {
    let panels = area.split_evenly((1, 2));
    let shores: [fn(&RatioSamples) -> &[f64]; 2] = [north, south];

    let all: Vec<(f64, f64)> = ratios
        .groups
        .values()
        .flat_map(|s| s.north.iter().chain(&s.south).map(|v| (0.0, *v)))
        .collect();
    let frame = Frame::around(all, 0.05)
        .unwrap_or_else(|| Frame::new(0.0..1.0, 0.0..1.0))
        .with_x(-0.6..decades as f64 - 0.4);
    let basins = CenterlineBasin::ALL.len();
    let box_width = 0.8 / basins as f64 * 0.8;

    for (panel, shore) in panels.iter().zip(shores) {
        let mut chart = frame.build(panel)?;
        for d in 0..decades {
            for basin in CenterlineBasin::ALL {
                let Some(b) = ratios.get(basin, d).and_then(|s| BoxStats::from_values(shore(s))) else {
                    continue;
                };
                let x = bar_center(d, basin.index(), basins);
                draw::box_plot(&mut chart, x, box_width, &b, &COLORBLIND[basin.index() % COLORBLIND.len()])?;
            }
        }
    }
    Ok(())
}

fn north(samples: &RatioSamples) -> &[f64] {
    &samples.north
}

fn south(samples: &RatioSamples) -> &[f64] {
    &samples.south
}
