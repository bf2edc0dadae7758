//! One module per figure task.

use chla_chart::draw::{self, Chart};
use chla_chart::Frame;
use chla_obs::{CenterlineTable, Result, BASIN_BOUNDARIES_KM, CENTERLINE_FILE};
use plotters::style::BLACK;

use crate::Settings;

pub mod asynchrony;
pub mod centerline_fitting;
pub mod centerline_months;
pub mod pelagic_comparison;
pub mod pelagic_ratio;
pub mod phenology;
pub mod transect_overlay;

/// Distance axis of the centerline profiles, km.
pub(crate) const CENTERLINE_KM: std::ops::Range<f64> = -5.0..80.0;

pub(crate) fn load_centerline(settings: &Settings) -> Result<CenterlineTable> {
    let table = CenterlineTable::load(&settings.input(CENTERLINE_FILE))?;
    if table.missing_pelagic() > 0 {
        log::warn!(
            "{}: {} records without a pelagic value",
            CENTERLINE_FILE,
            table.missing_pelagic()
        );
    }
    Ok(table)
}

/// Rows and columns for `n` panels, two per row.
pub(crate) fn grid_shape(n: usize) -> (usize, usize) {
    match n {
        0 | 1 => (1, 1),
        n => ((n + 1) / 2, 2),
    }
}

/// Dashed basin boundaries across the panel.
pub(crate) fn basin_lines(chart: &mut Chart, frame: &Frame) -> anyhow::Result<()> {
    for km in BASIN_BOUNDARIES_KM {
        draw::vline(chart, km, &frame.y, &BLACK, 12)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_shape() {
        assert_eq!(grid_shape(0), (1, 1));
        assert_eq!(grid_shape(1), (1, 1));
        assert_eq!(grid_shape(4), (2, 2));
        assert_eq!(grid_shape(5), (3, 2));
    }
}
