//! Chart building blocks on top of plotters' cartesian charts.
//!
//! Axes are a plain frame with light grid lines at rounded ticks; scales are
//! fixed per panel so panels in a grid line up.

use crate::palette::GRID_GREY;
use anyhow::Result;
use chla_utils::stats;
use plotters::coord::cartesian::Cartesian2d;
use plotters::coord::types::RangedCoordf64;
use plotters::coord::Shift;
use plotters::prelude::*;
use std::ops::Range;

pub type Area<'b> = DrawingArea<BitMapBackend<'b>, Shift>;
pub type Chart<'a, 'b> = ChartContext<'a, BitMapBackend<'b>, Cartesian2d<RangedCoordf64, RangedCoordf64>>;

/// Data ranges of one panel.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub x: Range<f64>,
    pub y: Range<f64>,
}

impl Frame {
    pub fn new(x: Range<f64>, y: Range<f64>) -> Self {
        Frame {
            x: widen(x),
            y: widen(y),
        }
    }

    /// Smallest frame holding every finite point, padded by `pad` of each span.
    pub fn around<I>(points: I, pad: f64) -> Option<Frame>
    where
        I: IntoIterator<Item = (f64, f64)>,
    {
        let (xs, ys): (Vec<f64>, Vec<f64>) = points
            .into_iter()
            .filter(|(x, y)| x.is_finite() && y.is_finite())
            .unzip();
        let (x0, x1) = stats::min_max(&xs)?;
        let (y0, y1) = stats::min_max(&ys)?;
        Some(Frame::new(padded(x0, x1, pad), padded(y0, y1, pad)))
    }

    pub fn with_x(mut self, x: Range<f64>) -> Self {
        self.x = widen(x);
        self
    }

    pub fn with_y(mut self, y: Range<f64>) -> Self {
        self.y = widen(y);
        self
    }

    /// Builds the chart on `area` and draws the grid and frame.
    pub fn build<'a, 'b>(&self, area: &'a Area<'b>) -> Result<Chart<'a, 'b>> {
        let mut chart = self.overlay(area)?;

        let (x, y) = (&self.x, &self.y);
        let grid = GRID_GREY.stroke_width(1);
        chart.draw_series(
            nice_ticks(x.start, x.end, 6)
                .into_iter()
                .map(|t| PathElement::new(vec![(t, y.start), (t, y.end)], grid)),
        )?;
        chart.draw_series(
            nice_ticks(y.start, y.end, 5)
                .into_iter()
                .map(|t| PathElement::new(vec![(x.start, t), (x.end, t)], grid)),
        )?;
        outline(&mut chart, self)?;
        Ok(chart)
    }

    /// Same pixels as [`Frame::build`] but nothing drawn, for a second y
    /// scale laid over an existing panel.
    pub fn overlay<'a, 'b>(&self, area: &'a Area<'b>) -> Result<Chart<'a, 'b>> {
        Ok(ChartBuilder::on(area)
            .margin(24)
            .build_cartesian_2d(self.x.clone(), self.y.clone())?)
    }

    pub fn clamp_y(&self, y: f64) -> f64 {
        y.clamp(self.y.start, self.y.end)
    }

    /// Pins y values to the frame so lines stay inside the panel.
    pub fn clamp_points(&self, points: &[(f64, f64)]) -> Vec<(f64, f64)> {
        points.iter().map(|&(x, y)| (x, self.clamp_y(y))).collect()
    }
}

fn widen(range: Range<f64>) -> Range<f64> {
    if range.end > range.start {
        range
    } else {
        let half = if range.start == 0.0 { 1.0 } else { range.start.abs() * 0.05 };
        range.start - half..range.start + half
    }
}

fn padded(lo: f64, hi: f64, pad: f64) -> Range<f64> {
    let extra = (hi - lo) * pad;
    lo - extra..hi + extra
}

/// Round tick positions inside `[lo, hi]`, roughly `count` of them.
pub fn nice_ticks(lo: f64, hi: f64, count: usize) -> Vec<f64> {
    if !(hi > lo) || count == 0 {
        return Vec::new();
    }
    let raw = (hi - lo) / count as f64;
    let magnitude = 10f64.powf(raw.log10().floor());
    let step = [1.0, 2.0, 5.0, 10.0]
        .iter()
        .map(|m| m * magnitude)
        .find(|s| *s >= raw)
        .unwrap_or(10.0 * magnitude);
    let first = (lo / step).ceil() as i64;
    let last = (hi / step).floor() as i64;
    (first..=last).map(|i| i as f64 * step).collect()
}

/// Border of the frame; drawn again after filled content.
pub fn outline(chart: &mut Chart, frame: &Frame) -> Result<()> {
    chart.draw_series(std::iter::once(Rectangle::new(
        [(frame.x.start, frame.y.start), (frame.x.end, frame.y.end)],
        BLACK.stroke_width(2),
    )))?;
    Ok(())
}

pub fn line(chart: &mut Chart, points: &[(f64, f64)], color: &RGBColor, width: u32) -> Result<()> {
    chart.draw_series(LineSeries::new(points.iter().copied(), color.stroke_width(width)))?;
    Ok(())
}

pub fn scatter(chart: &mut Chart, points: &[(f64, f64)], color: &RGBColor, radius: u32) -> Result<()> {
    chart.draw_series(points.iter().map(|p| Circle::new(*p, radius, color.filled())))?;
    Ok(())
}

/// Vertical line across the frame, dashed when `dashes > 0`.
pub fn vline(chart: &mut Chart, x: f64, y: &Range<f64>, color: &RGBColor, dashes: usize) -> Result<()> {
    let style = color.stroke_width(2);
    if dashes == 0 {
        chart.draw_series(std::iter::once(PathElement::new(vec![(x, y.start), (x, y.end)], style)))?;
        return Ok(());
    }
    let step = (y.end - y.start) / (2 * dashes) as f64;
    chart.draw_series((0..dashes).map(|i| {
        let top = y.start + 2.0 * i as f64 * step;
        PathElement::new(vec![(x, top), (x, top + step)], style)
    }))?;
    Ok(())
}

pub fn hline(chart: &mut Chart, y: f64, x: &Range<f64>, color: &RGBColor) -> Result<()> {
    chart.draw_series(std::iter::once(PathElement::new(
        vec![(x.start, y), (x.end, y)],
        color.stroke_width(1),
    )))?;
    Ok(())
}

/// Grouped bars: group `g` is centred on `x = g`, series `s` of `series.len()`
/// share the group width. Bars rise from zero (or the frame bottom) and are
/// clipped to the frame; missing values leave a gap.
pub fn grouped_bars(
    chart: &mut Chart,
    frame: &Frame,
    series: &[Vec<Option<f64>>],
    colors: &[RGBColor],
) -> Result<()> {
    let n = series.len().max(1) as f64;
    let width = 0.8 / n;
    let base = frame.clamp_y(0.0);
    for (s, values) in series.iter().enumerate() {
        let color = colors[s % colors.len()];
        let offset = -0.4 + s as f64 * width;
        chart.draw_series(values.iter().enumerate().filter_map(|(g, v)| {
            v.map(|v| {
                let x0 = g as f64 + offset;
                Rectangle::new(
                    [(x0, base), (x0 + width * 0.9, frame.clamp_y(v))],
                    color.mix(0.85).filled(),
                )
            })
        }))?;
    }
    Ok(())
}

/// x position of series `s` within group `g`, matching [`grouped_bars`].
pub fn bar_center(group: usize, series: usize, series_count: usize) -> f64 {
    let width = 0.8 / series_count.max(1) as f64;
    group as f64 - 0.4 + series as f64 * width + width * 0.45
}

/// Filled rectangle cells, `(x0, x1, y0, y1, colour)`.
pub fn cells<I>(chart: &mut Chart, cells: I) -> Result<()>
where
    I: IntoIterator<Item = (f64, f64, f64, f64, RGBColor)>,
{
    chart.draw_series(
        cells
            .into_iter()
            .map(|(x0, x1, y0, y1, c)| Rectangle::new([(x0, y0), (x1, y1)], c.filled())),
    )?;
    Ok(())
}

/// Five-number summary with Tukey whiskers at 1.5 IQR.
#[derive(Debug, Clone, PartialEq)]
pub struct BoxStats {
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub low: f64,
    pub high: f64,
    pub outliers: Vec<f64>,
}

impl BoxStats {
    pub fn from_values(values: &[f64]) -> Option<BoxStats> {
        let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
        let (q1, median, q3) = stats::quartiles(&finite)?;
        let iqr = q3 - q1;
        let (fence_lo, fence_hi) = (q1 - 1.5 * iqr, q3 + 1.5 * iqr);
        let inside: Vec<f64> = finite
            .iter()
            .copied()
            .filter(|v| *v >= fence_lo && *v <= fence_hi)
            .collect();
        let (low, high) = stats::min_max(&inside).unwrap_or((q1, q3));
        let outliers = finite
            .into_iter()
            .filter(|v| *v < fence_lo || *v > fence_hi)
            .collect();
        Some(BoxStats {
            q1,
            median,
            q3,
            low,
            high,
            outliers,
        })
    }
}

/// Box at `x` of total width `width`.
pub fn box_plot(chart: &mut Chart, x: f64, width: f64, b: &BoxStats, color: &RGBColor) -> Result<()> {
    let half = width / 2.0;
    let outline = BLACK.stroke_width(1);
    chart.draw_series([
        Rectangle::new([(x - half, b.q1), (x + half, b.q3)], color.mix(0.6).filled()),
        Rectangle::new([(x - half, b.q1), (x + half, b.q3)], outline),
    ])?;
    chart.draw_series([
        PathElement::new(vec![(x - half, b.median), (x + half, b.median)], BLACK.stroke_width(2)),
        PathElement::new(vec![(x, b.q3), (x, b.high)], outline),
        PathElement::new(vec![(x, b.q1), (x, b.low)], outline),
        PathElement::new(vec![(x - half / 2.0, b.high), (x + half / 2.0, b.high)], outline),
        PathElement::new(vec![(x - half / 2.0, b.low), (x + half / 2.0, b.low)], outline),
    ])?;
    chart.draw_series(b.outliers.iter().map(|v| Circle::new((x, *v), 3, BLACK.stroke_width(1))))?;
    Ok(())
}
