//! Phenology Estimator: start of season, peak timing, amplitude and area
//! under the curve from one basin's seasonal Chl-a curve.

use crate::config::PhenologyConfig;
use crate::interpolation::daily_grid;
use crate::smoothing::{rolling_mean, savitzky_golay};
use crate::trend::{DecadeScheme, DecadeSpan};
use chla_obs::{ChlaError, Observation, Result};
use chla_utils::stats;
use log::debug;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// What a seasonal curve pools: one calendar year, or all years of a decade span.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum SeasonKey {
    Year(i32),
    Composite { label: String, start: i32, end: i32 },
}

impl SeasonKey {
    pub fn composite(span: &DecadeSpan) -> Self {
        SeasonKey::Composite {
            label: span.label.clone(),
            start: span.start,
            end: span.end,
        }
    }

    /// Year used to place this season on a time axis.
    pub fn representative_year(&self) -> i32 {
        match self {
            SeasonKey::Year(year) => *year,
            SeasonKey::Composite { start, end, .. } => (start + end) / 2,
        }
    }

    pub fn contains(&self, year: i32) -> bool {
        match self {
            SeasonKey::Year(y) => *y == year,
            SeasonKey::Composite { start, end, .. } => (*start..=*end).contains(&year),
        }
    }
}

impl fmt::Display for SeasonKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SeasonKey::Year(year) => write!(f, "{year}"),
            SeasonKey::Composite { label, .. } => f.write_str(label),
        }
    }
}

/// Mean Chl-a per day-of-year for one (basin, season key), ordered by day.
#[derive(Debug, Clone, PartialEq)]
pub struct SeasonalSeries {
    pub basin: String,
    pub key: SeasonKey,
    /// (day-of-year, mean Chl-a) with one entry per observed day
    pub points: Vec<(u16, f64)>,
    /// observations without a Chl-a value
    pub dropped_missing: usize,
}

impl SeasonalSeries {
    /// Average the observations of one basin and season key per day-of-year.
    ///
    /// Observations of other basins or outside the key are ignored; those
    /// without a Chl-a value are dropped and counted.
    pub fn from_observations<'a, I>(basin: &str, key: SeasonKey, observations: I) -> Self
    where
        I: IntoIterator<Item = &'a Observation>,
    {
        let mut by_day: BTreeMap<u16, (f64, usize)> = BTreeMap::new();
        let mut dropped_missing = 0;
        for obs in observations {
            if !obs.basin.eq_ignore_ascii_case(basin) || !key.contains(obs.year()) {
                continue;
            }
            match obs.chla {
                Some(value) => {
                    let entry = by_day.entry(obs.doy).or_insert((0.0, 0));
                    entry.0 += value;
                    entry.1 += 1;
                }
                None => dropped_missing += 1,
            }
        }
        SeasonalSeries {
            basin: basin.to_string(),
            key,
            points: by_day
                .into_iter()
                .map(|(day, (sum, n))| (day, sum / n as f64))
                .collect(),
            dropped_missing,
        }
    }

    /// Build a series from `(day, value)` pairs; repeated days are averaged.
    pub fn from_points(basin: &str, key: SeasonKey, points: &[(u16, f64)]) -> Self {
        let mut by_day: BTreeMap<u16, Vec<f64>> = BTreeMap::new();
        for &(day, value) in points {
            by_day.entry(day).or_default().push(value);
        }
        SeasonalSeries {
            basin: basin.to_string(),
            key,
            points: by_day
                .into_iter()
                .filter_map(|(day, values)| stats::mean(&values).map(|m| (day, m)))
                .collect(),
            dropped_missing: 0,
        }
    }

    /// One series per calendar year present for `basin`.
    pub fn yearly(basin: &str, observations: &[Observation]) -> Vec<SeasonalSeries> {
        let mut years: Vec<i32> = observations
            .iter()
            .filter(|o| o.basin.eq_ignore_ascii_case(basin))
            .map(|o| o.year())
            .collect();
        years.sort_unstable();
        years.dedup();
        years
            .into_iter()
            .map(|year| SeasonalSeries::from_observations(basin, SeasonKey::Year(year), observations))
            .collect()
    }

    /// One composite series per decade span; spans without data are skipped.
    pub fn composites(
        basin: &str,
        observations: &[Observation],
        scheme: &DecadeScheme,
    ) -> Vec<SeasonalSeries> {
        scheme
            .spans()
            .iter()
            .map(|span| SeasonalSeries::from_observations(basin, SeasonKey::composite(span), observations))
            .filter(|s| !s.points.is_empty() || s.dropped_missing > 0)
            .collect()
    }

    /// Analysis unit used in logs and error messages.
    pub fn unit(&self) -> String {
        format!("{} {}", self.basin, self.key)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhenologyMetrics {
    pub basin: String,
    pub key: SeasonKey,
    /// start of season, day-of-year
    pub sos: u16,
    pub peak_doy: u16,
    pub peak_value: f64,
    pub min_value: f64,
    pub max_value: f64,
    pub amplitude: f64,
    /// area under the smoothed curve from SOS to the end of the season
    pub auc: f64,
}

/// Selects one field of [`PhenologyMetrics`] for trend testing and plotting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum PhenologyMetric {
    PeakDoy,
    Sos,
    Amplitude,
    Auc,
    PeakValue,
}

impl PhenologyMetric {
    pub fn name(&self) -> &'static str {
        match self {
            PhenologyMetric::PeakDoy => "peak_doy",
            PhenologyMetric::Sos => "sos",
            PhenologyMetric::Amplitude => "amplitude",
            PhenologyMetric::Auc => "auc",
            PhenologyMetric::PeakValue => "peak_value",
        }
    }

    pub fn value(&self, metrics: &PhenologyMetrics) -> f64 {
        match self {
            PhenologyMetric::PeakDoy => metrics.peak_doy as f64,
            PhenologyMetric::Sos => metrics.sos as f64,
            PhenologyMetric::Amplitude => metrics.amplitude,
            PhenologyMetric::Auc => metrics.auc,
            PhenologyMetric::PeakValue => metrics.peak_value,
        }
    }

    /// `(representative year, value)` pairs, ready for decade bucketing.
    pub fn yearly_values(&self, metrics: &[PhenologyMetrics]) -> Vec<(i32, f64)> {
        metrics
            .iter()
            .map(|m| (m.key.representative_year(), self.value(m)))
            .collect()
    }
}

/// Smoothed daily curve of one series, restricted to the season window.
#[derive(Debug, Clone, PartialEq)]
pub struct SmoothedSeason {
    pub days: Vec<u16>,
    pub values: Vec<f64>,
}

pub struct PhenologyEstimator<'a> {
    config: &'a PhenologyConfig,
}

impl<'a> PhenologyEstimator<'a> {
    pub fn new(config: &'a PhenologyConfig) -> Self {
        PhenologyEstimator { config }
    }

    /// Interpolate, smooth and clip one series to the season window.
    pub fn smooth(&self, series: &SeasonalSeries) -> Result<SmoothedSeason> {
        let cfg = self.config;
        let unit = series.unit();

        let in_season: Vec<u16> = series
            .points
            .iter()
            .map(|(day, _)| *day)
            .filter(|day| (cfg.season_start..=cfg.season_end).contains(day))
            .collect();
        if in_season.len() < cfg.min_observations {
            return Err(ChlaError::insufficient(
                unit,
                format!(
                    "{} observed days in the season window, need {}",
                    in_season.len(),
                    cfg.min_observations
                ),
            ));
        }
        let span = in_season.last().copied().unwrap_or(0) - in_season.first().copied().unwrap_or(0);
        if span < cfg.min_span_days {
            return Err(ChlaError::insufficient(
                unit,
                format!("observations span {} days, need {}", span, cfg.min_span_days),
            ));
        }

        let points: Vec<(f64, f64)> = series
            .points
            .iter()
            .map(|(day, value)| (*day as f64, *value))
            .collect();
        let grid = daily_grid(&points, cfg.grid_start, cfg.grid_end)
            .ok_or_else(|| ChlaError::insufficient(&unit, "no observations"))?;
        let mut smoothed = rolling_mean(&grid, cfg.rolling_window);
        if cfg.savgol_window > 1 {
            smoothed = savitzky_golay(&smoothed, cfg.savgol_window, cfg.savgol_order);
        }

        let (days, values): (Vec<u16>, Vec<f64>) = (cfg.grid_start..=cfg.grid_end)
            .zip(smoothed)
            .filter(|(day, _)| (cfg.season_start..=cfg.season_end).contains(day))
            .unzip();
        if days.is_empty() {
            return Err(ChlaError::insufficient(unit, "daily grid misses the season window"));
        }
        Ok(SmoothedSeason { days, values })
    }

    /// Derive the phenology metrics of one series.
    pub fn estimate(&self, series: &SeasonalSeries) -> Result<PhenologyMetrics> {
        let season = self.smooth(series)?;
        let unit = series.unit();
        let (min_value, max_value) = stats::min_max(&season.values)
            .ok_or_else(|| ChlaError::insufficient(&unit, "empty season"))?;
        let amplitude = max_value - min_value;
        if !(amplitude > 0.0) {
            return Err(ChlaError::insufficient(unit, "flat seasonal signal"));
        }

        let threshold = min_value + self.config.sos_fraction * amplitude;
        let sos_idx = season
            .values
            .iter()
            .position(|v| *v > threshold)
            .ok_or_else(|| ChlaError::insufficient(&unit, "signal never crosses the SOS threshold"))?;
        // the maximum lies above the threshold, so searching from SOS always finds it
        let peak_idx = sos_idx
            + season.values[sos_idx..]
                .iter()
                .position(|v| *v >= max_value - self.config.peak_tolerance)
                .ok_or_else(|| ChlaError::insufficient(&unit, "no peak"))?;

        // runs to the last smoothed day, min(season_end, grid_end)
        let xs: Vec<f64> = season.days[sos_idx..].iter().map(|d| *d as f64).collect();
        let auc = stats::trapezoid(&xs, &season.values[sos_idx..]);

        let metrics = PhenologyMetrics {
            basin: series.basin.clone(),
            key: series.key.clone(),
            sos: season.days[sos_idx],
            peak_doy: season.days[peak_idx],
            peak_value: season.values[peak_idx],
            min_value,
            max_value,
            amplitude,
            auc,
        };
        debug!(
            "{}: sos={} peak={} ({:.2}) amplitude={:.2} auc={:.1}",
            unit, metrics.sos, metrics.peak_doy, metrics.peak_value, metrics.amplitude, metrics.auc
        );
        Ok(metrics)
    }
}
