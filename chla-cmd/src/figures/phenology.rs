//! Decade-composite phenology per basin (Table 1), decadal trend tests of
//! peak timing and start of season, and the summary bar chart (Fig. 9).

use crate::{Settings, TaskReport};
use chla_analysis::phenology::{PhenologyEstimator, PhenologyMetric, PhenologyMetrics, SeasonKey, SeasonalSeries};
use chla_analysis::trend::{DecadalTrendTester, DecadeBucket, DecadeScheme, TrendResult};
use chla_chart::draw::{self, Area};
use chla_chart::palette::{BASIN_COLORS, CHLA_RED};
use chla_chart::{write_bytes, write_png, Canvas, Frame};
use chla_obs::{ChlaError, Result, Station, StationTable, STATIONS_FILE};
use chla_utils::stats;
use log::{info, warn};
use serde::Serialize;
use std::path::{Path, PathBuf};

pub const TABLE_FILE: &str = "Phenology_Tab1.csv";
pub const FIGURE_FILE: &str = "Phenology_Tab1_Fig9.png";

const PANEL_METRICS: [PhenologyMetric; 4] = [
    PhenologyMetric::PeakDoy,
    PhenologyMetric::Sos,
    PhenologyMetric::Amplitude,
    PhenologyMetric::Auc,
];
const TESTED_METRICS: [PhenologyMetric; 2] = [PhenologyMetric::PeakDoy, PhenologyMetric::Sos];

pub fn run(settings: &Settings) -> Result<TaskReport> {
    let stations = StationTable::load(&settings.input(STATIONS_FILE))?;
    stations.warn_unknown_basins();

    let config = &settings.config;
    let scheme = &config.trend.decades;
    let estimator = PhenologyEstimator::new(&config.phenology);
    let tester = DecadalTrendTester::new(&config.trend);
    let mut report = TaskReport::default();

    let composites = decade_composites(&stations, &estimator, scheme, &mut report);
    if composites.is_empty() {
        return Err(ChlaError::insufficient(
            "phenology",
            "no basin has enough observations in any decade",
        ));
    }
    log_table(&composites);
    report.output(write_table(&settings.output(TABLE_FILE), &composites)?);

    for metric in TESTED_METRICS {
        let unit = format!("{} basin mean", metric.name());
        match tester.test_buckets(&unit, &basin_buckets(&composites, metric, scheme)) {
            Ok(result) => log_trend(&result, config.trend.alpha),
            Err(err) => report.skip_error(&err),
        }
    }

    for station in Station::ALL {
        let yearly = yearly_metrics(station, &stations, &estimator, &mut report);
        for metric in TESTED_METRICS {
            let unit = format!("{} {}", metric.name(), station.name());
            match tester.test_metric(&unit, &yearly, metric) {
                Ok(result) => log_trend(&result, config.trend.alpha),
                Err(err) => report.skip_error(&err),
            }
        }
    }

    let figure = write_png(&settings.output(FIGURE_FILE), Canvas::grid(2, 2), |area| {
        draw_summary(area, &composites, scheme)
    })?;
    report.output(figure);
    Ok(report)
}

/// Metrics of every (basin, decade) composite that has enough data.
fn decade_composites(
    stations: &StationTable,
    estimator: &PhenologyEstimator,
    scheme: &DecadeScheme,
    report: &mut TaskReport,
) -> Vec<PhenologyMetrics> {
    let mut metrics = Vec::new();
    for station in Station::ALL {
        for series in SeasonalSeries::composites(station.name(), &stations.observations, scheme) {
            estimate_into(&series, estimator, &mut metrics, report);
        }
    }
    metrics
}

fn yearly_metrics(
    station: Station,
    stations: &StationTable,
    estimator: &PhenologyEstimator,
    report: &mut TaskReport,
) -> Vec<PhenologyMetrics> {
    let mut metrics = Vec::new();
    for series in SeasonalSeries::yearly(station.name(), &stations.observations) {
        estimate_into(&series, estimator, &mut metrics, report);
    }
    metrics
}

fn estimate_into(
    series: &SeasonalSeries,
    estimator: &PhenologyEstimator,
    metrics: &mut Vec<PhenologyMetrics>,
    report: &mut TaskReport,
) {
    if series.dropped_missing > 0 {
        warn!(
            "{}: dropped {} observations without Chl-a",
            series.unit(),
            series.dropped_missing
        );
    }
    match estimator.estimate(series) {
        Ok(m) => metrics.push(m),
        Err(err) => report.skip_error(&err),
    }
}

/// Per-basin values of one metric grouped by decade. Each decade is
/// outlier-corrected across basins before its mean enters the trend test.
fn basin_buckets(composites: &[PhenologyMetrics], metric: PhenologyMetric, scheme: &DecadeScheme) -> Vec<DecadeBucket> {
    scheme
        .spans()
        .iter()
        .map(|span| {
            let key = SeasonKey::composite(span);
            let values = composites
                .iter()
                .filter(|m| m.key == key)
                .map(|m| (span.mid_year(), metric.value(m)))
                .collect();
            DecadeBucket {
                span: span.clone(),
                values,
            }
        })
        .collect()
}

fn log_trend(result: &TrendResult, alpha: f64) {
    info!("{}", result);
    match result.significant_direction(alpha) {
        Some(direction) => info!("  significant {} trend (p < {})", direction, alpha),
        None => info!("  no significant trend (p >= {})", alpha),
    }
}

#[derive(Debug, Serialize)]
struct TableRow<'a> {
    basin: &'a str,
    basin_label: &'a str,
    decade: String,
    sos: u16,
    peak_doy: u16,
    peak_value: f64,
    min_value: f64,
    max_value: f64,
    amplitude: f64,
    auc: f64,
}

impl<'a> TableRow<'a> {
    fn new(m: &'a PhenologyMetrics) -> Self {
        TableRow {
            basin: &m.basin,
            basin_label: Station::from_name(&m.basin).map(|s| s.basin_label()).unwrap_or(""),
            decade: m.key.to_string(),
            sos: m.sos,
            peak_doy: m.peak_doy,
            peak_value: m.peak_value,
            min_value: m.min_value,
            max_value: m.max_value,
            amplitude: m.amplitude,
            auc: m.auc,
        }
    }
}

fn log_table(composites: &[PhenologyMetrics]) {
    info!(
        "{:<10} {:<10} {:>5} {:>5} {:>8} {:>9} {:>9}",
        "basin", "decade", "sos", "peak", "peak_chl", "amplitude", "auc"
    );
    for m in composites {
        info!(
            "{:<10} {:<10} {:>5} {:>5} {:>8.2} {:>9.2} {:>9.1}",
            m.basin, m.key, m.sos, m.peak_doy, m.peak_value, m.amplitude, m.auc
        );
    }
}

fn write_table(path: &Path, composites: &[PhenologyMetrics]) -> Result<PathBuf> {
    let failure = |reason: String| ChlaError::OutputWriteFailure {
        path: path.to_path_buf(),
        reason,
    };
    let mut writer = csv::Writer::from_writer(Vec::new());
    for m in composites {
        writer
            .serialize(TableRow::new(m))
            .map_err(|e| failure(e.to_string()))?;
    }
    let bytes = writer.into_inner().map_err(|e| failure(e.to_string()))?;
    write_bytes(path, &bytes)
}

fn panel_frame(metric: PhenologyMetric, series: &[Vec<Option<f64>>], groups: usize) -> Frame {
    let x = -0.6..groups as f64 - 0.4;
    match metric {
        PhenologyMetric::PeakDoy => Frame::new(x, 200.0..310.0),
        PhenologyMetric::Sos => Frame::new(x, 160.0..210.0),
        _ => {
            let top = series
                .iter()
                .flatten()
                .flatten()
                .fold(0.0_f64, |acc, v| acc.max(*v));
            let end = if top > 0.0 { top * 1.15 } else { 1.0 };
            Frame::new(x, 0.0..end)
        }
    }
}

/// 2x2 grouped bars: peak DOY, SOS, amplitude and AUC per decade and basin,
/// with the basin-mean SOS drawn over the SOS panel.
fn draw_summary(area: &Area, composites: &[PhenologyMetrics], scheme: &DecadeScheme) -> anyhow::Result<()> {
    let keys: Vec<SeasonKey> = scheme.spans().iter().map(SeasonKey::composite).collect();
    let lookup = |station: Station, key: &SeasonKey| {
        composites
            .iter()
            .find(|m| m.key == *key && Station::from_name(&m.basin) == Some(station))
    };

    for (panel, metric) in area.split_evenly((2, 2)).iter().zip(PANEL_METRICS) {
        let series: Vec<Vec<Option<f64>>> = Station::ALL
            .iter()
            .map(|station| {
                keys.iter()
                    .map(|key| lookup(*station, key).map(|m| metric.value(m)))
                    .collect()
            })
            .collect();
        let frame = panel_frame(metric, &series, keys.len());
        let mut chart = frame.build(panel)?;
        draw::grouped_bars(&mut chart, &frame, &series, &BASIN_COLORS)?;

        if metric == PhenologyMetric::Sos {
            let means: Vec<(f64, f64)> = (0..keys.len())
                .filter_map(|g| {
                    let values: Vec<f64> = series.iter().filter_map(|s| s[g]).collect();
                    stats::mean(&values).map(|m| (g as f64, m))
                })
                .collect();
            let means = frame.clamp_points(&means);
            draw::line(&mut chart, &means, &CHLA_RED, 3)?;
            draw::scatter(&mut chart, &means, &CHLA_RED, 6)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chla_analysis::config::TrendConfig;
    use chla_analysis::trend::DecadeSpan;

    fn metrics(basin: &str, span: &DecadeSpan, sos: u16) -> PhenologyMetrics {
        PhenologyMetrics {
            basin: basin.to_string(),
            key: SeasonKey::composite(span),
            sos,
            peak_doy: 230,
            peak_value: 20.0,
            min_value: 5.0,
            max_value: 20.0,
            amplitude: 15.0,
            auc: 1500.0,
        }
    }

    #[test]
    fn test_basin_buckets_per_decade() {
        let scheme = DecadeScheme::balaton();
        let spans = scheme.spans();
        let composites = vec![
            metrics("Keszthely", &spans[0], 180),
            metrics("Zanka", &spans[0], 190),
            metrics("Zanka", &spans[2], 170),
        ];
        let buckets = basin_buckets(&composites, PhenologyMetric::Sos, &scheme);
        assert_eq!(buckets.len(), spans.len());
        assert_eq!(buckets[0].span.label, "1984-1994");
        assert_eq!(buckets[0].values, vec![(1989, 180.0), (1989, 190.0)]);
        assert!(buckets[1].values.is_empty());
        assert_eq!(buckets[2].values, vec![(2009, 170.0)]);
    }

    #[test]
    fn test_basin_mean_trend_caps_outlying_basin() {
        let scheme = DecadeScheme::balaton();
        let spans = scheme.spans();
        let per_decade: [[u16; 5]; 4] = [
            [231; 5],
            [231; 5],
            [231; 5],
            [231, 230, 279, 232, 233],
        ];
        let mut composites = Vec::new();
        for (span, values) in spans.iter().zip(per_decade) {
            for (station, sos) in Station::ALL.iter().zip(values) {
                composites.push(metrics(station.name(), span, sos));
            }
        }

        let config = TrendConfig::default();
        let tester = DecadalTrendTester::new(&config);
        let buckets = basin_buckets(&composites, PhenologyMetric::Sos, &scheme);
        let result = tester.test_buckets("sos basin mean", &buckets).unwrap();
        assert_eq!(result.outliers_adjusted, 1);
        let last = result.points.last().unwrap();
        assert_eq!(last.count, 5);
        // 279 is capped at Q3 + 1.5 IQR = 236
        assert!((last.value - 232.4).abs() < 1e-9, "{}", last.value);
    }

    #[test]
    fn test_table_row_labels() {
        let scheme = DecadeScheme::balaton();
        let m = metrics("Bfuzfo", &scheme.spans()[3], 175);
        let row = TableRow::new(&m);
        assert_eq!(row.basin_label, "IV-2");
        assert_eq!(row.decade, "2015-2023");
    }

    #[test]
    fn test_fixed_panel_ranges() {
        let series = vec![vec![Some(100.0), None]];
        assert_eq!(panel_frame(PhenologyMetric::PeakDoy, &series, 4).y, 200.0..310.0);
        let auc = panel_frame(PhenologyMetric::Auc, &series, 4);
        assert!((auc.y.end - 115.0).abs() < 1e-9);
        assert!((auc.x.end - 3.6).abs() < 1e-9);
    }
}
