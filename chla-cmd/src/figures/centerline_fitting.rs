//! Distance-decay models of pelagic Chl-a along the centerline: every
//! candidate model fitted per decade and month (Fig. S4), and the spread of
//! their R² and RMSE across all fits (Fig. 5).

use super::load_centerline;
use crate::{Settings, TaskReport};
use chla_analysis::fit::{CurveFitter, FitReport, FitResult, ModelFamily};
use chla_analysis::spatial::fitting_samples;
use chla_chart::draw::{self, Area, BoxStats};
use chla_chart::palette::MODEL_COLORS;
use chla_chart::{write_png, Canvas, Frame};
use chla_obs::{ChlaError, Result};
use chla_utils::stats;
use log::{debug, info};
use plotters::style::BLACK;

pub const FITS_FILE: &str = "MonthlyCenterlineFitting_FigS4.png";
pub const SCORES_FILE: &str = "MonthlyCenterlineFitting_Fig5.png";
pub const MONTHS: [u32; 3] = [7, 8, 9];
/// Samples beyond this distance are left out of the fits.
pub const MAX_DISTANCE_KM: f64 = 52.0;

/// Samples and fits of one (decade, month).
struct FitCell {
    unit: String,
    points: Vec<(f64, f64)>,
    fits: FitReport,
}

/// R² and RMSE of every successful fit of one model.
#[derive(Debug, Default, Clone, PartialEq)]
struct ModelScores {
    r_squared: Vec<f64>,
    rmse: Vec<f64>,
}

impl ModelScores {
    fn r_squared(&self) -> &[f64] {
        &self.r_squared
    }

    fn rmse(&self) -> &[f64] {
        &self.rmse
    }
}

pub fn run(settings: &Settings) -> Result<TaskReport> {
    let table = load_centerline(settings)?;
    let fitter = CurveFitter::new(&settings.config.fit);
    let models = fitter.models();
    let spans = settings.config.trend.decades.spans();
    let mut report = TaskReport::default();

    let mut cells = Vec::new();
    for span in spans {
        for month in MONTHS {
            let unit = format!("{} month {}", span.label, month);
            let (xs, ys) = fitting_samples(&table.records, span, month, MAX_DISTANCE_KM);
            let fits = fitter.fit_all(&xs, &ys);
            for (model, failure) in fits.failures() {
                report.skip(format!("{unit} {model}"), format!("{}: {}", failure.kind(), failure));
            }
            for fit in fits.successes() {
                debug!(
                    "{} {}: params {:?} r2 {:.3} rmse {:.3}",
                    unit, fit.model, fit.params, fit.r_squared, fit.rmse
                );
            }
            cells.push(FitCell {
                unit,
                points: xs.into_iter().zip(ys).collect(),
                fits,
            });
        }
    }

    let scores = collect_scores(&cells, &models);
    if scores.iter().all(|s| s.r_squared.is_empty()) {
        return Err(ChlaError::insufficient(
            "centerline-fitting",
            "no model could be fitted in any decade and month",
        ));
    }
    for (model, score) in models.iter().zip(&scores) {
        log_scores(*model, score);
    }

    let fits_figure = write_png(
        &settings.output(FITS_FILE),
        Canvas::grid(spans.len() as u32, MONTHS.len() as u32),
        |area| draw_fits(area, &cells, &models, (spans.len(), MONTHS.len())),
    )?;
    report.output(fits_figure);

    let scores_figure = write_png(&settings.output(SCORES_FILE), Canvas::grid(1, 2), |area| {
        draw_scores(area, &scores)
    })?;
    report.output(scores_figure);
    Ok(report)
}

fn collect_scores(cells: &[FitCell], models: &[ModelFamily]) -> Vec<ModelScores> {
    let mut scores = vec![ModelScores::default(); models.len()];
    for fit in cells.iter().flat_map(|c| c.fits.successes()) {
        if let Some(i) = models.iter().position(|m| *m == fit.model) {
            scores[i].r_squared.push(fit.r_squared);
            scores[i].rmse.push(fit.rmse);
        }
    }
    scores
}

fn log_scores(model: ModelFamily, scores: &ModelScores) {
    let summary = |values: &[f64]| match (stats::mean(values), stats::median(values), stats::min_max(values)) {
        (Some(mean), Some(median), Some((lo, hi))) => {
            format!("mean {mean:.3} median {median:.3} min {lo:.3} max {hi:.3}")
        }
        _ => "no fits".to_string(),
    };
    info!("{} R2: {}", model, summary(&scores.r_squared));
    info!("{} RMSE: {}", model, summary(&scores.rmse));
}

/// Evaluation points of a fitted curve across the sampled distances.
fn curve(fit: &FitResult, lo: f64, hi: f64) -> Vec<(f64, f64)> {
    const STEPS: usize = 100;
    (0..=STEPS)
        .map(|i| lo + (hi - lo) * i as f64 / STEPS as f64)
        .map(|x| (x, fit.predict(x)))
        .filter(|(_, y)| y.is_finite())
        .collect()
}

fn draw_fits(area: &Area, cells: &[FitCell], models: &[ModelFamily], shape: (usize, usize)) -> anyhow::Result<()> {
    for (panel, cell) in area.split_evenly(shape).iter().zip(cells) {
        let Some(frame) = Frame::around(cell.points.iter().copied(), 0.05) else {
            debug!("{}: empty panel", cell.unit);
            Frame::new(0.0..MAX_DISTANCE_KM + 1.0, 0.0..1.0).build(panel)?;
            continue;
        };
        let mut chart = frame.build(panel)?;
        draw::scatter(&mut chart, &cell.points, &BLACK, 3)?;
        for fit in cell.fits.successes() {
            let color = models
                .iter()
                .position(|m| *m == fit.model)
                .map(|i| MODEL_COLORS[i % MODEL_COLORS.len()])
                .unwrap_or(BLACK);
            let points = frame.clamp_points(&curve(fit, frame.x.start.max(f64::MIN_POSITIVE), frame.x.end));
            draw::line(&mut chart, &points, &color, 3)?;
        }
    }
    Ok(())
}

/// Box plots of R² (left) and RMSE (right), one box per model.
fn draw_scores(area: &Area, scores: &[ModelScores]) -> anyhow::Result<()> {
    let panels = area.split_evenly((1, 2));
    let metrics: [fn(&ModelScores) -> &[f64]; 2] = [ModelScores::r_squared, ModelScores::rmse];
    for (panel, values_of) in panels.iter().zip(metrics) {
        let boxes: Vec<Option<BoxStats>> = scores.iter().map(|s| BoxStats::from_values(values_of(s))).collect();
        let all: Vec<(f64, f64)> = scores
            .iter()
            .flat_map(|s| values_of(s).iter().map(|v| (0.0, *v)))
            .collect();
        let frame = Frame::around(all, 0.08)
            .unwrap_or_else(|| Frame::new(0.0..1.0, 0.0..1.0))
            .with_x(-0.6..scores.len() as f64 - 0.4);
        let mut chart = frame.build(panel)?;
        for (i, b) in boxes.iter().enumerate() {
            if let Some(b) = b {
                draw::box_plot(&mut chart, i as f64, 0.6, b, &MODEL_COLORS[i % MODEL_COLORS.len()])?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chla_analysis::config::FitConfig;

    #[test]
    fn test_collect_scores_by_model() {
        let config = FitConfig::default();
        let fitter = CurveFitter::new(&config);
        let models = fitter.models();
        let xs: [f64; 6] = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let ys: Vec<f64> = xs.iter().map(|x| 30.0 * (-0.2 * x).exp() + 5.0).collect();
        let cell = FitCell {
            unit: "1995-2004 month 8".to_string(),
            points: xs.iter().copied().zip(ys.iter().copied()).collect(),
            fits: fitter.fit_all(&xs, &ys),
        };
        let scores = collect_scores(&[cell], &models);
        assert_eq!(scores.len(), models.len());
        assert!(scores.iter().all(|s| s.r_squared.len() == 1 && s.rmse.len() == 1));
    }

    #[test]
    fn test_curve_skips_non_finite() {
        let config = FitConfig::default();
        let fitter = CurveFitter::new(&config);
        let xs = [1.0, 2.0, 4.0, 8.0];
        let ys = [1.0, 2.0, 3.0, 4.0];
        let fit = fitter.fit(ModelFamily::Logarithmic, &xs, &ys).unwrap();
        let points = curve(&fit, 0.0, 8.0);
        assert_eq!(points.len(), 100);
        assert!(points.iter().all(|(x, _)| *x > 0.0));
    }
}
