//! Curve Fitter.
//!
//! Fits every candidate model to the same `(x, y)` samples and reports all
//! attempts: successes ranked by R² (then RMSE), followed by the failures
//! with their reasons. A failing model never affects the others.

use crate::config::FitConfig;
use crate::linalg;
use levenberg_marquardt::{LeastSquaresProblem, LevenbergMarquardt};
use nalgebra::{Dyn, OMatrix, OVector, Owned, Vector3, U3};
use serde::Serialize;
use std::cmp::Ordering;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ModelFamily {
    /// y = a·x + b
    Linear,
    /// y = a·ln(x) + b
    Logarithmic,
    /// y = a_d·x^d + … + a_0, coefficients highest power first
    Polynomial(usize),
    /// y = a·e^(−k·x) + c
    Exponential,
}

impl ModelFamily {
    pub fn name(&self) -> &'static str {
        match self {
            ModelFamily::Linear => "linear",
            ModelFamily::Logarithmic => "logarithmic",
            ModelFamily::Polynomial(_) => "polynomial",
            ModelFamily::Exponential => "exponential",
        }
    }

    pub fn param_count(&self) -> usize {
        match self {
            ModelFamily::Linear | ModelFamily::Logarithmic => 2,
            ModelFamily::Polynomial(degree) => degree + 1,
            ModelFamily::Exponential => 3,
        }
    }

    /// Evaluate the model with fitted `params` at `x`.
    pub fn evaluate(&self, params: &[f64], x: f64) -> f64 {
        match self {
            ModelFamily::Linear => params[0] * x + params[1],
            ModelFamily::Logarithmic => params[0] * x.ln() + params[1],
            ModelFamily::Polynomial(_) => params.iter().fold(0.0, |acc, c| acc * x + c),
            ModelFamily::Exponential => params[0] * (-params[1] * x).exp() + params[2],
        }
    }

    fn requires_positive_x(&self) -> bool {
        matches!(self, ModelFamily::Logarithmic | ModelFamily::Exponential)
    }
}

impl fmt::Display for ModelFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelFamily::Polynomial(degree) => write!(f, "polynomial(deg {degree})"),
            other => f.write_str(other.name()),
        }
    }
}

/// Why one model could not be fitted.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelFailure {
    #[error("needs {required} distinct x values, {available} available")]
    Underdetermined { required: usize, available: usize },

    #[error("domain violation: {detail}")]
    DomainViolation { detail: String },

    #[error("no convergence after {iterations} iterations: {detail}")]
    NonConvergence { iterations: usize, detail: String },
}

impl ModelFailure {
    pub fn kind(&self) -> &'static str {
        match self {
            ModelFailure::Underdetermined { .. } => "ModelUnderdetermined",
            ModelFailure::DomainViolation { .. } => "ModelDomainViolation",
            ModelFailure::NonConvergence { .. } => "ModelNonConvergence",
        }
    }

    fn singular(iterations: usize) -> Self {
        ModelFailure::NonConvergence {
            iterations,
            detail: "singular linear system".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FitResult {
    pub model: ModelFamily,
    pub params: Vec<f64>,
    pub r_squared: f64,
    pub rmse: f64,
    pub n: usize,
}

impl FitResult {
    pub fn predict(&self, x: f64) -> f64 {
        self.model.evaluate(&self.params, x)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FitAttempt {
    pub model: ModelFamily,
    pub outcome: Result<FitResult, ModelFailure>,
}

/// All attempts for one series, successes first in rank order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FitReport {
    pub attempts: Vec<FitAttempt>,
}

impl FitReport {
    /// Top-ranked successful fit.
    pub fn best(&self) -> Option<&FitResult> {
        self.successes().next()
    }

    pub fn successes(&self) -> impl Iterator<Item = &FitResult> {
        self.attempts.iter().filter_map(|a| a.outcome.as_ref().ok())
    }

    pub fn failures(&self) -> impl Iterator<Item = (ModelFamily, &ModelFailure)> {
        self.attempts
            .iter()
            .filter_map(|a| a.outcome.as_ref().err().map(|e| (a.model, e)))
    }

    pub fn get(&self, model: ModelFamily) -> Option<&FitAttempt> {
        self.attempts.iter().find(|a| a.model == model)
    }
}

pub struct CurveFitter<'a> {
    config: &'a FitConfig,
}

impl<'a> CurveFitter<'a> {
    pub fn new(config: &'a FitConfig) -> Self {
        CurveFitter { config }
    }

    /// Candidate models in their fixed evaluation order.
    pub fn models(&self) -> Vec<ModelFamily> {
        vec![
            ModelFamily::Linear,
            ModelFamily::Logarithmic,
            ModelFamily::Polynomial(self.config.polynomial_degree),
            ModelFamily::Exponential,
        ]
    }

    /// Fit every candidate and rank the outcomes.
    pub fn fit_all(&self, xs: &[f64], ys: &[f64]) -> FitReport {
        let (mut successes, failures): (Vec<FitAttempt>, Vec<FitAttempt>) = self
            .models()
            .into_iter()
            .map(|model| FitAttempt {
                model,
                outcome: self.fit(model, xs, ys),
            })
            .partition(|a| a.outcome.is_ok());
        successes.sort_by(|a, b| match (&a.outcome, &b.outcome) {
            (Ok(a), Ok(b)) => b
                .r_squared
                .total_cmp(&a.r_squared)
                .then_with(|| a.rmse.total_cmp(&b.rmse)),
            _ => Ordering::Equal,
        });
        successes.extend(failures);
        FitReport {
            attempts: successes,
        }
    }

    /// Fit one model.
    pub fn fit(&self, model: ModelFamily, xs: &[f64], ys: &[f64]) -> Result<FitResult, ModelFailure> {
        if xs.len() != ys.len() {
            return Err(ModelFailure::DomainViolation {
                detail: format!("{} x values but {} y values", xs.len(), ys.len()),
            });
        }
        if let Some(bad) = xs.iter().chain(ys).find(|v| !v.is_finite()) {
            return Err(ModelFailure::DomainViolation {
                detail: format!("non-finite sample {bad}"),
            });
        }
        if model.requires_positive_x() {
            if let Some(bad) = xs.iter().find(|x| **x <= 0.0) {
                return Err(ModelFailure::DomainViolation {
                    detail: format!("{} needs x > 0, got {}", model.name(), bad),
                });
            }
        }
        let available = distinct_count(xs);
        if available < model.param_count() {
            return Err(ModelFailure::Underdetermined {
                required: model.param_count(),
                available,
            });
        }

        let params = match model {
            ModelFamily::Linear => {
                let design: Vec<Vec<f64>> = xs.iter().map(|x| vec![*x, 1.0]).collect();
                linalg::least_squares(&design, ys).ok_or_else(|| ModelFailure::singular(0))?
            }
            ModelFamily::Logarithmic => {
                let design: Vec<Vec<f64>> = xs.iter().map(|x| vec![x.ln(), 1.0]).collect();
                linalg::least_squares(&design, ys).ok_or_else(|| ModelFailure::singular(0))?
            }
            ModelFamily::Polynomial(degree) => fit_polynomial(xs, ys, degree)?,
            ModelFamily::Exponential => self.fit_exponential(xs, ys)?,
        };
        if params.iter().any(|p| !p.is_finite()) {
            return Err(ModelFailure::NonConvergence {
                iterations: 0,
                detail: "non-finite parameters".to_string(),
            });
        }

        let (r_squared, rmse) = goodness_of_fit(model, &params, xs, ys);
        Ok(FitResult {
            model,
            params,
            r_squared,
            rmse,
            n: xs.len(),
        })
    }

    /// Levenberg-Marquardt on (a, k, c), started from the configured rate
    /// with `a` and `c` solved linearly for that rate.
    fn fit_exponential(&self, xs: &[f64], ys: &[f64]) -> Result<Vec<f64>, ModelFailure> {
        let k0 = self.config.exp_initial_rate;
        let design: Vec<Vec<f64>> = xs.iter().map(|x| vec![(-k0 * x).exp(), 1.0]).collect();
        let start = linalg::least_squares(&design, ys).ok_or_else(|| ModelFailure::singular(0))?;
        let problem = ExponentialProblem {
            params: Vector3::new(start[0], k0, start[1]),
            x: xs.to_vec(),
            y: ys.to_vec(),
        };

        let (fitted, report) = LevenbergMarquardt::new()
            .with_ftol(self.config.tolerance)
            .with_xtol(self.config.tolerance)
            .with_patience(self.config.max_iterations)
            .minimize(problem);
        if !report.termination.was_successful() {
            return Err(ModelFailure::NonConvergence {
                iterations: report.number_of_evaluations,
                detail: format!("{:?}", report.termination),
            });
        }
        Ok(fitted.params.iter().copied().collect())
    }
}

/// y ≈ a·e^(−k·x) + c with parameters [a, k, c].
struct ExponentialProblem {
    params: Vector3<f64>,
    x: Vec<f64>,
    y: Vec<f64>,
}

impl LeastSquaresProblem<f64, Dyn, U3> for ExponentialProblem {
    type ParameterStorage = Owned<f64, U3>;
    type ResidualStorage = Owned<f64, Dyn>;
    type JacobianStorage = Owned<f64, Dyn, U3>;

    fn set_params(&mut self, p: &Vector3<f64>) {
        self.params.copy_from(p);
    }

    fn params(&self) -> Vector3<f64> {
        self.params
    }

    fn residuals(&self) -> Option<OVector<f64, Dyn>> {
        let (a, k, c) = (self.params[0], self.params[1], self.params[2]);
        let residuals = OVector::<f64, Dyn>::from_iterator(
            self.x.len(),
            self.x.iter().zip(&self.y).map(|(x, y)| y - (a * (-k * x).exp() + c)),
        );
        residuals.iter().all(|r| r.is_finite()).then_some(residuals)
    }

    fn jacobian(&self) -> Option<OMatrix<f64, Dyn, U3>> {
        let (a, k) = (self.params[0], self.params[1]);
        let mut jac = OMatrix::<f64, Dyn, U3>::zeros(self.x.len());
        // derivatives of r = y - f
        for (i, x) in self.x.iter().enumerate() {
            let e = (-k * x).exp();
            jac[(i, 0)] = -e;
            jac[(i, 1)] = a * x * e;
            jac[(i, 2)] = -1.0;
        }
        jac.iter().all(|v| v.is_finite()).then_some(jac)
    }
}

fn fit_polynomial(xs: &[f64], ys: &[f64], degree: usize) -> Result<Vec<f64>, ModelFailure> {
    // centred and scaled x keeps the normal equations well conditioned
    let mean = xs.iter().sum::<f64>() / xs.len() as f64;
    let scale = xs
        .iter()
        .map(|x| (x - mean).abs())
        .fold(0.0_f64, f64::max)
        .max(f64::MIN_POSITIVE);
    let design: Vec<Vec<f64>> = xs
        .iter()
        .map(|x| {
            let u = (x - mean) / scale;
            (0..=degree).map(|p| u.powi(p as i32)).collect()
        })
        .collect();
    let scaled = linalg::least_squares(&design, ys).ok_or_else(|| ModelFailure::singular(0))?;

    // expand sum c_p ((x - mean)/scale)^p into powers of x
    let mut ascending = vec![0.0; degree + 1];
    for (p, c) in scaled.iter().enumerate() {
        let factor = c / scale.powi(p as i32);
        for j in 0..=p {
            ascending[j] += factor * binomial(p, j) * (-mean).powi((p - j) as i32);
        }
    }
    ascending.reverse();
    Ok(ascending)
}

fn binomial(n: usize, k: usize) -> f64 {
    (0..k).fold(1.0, |acc, i| acc * (n - i) as f64 / (i + 1) as f64)
}

fn sum_squared_residuals(model: ModelFamily, params: &[f64], xs: &[f64], ys: &[f64]) -> f64 {
    xs.iter()
        .zip(ys)
        .map(|(x, y)| {
            let r = y - model.evaluate(params, *x);
            r * r
        })
        .sum()
}

/// R² = 1 − SSres/SStot and RMSE = √(SSres/n). A constant `ys` gets R² = 1
/// only when it is reproduced exactly.
fn goodness_of_fit(model: ModelFamily, params: &[f64], xs: &[f64], ys: &[f64]) -> (f64, f64) {
    let n = ys.len() as f64;
    let mean = ys.iter().sum::<f64>() / n;
    let ss_res = sum_squared_residuals(model, params, xs, ys);
    let ss_tot: f64 = ys.iter().map(|y| (y - mean) * (y - mean)).sum();
    let r_squared = if ss_tot > 0.0 {
        1.0 - ss_res / ss_tot
    } else if ss_res <= f64::EPSILON {
        1.0
    } else {
        0.0
    };
    (r_squared, (ss_res / n).sqrt())
}

fn distinct_count(xs: &[f64]) -> usize {
    let mut sorted = xs.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    sorted.dedup();
    sorted.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fitter_config() -> FitConfig {
        FitConfig::default()
    }

    fn samples(f: impl Fn(f64) -> f64) -> (Vec<f64>, Vec<f64>) {
        let xs: Vec<f64> = (1..=40).map(|d| d as f64).collect();
        let ys = xs.iter().map(|x| f(*x)).collect();
        (xs, ys)
    }

    #[test]
    fn test_linear_and_polynomial_recover_parameters() {
        let config = fitter_config();
        let fitter = CurveFitter::new(&config);
        let (xs, ys) = samples(|x| 0.5 * x * x - 3.0 * x + 7.0);

        let poly = fitter.fit(ModelFamily::Polynomial(2), &xs, &ys).unwrap();
        assert!((poly.params[0] - 0.5).abs() < 1e-8);
        assert!((poly.params[1] + 3.0).abs() < 1e-6);
        assert!((poly.params[2] - 7.0).abs() < 1e-5);
        assert!((poly.r_squared - 1.0).abs() < 1e-12);

        let (xs, ys) = samples(|x| -2.0 * x + 4.0);
        let line = fitter.fit(ModelFamily::Linear, &xs, &ys).unwrap();
        assert!((line.params[0] + 2.0).abs() < 1e-10);
        assert!((line.params[1] - 4.0).abs() < 1e-9);
        assert!(line.rmse < 1e-9);
    }

    #[test]
    fn test_logarithmic_fit() {
        let config = fitter_config();
        let fitter = CurveFitter::new(&config);
        let (xs, ys) = samples(|x| -4.0 * x.ln() + 30.0);
        let fit = fitter.fit(ModelFamily::Logarithmic, &xs, &ys).unwrap();
        assert!((fit.params[0] + 4.0).abs() < 1e-9);
        assert!((fit.params[1] - 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_exponential_converges() {
        let config = fitter_config();
        let fitter = CurveFitter::new(&config);
        let (xs, ys) = samples(|x| 25.0 * (-0.12 * x).exp() + 8.0);
        let fit = fitter.fit(ModelFamily::Exponential, &xs, &ys).unwrap();
        assert!((fit.params[0] - 25.0).abs() < 1e-4, "{:?}", fit.params);
        assert!((fit.params[1] - 0.12).abs() < 1e-6, "{:?}", fit.params);
        assert!((fit.params[2] - 8.0).abs() < 1e-4, "{:?}", fit.params);
        assert!(fit.r_squared > 0.999_999);
    }

    #[test]
    fn test_ranking_puts_best_first() {
        let config = fitter_config();
        let fitter = CurveFitter::new(&config);
        let (xs, ys) = samples(|x| 25.0 * (-0.12 * x).exp() + 8.0);
        let report = fitter.fit_all(&xs, &ys);
        assert_eq!(report.attempts.len(), 4);
        assert_eq!(report.best().unwrap().model, ModelFamily::Exponential);
        let r2: Vec<f64> = report.successes().map(|f| f.r_squared).collect();
        assert!(r2.windows(2).all(|w| w[0] >= w[1]));
    }

    #[test]
    fn test_fitting_is_deterministic() {
        let config = fitter_config();
        let fitter = CurveFitter::new(&config);
        let xs = [1.0, 3.0, 6.0, 10.0, 15.0, 21.0, 28.0, 36.0, 45.0, 53.0];
        let ys = [31.0, 27.5, 24.0, 22.2, 19.0, 17.5, 15.1, 15.0, 13.9, 13.0];
        assert_eq!(fitter.fit_all(&xs, &ys), fitter.fit_all(&xs, &ys));
    }

    #[test]
    fn test_non_positive_x_fails_only_log_and_exp() {
        let config = fitter_config();
        let fitter = CurveFitter::new(&config);
        let xs = [0.0, 1.0, 2.0, 3.0, 4.0, 5.0];
        let ys = [3.0, 5.0, 7.2, 8.9, 11.0, 13.1];
        let report = fitter.fit_all(&xs, &ys);

        for model in [ModelFamily::Logarithmic, ModelFamily::Exponential] {
            let attempt = report.get(model).unwrap();
            assert_eq!(attempt.outcome.as_ref().unwrap_err().kind(), "ModelDomainViolation");
        }
        assert!(report.get(ModelFamily::Linear).unwrap().outcome.is_ok());
        assert!(report.get(ModelFamily::Polynomial(2)).unwrap().outcome.is_ok());
        // failures come after every success
        let kinds: Vec<bool> = report.attempts.iter().map(|a| a.outcome.is_ok()).collect();
        assert_eq!(kinds, vec![true, true, false, false]);
    }

    #[test]
    fn test_underdetermined_and_non_finite() {
        let config = fitter_config();
        let fitter = CurveFitter::new(&config);
        let err = fitter
            .fit(ModelFamily::Polynomial(2), &[1.0, 1.0, 2.0], &[1.0, 2.0, 3.0])
            .unwrap_err();
        assert_eq!(
            err,
            ModelFailure::Underdetermined {
                required: 3,
                available: 2
            }
        );
        assert!(fitter.fit(ModelFamily::Linear, &[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0]).is_ok());

        let report = fitter.fit_all(&[1.0, 2.0, f64::NAN, 4.0], &[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(report.successes().count(), 0);
        assert!(report
            .failures()
            .all(|(_, e)| e.kind() == "ModelDomainViolation"));
    }

    #[test]
    fn test_exponential_out_of_iterations_fails_alone() {
        let config = FitConfig {
            max_iterations: 1,
            ..FitConfig::default()
        };
        let fitter = CurveFitter::new(&config);
        let (xs, ys) = samples(|x| 25.0 * (-0.12 * x).exp() + 8.0);
        let report = fitter.fit_all(&xs, &ys);

        let failures: Vec<_> = report.failures().collect();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].0, ModelFamily::Exponential);
        assert_eq!(failures[0].1.kind(), "ModelNonConvergence");
        for model in [ModelFamily::Linear, ModelFamily::Logarithmic, ModelFamily::Polynomial(2)] {
            assert!(report.get(model).unwrap().outcome.is_ok(), "{model}");
        }
        assert_eq!(report.attempts.last().unwrap().model, ModelFamily::Exponential);
    }

    #[test]
    fn test_constant_series() {
        let config = fitter_config();
        let fitter = CurveFitter::new(&config);
        let fit = fitter
            .fit(ModelFamily::Linear, &[1.0, 2.0, 3.0, 4.0], &[5.0; 4])
            .unwrap();
        assert_eq!(fit.r_squared, 1.0);
    }
}
