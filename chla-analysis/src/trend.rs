//! Decadal Trend Tester.
//!
//! Per-year values are grouped into fixed decade buckets, outliers in each
//! bucket are capped (or removed) at the IQR fences, each bucket is reduced
//! to one value at its mid-year, and the resulting short sequence is tested
//! with Mann-Kendall, Sen's slope and ordinary least squares.

use crate::config::TrendConfig;
use crate::linalg;
use crate::phenology::{PhenologyMetric, PhenologyMetrics};
use chla_obs::{ChlaError, Result};
use chla_utils::stats;
use log::debug;
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Normal, StudentsT};
use std::fmt;

/// One fixed calendar span, both ends inclusive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecadeSpan {
    pub label: String,
    pub start: i32,
    pub end: i32,
}

impl DecadeSpan {
    pub fn new(label: &str, start: i32, end: i32) -> Self {
        DecadeSpan {
            label: label.to_string(),
            start,
            end,
        }
    }

    pub fn contains(&self, year: i32) -> bool {
        (self.start..=self.end).contains(&year)
    }

    /// Integer mid-year, where the bucket is placed on the time axis.
    pub fn mid_year(&self) -> i32 {
        (self.start + self.end) / 2
    }
}

/// Ordered, non-overlapping, contiguous decade spans.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DecadeScheme(Vec<DecadeSpan>);

impl DecadeScheme {
    /// 1984-1994, 1995-2004, 2005-2014, 2015-2023.
    pub fn balaton() -> Self {
        DecadeScheme(vec![
            DecadeSpan::new("1984-1994", 1984, 1994),
            DecadeSpan::new("1995-2004", 1995, 2004),
            DecadeSpan::new("2005-2014", 2005, 2014),
            DecadeSpan::new("2015-2023", 2015, 2023),
        ])
    }

    pub fn new(spans: Vec<DecadeSpan>) -> std::result::Result<Self, String> {
        let scheme = DecadeScheme(spans);
        scheme.validate()?;
        Ok(scheme)
    }

    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.0.is_empty() {
            return Err("decade scheme is empty".to_string());
        }
        for span in &self.0 {
            if span.start > span.end {
                return Err(format!("decade {} ends before it starts", span.label));
            }
        }
        for pair in self.0.windows(2) {
            if pair[1].start != pair[0].end + 1 {
                return Err(format!(
                    "decades {} and {} overlap or leave a gap",
                    pair[0].label, pair[1].label
                ));
            }
        }
        Ok(())
    }

    pub fn spans(&self) -> &[DecadeSpan] {
        &self.0
    }

    pub fn first_year(&self) -> i32 {
        self.0.first().map(|s| s.start).unwrap_or(0)
    }

    pub fn last_year(&self) -> i32 {
        self.0.last().map(|s| s.end).unwrap_or(0)
    }

    /// Index of the span holding `year`.
    pub fn bucket_of(&self, year: i32) -> Option<usize> {
        self.0.iter().position(|s| s.contains(year))
    }

    /// Group `(year, value)` pairs into one bucket per span.
    ///
    /// Non-finite values and years outside every span are dropped; the
    /// second element of the result counts them.
    pub fn bucketize(&self, values: &[(i32, f64)]) -> (Vec<DecadeBucket>, usize) {
        let mut buckets: Vec<DecadeBucket> = self
            .0
            .iter()
            .map(|span| DecadeBucket {
                span: span.clone(),
                values: Vec::new(),
            })
            .collect();
        let mut excluded = 0;
        for &(year, value) in values {
            match self.bucket_of(year) {
                Some(idx) if value.is_finite() => buckets[idx].values.push((year, value)),
                _ => excluded += 1,
            }
        }
        (buckets, excluded)
    }
}

impl Default for DecadeScheme {
    fn default() -> Self {
        DecadeScheme::balaton()
    }
}

/// The values that fell into one decade span.
#[derive(Debug, Clone, PartialEq)]
pub struct DecadeBucket {
    pub span: DecadeSpan,
    pub values: Vec<(i32, f64)>,
}

impl DecadeBucket {
    pub fn raw_values(&self) -> Vec<f64> {
        self.values.iter().map(|(_, v)| *v).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutlierMode {
    /// move outliers to the nearest fence
    Cap,
    Remove,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Aggregation {
    Mean,
    Median,
}

impl Aggregation {
    pub fn apply(&self, values: &[f64]) -> Option<f64> {
        match self {
            Aggregation::Mean => stats::mean(values),
            Aggregation::Median => stats::median(values),
        }
    }
}

/// Cap or remove values outside `[q1 - k·iqr, q3 + k·iqr]`.
///
/// Returns the corrected values and how many were changed or removed.
pub fn correct_outliers(values: &[f64], k: f64, mode: OutlierMode) -> (Vec<f64>, usize) {
    let Some((q1, _, q3)) = stats::quartiles(values) else {
        return (Vec::new(), 0);
    };
    let iqr = q3 - q1;
    let (lower, upper) = (q1 - k * iqr, q3 + k * iqr);
    let outside = |v: f64| v < lower || v > upper;
    let adjusted = values.iter().filter(|v| outside(**v)).count();
    let corrected = match mode {
        OutlierMode::Cap => values.iter().map(|v| v.clamp(lower, upper)).collect(),
        OutlierMode::Remove => values.iter().copied().filter(|v| !outside(*v)).collect(),
    };
    (corrected, adjusted)
}

/// One aggregated decade on the time axis.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecadePoint {
    pub label: String,
    pub mid_year: i32,
    pub value: f64,
    pub count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MannKendall {
    /// sum of pairwise signs
    pub s: i64,
    pub variance: f64,
    pub z: f64,
    pub p_value: f64,
    /// Kendall tau-b against time
    pub tau: f64,
    /// p-value from the permutation distribution rather than the normal approximation
    pub exact: bool,
}

/// Mann-Kendall test for a monotonic trend in a sequence ordered by time.
///
/// Tie-free sequences of at most `exact_max_n` values get the exact
/// two-sided p-value from the permutation distribution of S. Otherwise the
/// normal approximation with tie-corrected variance and continuity
/// correction is used.
pub fn mann_kendall(values: &[f64], exact_max_n: usize) -> MannKendall {
    let n = values.len();
    let mut s: i64 = 0;
    for i in 0..n {
        for j in i + 1..n {
            s += sign(values[j] - values[i]);
        }
    }

    let ties = tie_groups(values);
    let n_f = n as f64;
    let tie_term: f64 = ties
        .iter()
        .map(|&t| {
            let t = t as f64;
            t * (t - 1.0) * (2.0 * t + 5.0)
        })
        .sum();
    let variance = (n_f * (n_f - 1.0) * (2.0 * n_f + 5.0) - tie_term) / 18.0;

    let z = if variance <= 0.0 {
        0.0
    } else if s > 0 {
        (s as f64 - 1.0) / variance.sqrt()
    } else if s < 0 {
        (s as f64 + 1.0) / variance.sqrt()
    } else {
        0.0
    };

    let exact = ties.is_empty() && n >= 2 && n <= exact_max_n;
    let p_value = if exact {
        exact_p_value(n, s)
    } else if variance <= 0.0 {
        1.0
    } else {
        normal_two_sided_p(z)
    };

    let pairs = n_f * (n_f - 1.0) / 2.0;
    let tied_pairs: f64 = ties.iter().map(|&t| (t * (t - 1)) as f64 / 2.0).sum();
    let denominator = (pairs * (pairs - tied_pairs)).sqrt();
    let tau = if denominator > 0.0 {
        s as f64 / denominator
    } else {
        0.0
    };

    MannKendall {
        s,
        variance,
        z,
        p_value,
        tau,
        exact,
    }
}

fn sign(d: f64) -> i64 {
    if d > 0.0 {
        1
    } else if d < 0.0 {
        -1
    } else {
        0
    }
}

/// Sizes of the groups of equal values (only groups larger than one).
fn tie_groups(values: &[f64]) -> Vec<usize> {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mut groups = Vec::new();
    let mut run = 1;
    for pair in sorted.windows(2) {
        if pair[0] == pair[1] {
            run += 1;
        } else {
            if run > 1 {
                groups.push(run);
            }
            run = 1;
        }
    }
    if run > 1 {
        groups.push(run);
    }
    groups
}

/// P(|S| >= |s|) over all n! equally likely orderings.
///
/// S = pairs - 2·inversions, and the number of permutations with a given
/// inversion count is the Mahonian number, built up one element at a time.
fn exact_p_value(n: usize, s: i64) -> f64 {
    let max_inversions = n * (n - 1) / 2;
    let mut counts: Vec<u128> = vec![1];
    for k in 1..n {
        // inserting the (k+1)-th element adds 0..=k inversions
        let mut next = vec![0u128; counts.len() + k];
        for (inv, &c) in counts.iter().enumerate() {
            for add in 0..=k {
                next[inv + add] += c;
            }
        }
        counts = next;
    }
    let total: u128 = counts.iter().sum();
    let pairs = max_inversions as i64;
    let extreme: u128 = counts
        .iter()
        .enumerate()
        .filter(|(inv, _)| (pairs - 2 * *inv as i64).abs() >= s.abs())
        .map(|(_, c)| *c)
        .sum();
    (extreme as f64 / total as f64).min(1.0)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SensSlope {
    pub slope: f64,
    pub intercept: f64,
}

/// Median of all pairwise slopes; intercept is `median(y) - slope·median(x)`.
pub fn sens_slope(xs: &[f64], ys: &[f64]) -> Option<SensSlope> {
    if xs.len() != ys.len() {
        return None;
    }
    let mut slopes = Vec::new();
    for i in 0..xs.len() {
        for j in i + 1..xs.len() {
            let dx = xs[j] - xs[i];
            if dx != 0.0 {
                slopes.push((ys[j] - ys[i]) / dx);
            }
        }
    }
    let slope = stats::median(&slopes)?;
    let intercept = stats::median(ys)? - slope * stats::median(xs)?;
    Some(SensSlope { slope, intercept })
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LinearRegression {
    pub slope: f64,
    pub intercept: f64,
    pub r: f64,
    pub r_squared: f64,
    /// two-sided t-test of slope = 0
    pub p_value: f64,
    pub std_err: f64,
}

/// Ordinary least squares of `ys` on `xs`. Needs three points and some spread in x.
pub fn linear_regression(xs: &[f64], ys: &[f64]) -> Option<LinearRegression> {
    let n = xs.len();
    if n != ys.len() || n < 3 {
        return None;
    }
    let mean_x = stats::mean(xs)?;
    let mean_y = stats::mean(ys)?;
    let sxx: f64 = xs.iter().map(|x| (x - mean_x).powi(2)).sum();
    if sxx == 0.0 {
        return None;
    }
    let design: Vec<Vec<f64>> = xs.iter().map(|x| vec![*x, 1.0]).collect();
    let coefficients = linalg::least_squares(&design, ys)?;
    let (slope, intercept) = (coefficients[0], coefficients[1]);

    let syy: f64 = ys.iter().map(|y| (y - mean_y).powi(2)).sum();
    let ss_res: f64 = xs
        .iter()
        .zip(ys)
        .map(|(x, y)| (y - slope * x - intercept).powi(2))
        .sum();
    let df = (n - 2) as f64;
    let (r_squared, p_value, std_err) = if syy == 0.0 {
        (0.0, 1.0, 0.0)
    } else if ss_res <= syy * PERFECT_FIT {
        (1.0, 0.0, 0.0)
    } else {
        let r_squared = (1.0 - ss_res / syy).clamp(0.0, 1.0);
        let std_err = (ss_res / df / sxx).sqrt();
        (r_squared, student_t_two_sided_p(slope / std_err, df), std_err)
    };
    Some(LinearRegression {
        slope,
        intercept,
        r: r_squared.sqrt().copysign(slope),
        r_squared,
        p_value,
        std_err,
    })
}

/// Residual share of the total variance treated as an exact fit.
const PERFECT_FIT: f64 = 1e-24;

/// Two-sided p-value of a standard normal statistic.
fn normal_two_sided_p(z: f64) -> f64 {
    Normal::new(0.0, 1.0)
        .map(|normal| (2.0 * normal.sf(z.abs())).min(1.0))
        .unwrap_or(1.0)
}

/// Two-sided p-value of a t statistic with `df` degrees of freedom.
fn student_t_two_sided_p(t: f64, df: f64) -> f64 {
    if !t.is_finite() {
        return 0.0;
    }
    StudentsT::new(0.0, 1.0, df)
        .map(|dist| (2.0 * dist.sf(t.abs())).min(1.0))
        .unwrap_or(1.0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TrendDirection {
    Increasing,
    Decreasing,
    NoTrend,
}

impl TrendDirection {
    fn from_slope(slope: f64) -> TrendDirection {
        if slope > 0.0 {
            TrendDirection::Increasing
        } else if slope < 0.0 {
            TrendDirection::Decreasing
        } else {
            TrendDirection::NoTrend
        }
    }
}

impl fmt::Display for TrendDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TrendDirection::Increasing => "increasing",
            TrendDirection::Decreasing => "decreasing",
            TrendDirection::NoTrend => "no trend",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendResult {
    /// what was tested, e.g. "peak_doy Zanka"
    pub unit: String,
    pub points: Vec<DecadePoint>,
    pub mann_kendall: MannKendall,
    pub sen: SensSlope,
    pub regression: Option<LinearRegression>,
    /// values changed or removed by outlier correction, across all buckets
    pub outliers_adjusted: usize,
    /// years outside every decade span
    pub excluded: usize,
    /// sign of Sen's slope, regardless of significance
    pub direction: TrendDirection,
}

impl TrendResult {
    pub fn outlier_adjusted(&self) -> bool {
        self.outliers_adjusted > 0
    }

    pub fn is_significant(&self, alpha: f64) -> bool {
        self.mann_kendall.p_value < alpha
    }

    /// The trend direction, only when the Mann-Kendall p-value is below `alpha`.
    pub fn significant_direction(&self, alpha: f64) -> Option<TrendDirection> {
        if self.is_significant(alpha) && self.direction != TrendDirection::NoTrend {
            Some(self.direction)
        } else {
            None
        }
    }
}

impl fmt::Display for TrendResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: sen={:.3}/yr S={} tau={:.3} p={:.4}{} ({})",
            self.unit,
            self.sen.slope,
            self.mann_kendall.s,
            self.mann_kendall.tau,
            self.mann_kendall.p_value,
            if self.mann_kendall.exact { " exact" } else { "" },
            self.direction
        )?;
        if let Some(reg) = &self.regression {
            write!(
                f,
                " ols={:.3}/yr r2={:.3} p={:.4}",
                reg.slope, reg.r_squared, reg.p_value
            )?;
        }
        Ok(())
    }
}

/// Runs the decade bucketing and trend tests with one [`TrendConfig`].
pub struct DecadalTrendTester<'a> {
    config: &'a TrendConfig,
}

impl<'a> DecadalTrendTester<'a> {
    pub fn new(config: &'a TrendConfig) -> Self {
        DecadalTrendTester { config }
    }

    /// Bucket `(year, value)` pairs by decade and test the aggregated sequence.
    pub fn test_yearly(&self, unit: &str, values: &[(i32, f64)]) -> Result<TrendResult> {
        let (buckets, excluded) = self.config.decades.bucketize(values);
        if excluded > 0 {
            debug!("{}: {} values outside the decade scheme", unit, excluded);
        }
        let mut result = self.test_buckets(unit, &buckets)?;
        result.excluded = excluded;
        Ok(result)
    }

    /// Test one field of per-season phenology metrics, placed at each season's representative year.
    pub fn test_metric(
        &self,
        unit: &str,
        metrics: &[PhenologyMetrics],
        metric: PhenologyMetric,
    ) -> Result<TrendResult> {
        self.test_yearly(unit, &metric.yearly_values(metrics))
    }

    /// Outlier-correct and aggregate each bucket, then test. Empty buckets are skipped.
    pub fn test_buckets(&self, unit: &str, buckets: &[DecadeBucket]) -> Result<TrendResult> {
        let mut points = Vec::new();
        let mut outliers_adjusted = 0;
        for bucket in buckets {
            let raw = bucket.raw_values();
            let values = if raw.len() >= self.config.min_bucket_size {
                let (corrected, adjusted) =
                    correct_outliers(&raw, self.config.iqr_multiplier, self.config.outlier_mode);
                if adjusted > 0 {
                    debug!(
                        "{} {}: {} outliers adjusted",
                        unit, bucket.span.label, adjusted
                    );
                }
                outliers_adjusted += adjusted;
                corrected
            } else {
                raw
            };
            if let Some(value) = self.config.aggregation.apply(&values) {
                points.push(DecadePoint {
                    label: bucket.span.label.clone(),
                    mid_year: bucket.span.mid_year(),
                    value,
                    count: values.len(),
                });
            }
        }
        let mut result = self.test_points(unit, points)?;
        result.outliers_adjusted = outliers_adjusted;
        Ok(result)
    }

    /// Test an already aggregated decade sequence, ordered by mid-year.
    pub fn test_points(&self, unit: &str, points: Vec<DecadePoint>) -> Result<TrendResult> {
        if points.len() < 3 {
            return Err(ChlaError::insufficient(
                unit,
                format!("{} decade points, need at least 3", points.len()),
            ));
        }
        let xs: Vec<f64> = points.iter().map(|p| p.mid_year as f64).collect();
        let ys: Vec<f64> = points.iter().map(|p| p.value).collect();
        let mann_kendall = mann_kendall(&ys, self.config.exact_max_n);
        let sen = sens_slope(&xs, &ys)
            .ok_or_else(|| ChlaError::insufficient(unit, "no distinct decade mid-years"))?;
        let regression = linear_regression(&xs, &ys);
        Ok(TrendResult {
            unit: unit.to_string(),
            points,
            mann_kendall,
            direction: TrendDirection::from_slope(sen.slope),
            sen,
            regression,
            outliers_adjusted: 0,
            excluded: 0,
        })
    }
}
