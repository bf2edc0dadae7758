//! Shared utility functions for the Chl-a phenology crates.

/// Date utility functions
pub mod dates {
    use crate::error::DateError;
    use chrono::{Datelike, NaiveDate, NaiveDateTime};

    /// Date formats accepted in the input tables, tried in order.
    const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%Y%m%d"];

    /// Datetime formats accepted in the input tables; only the date part is kept.
    const DATETIME_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];

    /// Format a NaiveDate as "YYYY-MM-DD"
    pub fn format_date(date: &NaiveDate) -> String {
        date.format("%Y-%m-%d").to_string()
    }

    /// Parse a date cell from one of the input tables.
    ///
    /// Accepts `YYYY-MM-DD`, `YYYY/MM/DD`, `YYYYMMDD` and the common datetime
    /// spellings (the time of day is discarded).
    pub fn parse_date(s: &str) -> Result<NaiveDate, DateError> {
        let s = s.trim();
        for format in DATE_FORMATS {
            if let Ok(date) = NaiveDate::parse_from_str(s, format) {
                return Ok(date);
            }
        }
        for format in DATETIME_FORMATS {
            if let Ok(datetime) = NaiveDateTime::parse_from_str(s, format) {
                return Ok(datetime.date());
            }
        }
        Err(DateError(s.to_string()))
    }

    /// Day of the calendar year, 1-based (Jan 1 = 1, Dec 31 = 365 or 366).
    pub fn day_of_year(date: &NaiveDate) -> u16 {
        date.ordinal() as u16
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_parse_date_formats() {
            let expected = NaiveDate::from_ymd_opt(2019, 7, 14).unwrap();
            assert_eq!(parse_date("2019-07-14").unwrap(), expected);
            assert_eq!(parse_date("2019/07/14").unwrap(), expected);
            assert_eq!(parse_date("20190714").unwrap(), expected);
            assert_eq!(parse_date(" 2019-07-14 10:32:05 ").unwrap(), expected);
            assert_eq!(parse_date("2019-07-14T10:32:05").unwrap(), expected);
        }

        #[test]
        fn test_parse_date_rejects_garbage() {
            let err = parse_date("14.07.2019").unwrap_err();
            assert_eq!(err.0, "14.07.2019");
            assert!(parse_date("").is_err());
        }

        #[test]
        fn test_day_of_year() {
            let jan1 = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
            assert_eq!(day_of_year(&jan1), 1);

            let oct31 = NaiveDate::from_ymd_opt(2023, 10, 31).unwrap();
            assert_eq!(day_of_year(&oct31), 304);

            let dec31_leap = NaiveDate::from_ymd_opt(2020, 12, 31).unwrap();
            assert_eq!(day_of_year(&dec31_leap), 366);
        }

        #[test]
        fn test_format_and_parse() {
            let date = NaiveDate::from_ymd_opt(2023, 6, 15).unwrap();
            let formatted = format_date(&date);
            assert_eq!(formatted, "2023-06-15");
            assert_eq!(parse_date(&formatted).unwrap(), date);
        }
    }
}

/// Descriptive statistics over `f64` slices.
///
/// Inputs are expected to be free of missing values; callers drop them first
/// so the dropped count can be logged where the data is loaded.
pub mod stats {
    /// Arithmetic mean, `None` for an empty slice.
    pub fn mean(values: &[f64]) -> Option<f64> {
        if values.is_empty() {
            return None;
        }
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }

    /// Median (mean of the two middle values for even lengths).
    pub fn median(values: &[f64]) -> Option<f64> {
        quantile(values, 0.5)
    }

    /// Quantile with linear interpolation between closest ranks.
    ///
    /// Matches the "linear" method of the common dataframe libraries:
    /// position `q * (n - 1)` in the sorted data.
    pub fn quantile(values: &[f64], q: f64) -> Option<f64> {
        if values.is_empty() || !(0.0..=1.0).contains(&q) {
            return None;
        }
        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));
        let position = q * (sorted.len() - 1) as f64;
        let lower = position.floor() as usize;
        let upper = position.ceil() as usize;
        let fraction = position - lower as f64;
        Some(sorted[lower] + (sorted[upper] - sorted[lower]) * fraction)
    }

    /// First quartile, median and third quartile.
    pub fn quartiles(values: &[f64]) -> Option<(f64, f64, f64)> {
        Some((
            quantile(values, 0.25)?,
            quantile(values, 0.5)?,
            quantile(values, 0.75)?,
        ))
    }

    /// Smallest and largest value, `None` for an empty slice.
    pub fn min_max(values: &[f64]) -> Option<(f64, f64)> {
        let first = *values.first()?;
        Some(
            values
                .iter()
                .fold((first, first), |(lo, hi), &v| (lo.min(v), hi.max(v))),
        )
    }

    /// Trapezoidal integral of `ys` over the sample positions `xs`.
    ///
    /// Panics if the slices differ in length.
    pub fn trapezoid(xs: &[f64], ys: &[f64]) -> f64 {
        assert_eq!(xs.len(), ys.len(), "trapezoid needs paired samples");
        xs.windows(2)
            .zip(ys.windows(2))
            .map(|(x, y)| (x[1] - x[0]) * (y[0] + y[1]) / 2.0)
            .sum()
    }

}

/// Error types
pub mod error {
    use thiserror::Error;

    /// A date cell that matched none of the accepted formats.
    #[derive(Debug, Error)]
    #[error("unparseable date '{0}'")]
    pub struct DateError(pub String);
}
