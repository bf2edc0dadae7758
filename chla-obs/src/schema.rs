//! Header lookup and cell parsing shared by the table loaders.
//!
//! Every loader resolves its columns once from the header row, so a missing
//! or renamed column fails before any data row is read.

use crate::error::{ChlaError, Result};
use chrono::NaiveDate;
use csv::{Reader, ReaderBuilder, StringRecord, Trim};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

/// Open a headered CSV file, reporting a missing file by name.
pub(crate) fn open_csv(path: &Path) -> Result<Reader<File>> {
    if !path.exists() {
        return Err(ChlaError::MissingInputFile {
            path: path.to_path_buf(),
        });
    }
    ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .from_path(path)
        .map_err(|source| ChlaError::Csv {
            path: path.to_path_buf(),
            source,
        })
}

/// Wrap any reader (an in-memory string in tests) in the same CSV settings.
pub(crate) fn csv_from_reader<R: Read>(reader: R) -> Reader<R> {
    ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .from_reader(reader)
}

/// Resolved header row of one input file.
pub(crate) struct Schema {
    path: PathBuf,
    headers: StringRecord,
}

impl Schema {
    pub(crate) fn read<R: Read>(path: &Path, rdr: &mut Reader<R>) -> Result<Self> {
        let headers = rdr.headers().map_err(|source| ChlaError::Csv {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Schema {
            path: path.to_path_buf(),
            headers: headers.clone(),
        })
    }

    /// Index of a column that must be present.
    pub(crate) fn require(&self, column: &str) -> Result<usize> {
        self.optional(column)
            .ok_or_else(|| ChlaError::SchemaMismatch {
                path: self.path.clone(),
                column: column.to_string(),
            })
    }

    /// Index of a column that may be absent.
    pub(crate) fn optional(&self, column: &str) -> Option<usize> {
        self.headers.iter().position(|h| h.trim() == column)
    }

    pub(crate) fn len(&self) -> usize {
        self.headers.len()
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }
}

/// One data row with enough context to name the offending cell on failure.
pub(crate) struct Row<'a> {
    pub(crate) path: &'a Path,
    pub(crate) line: u64,
    pub(crate) record: &'a StringRecord,
}

impl<'a> Row<'a> {
    pub(crate) fn new(path: &'a Path, record: &'a StringRecord) -> Self {
        let line = record.position().map(|p| p.line()).unwrap_or(0);
        Row { path, line, record }
    }

    fn invalid(&self, column: &str, value: &str) -> ChlaError {
        ChlaError::InvalidValue {
            path: self.path.to_path_buf(),
            line: self.line,
            column: column.to_string(),
            value: value.to_string(),
        }
    }

    pub(crate) fn text(&self, index: usize) -> &'a str {
        self.record.get(index).unwrap_or("").trim()
    }

    pub(crate) fn date(&self, index: usize, column: &str) -> Result<NaiveDate> {
        let raw = self.text(index);
        chla_utils::dates::parse_date(raw).map_err(|_| self.invalid(column, raw))
    }

    /// Numeric cell where an empty/NA cell means "missing".
    pub(crate) fn optional_f64(&self, index: usize, column: &str) -> Result<Option<f64>> {
        let raw = self.text(index);
        if is_missing(raw) {
            return Ok(None);
        }
        parse_number(raw)
            .map(Some)
            .ok_or_else(|| self.invalid(column, raw))
    }

    /// Numeric cell that must hold a finite number.
    pub(crate) fn required_f64(&self, index: usize, column: &str) -> Result<f64> {
        let raw = self.text(index);
        match self.optional_f64(index, column)? {
            Some(v) => Ok(v),
            None => Err(self.invalid(column, raw)),
        }
    }

    pub(crate) fn required_text(&self, index: usize, column: &str) -> Result<String> {
        let raw = self.text(index);
        if raw.is_empty() {
            return Err(self.invalid(column, raw));
        }
        Ok(raw.to_string())
    }

    /// Day of year of `date`. A filled `index` cell must agree with it.
    pub(crate) fn day_of_year(&self, index: Option<usize>, column: &str, date: &NaiveDate) -> Result<u16> {
        let derived = chla_utils::dates::day_of_year(date);
        let Some(raw) = index.map(|i| self.text(i)).filter(|raw| !raw.is_empty()) else {
            return Ok(derived);
        };
        raw.parse::<f64>()
            .ok()
            .filter(|d| *d == derived as f64)
            .map(|_| derived)
            .ok_or_else(|| self.invalid(column, raw))
    }
}

fn is_missing(raw: &str) -> bool {
    raw.is_empty() || raw.eq_ignore_ascii_case("nan") || raw.eq_ignore_ascii_case("na")
}

/// Parse a number, accepting thousands separators ("12,345.6").
pub(crate) fn parse_number(raw: &str) -> Option<f64> {
    let cleaned: String = raw.chars().filter(|c| *c != ',').collect();
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}
