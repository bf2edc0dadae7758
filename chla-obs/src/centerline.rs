use crate::basin::CenterlineBasin;
use crate::error::{ChlaError, Result};
use crate::schema::{csv_from_reader, open_csv, Row, Schema};
use chrono::{Datelike, NaiveDate};
use log::info;
use serde::Serialize;
use std::io::Read;
use std::path::Path;

/// File name of the centerline table under the data directory.
pub const CENTERLINE_FILE: &str = "Centerline_4decades.csv";

pub const COL_DATE: &str = "date";
pub const COL_DISTANCE: &str = "distance";
pub const COL_PELAGIC: &str = "pelagic";
pub const COL_NORTH: &str = "north coast";
pub const COL_SOUTH: &str = "south coast";

/// Chl-a sampled at one position along the lake centerline on one date,
/// with the matching north and south littoral values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CenterlineRecord {
    pub date: NaiveDate,
    /// km from the western end of the lake
    pub distance: f64,
    pub pelagic: Option<f64>,
    pub north_coast: Option<f64>,
    pub south_coast: Option<f64>,
}

impl CenterlineRecord {
    pub fn year(&self) -> i32 {
        self.date.year()
    }

    pub fn month(&self) -> u32 {
        self.date.month()
    }

    pub fn basin(&self) -> Option<CenterlineBasin> {
        CenterlineBasin::from_distance(self.distance)
    }
}

#[derive(Debug, Clone, Default)]
pub struct CenterlineTable {
    pub records: Vec<CenterlineRecord>,
}

impl CenterlineTable {
    /// Load `Centerline_4decades.csv`. `month`/`year` columns, when present,
    /// are ignored in favour of the parsed date.
    pub fn load(path: &Path) -> Result<CenterlineTable> {
        let mut rdr = open_csv(path)?;
        let table = Self::read_rows(path, &mut rdr)?;
        info!(
            "loaded {} centerline records from {} ({} without pelagic chla)",
            table.records.len(),
            path.display(),
            table.missing_pelagic()
        );
        Ok(table)
    }

    pub fn from_reader<R: Read>(label: &Path, reader: R) -> Result<CenterlineTable> {
        let mut rdr = csv_from_reader(reader);
        Self::read_rows(label, &mut rdr)
    }

    fn read_rows<R: Read>(path: &Path, rdr: &mut csv::Reader<R>) -> Result<CenterlineTable> {
        let schema = Schema::read(path, rdr)?;
        let date_idx = schema.require(COL_DATE)?;
        let distance_idx = schema.require(COL_DISTANCE)?;
        let pelagic_idx = schema.require(COL_PELAGIC)?;
        let north_idx = schema.require(COL_NORTH)?;
        let south_idx = schema.require(COL_SOUTH)?;

        let mut records = Vec::new();
        for record in rdr.records() {
            let record = record.map_err(|source| ChlaError::Csv {
                path: path.to_path_buf(),
                source,
            })?;
            let row = Row::new(path, &record);
            records.push(CenterlineRecord {
                date: row.date(date_idx, COL_DATE)?,
                distance: row.required_f64(distance_idx, COL_DISTANCE)?,
                pelagic: row.optional_f64(pelagic_idx, COL_PELAGIC)?,
                north_coast: row.optional_f64(north_idx, COL_NORTH)?,
                south_coast: row.optional_f64(south_idx, COL_SOUTH)?,
            });
        }
        Ok(CenterlineTable { records })
    }

    pub fn missing_pelagic(&self) -> usize {
        self.records.iter().filter(|r| r.pelagic.is_none()).count()
    }

    /// Records of one calendar month in one year.
    pub fn for_year_month(&self, year: i32, month: u32) -> impl Iterator<Item = &CenterlineRecord> {
        self.records
            .iter()
            .filter(move |r| r.year() == year && r.month() == month)
    }

    /// Records of one calendar month across all years.
    pub fn for_month(&self, month: u32) -> impl Iterator<Item = &CenterlineRecord> {
        self.records.iter().filter(move |r| r.month() == month)
    }

    /// Distinct years in ascending order.
    pub fn years(&self) -> Vec<i32> {
        let mut years: Vec<i32> = self.records.iter().map(|r| r.year()).collect();
        years.sort_unstable();
        years.dedup();
        years
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
date,distance,pelagic,north coast,south coast,month
2004-08-03,1.5,30.2,35.0,41.1,8
2004-08-03,8.0,22.0,,25.5,8
2004-09-11,8.0,NaN,20.0,19.0,9
";

    #[test]
    fn test_load_from_reader() {
        let table = CenterlineTable::from_reader(Path::new("mem.csv"), SAMPLE.as_bytes()).unwrap();
        assert_eq!(table.records.len(), 3);
        assert_eq!(table.records[1].north_coast, None);
        assert_eq!(table.records[2].pelagic, None);
        assert_eq!(table.missing_pelagic(), 1);
        assert_eq!(table.records[0].basin(), Some(CenterlineBasin::I));
        assert_eq!(table.records[1].basin(), Some(CenterlineBasin::II));
    }

    #[test]
    fn test_month_filters() {
        let table = CenterlineTable::from_reader(Path::new("mem.csv"), SAMPLE.as_bytes()).unwrap();
        assert_eq!(table.for_year_month(2004, 8).count(), 2);
        assert_eq!(table.for_month(9).count(), 1);
        assert_eq!(table.years(), vec![2004]);
    }

    #[test]
    fn test_renamed_column_is_schema_mismatch() {
        let csv = "date,distance,pelagic,north_coast,south coast\n";
        let err = CenterlineTable::from_reader(Path::new("c.csv"), csv.as_bytes()).unwrap_err();
        match err {
            ChlaError::SchemaMismatch { column, .. } => assert_eq!(column, "north coast"),
            other => panic!("unexpected error {other:?}"),
        }
    }
}
