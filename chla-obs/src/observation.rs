use crate::basin::Station;
use crate::error::Result;
use crate::schema::{csv_from_reader, open_csv, Row, Schema};
use chrono::{Datelike, NaiveDate};
use log::{info, warn};
use serde::Serialize;
use std::collections::BTreeSet;
use std::io::Read;
use std::path::Path;

/// File name of the station table under the data directory.
pub const STATIONS_FILE: &str = "Landsat_1984_2024_stations.csv";

pub const COL_DATE: &str = "date";
pub const COL_CHLA: &str = "chla";
pub const COL_BASIN: &str = "Basin";
pub const COL_SENSOR: &str = "sensor";
pub const COL_DOY: &str = "doy";

/// One satellite overpass over one station.
///
/// A blank or `NaN` Chl-a cell is kept as `None`; it is never read as zero.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Observation {
    pub date: NaiveDate,
    pub chla: Option<f64>,
    pub basin: String,
    pub sensor: String,
    pub doy: u16,
}

impl Observation {
    pub fn year(&self) -> i32 {
        self.date.year()
    }

    pub fn station(&self) -> Option<Station> {
        Station::from_name(&self.basin)
    }
}

/// All rows of the station table, in file order.
#[derive(Debug, Clone, Default)]
pub struct StationTable {
    pub observations: Vec<Observation>,
}

impl StationTable {
    /// Load `Landsat_1984_2024_stations.csv` (or any file with the same columns).
    pub fn load(path: &Path) -> Result<StationTable> {
        let mut rdr = open_csv(path)?;
        let table = Self::read_rows(path, &mut rdr)?;
        info!(
            "loaded {} station observations from {} ({} without chla)",
            table.observations.len(),
            path.display(),
            table.missing_count()
        );
        Ok(table)
    }

    /// Parse station rows from any reader; `label` names the source in errors.
    pub fn from_reader<R: Read>(label: &Path, reader: R) -> Result<StationTable> {
        let mut rdr = csv_from_reader(reader);
        Self::read_rows(label, &mut rdr)
    }

    fn read_rows<R: Read>(path: &Path, rdr: &mut csv::Reader<R>) -> Result<StationTable> {
        let schema = Schema::read(path, rdr)?;
        let date_idx = schema.require(COL_DATE)?;
        let chla_idx = schema.require(COL_CHLA)?;
        let basin_idx = schema.require(COL_BASIN)?;
        let sensor_idx = schema.require(COL_SENSOR)?;
        let doy_idx = schema.optional(COL_DOY);

        let mut observations = Vec::new();
        for record in rdr.records() {
            let record = record.map_err(|source| crate::ChlaError::Csv {
                path: schema.path().to_path_buf(),
                source,
            })?;
            let row = Row::new(path, &record);
            let date = row.date(date_idx, COL_DATE)?;
            let doy = row.day_of_year(doy_idx, COL_DOY, &date)?;
            observations.push(Observation {
                date,
                chla: row.optional_f64(chla_idx, COL_CHLA)?,
                basin: row.required_text(basin_idx, COL_BASIN)?,
                sensor: row.text(sensor_idx).to_string(),
                doy,
            });
        }
        Ok(StationTable { observations })
    }

    /// Number of rows whose Chl-a cell was empty.
    pub fn missing_count(&self) -> usize {
        self.observations.iter().filter(|o| o.chla.is_none()).count()
    }

    /// Distinct basin names in sorted order.
    pub fn basins(&self) -> Vec<String> {
        self.observations
            .iter()
            .map(|o| o.basin.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Distinct sensor ids in sorted order.
    pub fn sensors(&self) -> Vec<String> {
        self.observations
            .iter()
            .map(|o| o.sensor.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Observations of one basin, matched case-insensitively.
    pub fn for_basin<'a>(&'a self, basin: &'a str) -> impl Iterator<Item = &'a Observation> + 'a {
        self.observations
            .iter()
            .filter(move |o| o.basin.eq_ignore_ascii_case(basin))
    }

    /// Observations of one sensor.
    pub fn for_sensor<'a>(&'a self, sensor: &'a str) -> impl Iterator<Item = &'a Observation> + 'a {
        self.observations.iter().filter(move |o| o.sensor == sensor)
    }

    /// Observations whose year lies in `[start, end]`.
    pub fn for_years(&self, start: i32, end: i32) -> impl Iterator<Item = &Observation> {
        self.observations
            .iter()
            .filter(move |o| (start..=end).contains(&o.year()))
    }

    /// Warn about basin names that match no known station.
    pub fn warn_unknown_basins(&self) {
        for basin in self.basins() {
            if Station::from_name(&basin).is_none() {
                warn!("station table has observations for unknown basin '{}'", basin);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
date,chla,Basin,sensor
2019-07-01,12.5,Keszthely,L8
2019-07-09,,Keszthely,L8
2019-07-17 10:02:00,8.25,Tihany,L7
";

    #[test]
    fn test_from_reader_keeps_missing_chla() {
        let table = StationTable::from_reader(Path::new("mem.csv"), SAMPLE.as_bytes()).unwrap();
        assert_eq!(table.observations.len(), 3);
        assert_eq!(table.observations[0].chla, Some(12.5));
        assert_eq!(table.observations[1].chla, None);
        assert_eq!(table.missing_count(), 1);
        assert_eq!(table.observations[2].doy, 198);
        assert_eq!(table.observations[2].station(), Some(Station::Tihany));
    }

    #[test]
    fn test_filters() {
        let table = StationTable::from_reader(Path::new("mem.csv"), SAMPLE.as_bytes()).unwrap();
        assert_eq!(table.basins(), vec!["Keszthely".to_string(), "Tihany".to_string()]);
        assert_eq!(table.for_basin("keszthely").count(), 2);
        assert_eq!(table.for_sensor("L7").count(), 1);
        assert_eq!(table.for_years(2020, 2023).count(), 0);
    }

    #[test]
    fn test_explicit_doy_column_wins() {
        let csv = "date,chla,Basin,sensor,doy\n2019-07-01,1.0,Zanka,L8,183\n";
        let table = StationTable::from_reader(Path::new("mem.csv"), csv.as_bytes()).unwrap();
        assert_eq!(table.observations[0].doy, 183);
    }
}
