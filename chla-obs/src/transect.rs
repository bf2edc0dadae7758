use crate::error::{ChlaError, Result};
use crate::schema::{csv_from_reader, open_csv, Row, Schema};
use log::info;
use serde::Serialize;
use std::io::Read;
use std::path::{Path, PathBuf};

/// The five south-north transects, west to east.
pub const TRANSECT_NAMES: [&str; 5] = ["I", "II", "III", "IV-1", "IV-2"];

/// `Transection_<name>.csv`
pub fn file_name(name: &str) -> String {
    format!("Transection_{name}.csv")
}

/// One sample along a transect.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TransectPoint {
    /// km from the southern shore
    pub distance: f64,
    /// m, negative below the surface
    pub depth: f64,
    pub chla: f64,
}

#[derive(Debug, Clone)]
pub struct Transect {
    pub name: String,
    pub points: Vec<TransectPoint>,
}

impl Transect {
    /// Load `Transection_<name>.csv` from `data_dir`.
    ///
    /// The file carries three positional columns: distance in meters
    /// (thousands separators allowed), depth in meters and Chl-a. Header
    /// names are not checked.
    pub fn load(data_dir: &Path, name: &str) -> Result<Transect> {
        let path: PathBuf = data_dir.join(file_name(name));
        let mut rdr = open_csv(&path)?;
        let transect = Self::read_rows(&path, name, &mut rdr)?;
        if let (Some(first), Some(last)) = (transect.points.first(), transect.points.last()) {
            info!(
                "loaded transect {}: {} points, {:.1}-{:.1} km",
                name,
                transect.points.len(),
                first.distance,
                last.distance
            );
        }
        Ok(transect)
    }

    pub fn from_reader<R: Read>(label: &Path, name: &str, reader: R) -> Result<Transect> {
        let mut rdr = csv_from_reader(reader);
        Self::read_rows(label, name, &mut rdr)
    }

    fn read_rows<R: Read>(path: &Path, name: &str, rdr: &mut csv::Reader<R>) -> Result<Transect> {
        let schema = Schema::read(path, rdr)?;
        if schema.len() < 3 {
            return Err(ChlaError::SchemaMismatch {
                path: path.to_path_buf(),
                column: "distance, depth, chla".to_string(),
            });
        }

        let mut points = Vec::new();
        for record in rdr.records() {
            let record = record.map_err(|source| ChlaError::Csv {
                path: path.to_path_buf(),
                source,
            })?;
            let row = Row::new(path, &record);
            points.push(TransectPoint {
                distance: row.required_f64(0, "distance")? / 1000.0,
                depth: row.required_f64(1, "depth")?,
                chla: row.required_f64(2, "chla")?,
            });
        }
        Ok(Transect {
            name: name.to_string(),
            points,
        })
    }

    pub fn distances(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.distance).collect()
    }

    pub fn depths(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.depth).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_meters_with_separators() {
        let csv = "Distance (m),Depth,Chl-a\n0,0.0,30.5\n\"1,250\",-1.5,28.0\n\"2,500.5\",-3.2,22.0\n";
        let t = Transect::from_reader(Path::new("t.csv"), "I", csv.as_bytes()).unwrap();
        assert_eq!(t.points.len(), 3);
        assert_eq!(t.points[1].distance, 1.25);
        assert!((t.points[2].distance - 2.5005).abs() < 1e-12);
        assert_eq!(t.depths(), vec![0.0, -1.5, -3.2]);
    }

    #[test]
    fn test_too_few_columns() {
        let csv = "distance,depth\n0,0\n";
        let err = Transect::from_reader(Path::new("t.csv"), "I", csv.as_bytes()).unwrap_err();
        assert_eq!(err.kind(), "SchemaMismatch");
    }

    #[test]
    fn test_file_names() {
        assert_eq!(file_name("IV-1"), "Transection_IV-1.csv");
    }
}
