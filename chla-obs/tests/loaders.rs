use chla_obs::{CenterlineTable, ChlaError, StationTable, Transect, CENTERLINE_FILE, STATIONS_FILE};
use std::fs;
use tempfile::TempDir;

fn write(dir: &TempDir, name: &str, contents: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, contents).unwrap();
    path
}

#[test]
fn test_missing_file_is_reported_by_path() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(STATIONS_FILE);
    let err = StationTable::load(&path).unwrap_err();
    assert_eq!(err.kind(), "MissingInputFile");
    assert!(err.identifier().ends_with(STATIONS_FILE));
}

#[test]
fn test_missing_column_names_the_column() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, STATIONS_FILE, "date,chla,sensor\n2019-07-01,3.0,L8\n");
    match StationTable::load(&path).unwrap_err() {
        ChlaError::SchemaMismatch { column, path: p } => {
            assert_eq!(column, "Basin");
            assert_eq!(p, path);
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn test_unparseable_date_names_line_and_column() {
    let dir = TempDir::new().unwrap();
    let path = write(
        &dir,
        STATIONS_FILE,
        "date,chla,Basin,sensor\n2019-07-01,3.0,Zanka,L8\n01.07.2019,4.0,Zanka,L8\n",
    );
    match StationTable::load(&path).unwrap_err() {
        ChlaError::InvalidValue {
            line, column, value, ..
        } => {
            assert_eq!(line, 3);
            assert_eq!(column, "date");
            assert_eq!(value, "01.07.2019");
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn test_unparseable_number_is_invalid_value() {
    let dir = TempDir::new().unwrap();
    let path = write(
        &dir,
        STATIONS_FILE,
        "date,chla,Basin,sensor\n2019-07-01,high,Zanka,L8\n",
    );
    let err = StationTable::load(&path).unwrap_err();
    assert_eq!(err.kind(), "InvalidValue");
}

#[test]
fn test_doy_column_must_match_date() {
    let dir = TempDir::new().unwrap();
    let path = write(
        &dir,
        STATIONS_FILE,
        "date,chla,Basin,sensor,doy\n2020-07-01,3.0,Zanka,L8,183\n2019-07-01,4.0,Zanka,L8,\n",
    );
    let table = StationTable::load(&path).unwrap();
    let days: Vec<u16> = table.observations.iter().map(|o| o.doy).collect();
    assert_eq!(days, vec![183, 182]);

    let path = write(
        &dir,
        STATIONS_FILE,
        "date,chla,Basin,sensor,doy\n2019-07-01,3.0,Zanka,L8,182\n2019-07-02,4.0,Zanka,L8,200\n",
    );
    match StationTable::load(&path).unwrap_err() {
        ChlaError::InvalidValue {
            line, column, value, ..
        } => {
            assert_eq!(line, 3);
            assert_eq!(column, "doy");
            assert_eq!(value, "200");
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn test_missing_chla_kept_as_missing() {
    let dir = TempDir::new().unwrap();
    let path = write(
        &dir,
        STATIONS_FILE,
        "date,chla,Basin,sensor\n2019-07-01,,Zanka,L8\n2019-07-02,NaN,Zanka,L8\n2019-07-03,0,Zanka,L8\n",
    );
    let table = StationTable::load(&path).unwrap();
    let values: Vec<Option<f64>> = table.observations.iter().map(|o| o.chla).collect();
    assert_eq!(values, vec![None, None, Some(0.0)]);
    assert_eq!(table.missing_count(), 2);
}

#[test]
fn test_centerline_and_transect_files() {
    let dir = TempDir::new().unwrap();
    write(
        &dir,
        CENTERLINE_FILE,
        "date,distance,pelagic,north coast,south coast\n2023-08-10,12.0,25.0,30.0,33.0\n",
    );
    write(
        &dir,
        "Transection_II.csv",
        "dist,depth,chla\n0,0.2,20\n\"1,000\",-2.5,18\n",
    );

    let centerline = CenterlineTable::load(&dir.path().join(CENTERLINE_FILE)).unwrap();
    assert_eq!(centerline.records.len(), 1);
    assert_eq!(centerline.records[0].month(), 8);

    let transect = Transect::load(dir.path(), "II").unwrap();
    assert_eq!(transect.name, "II");
    assert_eq!(transect.distances(), vec![0.0, 1.0]);

    let err = Transect::load(dir.path(), "III").unwrap_err();
    assert_eq!(err.kind(), "MissingInputFile");
}
