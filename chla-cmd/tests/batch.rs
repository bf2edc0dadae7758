use chla_cmd::figures::{pelagic_comparison, pelagic_ratio, phenology, transect_overlay};
use chla_cmd::{run_all, run_tasks, Settings, Task};
use chla_obs::{Station, CENTERLINE_FILE, STATIONS_FILE, TRANSECT_NAMES};
use std::fmt::Write as _;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn settings(dir: &TempDir) -> Settings {
    Settings {
        data_dir: dir.path().join("data"),
        figures_dir: dir.path().join("figures"),
        ..Settings::default()
    }
}

/// July-September centerline samples every 2 km for one year per decade.
fn write_centerline(data: &Path) {
    let mut csv = String::from("date,distance,pelagic,north coast,south coast\n");
    for (i, year) in [1990, 2000, 2010, 2020].into_iter().enumerate() {
        for month in [7, 8, 9] {
            for day in [5, 20] {
                for step in 0..=25 {
                    let distance = step as f64 * 2.0;
                    let pelagic = 20.0 * (-0.05 * distance).exp() + 5.0 + i as f64 + day as f64 * 0.01;
                    writeln!(
                        csv,
                        "{year}-{month:02}-{day:02},{distance:.1},{pelagic:.3},{:.3},{:.3}",
                        pelagic * 1.2,
                        pelagic * 1.1
                    )
                    .unwrap();
                }
            }
        }
    }
    fs::write(data.join(CENTERLINE_FILE), csv).unwrap();
}

/// Depth dips to -4 m mid-lake, so every transect crosses -2 m twice.
fn write_transects(data: &Path) {
    for name in TRANSECT_NAMES {
        let mut csv = String::from("distance,depth,chla\n");
        for step in 0..=24 {
            let meters = step as f64 * 500.0;
            let depth = -4.0 * (std::f64::consts::PI * meters / 12000.0).sin();
            writeln!(csv, "{meters},{depth:.3},{:.2}", 20.0 + step as f64 * 0.5).unwrap();
        }
        fs::write(data.join(format!("Transection_{name}.csv")), csv).unwrap();
    }
}

/// Five-daily samples of a bell-shaped bloom peaking around day 230.
fn write_stations(data: &Path) {
    let mut csv = String::from("date,chla,Basin,sensor\n");
    for station in Station::ALL {
        for year in 1986..=2023 {
            let start = chrono::NaiveDate::from_ymd_opt(year, 5, 31).unwrap();
            for k in 0..28 {
                let date = start + chrono::Duration::days(k * 5);
                let doy = 151.0 + k as f64 * 5.0;
                let chla = 4.0 + 20.0 * (-((doy - 230.0) / 30.0).powi(2)).exp();
                writeln!(csv, "{},{chla:.3},{},L8", date.format("%Y-%m-%d"), station.name()).unwrap();
            }
        }
    }
    fs::write(data.join(STATIONS_FILE), csv).unwrap();
}

fn data_dir(dir: &TempDir) -> std::path::PathBuf {
    let data = dir.path().join("data");
    fs::create_dir_all(&data).unwrap();
    data
}

#[test]
fn test_missing_station_table_does_not_stop_the_batch() {
    let dir = TempDir::new().unwrap();
    let data = data_dir(&dir);
    write_centerline(&data);
    write_transects(&data);
    let settings = settings(&dir);

    let summary = run_all(&settings);
    assert_eq!(summary.outcomes.len(), Task::ALL.len());
    assert!(!summary.all_passed());

    let failed: Vec<_> = summary.failed().collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].0, Task::Phenology);
    assert_eq!(failed[0].1.kind(), "MissingInputFile");
    assert!(failed[0].1.identifier().ends_with(STATIONS_FILE));

    assert!(settings.output(transect_overlay::FIGURE_FILE).exists());
    assert!(settings.output(pelagic_ratio::FIGURE_FILE).exists());
    assert!(!settings.output(phenology::TABLE_FILE).exists());
}

#[test]
fn test_missing_transect_fails_only_its_task() {
    let dir = TempDir::new().unwrap();
    let data = data_dir(&dir);
    write_centerline(&data);
    write_transects(&data);
    fs::remove_file(data.join("Transection_IV-1.csv")).unwrap();
    let settings = settings(&dir);

    let summary = run_tasks(&settings, &[Task::TransectOverlay, Task::PelagicComparison]);
    let failed: Vec<_> = summary.failed().collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].0, Task::TransectOverlay);
    assert_eq!(failed[0].1.kind(), "MissingInputFile");
    assert!(!settings.output(transect_overlay::FIGURE_FILE).exists());

    let passed: Vec<_> = summary.passed().collect();
    assert_eq!(passed.len(), 1);
    assert_eq!(passed[0].1.outputs, vec![settings.output(pelagic_comparison::FIGURE_FILE)]);
}

#[test]
fn test_renamed_centerline_column_is_schema_mismatch() {
    let dir = TempDir::new().unwrap();
    let data = data_dir(&dir);
    fs::write(
        data.join(CENTERLINE_FILE),
        "date,distance,pelagic,north,south coast\n2020-08-01,1.0,20.0,22.0,21.0\n",
    )
    .unwrap();
    let settings = settings(&dir);

    let summary = run_tasks(&settings, &[Task::PelagicRatio]);
    let failed: Vec<_> = summary.failed().collect();
    assert_eq!(failed[0].1.kind(), "SchemaMismatch");
    assert!(failed[0].1.identifier().ends_with("[north coast]"));
    assert!(!settings.figures_dir.join(pelagic_ratio::FIGURE_FILE).exists());
}

#[test]
fn test_phenology_writes_table_and_figure() {
    let dir = TempDir::new().unwrap();
    let data = data_dir(&dir);
    write_stations(&data);
    let settings = settings(&dir);

    let report = Task::Phenology.run(&settings).unwrap();
    assert_eq!(
        report.outputs,
        vec![
            settings.output(phenology::TABLE_FILE),
            settings.output(phenology::FIGURE_FILE)
        ]
    );
    let table = fs::read_to_string(settings.output(phenology::TABLE_FILE)).unwrap();
    let mut lines = table.lines();
    assert!(lines.next().unwrap().starts_with("basin,basin_label,decade,sos,peak_doy"));
    assert_eq!(lines.count(), Station::ALL.len() * 4);
}
