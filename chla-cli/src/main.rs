//! Chl-a CLI - regenerates the phenology table and figures from the CSV
//! exports under the data directory.

use chla_cmd::{report_failure, run_all, run_tasks, Command, Settings};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(
    name = "chla-cli",
    version,
    about = "Lake Balaton Chl-a phenology and spatial figures"
)]
struct Cli {
    /// Directory holding the station, centerline and transect CSVs
    #[arg(long, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    /// Directory the figures and tables are written to
    #[arg(long, value_name = "DIR")]
    figures_dir: Option<PathBuf>,

    /// JSON file overriding the analysis configuration
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Task to run; every task when omitted
    #[command(subcommand)]
    command: Option<Command>,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let settings = match Settings::new(cli.data_dir, cli.figures_dir, cli.config.as_deref()) {
        Ok(settings) => settings,
        Err(err) => {
            eprintln!("{}: {}", err.kind(), err.identifier());
            eprintln!("  {}", err);
            return ExitCode::FAILURE;
        }
    };

    match cli.command.unwrap_or(Command::All) {
        Command::All => {
            let summary = run_all(&settings);
            summary.print();
            summary.exit_code()
        }
        Command::Task(task) => {
            let summary = run_tasks(&settings, &[task]);
            for (task, err) in summary.failed() {
                report_failure(task, err);
            }
            summary.exit_code()
        }
    }
}
