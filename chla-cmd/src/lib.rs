//! Figure tasks for the Balaton Chl-a toolkit.
//!
//! Each task reads its inputs under the data directory, writes its PNG (and
//! tables) under the figures directory and reports what it produced and which
//! analysis units it had to skip.

use chla_obs::{ChlaError, Result};
use clap::Subcommand;
use log::{info, warn};
use std::fmt;
use std::path::PathBuf;

pub mod batch;
pub mod figures;
pub mod settings;

pub use batch::{report_failure, run_all, run_standalone, run_tasks, BatchSummary};
pub use settings::Settings;

/// One figure task, in the order the batch runs them.
#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Task {
    /// Decade phenology table, trend tests and Fig. 9
    Phenology,
    /// Pelagic Chl-a along the centerline per month (Fig. 3)
    CenterlineMonths,
    /// Binned July-September heat map with the Sep - Aug difference (Fig. 4)
    Asynchrony,
    /// Distance-decay model fits per decade and month (Fig. S4, Fig. 5)
    CenterlineFitting,
    /// Littoral/pelagic ratios by decade and basin (Fig. 6)
    PelagicRatio,
    /// August north, south and pelagic profiles per year (Fig. 7)
    PelagicComparison,
    /// Chl-a and depth along the south-north transects (Fig. 8)
    TransectOverlay,
}

impl Task {
    pub const ALL: [Task; 7] = [
        Task::Phenology,
        Task::CenterlineMonths,
        Task::Asynchrony,
        Task::CenterlineFitting,
        Task::PelagicRatio,
        Task::PelagicComparison,
        Task::TransectOverlay,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Task::Phenology => "phenology",
            Task::CenterlineMonths => "centerline-months",
            Task::Asynchrony => "asynchrony",
            Task::CenterlineFitting => "centerline-fitting",
            Task::PelagicRatio => "pelagic-ratio",
            Task::PelagicComparison => "pelagic-comparison",
            Task::TransectOverlay => "transect-overlay",
        }
    }

    pub fn run(&self, settings: &Settings) -> Result<TaskReport> {
        info!("running {}", self);
        let report = match self {
            Task::Phenology => figures::phenology::run(settings),
            Task::CenterlineMonths => figures::centerline_months::run(settings),
            Task::Asynchrony => figures::asynchrony::run(settings),
            Task::CenterlineFitting => figures::centerline_fitting::run(settings),
            Task::PelagicRatio => figures::pelagic_ratio::run(settings),
            Task::PelagicComparison => figures::pelagic_comparison::run(settings),
            Task::TransectOverlay => figures::transect_overlay::run(settings),
        }?;
        report.log_summary(*self);
        Ok(report)
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Top-level subcommands of `chla-cli`.
#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Run every figure task in order
    All,
    #[command(flatten)]
    Task(Task),
}

/// An analysis unit a task could not compute, and why.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedUnit {
    pub unit: String,
    pub reason: String,
}

/// What one task run produced.
#[derive(Debug, Default)]
pub struct TaskReport {
    pub outputs: Vec<PathBuf>,
    pub skipped: Vec<SkippedUnit>,
}

impl TaskReport {
    pub fn output(&mut self, path: PathBuf) {
        self.outputs.push(path);
    }

    pub fn skip(&mut self, unit: impl Into<String>, reason: impl Into<String>) {
        let unit = SkippedUnit {
            unit: unit.into(),
            reason: reason.into(),
        };
        warn!("skipping {}: {}", unit.unit, unit.reason);
        self.skipped.push(unit);
    }

    /// Records a recoverable per-unit error, named by its identifier.
    pub fn skip_error(&mut self, err: &ChlaError) {
        let reason = match err {
            ChlaError::InsufficientData { reason, .. } => reason.clone(),
            other => other.to_string(),
        };
        self.skip(err.identifier(), reason);
    }

    pub fn log_summary(&self, task: Task) {
        info!(
            "{}: {} outputs, {} skipped units",
            task,
            self.outputs.len(),
            self.skipped.len()
        );
        for output in &self.outputs {
            info!("  {}", output.display());
        }
        for skipped in &self.skipped {
            info!("  skipped {}: {}", skipped.unit, skipped.reason);
        }
    }
}
