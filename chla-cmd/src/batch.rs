//! Runs tasks one after another and summarises which passed.

use crate::{Settings, Task, TaskReport};
use chla_obs::{ChlaError, Result};
use log::{error, info};
use std::fmt::Write as _;
use std::process::ExitCode;

pub struct BatchSummary {
    pub outcomes: Vec<(Task, Result<TaskReport>)>,
}

impl BatchSummary {
    pub fn failed(&self) -> impl Iterator<Item = (Task, &ChlaError)> {
        self.outcomes
            .iter()
            .filter_map(|(task, outcome)| outcome.as_ref().err().map(|e| (*task, e)))
    }

    pub fn passed(&self) -> impl Iterator<Item = (Task, &TaskReport)> {
        self.outcomes
            .iter()
            .filter_map(|(task, outcome)| outcome.as_ref().ok().map(|r| (*task, r)))
    }

    pub fn all_passed(&self) -> bool {
        self.failed().next().is_none()
    }

    /// Prints one line per task, followed by the units a passing task skipped.
    pub fn print(&self) {
        print!("{}", self.render());
    }

    fn render(&self) -> String {
        let mut out = format!("{:<20} {:<6} details\n", "task", "status");
        for (task, outcome) in &self.outcomes {
            match outcome {
                Ok(report) => {
                    let _ = writeln!(
                        out,
                        "{:<20} {:<6} {} outputs, {} skipped",
                        task.name(),
                        "ok",
                        report.outputs.len(),
                        report.skipped.len()
                    );
                    for skipped in &report.skipped {
                        let _ = writeln!(out, "    skipped {}: {}", skipped.unit, skipped.reason);
                    }
                }
                Err(err) => {
                    let _ = writeln!(
                        out,
                        "{:<20} {:<6} {}: {}",
                        task.name(),
                        "FAILED",
                        err.kind(),
                        err.identifier()
                    );
                }
            }
        }
        out
    }

    pub fn exit_code(&self) -> ExitCode {
        if self.all_passed() {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        }
    }
}

/// Runs `tasks` in order; a failing task does not stop the rest.
pub fn run_tasks(settings: &Settings, tasks: &[Task]) -> BatchSummary {
    let outcomes = tasks
        .iter()
        .map(|task| {
            let outcome = task.run(settings);
            if let Err(err) = &outcome {
                error!("{} failed: {}", task, err);
            }
            (*task, outcome)
        })
        .collect::<Vec<_>>();
    let summary = BatchSummary { outcomes };
    info!(
        "batch finished: {} passed, {} failed",
        summary.passed().count(),
        summary.failed().count()
    );
    summary
}

pub fn run_all(settings: &Settings) -> BatchSummary {
    run_tasks(settings, &Task::ALL)
}

/// Prints the error kind and the offending file, column or unit.
pub fn report_failure(task: Task, err: &ChlaError) {
    eprintln!("{}: {}: {}", task, err.kind(), err.identifier());
    eprintln!("  {}", err);
}

/// Entry point of the standalone `chart-*` binaries: default paths, default
/// configuration, one task.
pub fn run_standalone(task: Task) -> ExitCode {
    match task.run(&Settings::default()) {
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            report_failure(task, &err);
            ExitCode::FAILURE
        }
    }
}
