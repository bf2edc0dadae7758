//! Spatio-temporal asynchrony heat map (Fig. 4)
//!
//! Reads from `data/` and writes under `figures/` relative to the working
//! directory, with the default analysis configuration.

use chla_cmd::{run_standalone, Task};
use std::process::ExitCode;

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    run_standalone(Task::Asynchrony)
}
