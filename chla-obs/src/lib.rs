//! Data model and CSV loaders for the Lake Balaton Chl-a tables.
//!
//! Loaders fail fast on a missing file, a missing column or an unparseable
//! cell, naming the file and column. Empty Chl-a cells are kept as `None`.

pub mod basin;
pub mod centerline;
pub mod error;
pub mod observation;
mod schema;
pub mod transect;

pub use basin::{CenterlineBasin, Station, BASIN_BOUNDARIES_KM};
pub use centerline::{CenterlineRecord, CenterlineTable, CENTERLINE_FILE};
pub use error::{ChlaError, Result};
pub use observation::{Observation, StationTable, STATIONS_FILE};
pub use transect::{Transect, TransectPoint, TRANSECT_NAMES};
