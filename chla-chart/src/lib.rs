//! Static PNG rendering for the Chl-a figures.
//!
//! Figures carry geometry and colour only. Nothing here draws text, so the
//! bitmap backend never needs a font.

pub mod draw;
pub mod palette;
pub mod writer;

pub use draw::{BoxStats, Chart, Frame};
pub use writer::{write_bytes, write_png, Canvas};
