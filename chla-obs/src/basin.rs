//! Catalog of Lake Balaton basins.
//!
//! The lake is split west to east into four basins. Station observations carry
//! the station name (basin IV has two stations); centerline records are
//! assigned a basin from their distance along the lake axis.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Sampling station, named after the town closest to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Station {
    Keszthely,
    Szigliget,
    Zanka,
    Tihany,
    Bfuzfo,
}

impl Station {
    /// All stations, west to east.
    pub const ALL: [Station; 5] = [
        Station::Keszthely,
        Station::Szigliget,
        Station::Zanka,
        Station::Tihany,
        Station::Bfuzfo,
    ];

    /// Spelling used in the `Basin` column of the station table.
    pub fn name(&self) -> &'static str {
        match self {
            Station::Keszthely => "Keszthely",
            Station::Szigliget => "Szigliget",
            Station::Zanka => "Zanka",
            Station::Tihany => "Tihany",
            Station::Bfuzfo => "Bfuzfo",
        }
    }

    /// Basin label used in figures and tables.
    pub fn basin_label(&self) -> &'static str {
        match self {
            Station::Keszthely => "I",
            Station::Szigliget => "II",
            Station::Zanka => "III",
            Station::Tihany => "IV-1",
            Station::Bfuzfo => "IV-2",
        }
    }

    pub fn from_name(name: &str) -> Option<Station> {
        Station::ALL
            .iter()
            .copied()
            .find(|s| s.name().eq_ignore_ascii_case(name.trim()))
    }
}

impl fmt::Display for Station {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.basin_label())
    }
}

/// Basin boundaries along the centerline in km, as drawn on the profile figures.
pub const BASIN_BOUNDARIES_KM: [f64; 4] = [-5.0, 7.0, 21.0, 53.0];

/// Basin a centerline position falls in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CenterlineBasin {
    I,
    II,
    III,
    IV,
}

impl CenterlineBasin {
    pub const ALL: [CenterlineBasin; 4] = [
        CenterlineBasin::I,
        CenterlineBasin::II,
        CenterlineBasin::III,
        CenterlineBasin::IV,
    ];

    /// Bins are right-closed: (0, 7], (7, 21], (21, 53], (53, inf).
    /// Positions at or before 0 km lie outside every bin.
    pub fn from_distance(distance_km: f64) -> Option<CenterlineBasin> {
        if !distance_km.is_finite() || distance_km <= 0.0 {
            None
        } else if distance_km <= 7.0 {
            Some(CenterlineBasin::I)
        } else if distance_km <= 21.0 {
            Some(CenterlineBasin::II)
        } else if distance_km <= 53.0 {
            Some(CenterlineBasin::III)
        } else {
            Some(CenterlineBasin::IV)
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            CenterlineBasin::I => "I",
            CenterlineBasin::II => "II",
            CenterlineBasin::III => "III",
            CenterlineBasin::IV => "IV",
        }
    }

    pub fn index(&self) -> usize {
        *self as usize
    }
}
