//! Aggregations along the lake centerline and the south-north transects.

use crate::trend::{DecadeScheme, DecadeSpan};
use chla_obs::{CenterlineBasin, CenterlineRecord, TransectPoint};
use chla_utils::stats;
use log::debug;
use std::collections::BTreeMap;

/// Which of the three centerline Chl-a columns to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Zone {
    NorthCoast,
    SouthCoast,
    Pelagic,
}

impl Zone {
    pub const ALL: [Zone; 3] = [Zone::NorthCoast, Zone::SouthCoast, Zone::Pelagic];

    pub fn value(&self, record: &CenterlineRecord) -> Option<f64> {
        match self {
            Zone::NorthCoast => record.north_coast,
            Zone::SouthCoast => record.south_coast,
            Zone::Pelagic => record.pelagic,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Zone::NorthCoast => "north",
            Zone::SouthCoast => "south",
            Zone::Pelagic => "pelagic",
        }
    }
}

/// `(distance, value)` pairs of one zone, sorted by distance, missing values dropped.
pub fn profile<'a, I>(records: I, zone: Zone) -> Vec<(f64, f64)>
where
    I: IntoIterator<Item = &'a CenterlineRecord>,
{
    let mut points: Vec<(f64, f64)> = records
        .into_iter()
        .filter_map(|r| zone.value(r).map(|v| (r.distance, v)))
        .collect();
    points.sort_by(|a, b| a.0.total_cmp(&b.0));
    points
}

/// Mean pelagic Chl-a per (distance bin, month).
#[derive(Debug, Clone, PartialEq)]
pub struct BinnedMonthly {
    pub bin_width: f64,
    /// left edge of each bin, ascending
    pub bins: Vec<f64>,
    pub months: Vec<u32>,
    /// `means[bin][month index]`
    pub means: Vec<Vec<Option<f64>>>,
}

impl BinnedMonthly {
    /// Bin records of the given months by `floor(distance / width) * width`.
    pub fn from_records(records: &[CenterlineRecord], bin_width: f64, months: &[u32]) -> BinnedMonthly {
        let mut cells: BTreeMap<i64, Vec<Vec<f64>>> = BTreeMap::new();
        for record in records {
            let Some(m) = months.iter().position(|m| *m == record.month()) else {
                continue;
            };
            let Some(value) = record.pelagic else {
                continue;
            };
            let bin = (record.distance / bin_width).floor() as i64;
            cells.entry(bin).or_insert_with(|| vec![Vec::new(); months.len()])[m].push(value);
        }
        let bins = cells.keys().map(|b| *b as f64 * bin_width).collect();
        let means = cells
            .values()
            .map(|per_month| per_month.iter().map(|v| stats::mean(v)).collect())
            .collect();
        BinnedMonthly {
            bin_width,
            bins,
            months: months.to_vec(),
            means,
        }
    }

    pub fn month_index(&self, month: u32) -> Option<usize> {
        self.months.iter().position(|m| *m == month)
    }

    /// Per-bin `later - earlier`; `None` where either month has no data.
    pub fn difference(&self, later: u32, earlier: u32) -> Vec<Option<f64>> {
        let (Some(l), Some(e)) = (self.month_index(later), self.month_index(earlier)) else {
            return vec![None; self.bins.len()];
        };
        self.means
            .iter()
            .map(|row| match (row[l], row[e]) {
                (Some(a), Some(b)) => Some(a - b),
                _ => None,
            })
            .collect()
    }

    /// Smallest and largest cell mean.
    pub fn value_range(&self) -> Option<(f64, f64)> {
        let values: Vec<f64> = self.means.iter().flatten().flatten().copied().collect();
        stats::min_max(&values)
    }
}

/// Littoral/pelagic ratios of one (basin, decade) group.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RatioSamples {
    pub north: Vec<f64>,
    pub south: Vec<f64>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LittoralRatios {
    /// keyed by (basin, decade index)
    pub groups: BTreeMap<(CenterlineBasin, usize), RatioSamples>,
    pub skipped_zero_pelagic: usize,
    /// records without a pelagic value, outside every basin or outside every decade
    pub skipped_other: usize,
}

impl LittoralRatios {
    pub fn get(&self, basin: CenterlineBasin, decade: usize) -> Option<&RatioSamples> {
        self.groups.get(&(basin, decade))
    }
}

/// North-coast/pelagic and south-coast/pelagic ratios of the records in
/// `month`, grouped by basin and decade. Zero pelagic values are skipped
/// and counted rather than divided by.
pub fn littoral_ratios(records: &[CenterlineRecord], month: u32, scheme: &DecadeScheme) -> LittoralRatios {
    let mut out = LittoralRatios::default();
    for record in records.iter().filter(|r| r.month() == month) {
        let (Some(pelagic), Some(basin), Some(decade)) =
            (record.pelagic, record.basin(), scheme.bucket_of(record.year()))
        else {
            out.skipped_other += 1;
            continue;
        };
        if pelagic == 0.0 {
            out.skipped_zero_pelagic += 1;
            continue;
        }
        let group = out.groups.entry((basin, decade)).or_default();
        if let Some(north) = record.north_coast {
            group.north.push(north / pelagic);
        }
        if let Some(south) = record.south_coast {
            group.south.push(south / pelagic);
        }
    }
    debug!(
        "littoral ratios: {} groups, {} zero pelagic, {} other skipped",
        out.groups.len(),
        out.skipped_zero_pelagic,
        out.skipped_other
    );
    out
}

/// Samples for the distance-decay fit of one (decade, month):
/// x = distance + 1 km, y = pelagic Chl-a, limited to `max_distance`.
pub fn fitting_samples(
    records: &[CenterlineRecord],
    span: &DecadeSpan,
    month: u32,
    max_distance: f64,
) -> (Vec<f64>, Vec<f64>) {
    records
        .iter()
        .filter(|r| span.contains(r.year()) && r.month() == month && r.distance <= max_distance)
        .filter_map(|r| r.pelagic.map(|p| (r.distance + 1.0, p)))
        .unzip()
}

/// Distances where the depth profile crosses `threshold`, interpolated
/// linearly between neighbouring samples.
pub fn littoral_boundaries(points: &[TransectPoint], threshold: f64) -> Vec<f64> {
    let side = |depth: f64| (depth - threshold).partial_cmp(&0.0);
    points
        .windows(2)
        .filter(|pair| side(pair[0].depth) != side(pair[1].depth))
        .filter(|pair| pair[1].depth != pair[0].depth)
        .map(|pair| {
            let (a, b) = (pair[0], pair[1]);
            a.distance + (threshold - a.depth) * (b.distance - a.distance) / (b.depth - a.depth)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn record(date: (i32, u32, u32), distance: f64, pelagic: Option<f64>) -> CenterlineRecord {
        CenterlineRecord {
            date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
            distance,
            pelagic,
            north_coast: pelagic.map(|p| p * 1.5),
            south_coast: pelagic.map(|p| p * 0.5),
        }
    }

    #[test]
    fn test_binned_monthly_means_and_difference() {
        let records = vec![
            record((2004, 7, 2), 0.5, Some(10.0)),
            record((2004, 7, 2), 1.5, Some(20.0)),
            record((2004, 8, 2), 1.0, Some(6.0)),
            record((2004, 9, 2), 1.9, Some(9.0)),
            record((2004, 9, 2), 2.0, Some(4.0)),
            record((2004, 10, 2), 2.0, Some(99.0)),
            record((2004, 8, 2), 3.0, None),
        ];
        let binned = BinnedMonthly::from_records(&records, 2.0, &[7, 8, 9]);
        assert_eq!(binned.bins, vec![0.0, 2.0]);
        assert_eq!(binned.means[0], vec![Some(15.0), Some(6.0), Some(9.0)]);
        assert_eq!(binned.means[1], vec![None, None, Some(4.0)]);
        assert_eq!(binned.difference(9, 8), vec![Some(3.0), None]);
        assert_eq!(binned.value_range(), Some((4.0, 15.0)));
    }

    #[test]
    fn test_littoral_ratios_skip_zero_pelagic() {
        let scheme = DecadeScheme::balaton();
        let records = vec![
            record((1994, 8, 1), 3.0, Some(10.0)),
            record((1994, 8, 1), 5.0, Some(0.0)),
            record((2023, 8, 1), 60.0, Some(4.0)),
            record((2023, 7, 1), 60.0, Some(4.0)),
            record((2023, 8, 1), 0.0, Some(4.0)),
        ];
        let ratios = littoral_ratios(&records, 8, &scheme);
        assert_eq!(ratios.skipped_zero_pelagic, 1);
        assert_eq!(ratios.skipped_other, 1);
        let basin_i = ratios.get(CenterlineBasin::I, 0).unwrap();
        assert_eq!(basin_i.north, vec![1.5]);
        assert_eq!(basin_i.south, vec![0.5]);
        assert!(ratios.get(CenterlineBasin::IV, 3).is_some());
    }

    #[test]
    fn test_fitting_samples_shift_distance() {
        let span = DecadeSpan::new("1995-2004", 1995, 2004);
        let records = vec![
            record((2004, 7, 2), 0.0, Some(10.0)),
            record((2004, 7, 2), 52.0, Some(5.0)),
            record((2004, 7, 2), 60.0, Some(4.0)),
            record((2014, 7, 2), 10.0, Some(7.0)),
            record((2004, 8, 2), 10.0, Some(7.0)),
        ];
        let (xs, ys) = fitting_samples(&records, &span, 7, 52.0);
        assert_eq!(xs, vec![1.0, 53.0]);
        assert_eq!(ys, vec![10.0, 5.0]);
    }

    #[test]
    fn test_littoral_boundaries() {
        let points: Vec<TransectPoint> = [(0.0, 0.0), (1.0, -1.0), (2.0, -3.0), (3.0, -3.5), (4.0, -1.0)]
            .iter()
            .map(|(d, z)| TransectPoint {
                distance: *d,
                depth: *z,
                chla: 20.0,
            })
            .collect();
        let boundaries = littoral_boundaries(&points, -2.0);
        assert_eq!(boundaries.len(), 2);
        assert!((boundaries[0] - 1.5).abs() < 1e-12);
        assert!((boundaries[1] - 3.6).abs() < 1e-12);
    }

    #[test]
    fn test_profile_sorted() {
        let records = vec![
            record((2004, 8, 2), 9.0, Some(1.0)),
            record((2004, 8, 2), 3.0, Some(2.0)),
            record((2004, 8, 2), 5.0, None),
        ];
        assert_eq!(profile(&records, Zone::Pelagic), vec![(3.0, 2.0), (9.0, 1.0)]);
        assert_eq!(profile(&records, Zone::NorthCoast), vec![(3.0, 3.0), (9.0, 1.5)]);
    }
}
