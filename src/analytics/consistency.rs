use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::{clean_laps, mean, median};
use crate::session::{Driver, Lap};

pub const DEFAULT_OUTLIER_FACTOR: f64 = 1.08;
pub const DEFAULT_MIN_LAPS: usize = 5;

#[derive(Clone, Debug, PartialEq)]
pub struct ConsistencyOptions {
    /// Laps slower than `outlier_factor` times the sample median are treated as outliers
    pub outlier_factor: f64,
    /// Smallest sample a statistic is reported for
    pub min_laps: usize,
}

impl Default for ConsistencyOptions {
    fn default() -> Self {
        Self {
            outlier_factor: DEFAULT_OUTLIER_FACTOR,
            min_laps: DEFAULT_MIN_LAPS,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ConsistencyStats {
    pub lap_count: usize,
    pub mean: f64,
    pub std_dev: f64,
    /// Standard deviation as a percentage of the mean lap time
    pub coefficient_of_variation: f64,
}

/// Lap times used for consistency metrics.
///
/// Pit-out and excluded (safety car) laps are dropped first. Outliers above
/// `outlier_factor` x median are then removed, unless that would leave fewer
/// than `min_laps` laps, in which case the unfiltered sample is returned.
pub fn consistency_sample(
    laps: &[Lap],
    excluded: &BTreeSet<u32>,
    options: &ConsistencyOptions,
) -> Vec<f64> {
    let sample: Vec<f64> = clean_laps(laps, excluded)
        .iter()
        .filter_map(|l| l.valid_duration())
        .collect();
    let Some(sample_median) = median(sample.clone()) else {
        return sample;
    };

    let limit = sample_median * options.outlier_factor;
    let filtered: Vec<f64> = sample.iter().copied().filter(|d| *d <= limit).collect();
    if filtered.len() >= options.min_laps {
        filtered
    } else {
        sample
    }
}

/// Mean, population standard deviation and coefficient of variation of the
/// consistency sample, `None` when the sample is too small.
pub fn lap_time_consistency(
    laps: &[Lap],
    excluded: &BTreeSet<u32>,
    options: &ConsistencyOptions,
) -> Option<ConsistencyStats> {
    let sample = consistency_sample(laps, excluded, options);
    if sample.len() < options.min_laps.max(1) {
        return None;
    }
    let avg = mean(sample.iter().copied())?;
    let variance = mean(sample.iter().map(|d| (d - avg).powi(2)))?;
    let std_dev = variance.sqrt();
    Some(ConsistencyStats {
        lap_count: sample.len(),
        mean: avg,
        std_dev,
        coefficient_of_variation: std_dev / avg * 100.,
    })
}

/// Consistency per driver number. Drivers with too few laps are omitted.
pub fn consistency_by_driver(
    laps: &[Lap],
    excluded: &BTreeSet<u32>,
    options: &ConsistencyOptions,
) -> BTreeMap<u32, ConsistencyStats> {
    partition_by(laps, |l| Some(l.driver_number))
        .into_iter()
        .filter_map(|(driver, driver_laps)| {
            lap_time_consistency(&driver_laps, excluded, options).map(|s| (driver, s))
        })
        .collect()
}

/// Consistency per team over the pooled laps of its drivers.
/// Laps from drivers without a team are ignored.
pub fn consistency_by_team(
    laps: &[Lap],
    drivers: &[Driver],
    excluded: &BTreeSet<u32>,
    options: &ConsistencyOptions,
) -> BTreeMap<String, ConsistencyStats> {
    let teams = team_lookup(drivers);
    partition_by(laps, |l| teams.get(&l.driver_number).cloned())
        .into_iter()
        .filter_map(|(team, team_laps)| {
            lap_time_consistency(&team_laps, excluded, options).map(|s| (team, s))
        })
        .collect()
}

/// Most consistent first (lowest coefficient of variation).
pub fn rank_by_consistency<K: Ord + Clone>(
    stats: &BTreeMap<K, ConsistencyStats>,
) -> Vec<(K, ConsistencyStats)> {
    let mut ranking: Vec<(K, ConsistencyStats)> = stats
        .iter()
        .map(|(k, s)| (k.clone(), s.clone()))
        .collect();
    ranking.sort_by(|a, b| {
        a.1.coefficient_of_variation
            .total_cmp(&b.1.coefficient_of_variation)
            .then_with(|| a.0.cmp(&b.0))
    });
    ranking
}

pub(crate) fn team_lookup(drivers: &[Driver]) -> BTreeMap<u32, String> {
    drivers
        .iter()
        .filter_map(|d| {
            d.team_name
                .as_deref()
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(|t| (d.driver_number, t.to_string()))
        })
        .collect()
}

pub(crate) fn partition_by<K: Ord, T: Clone>(
    items: &[T],
    key: impl Fn(&T) -> Option<K>,
) -> BTreeMap<K, Vec<T>> {
    let mut groups: BTreeMap<K, Vec<T>> = BTreeMap::new();
    for item in items {
        if let Some(k) = key(item) {
            groups.entry(k).or_default().push(item.clone());
        }
    }
    groups
}
