use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::consistency::{partition_by, team_lookup};
use super::mean;
use super::stints::{StintLaps, group_laps_by_stints};
use crate::session::{Driver, Lap, Stint};

/// Laps averaged at each end of a stint.
pub const DEFAULT_EDGE_WINDOW: usize = 3;

/// Pace change across a single stint.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct StintDegradation {
    pub stint_number: u32,
    pub compound: Option<String>,
    /// Clean laps the figures were computed from
    pub lap_count: usize,
    /// Average of the last laps minus average of the first laps, in seconds
    pub delta: Option<f64>,
    /// Linear pace trend in seconds per lap
    pub slope: Option<f64>,
}

/// Lap-count-weighted degradation across several stints.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct DegradationSummary {
    pub delta: Option<f64>,
    pub slope: Option<f64>,
    pub stint_count: usize,
    pub lap_count: usize,
}

pub fn stint_degradation(
    group: &StintLaps<'_>,
    excluded: &BTreeSet<u32>,
    window: usize,
) -> StintDegradation {
    let clean: Vec<(f64, f64)> = group
        .laps
        .iter()
        .filter(|l| !l.is_pit_out_lap && !excluded.contains(&l.lap_number))
        .filter_map(|l| l.valid_duration().map(|d| (l.lap_number as f64, d)))
        .collect();

    let (delta, slope) = if clean.len() < 2 {
        (None, None)
    } else {
        let window = window.max(1).min(clean.len());
        let first = mean(clean[..window].iter().map(|(_, d)| *d));
        let last = mean(clean[clean.len() - window..].iter().map(|(_, d)| *d));
        let delta = first.zip(last).map(|(first, last)| last - first);
        (delta, linear_slope(&clean))
    };

    StintDegradation {
        stint_number: group.stint.stint_number,
        compound: group.stint.compound_label().map(str::to_string),
        lap_count: clean.len(),
        delta,
        slope,
    }
}

/// Least-squares slope of `y` over `x`, `None` when `x` has no spread.
fn linear_slope(points: &[(f64, f64)]) -> Option<f64> {
    let mean_x = mean(points.iter().map(|(x, _)| *x))?;
    let mean_y = mean(points.iter().map(|(_, y)| *y))?;
    let (covariance, variance) = points.iter().fold((0., 0.), |(cov, var), (x, y)| {
        (cov + (x - mean_x) * (y - mean_y), var + (x - mean_x).powi(2))
    });
    if variance == 0. {
        None
    } else {
        Some(covariance / variance)
    }
}

fn weighted_average(values: impl Iterator<Item = (Option<f64>, usize)>) -> Option<f64> {
    let (sum, weight) = values
        .filter_map(|(v, n)| v.filter(|v| v.is_finite()).map(|v| (v, n)))
        .filter(|(_, n)| *n > 0)
        .fold((0., 0usize), |(sum, weight), (v, n)| {
            (sum + v * n as f64, weight + n)
        });
    if weight == 0 {
        None
    } else {
        Some(sum / weight as f64)
    }
}

/// Combines stints so longer stints weigh proportionally more.
///
/// Delta and slope are averaged independently; a stint with a missing or
/// non-finite value is left out of that average entirely.
pub fn aggregate_degradation(stints: &[StintDegradation]) -> DegradationSummary {
    DegradationSummary {
        delta: weighted_average(stints.iter().map(|s| (s.delta, s.lap_count))),
        slope: weighted_average(stints.iter().map(|s| (s.slope, s.lap_count))),
        stint_count: stints.len(),
        lap_count: stints.iter().map(|s| s.lap_count).sum(),
    }
}

/// Degradation of every stint of one driver, in stint order.
pub fn driver_stint_degradation(
    laps: &[Lap],
    stints: &[Stint],
    excluded: &BTreeSet<u32>,
    window: usize,
) -> Vec<StintDegradation> {
    group_laps_by_stints(laps, stints)
        .iter()
        .map(|group| stint_degradation(group, excluded, window))
        .collect()
}

pub fn degradation_by_driver(
    laps: &[Lap],
    stints: &[Stint],
    excluded: &BTreeSet<u32>,
    window: usize,
) -> BTreeMap<u32, DegradationSummary> {
    let laps_by_driver = partition_by(laps, |l| Some(l.driver_number));
    partition_by(stints, |s| Some(s.driver_number))
        .into_iter()
        .map(|(driver, driver_stints)| {
            let driver_laps = laps_by_driver.get(&driver).map(Vec::as_slice).unwrap_or(&[]);
            let per_stint =
                driver_stint_degradation(driver_laps, &driver_stints, excluded, window);
            (driver, aggregate_degradation(&per_stint))
        })
        .collect()
}

/// Team figures weigh every stint of every team driver by its lap count.
pub fn degradation_by_team(
    laps: &[Lap],
    stints: &[Stint],
    drivers: &[Driver],
    excluded: &BTreeSet<u32>,
    window: usize,
) -> BTreeMap<String, DegradationSummary> {
    let teams = team_lookup(drivers);
    let laps_by_driver = partition_by(laps, |l| Some(l.driver_number));
    let mut per_team: BTreeMap<String, Vec<StintDegradation>> = BTreeMap::new();

    for (driver, driver_stints) in partition_by(stints, |s| Some(s.driver_number)) {
        let Some(team) = teams.get(&driver) else {
            continue;
        };
        let driver_laps = laps_by_driver.get(&driver).map(Vec::as_slice).unwrap_or(&[]);
        per_team
            .entry(team.clone())
            .or_default()
            .extend(driver_stint_degradation(driver_laps, &driver_stints, excluded, window));
    }

    per_team
        .into_iter()
        .map(|(team, stints)| (team, aggregate_degradation(&stints)))
        .collect()
}

fn compare_optional(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.total_cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Lowest delta first (most improving pace), then lowest slope. Missing values go last.
pub fn compare_degradation(a: &DegradationSummary, b: &DegradationSummary) -> Ordering {
    compare_optional(a.delta, b.delta).then_with(|| compare_optional(a.slope, b.slope))
}

pub fn rank_by_degradation<K: Ord + Clone>(
    summaries: &BTreeMap<K, DegradationSummary>,
) -> Vec<(K, DegradationSummary)> {
    let mut ranking: Vec<(K, DegradationSummary)> = summaries
        .iter()
        .map(|(k, s)| (k.clone(), s.clone()))
        .collect();
    ranking.sort_by(|a, b| compare_degradation(&a.1, &b.1).then_with(|| a.0.cmp(&b.0)));
    ranking
}
