// Lap and stint analytics
// Pure functions deriving pace, tyre and consistency summaries from session records.
// Nothing in here performs I/O or keeps state between calls.

pub mod compound;
pub mod consistency;
pub mod degradation;
pub mod pit_stops;
pub mod stints;

use std::collections::BTreeSet;

use crate::session::Lap;

pub use compound::{
    CompoundPace, CompoundPaceOptions, avg_lap_time_per_compound, sort_by_compound_priority,
};
pub use consistency::{
    ConsistencyOptions, ConsistencyStats, consistency_by_driver, consistency_by_team,
    lap_time_consistency, rank_by_consistency,
};
pub use degradation::{
    DegradationSummary, StintDegradation, aggregate_degradation, compare_degradation,
    degradation_by_driver, degradation_by_team, rank_by_degradation, stint_degradation,
};
pub use pit_stops::{PitStopSummary, fastest_pit_stop, summarize_pit_stops};
pub use stints::{StintLaps, group_laps_by_stints};

/// Arithmetic mean of the valid lap times, `None` when there are none.
pub fn average_lap_time(laps: &[Lap]) -> Option<f64> {
    mean(laps.iter().filter_map(Lap::valid_duration))
}

/// Fastest valid lap time. The first lap wins when several share the minimum.
pub fn best_lap_time(laps: &[Lap]) -> Option<f64> {
    laps.iter()
        .filter_map(Lap::valid_duration)
        .fold(None, |best: Option<f64>, d| match best {
            Some(b) if b <= d => Some(b),
            _ => Some(d),
        })
}

/// Median lap time over valid laps that are not pit-out laps.
///
/// This is the baseline used to build a slow-lap threshold (see [`pace_threshold`]).
pub fn typical_lap_duration(laps: &[Lap]) -> Option<f64> {
    median(
        laps.iter()
            .filter(|l| !l.is_pit_out_lap)
            .filter_map(Lap::valid_duration)
            .collect(),
    )
}

/// Upper bound for a representative lap: typical lap time plus `delta` seconds.
pub fn pace_threshold(laps: &[Lap], delta: f64) -> Option<f64> {
    typical_lap_duration(laps).map(|typical| typical + delta)
}

/// Lap numbers of valid laps slower than [`pace_threshold`].
pub fn slow_lap_numbers(laps: &[Lap], delta: f64) -> BTreeSet<u32> {
    let Some(threshold) = pace_threshold(laps, delta) else {
        return BTreeSet::new();
    };
    laps.iter()
        .filter(|l| l.valid_duration().is_some_and(|d| d > threshold))
        .map(|l| l.lap_number)
        .collect()
}

/// Fastest time in each sector across the laps, `None` for sectors never timed.
pub fn best_sectors(laps: &[Lap]) -> [Option<f64>; 3] {
    laps.iter().map(Lap::sectors).fold([None; 3], |best, sectors| {
        [0, 1, 2].map(|i| match (best[i], sectors[i]) {
            (Some(b), Some(s)) => Some(b.min(s)),
            (b, s) => b.or(s),
        })
    })
}

/// Valid laps that are neither pit-out laps nor listed in `excluded`, in input order.
pub fn clean_laps<'a>(laps: &'a [Lap], excluded: &BTreeSet<u32>) -> Vec<&'a Lap> {
    laps.iter()
        .filter(|l| l.is_valid() && !l.is_pit_out_lap && !excluded.contains(&l.lap_number))
        .collect()
}

pub(crate) fn mean(values: impl IntoIterator<Item = f64>) -> Option<f64> {
    let (total, count) = values
        .into_iter()
        .fold((0., 0usize), |(total, count), v| (total + v, count + 1));
    if count == 0 {
        None
    } else {
        Some(total / count as f64)
    }
}

pub(crate) fn median(mut values: Vec<f64>) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        Some((values[mid - 1] + values[mid]) / 2.)
    } else {
        Some(values[mid])
    }
}
