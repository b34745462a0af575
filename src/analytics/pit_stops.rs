use serde::{Deserialize, Serialize};

use crate::session::{PitStop, positive_duration};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct PitStopSummary {
    pub stop_count: usize,
    pub fastest: f64,
    pub average: f64,
    pub total: f64,
}

/// Summary over stops with a valid duration, `None` when there are none.
pub fn summarize_pit_stops(stops: &[PitStop]) -> Option<PitStopSummary> {
    let durations: Vec<f64> = stops
        .iter()
        .filter_map(|s| positive_duration(s.stop_duration))
        .collect();
    if durations.is_empty() {
        return None;
    }
    let total: f64 = durations.iter().sum();
    Some(PitStopSummary {
        stop_count: durations.len(),
        fastest: durations.iter().copied().fold(f64::INFINITY, f64::min),
        average: total / durations.len() as f64,
        total,
    })
}

/// Quickest stop; the earliest one wins a tie.
pub fn fastest_pit_stop(stops: &[PitStop]) -> Option<&PitStop> {
    stops
        .iter()
        .filter_map(|s| positive_duration(s.stop_duration).map(|d| (s, d)))
        .fold(None, |best: Option<(&PitStop, f64)>, (stop, d)| match best {
            Some((_, b)) if b <= d => best,
            _ => Some((stop, d)),
        })
        .map(|(stop, _)| stop)
}
