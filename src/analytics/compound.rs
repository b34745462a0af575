use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::session::{Lap, Stint};

/// Compounds in the order they are usually presented, softest first.
const COMPOUND_PRIORITY: [&str; 5] = ["soft", "medium", "hard", "intermediate", "wet"];

/// Filters applied before laps are averaged per compound.
#[derive(Clone, Debug, Default)]
pub struct CompoundPaceOptions {
    /// Laps slower than this many seconds are ignored
    pub lap_threshold: Option<f64>,
    /// Laps to ignore outright, e.g. laps run behind the safety car
    pub excluded_lap_numbers: BTreeSet<u32>,
    pub include_pit_out_laps: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct CompoundPace {
    /// Compound label as first seen in the stints
    pub compound: String,
    pub avg_time: f64,
    pub lap_count: usize,
}

/// Average lap time per tyre compound.
///
/// Each qualifying lap is attributed to the first stint whose lap range contains it.
/// Compound labels are merged case-insensitively. Results are in first-seen order and
/// compounds without any qualifying lap are left out.
pub fn avg_lap_time_per_compound(
    laps: &[Lap],
    stints: &[Stint],
    options: &CompoundPaceOptions,
) -> Vec<CompoundPace> {
    // (display label, total, count), indexed by lowercase label
    let mut totals: Vec<(String, f64, usize)> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for lap in laps {
        let Some(duration) = lap.valid_duration() else {
            continue;
        };
        if lap.is_pit_out_lap && !options.include_pit_out_laps {
            continue;
        }
        if options.lap_threshold.is_some_and(|t| duration > t) {
            continue;
        }
        if options.excluded_lap_numbers.contains(&lap.lap_number) {
            continue;
        }
        let Some(label) = stints
            .iter()
            .find(|s| s.contains_lap(lap.lap_number))
            .and_then(Stint::compound_label)
        else {
            continue;
        };

        let slot = *index.entry(label.to_lowercase()).or_insert_with(|| {
            totals.push((label.to_string(), 0., 0));
            totals.len() - 1
        });
        let entry = &mut totals[slot];
        entry.1 += duration;
        entry.2 += 1;
    }

    totals
        .into_iter()
        .map(|(compound, total, count)| CompoundPace {
            compound,
            avg_time: total / count as f64,
            lap_count: count,
        })
        .collect()
}

fn compound_priority(label: &str) -> usize {
    let label = label.trim().to_lowercase();
    COMPOUND_PRIORITY
        .iter()
        .position(|c| *c == label)
        .unwrap_or(COMPOUND_PRIORITY.len())
}

/// Orders compounds softest to wettest, unknown labels last and alphabetically.
pub fn compare_compounds(a: &str, b: &str) -> Ordering {
    compound_priority(a)
        .cmp(&compound_priority(b))
        .then_with(|| a.to_lowercase().cmp(&b.to_lowercase()))
}

pub fn sort_by_compound_priority(paces: &mut [CompoundPace]) {
    paces.sort_by(|a, b| compare_compounds(&a.compound, &b.compound));
}
