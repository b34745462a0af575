use itertools::Itertools;

use crate::session::{Lap, Stint};

/// A stint together with the laps attributed to it.
#[derive(Clone, Debug, PartialEq)]
pub struct StintLaps<'a> {
    pub stint: &'a Stint,
    /// Laps in ascending lap number order
    pub laps: Vec<&'a Lap>,
}

impl StintLaps<'_> {
    pub fn lap_numbers(&self) -> Vec<u32> {
        self.laps.iter().map(|l| l.lap_number).collect()
    }
}

/// Splits laps into stints.
///
/// Stints are walked in `(lap_start, stint_number)` order. When ranges overlap the
/// earlier stint keeps the contested laps: a stint only receives laps after the
/// highest `lap_end` seen so far. Every input stint yields a group, possibly empty.
pub fn group_laps_by_stints<'a>(laps: &'a [Lap], stints: &'a [Stint]) -> Vec<StintLaps<'a>> {
    let sorted_laps = laps.iter().sorted_by_key(|l| l.lap_number).collect_vec();
    let mut last_assigned: Option<u32> = None;

    stints
        .iter()
        .sorted_by_key(|s| (s.lap_start, s.stint_number))
        .map(|stint| {
            let start = match last_assigned {
                Some(last) => stint.lap_start.max(last.saturating_add(1)),
                None => stint.lap_start,
            };
            let end = stint.lap_end;
            last_assigned = Some(last_assigned.map_or(end, |last| last.max(end)));

            StintLaps {
                stint,
                laps: sorted_laps
                    .iter()
                    .copied()
                    .filter(|l| l.lap_number >= start && l.lap_number <= end)
                    .collect(),
            }
        })
        .collect()
}
