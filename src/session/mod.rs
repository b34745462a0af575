// Session data model
// Records as delivered by the motorsport data API, plus the snapshot loader

pub mod loader;

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

pub use loader::{DriverSnapshot, SessionSnapshot, load_records};

/// Returns the value only when it is a usable, strictly positive duration.
pub(crate) fn positive_duration(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite() && *v > 0.)
}

/// A single timed lap for one driver.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Lap {
    pub driver_number: u32,
    /// Lap number, unique within a driver-session
    pub lap_number: u32,
    /// Lap time in seconds. Missing or non-positive for out-laps and aborted laps
    pub lap_duration: Option<f64>,
    /// Lap immediately following a pit stop
    #[serde(deserialize_with = "null_as_false")]
    pub is_pit_out_lap: bool,
    pub duration_sector_1: Option<f64>,
    pub duration_sector_2: Option<f64>,
    pub duration_sector_3: Option<f64>,
    /// Timestamp the lap started, as reported by the API
    pub date_start: Option<String>,
}

impl Lap {
    pub fn new(driver_number: u32, lap_number: u32, lap_duration: Option<f64>) -> Self {
        Self {
            driver_number,
            lap_number,
            lap_duration,
            ..Default::default()
        }
    }

    /// Lap duration if it can take part in pace statistics.
    pub fn valid_duration(&self) -> Option<f64> {
        positive_duration(self.lap_duration)
    }

    pub fn is_valid(&self) -> bool {
        self.valid_duration().is_some()
    }

    /// Sector times in order, `None` where the sector was not timed.
    pub fn sectors(&self) -> [Option<f64>; 3] {
        [
            positive_duration(self.duration_sector_1),
            positive_duration(self.duration_sector_2),
            positive_duration(self.duration_sector_3),
        ]
    }
}

/// A continuous run on one set of tyres.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Stint {
    pub driver_number: u32,
    pub stint_number: u32,
    /// First lap of the stint (inclusive)
    pub lap_start: u32,
    /// Last lap of the stint (inclusive)
    pub lap_end: u32,
    /// Tyre compound label, free text and case-insensitive
    pub compound: Option<String>,
    /// Laps already on the tyre when the stint started
    pub tyre_age_at_start: Option<i32>,
}

impl Stint {
    pub fn new(stint_number: u32, lap_start: u32, lap_end: u32, compound: &str) -> Self {
        Self {
            stint_number,
            lap_start,
            lap_end,
            compound: Some(compound.to_string()),
            ..Default::default()
        }
    }

    pub fn contains_lap(&self, lap_number: u32) -> bool {
        (self.lap_start..=self.lap_end).contains(&lap_number)
    }

    /// Trimmed compound label, `None` when missing or blank.
    pub fn compound_label(&self) -> Option<&str> {
        self.compound
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
    }

    pub fn is_fresh_tyre(&self) -> bool {
        self.tyre_age_at_start.is_none_or(|age| age <= 0)
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PitStop {
    pub driver_number: u32,
    pub lap_number: u32,
    /// Stationary time in seconds
    pub stop_duration: Option<f64>,
}

/// Gap to the session leader. Lapped cars are reported with a label
/// such as "+1 LAP" instead of seconds.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Gap {
    Seconds(f64),
    Label(String),
}

impl fmt::Display for Gap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Gap::Seconds(s) => write!(f, "+{:.3}", s),
            Gap::Label(label) => write!(f, "{}", label),
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SessionResult {
    pub driver_number: u32,
    pub position: Option<u32>,
    pub gap_to_leader: Option<Gap>,
    pub number_of_laps: Option<u32>,
    #[serde(deserialize_with = "null_as_false")]
    pub dnf: bool,
    #[serde(deserialize_with = "null_as_false")]
    pub dns: bool,
    #[serde(deserialize_with = "null_as_false")]
    pub dsq: bool,
}

/// Final classification of a driver in a session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ClassificationStatus {
    Classified(u32),
    Dnf,
    Dns,
    Dsq,
    Unclassified,
}

impl ClassificationStatus {
    fn rank(&self) -> (u8, u32) {
        match self {
            ClassificationStatus::Classified(position) => (0, *position),
            ClassificationStatus::Dnf => (1, 0),
            ClassificationStatus::Dns => (2, 0),
            ClassificationStatus::Dsq => (3, 0),
            ClassificationStatus::Unclassified => (4, 0),
        }
    }
}

impl fmt::Display for ClassificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClassificationStatus::Classified(position) => write!(f, "P{}", position),
            ClassificationStatus::Dnf => write!(f, "DNF"),
            ClassificationStatus::Dns => write!(f, "DNS"),
            ClassificationStatus::Dsq => write!(f, "DSQ"),
            ClassificationStatus::Unclassified => write!(f, "NC"),
        }
    }
}

impl SessionResult {
    pub fn status(&self) -> ClassificationStatus {
        if self.dsq {
            ClassificationStatus::Dsq
        } else if self.dns {
            ClassificationStatus::Dns
        } else if self.dnf {
            ClassificationStatus::Dnf
        } else if let Some(position) = self.position {
            ClassificationStatus::Classified(position)
        } else {
            ClassificationStatus::Unclassified
        }
    }
}

/// Orders results for a standings table: classified drivers by position,
/// then retirements, non-starters, disqualifications and the rest.
pub fn order_results(results: &[SessionResult]) -> Vec<&SessionResult> {
    let mut ordered: Vec<&SessionResult> = results.iter().collect();
    ordered.sort_by(|a, b| match a.status().rank().cmp(&b.status().rank()) {
        Ordering::Equal => a.driver_number.cmp(&b.driver_number),
        other => other,
    });
    ordered
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Driver {
    pub driver_number: u32,
    pub full_name: Option<String>,
    pub name_acronym: Option<String>,
    pub team_name: Option<String>,
}

impl Driver {
    /// Acronym, or the full name when the acronym is missing.
    pub fn display_name(&self) -> Option<&str> {
        non_blank(&self.name_acronym).or_else(|| non_blank(&self.full_name))
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Session {
    pub session_key: u32,
    pub meeting_key: u32,
    /// e.g. "Race", "Sprint", "Practice 2"
    pub session_name: Option<String>,
    pub session_type: Option<String>,
    pub date_start: Option<String>,
}

/// A race weekend, grouping its sessions.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Meeting {
    pub meeting_key: u32,
    pub meeting_name: Option<String>,
    pub circuit_short_name: Option<String>,
    pub country_name: Option<String>,
    pub year: Option<u32>,
    pub date_start: Option<String>,
}

/// Builds a one-line heading such as "Bahrain Grand Prix 2024 - Race (Sakhir)".
/// Returns `None` when neither record carries a name.
pub fn session_title(meeting: Option<&Meeting>, session: Option<&Session>) -> Option<String> {
    let meeting_name = meeting.and_then(|m| {
        non_blank(&m.meeting_name).map(|name| match m.year {
            Some(year) => format!("{} {}", name, year),
            None => name.to_string(),
        })
    });
    let session_name = session.and_then(|s| non_blank(&s.session_name));

    let mut title = match (meeting_name, session_name) {
        (Some(m), Some(s)) => format!("{} - {}", m, s),
        (Some(m), None) => m,
        (None, Some(s)) => s.to_string(),
        (None, None) => return None,
    };
    if let Some(circuit) = meeting.and_then(|m| non_blank(&m.circuit_short_name)) {
        title.push_str(&format!(" ({})", circuit));
    }
    Some(title)
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn null_as_false<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<bool>::deserialize(deserializer)?.unwrap_or(false))
}
