use std::collections::BTreeSet;
use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};

use log::{debug, info};
use serde::de::DeserializeOwned;

use super::{Driver, Lap, Meeting, PitStop, Session, SessionResult, Stint, session_title};
use crate::StintlabError;

const LAPS_FILE: &str = "laps";
const STINTS_FILE: &str = "stints";
const PIT_FILE: &str = "pit";
const RESULTS_FILE: &str = "session_result";
const DRIVERS_FILE: &str = "drivers";
const SESSIONS_FILE: &str = "sessions";
const MEETINGS_FILE: &str = "meetings";

/// Malformed lines surface from `serde_jsonlines` as I/O errors wrapping the
/// `serde_json` error.
fn json_lines_error(path: String, e: io::Error) -> StintlabError {
    if !e.get_ref().is_some_and(|inner| inner.is::<serde_json::Error>()) {
        return StintlabError::SnapshotIOError { path, source: e };
    }
    let kind = e.kind();
    match e.into_inner().map(|inner| inner.downcast::<serde_json::Error>()) {
        Some(Ok(source)) => StintlabError::SnapshotParseError {
            path,
            source: *source,
        },
        Some(Err(inner)) => StintlabError::SnapshotIOError {
            path,
            source: io::Error::new(kind, inner),
        },
        None => StintlabError::SnapshotIOError {
            path,
            source: kind.into(),
        },
    }
}

/// Loads a list of records from a JSON array file, or a JSON lines file when
/// the extension is `.jsonl`.
pub fn load_records<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, StintlabError> {
    let path_str = format!("{:?}", path);
    if path.extension().is_some_and(|ext| ext == "jsonl") {
        serde_jsonlines::json_lines(path)
            .map_err(|e| StintlabError::SnapshotIOError {
                path: path_str.clone(),
                source: e,
            })?
            .collect::<Result<Vec<T>, io::Error>>()
            .map_err(|e| json_lines_error(path_str, e))
    } else {
        let file = File::open(path).map_err(|e| StintlabError::SnapshotIOError {
            path: path_str.clone(),
            source: e,
        })?;
        serde_json::from_reader(BufReader::new(file)).map_err(|e| {
            StintlabError::SnapshotParseError {
                path: path_str,
                source: e,
            }
        })
    }
}

/// Finds `<name>.json` or `<name>.jsonl` in the snapshot directory.
fn find_snapshot_file(dir: &Path, name: &str) -> Option<PathBuf> {
    ["json", "jsonl"]
        .iter()
        .map(|ext| dir.join(format!("{}.{}", name, ext)))
        .find(|p| p.exists())
}

fn load_optional<T: DeserializeOwned>(dir: &Path, name: &str) -> Result<Vec<T>, StintlabError> {
    match find_snapshot_file(dir, name) {
        Some(path) => load_records(&path),
        None => {
            debug!("No {} file in {:?}, using an empty list", name, dir);
            Ok(Vec::new())
        }
    }
}

/// Every record fetched for one session.
#[derive(Clone, Debug, Default)]
pub struct SessionSnapshot {
    pub laps: Vec<Lap>,
    pub stints: Vec<Stint>,
    pub pit_stops: Vec<PitStop>,
    pub results: Vec<SessionResult>,
    pub drivers: Vec<Driver>,
    pub sessions: Vec<Session>,
    pub meetings: Vec<Meeting>,
}

/// Records belonging to a single driver, copied out of a [`SessionSnapshot`].
#[derive(Clone, Debug)]
pub struct DriverSnapshot<'a> {
    pub driver_number: u32,
    pub driver: Option<&'a Driver>,
    pub laps: Vec<Lap>,
    pub stints: Vec<Stint>,
    pub pit_stops: Vec<PitStop>,
}

impl SessionSnapshot {
    /// Loads a snapshot directory. Only the laps file is mandatory.
    pub fn load(dir: &Path) -> Result<Self, StintlabError> {
        let laps_path =
            find_snapshot_file(dir, LAPS_FILE).ok_or(StintlabError::MissingSnapshotFile {
                path: format!("{:?}", dir.join(format!("{}.json", LAPS_FILE))),
            })?;
        let snapshot = Self {
            laps: load_records(&laps_path)?,
            stints: load_optional(dir, STINTS_FILE)?,
            pit_stops: load_optional(dir, PIT_FILE)?,
            results: load_optional(dir, RESULTS_FILE)?,
            drivers: load_optional(dir, DRIVERS_FILE)?,
            sessions: load_optional(dir, SESSIONS_FILE)?,
            meetings: load_optional(dir, MEETINGS_FILE)?,
        };
        info!(
            "Loaded {:?}{}: {} laps, {} stints, {} pit stops, {} results, {} drivers",
            dir,
            snapshot
                .title()
                .map(|t| format!(" ({})", t))
                .unwrap_or_default(),
            snapshot.laps.len(),
            snapshot.stints.len(),
            snapshot.pit_stops.len(),
            snapshot.results.len(),
            snapshot.drivers.len()
        );
        Ok(snapshot)
    }

    /// The first session in the snapshot.
    pub fn session(&self) -> Option<&Session> {
        self.sessions.first()
    }

    /// The meeting of [`Self::session`], or the first meeting when no session
    /// names one.
    pub fn meeting(&self) -> Option<&Meeting> {
        self.session()
            .and_then(|s| self.meetings.iter().find(|m| m.meeting_key == s.meeting_key))
            .or_else(|| self.meetings.first())
    }

    /// Heading naming the meeting and session, when either file was present.
    pub fn title(&self) -> Option<String> {
        session_title(self.meeting(), self.session())
    }

    /// Driver numbers seen in laps or stints, ascending.
    pub fn driver_numbers(&self) -> Vec<u32> {
        self.laps
            .iter()
            .map(|l| l.driver_number)
            .chain(self.stints.iter().map(|s| s.driver_number))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn driver(&self, driver_number: u32) -> Option<&Driver> {
        self.drivers
            .iter()
            .find(|d| d.driver_number == driver_number)
    }

    /// Short display name for a driver, falling back to the car number.
    pub fn driver_label(&self, driver_number: u32) -> String {
        match self.driver(driver_number).and_then(Driver::display_name) {
            Some(name) => name.to_string(),
            None => format!("#{}", driver_number),
        }
    }

    pub fn for_driver(&self, driver_number: u32) -> DriverSnapshot<'_> {
        DriverSnapshot {
            driver_number,
            driver: self.driver(driver_number),
            laps: self
                .laps
                .iter()
                .filter(|l| l.driver_number == driver_number)
                .cloned()
                .collect(),
            stints: self
                .stints
                .iter()
                .filter(|s| s.driver_number == driver_number)
                .cloned()
                .collect(),
            pit_stops: self
                .pit_stops
                .iter()
                .filter(|p| p.driver_number == driver_number)
                .cloned()
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io::Write;
    use tempfile::{Builder, TempDir};

    #[test]
    fn test_load_json_array() {
        let mut file = Builder::new().suffix(".json").tempfile().unwrap();
        writeln!(
            file,
            r#"[{{"driver_number":1,"lap_number":1,"lap_duration":null,"is_pit_out_lap":true}},{{"driver_number":1,"lap_number":2,"lap_duration":92.1}}]"#
        )
        .unwrap();
        file.flush().unwrap();

        let laps: Vec<Lap> = load_records(file.path()).unwrap();
        assert_eq!(laps.len(), 2);
        assert!(laps[0].is_pit_out_lap);
        assert_eq!(laps[1].valid_duration(), Some(92.1));
    }

    #[test]
    fn test_load_json_lines() {
        let mut file = Builder::new().suffix(".jsonl").tempfile().unwrap();
        writeln!(
            file,
            r#"{{"driver_number":1,"stint_number":1,"lap_start":1,"lap_end":20,"compound":"MEDIUM","tyre_age_at_start":0}}"#
        )
        .unwrap();
        writeln!(
            file,
            r#"{{"driver_number":1,"stint_number":2,"lap_start":21,"lap_end":57,"compound":"HARD","tyre_age_at_start":2}}"#
        )
        .unwrap();
        file.flush().unwrap();

        let stints: Vec<Stint> = load_records(file.path()).unwrap();
        assert_eq!(stints.len(), 2);
        assert_eq!(stints[1].compound_label(), Some("HARD"));
    }

    #[test]
    fn test_load_invalid_json_returns_parse_error() {
        let mut file = Builder::new().suffix(".json").tempfile().unwrap();
        writeln!(file, "not json").unwrap();
        file.flush().unwrap();

        match load_records::<Lap>(file.path()) {
            Err(StintlabError::SnapshotParseError { .. }) => {}
            other => panic!("Expected SnapshotParseError, got {:?}", other),
        }
    }

    #[test]
    fn test_malformed_json_line_returns_parse_error() {
        let mut file = Builder::new().suffix(".jsonl").tempfile().unwrap();
        writeln!(file, r#"{{"driver_number":1,"lap_number":1,"lap_duration":90.1}}"#).unwrap();
        writeln!(file, r#"{{"driver_number":1,"lap_number":"two"}}"#).unwrap();
        file.flush().unwrap();

        match load_records::<Lap>(file.path()) {
            Err(StintlabError::SnapshotParseError { .. }) => {}
            other => panic!("Expected SnapshotParseError, got {:?}", other),
        }

        let mut truncated = Builder::new().suffix(".jsonl").tempfile().unwrap();
        writeln!(truncated, r#"{{"driver_number":1,"lap_number":1"#).unwrap();
        truncated.flush().unwrap();

        match load_records::<Lap>(truncated.path()) {
            Err(StintlabError::SnapshotParseError { .. }) => {}
            other => panic!("Expected SnapshotParseError, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_file_returns_io_error() {
        let dir = TempDir::new().unwrap();
        match load_records::<Lap>(&dir.path().join("laps.jsonl")) {
            Err(StintlabError::SnapshotIOError { .. }) => {}
            other => panic!("Expected SnapshotIOError, got {:?}", other),
        }
    }

    #[test]
    fn test_snapshot_requires_laps() {
        let dir = TempDir::new().unwrap();
        match SessionSnapshot::load(dir.path()) {
            Err(StintlabError::MissingSnapshotFile { .. }) => {}
            other => panic!("Expected MissingSnapshotFile, got {:?}", other),
        }
    }

    #[test]
    fn test_snapshot_for_driver() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("laps.json"),
            r#"[{"driver_number":1,"lap_number":1,"lap_duration":90.0},{"driver_number":16,"lap_number":1,"lap_duration":91.0}]"#,
        )
        .unwrap();
        fs::write(
            dir.path().join("drivers.json"),
            r#"[{"driver_number":16,"full_name":"Charles LECLERC","name_acronym":"LEC","team_name":"Ferrari"}]"#,
        )
        .unwrap();

        let snapshot = SessionSnapshot::load(dir.path()).unwrap();
        assert!(snapshot.stints.is_empty());
        assert_eq!(snapshot.driver_numbers(), vec![1, 16]);
        assert_eq!(snapshot.driver_label(16), "LEC");
        assert_eq!(snapshot.driver_label(1), "#1");

        assert_eq!(snapshot.title(), None);

        let leclerc = snapshot.for_driver(16);
        assert_eq!(leclerc.laps.len(), 1);
        assert_eq!(
            leclerc.driver.and_then(|d| d.team_name.as_deref()),
            Some("Ferrari")
        );
    }

    #[test]
    fn test_snapshot_loads_session_and_meeting() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("laps.json"),
            r#"[{"driver_number":1,"lap_number":1,"lap_duration":90.0}]"#,
        )
        .unwrap();
        fs::write(
            dir.path().join("drivers.json"),
            r#"[{"driver_number":1,"full_name":null,"name_acronym":null,"team_name":null}]"#,
        )
        .unwrap();
        fs::write(
            dir.path().join("sessions.json"),
            r#"[{"session_key":9472,"meeting_key":1229,"session_name":"Race","session_type":"Race"}]"#,
        )
        .unwrap();
        fs::write(
            dir.path().join("meetings.jsonl"),
            [
                r#"{"meeting_key":1228,"meeting_name":"Pre-Season Testing","year":2024}"#,
                r#"{"meeting_key":1229,"meeting_name":"Bahrain Grand Prix","circuit_short_name":"Sakhir","year":2024}"#,
            ]
            .join("\n"),
        )
        .unwrap();

        let snapshot = SessionSnapshot::load(dir.path()).unwrap();
        assert_eq!(snapshot.meetings.len(), 2);
        assert_eq!(snapshot.meeting().map(|m| m.meeting_key), Some(1229));
        assert_eq!(
            snapshot.title().as_deref(),
            Some("Bahrain Grand Prix 2024 - Race (Sakhir)")
        );
        assert_eq!(snapshot.driver_label(1), "#1");
    }
}
