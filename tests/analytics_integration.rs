// Integration tests running the analytics over a session snapshot loaded from disk
//
// The fixture is a short two-driver race:
// - driver 1 runs Soft then Medium, pits on lap 6
// - driver 16 runs Soft for the whole race, with overlapping stint records
// - laps 9 and 10 are run behind the safety car

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use stintlab::analytics::{
    self, CompoundPaceOptions, avg_lap_time_per_compound, consistency_by_driver,
    degradation_by_driver, group_laps_by_stints, rank_by_consistency, rank_by_degradation,
    sort_by_compound_priority, summarize_pit_stops,
};
use stintlab::session::{ClassificationStatus, order_results};
use stintlab::{AnalysisConfig, SessionSnapshot};
use tempfile::TempDir;

const SAFETY_CAR_LAPS: [u32; 2] = [9, 10];

fn lap_json(driver_number: u32, lap_number: u32, duration: Option<f64>, pit_out: bool) -> String {
    format!(
        r#"{{"driver_number":{},"lap_number":{},"lap_duration":{},"is_pit_out_lap":{},"duration_sector_1":null,"duration_sector_2":null,"duration_sector_3":null,"date_start":null}}"#,
        driver_number,
        lap_number,
        duration.map(|d| d.to_string()).unwrap_or("null".to_string()),
        pit_out
    )
}

fn write_fixture(dir: &Path) {
    let driver_1 = [
        None,
        Some(91.0),
        Some(91.2),
        Some(91.4),
        Some(91.6),
        Some(112.0),
        Some(90.5),
        Some(90.6),
        Some(120.0),
        Some(121.0),
        Some(90.8),
        Some(90.9),
    ];
    let driver_16 = [
        None,
        Some(91.5),
        Some(91.5),
        Some(91.6),
        Some(91.5),
        Some(91.7),
        Some(91.6),
        Some(91.7),
        Some(119.0),
        Some(120.5),
        Some(91.8),
        Some(91.8),
    ];

    let mut laps = Vec::new();
    for (i, d) in driver_1.iter().enumerate() {
        let lap_number = i as u32 + 1;
        laps.push(lap_json(1, lap_number, *d, lap_number == 1 || lap_number == 6));
    }
    for (i, d) in driver_16.iter().enumerate() {
        let lap_number = i as u32 + 1;
        laps.push(lap_json(16, lap_number, *d, lap_number == 1));
    }
    fs::write(dir.join("laps.json"), format!("[{}]", laps.join(","))).unwrap();

    fs::write(
        dir.join("stints.jsonl"),
        [
            r#"{"driver_number":1,"stint_number":1,"lap_start":1,"lap_end":5,"compound":"SOFT","tyre_age_at_start":0}"#,
            r#"{"driver_number":1,"stint_number":2,"lap_start":6,"lap_end":12,"compound":"MEDIUM","tyre_age_at_start":3}"#,
            r#"{"driver_number":16,"stint_number":1,"lap_start":1,"lap_end":7,"compound":"SOFT","tyre_age_at_start":0}"#,
            r#"{"driver_number":16,"stint_number":2,"lap_start":6,"lap_end":12,"compound":"Soft","tyre_age_at_start":null}"#,
        ]
        .join("\n"),
    )
    .unwrap();

    fs::write(
        dir.join("pit.json"),
        r#"[{"driver_number":1,"lap_number":5,"stop_duration":2.6},{"driver_number":16,"lap_number":9,"stop_duration":null}]"#,
    )
    .unwrap();

    fs::write(
        dir.join("session_result.json"),
        r#"[{"driver_number":16,"position":2,"gap_to_leader":4.512,"number_of_laps":12,"dnf":false,"dns":false,"dsq":false},
            {"driver_number":1,"position":1,"gap_to_leader":0,"number_of_laps":12,"dnf":false,"dns":false,"dsq":false},
            {"driver_number":44,"position":null,"gap_to_leader":"+1 LAP","number_of_laps":3,"dnf":true,"dns":false,"dsq":false}]"#,
    )
    .unwrap();

    fs::write(
        dir.join("sessions.json"),
        r#"[{"session_key":9472,"meeting_key":1229,"session_name":"Race","session_type":"Race"}]"#,
    )
    .unwrap();
    fs::write(
        dir.join("meetings.json"),
        r#"[{"meeting_key":1229,"meeting_name":"Bahrain Grand Prix","circuit_short_name":"Sakhir","country_name":"Bahrain","year":2024}]"#,
    )
    .unwrap();

    fs::write(
        dir.join("drivers.json"),
        r#"[{"driver_number":1,"full_name":"Max VERSTAPPEN","name_acronym":"VER","team_name":"Red Bull Racing"},
            {"driver_number":16,"full_name":"Charles LECLERC","name_acronym":"LEC","team_name":"Ferrari"}]"#,
    )
    .unwrap();
}

fn load_fixture() -> (TempDir, SessionSnapshot) {
    let dir = TempDir::new().unwrap();
    write_fixture(dir.path());
    let snapshot = SessionSnapshot::load(dir.path()).unwrap();
    (dir, snapshot)
}

#[test]
fn test_snapshot_loads_all_files() {
    let (_dir, snapshot) = load_fixture();
    assert_eq!(snapshot.laps.len(), 24);
    assert_eq!(snapshot.stints.len(), 4);
    assert_eq!(snapshot.pit_stops.len(), 2);
    assert_eq!(snapshot.results.len(), 3);
    assert_eq!(snapshot.driver_numbers(), vec![1, 16]);
    assert_eq!(snapshot.driver_label(16), "LEC");
    assert_eq!(
        snapshot.title().as_deref(),
        Some("Bahrain Grand Prix 2024 - Race (Sakhir)")
    );
}

#[test]
fn test_lap_summary_per_driver() {
    let (_dir, snapshot) = load_fixture();
    let verstappen = snapshot.for_driver(1);

    assert_eq!(analytics::best_lap_time(&verstappen.laps), Some(90.5));
    // lap 1 has no time, lap 6 is a pit-out lap
    let typical = analytics::typical_lap_duration(&verstappen.laps).unwrap();
    assert!((typical - 91.1).abs() < 1e-9);
    let average = analytics::average_lap_time(&verstappen.laps).unwrap();
    let expected =
        (91.0 + 91.2 + 91.4 + 91.6 + 112.0 + 90.5 + 90.6 + 120.0 + 121.0 + 90.8 + 90.9) / 11.;
    assert!((average - expected).abs() < 1e-9);
}

#[test]
fn test_compound_pace_with_safety_car_laps_excluded() {
    let (_dir, snapshot) = load_fixture();
    let verstappen = snapshot.for_driver(1);
    let options = CompoundPaceOptions {
        excluded_lap_numbers: BTreeSet::from(SAFETY_CAR_LAPS),
        ..Default::default()
    };

    let mut paces = avg_lap_time_per_compound(&verstappen.laps, &verstappen.stints, &options);
    sort_by_compound_priority(&mut paces);

    assert_eq!(paces.len(), 2);
    assert_eq!(paces[0].compound, "SOFT");
    assert_eq!(paces[0].lap_count, 4);
    assert!((paces[0].avg_time - 91.3).abs() < 1e-9);
    assert_eq!(paces[1].compound, "MEDIUM");
    assert_eq!(paces[1].lap_count, 4);
    assert!((paces[1].avg_time - 90.7).abs() < 1e-9);
}

#[test]
fn test_compound_labels_merge_across_stints() {
    let (_dir, snapshot) = load_fixture();
    let leclerc = snapshot.for_driver(16);
    let options = CompoundPaceOptions {
        lap_threshold: analytics::pace_threshold(&leclerc.laps, 5.),
        ..Default::default()
    };

    let paces = avg_lap_time_per_compound(&leclerc.laps, &leclerc.stints, &options);
    assert_eq!(paces.len(), 1);
    assert_eq!(paces[0].compound, "SOFT");
    // laps 2-8 and 11-12, the safety car laps are above the pace threshold
    assert_eq!(paces[0].lap_count, 9);
}

#[test]
fn test_overlapping_stints_do_not_share_laps() {
    let (_dir, snapshot) = load_fixture();
    let leclerc = snapshot.for_driver(16);
    let groups = group_laps_by_stints(&leclerc.laps, &leclerc.stints);

    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0].lap_numbers(), (1..=7).collect::<Vec<_>>());
    assert_eq!(groups[1].lap_numbers(), (8..=12).collect::<Vec<_>>());
}

#[test]
fn test_rankings() {
    let (_dir, snapshot) = load_fixture();
    let excluded = BTreeSet::from(SAFETY_CAR_LAPS);
    let config = AnalysisConfig::default();

    let consistency =
        consistency_by_driver(&snapshot.laps, &excluded, &config.consistency_options());
    let ranking = rank_by_consistency(&consistency);
    assert_eq!(ranking.len(), 2);
    assert_eq!(ranking[0].0, 16);

    let degradation = degradation_by_driver(
        &snapshot.laps,
        &snapshot.stints,
        &excluded,
        config.degradation_window,
    );
    let ranking = rank_by_degradation(&degradation);
    assert_eq!(ranking.len(), 2);
    assert!(ranking.iter().all(|(_, s)| s.delta.is_some()));
    assert!(ranking[0].1.delta <= ranking[1].1.delta);
}

#[test]
fn test_pit_stops_and_results() {
    let (_dir, snapshot) = load_fixture();
    let summary = summarize_pit_stops(&snapshot.pit_stops).unwrap();
    assert_eq!(summary.stop_count, 1);
    assert_eq!(summary.fastest, 2.6);

    let ordered = order_results(&snapshot.results);
    let statuses = ordered.iter().map(|r| r.status()).collect::<Vec<_>>();
    assert_eq!(
        statuses,
        vec![
            ClassificationStatus::Classified(1),
            ClassificationStatus::Classified(2),
            ClassificationStatus::Dnf,
        ]
    );
}

#[test]
fn test_analytics_are_repeatable() {
    let (_dir, snapshot) = load_fixture();
    let excluded = BTreeSet::from(SAFETY_CAR_LAPS);
    let config = AnalysisConfig::default();

    let first = degradation_by_driver(&snapshot.laps, &snapshot.stints, &excluded, 3);
    let second = degradation_by_driver(&snapshot.laps, &snapshot.stints, &excluded, 3);
    assert_eq!(first, second);

    let options = config.consistency_options();
    assert_eq!(
        consistency_by_driver(&snapshot.laps, &excluded, &options),
        consistency_by_driver(&snapshot.laps, &excluded, &options)
    );

    let leclerc = snapshot.for_driver(16);
    assert_eq!(
        group_laps_by_stints(&leclerc.laps, &leclerc.stints),
        group_laps_by_stints(&leclerc.laps, &leclerc.stints)
    );
    let options = CompoundPaceOptions::default();
    assert_eq!(
        avg_lap_time_per_compound(&leclerc.laps, &leclerc.stints, &options),
        avg_lap_time_per_compound(&leclerc.laps, &leclerc.stints, &options)
    );
}
