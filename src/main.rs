use std::collections::BTreeSet;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use itertools::Itertools;
use log::error;

use stintlab::analytics::{
    self, CompoundPaceOptions, ConsistencyStats, DegradationSummary, avg_lap_time_per_compound,
    consistency_by_driver, consistency_by_team, degradation::driver_stint_degradation,
    degradation_by_driver, degradation_by_team, fastest_pit_stop, group_laps_by_stints,
    rank_by_consistency, rank_by_degradation, sort_by_compound_priority, summarize_pit_stops,
};
use stintlab::format::{self, PLACEHOLDER};
use stintlab::session::order_results;
use stintlab::{AnalysisConfig, SessionSnapshot, StintlabError};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Args {
    /// Directory holding laps.json, stints.json, pit.json, session_result.json and drivers.json
    #[arg(short, long, global = true, default_value = ".")]
    data: PathBuf,

    /// Config file, defaults to the platform config directory
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Best, average and typical lap time per driver
    Summary,
    /// Average pace per tyre compound
    Compounds {
        #[arg(long)]
        driver: Option<u32>,
        /// Ignore laps slower than this many seconds (defaults to typical lap + slow lap delta)
        #[arg(long)]
        threshold: Option<f64>,
        /// Lap numbers to ignore, e.g. safety car laps
        #[arg(long, value_delimiter = ',')]
        exclude_laps: Vec<u32>,
        #[arg(long)]
        include_pit_out: bool,
    },
    /// Laps grouped by stint for one driver
    Stints {
        #[arg(long)]
        driver: u32,
        #[arg(long, value_delimiter = ',')]
        exclude_laps: Vec<u32>,
    },
    /// Lap time consistency ranking
    Consistency {
        #[arg(long)]
        teams: bool,
        #[arg(long, value_delimiter = ',')]
        exclude_laps: Vec<u32>,
    },
    /// Tyre degradation ranking
    Degradation {
        #[arg(long)]
        teams: bool,
        #[arg(long, value_delimiter = ',')]
        exclude_laps: Vec<u32>,
    },
    /// Pit stop times per driver
    Pits,
    /// Session classification
    Results,
    /// Print the effective configuration
    Config {
        /// Write the effective configuration to the config file
        #[arg(long)]
        save: bool,
    },
}

fn summary(snapshot: &SessionSnapshot) {
    println!(
        "{:<8} {:>5} {:>10} {:>10} {:>10}",
        "Driver", "Laps", "Best", "Average", "Typical"
    );
    for driver_number in snapshot.driver_numbers() {
        let driver = snapshot.for_driver(driver_number);
        println!(
            "{:<8} {:>5} {:>10} {:>10} {:>10}",
            snapshot.driver_label(driver_number),
            driver.laps.len(),
            format::lap_time(analytics::best_lap_time(&driver.laps)),
            format::lap_time(analytics::average_lap_time(&driver.laps)),
            format::lap_time(analytics::typical_lap_duration(&driver.laps)),
        );
    }
}

fn compounds(
    snapshot: &SessionSnapshot,
    config: &AnalysisConfig,
    driver: Option<u32>,
    threshold: Option<f64>,
    excluded: BTreeSet<u32>,
    include_pit_out: bool,
) -> Result<(), StintlabError> {
    let drivers = match driver {
        Some(driver_number) => vec![require_driver(snapshot, driver_number)?],
        None => snapshot.driver_numbers(),
    };
    for driver_number in drivers {
        let driver = snapshot.for_driver(driver_number);
        let options = CompoundPaceOptions {
            lap_threshold: threshold
                .or_else(|| analytics::pace_threshold(&driver.laps, config.slow_lap_delta_s)),
            excluded_lap_numbers: excluded.clone(),
            include_pit_out_laps: include_pit_out || config.include_pit_out_laps,
        };
        let mut paces = avg_lap_time_per_compound(&driver.laps, &driver.stints, &options);
        sort_by_compound_priority(&mut paces);

        println!("{}", snapshot.driver_label(driver_number));
        if paces.is_empty() {
            println!("  {}", PLACEHOLDER);
        }
        for pace in paces {
            println!(
                "  {:<14} {:>10} ({} laps)",
                pace.compound,
                format::lap_time(Some(pace.avg_time)),
                pace.lap_count
            );
        }
    }
    Ok(())
}

fn stints(
    snapshot: &SessionSnapshot,
    config: &AnalysisConfig,
    driver_number: u32,
    excluded: BTreeSet<u32>,
) -> Result<(), StintlabError> {
    let driver = snapshot.for_driver(require_driver(snapshot, driver_number)?);
    let groups = group_laps_by_stints(&driver.laps, &driver.stints);
    let degradation = driver_stint_degradation(
        &driver.laps,
        &driver.stints,
        &excluded,
        config.degradation_window,
    );

    println!("{}", snapshot.driver_label(driver_number));
    for (group, degradation) in groups.iter().zip(degradation.iter()) {
        let laps = group.laps.iter().map(|l| (*l).clone()).collect_vec();
        let range = match (group.laps.first(), group.laps.last()) {
            (Some(first), Some(last)) => format!("L{}-L{}", first.lap_number, last.lap_number),
            _ => PLACEHOLDER.to_string(),
        };
        let sectors = analytics::best_sectors(&laps)
            .map(|s| s.map_or(PLACEHOLDER.to_string(), |s| format!("{:.3}", s)))
            .join(" / ");
        println!(
            "  Stint {:<2} {:<14} {:<10} {:>3} laps  avg {:>10}  best {:>10}  deg {:>9} ({}/lap)  sectors {}{}",
            group.stint.stint_number,
            group.stint.compound_label().unwrap_or(PLACEHOLDER),
            range,
            group.laps.len(),
            format::lap_time(analytics::average_lap_time(&laps)),
            format::lap_time(analytics::best_lap_time(&laps)),
            format::delta(degradation.delta),
            format::delta(degradation.slope),
            sectors,
            if group.stint.is_fresh_tyre() {
                ""
            } else {
                "  used tyres"
            },
        );
    }
    Ok(())
}

fn consistency(
    snapshot: &SessionSnapshot,
    config: &AnalysisConfig,
    teams: bool,
    excluded: BTreeSet<u32>,
) {
    let options = config.consistency_options();
    let rows: Vec<(String, ConsistencyStats)> = if teams {
        rank_by_consistency(&consistency_by_team(
            &snapshot.laps,
            &snapshot.drivers,
            &excluded,
            &options,
        ))
    } else {
        rank_by_consistency(&consistency_by_driver(&snapshot.laps, &excluded, &options))
            .into_iter()
            .map(|(driver, stats)| (snapshot.driver_label(driver), stats))
            .collect()
    };

    println!("{:<24} {:>5} {:>10} {:>9} {:>8}", "", "Laps", "Mean", "Std dev", "CV");
    for (name, stats) in rows {
        println!(
            "{:<24} {:>5} {:>10} {:>9} {:>8}",
            name,
            stats.lap_count,
            format::lap_time(Some(stats.mean)),
            format!("{:.3}s", stats.std_dev),
            format::percent(Some(stats.coefficient_of_variation)),
        );
    }
}

fn degradation(
    snapshot: &SessionSnapshot,
    config: &AnalysisConfig,
    teams: bool,
    excluded: BTreeSet<u32>,
) {
    let window = config.degradation_window;
    let rows: Vec<(String, DegradationSummary)> = if teams {
        rank_by_degradation(&degradation_by_team(
            &snapshot.laps,
            &snapshot.stints,
            &snapshot.drivers,
            &excluded,
            window,
        ))
    } else {
        rank_by_degradation(&degradation_by_driver(
            &snapshot.laps,
            &snapshot.stints,
            &excluded,
            window,
        ))
        .into_iter()
        .map(|(driver, summary)| (snapshot.driver_label(driver), summary))
        .collect()
    };

    println!("{:<24} {:>7} {:>5} {:>10} {:>10}", "", "Stints", "Laps", "Delta", "Per lap");
    for (name, summary) in rows {
        println!(
            "{:<24} {:>7} {:>5} {:>10} {:>10}",
            name,
            summary.stint_count,
            summary.lap_count,
            format::delta(summary.delta),
            format::delta(summary.slope),
        );
    }
}

fn pits(snapshot: &SessionSnapshot) {
    for driver_number in snapshot.driver_numbers() {
        let driver = snapshot.for_driver(driver_number);
        match summarize_pit_stops(&driver.pit_stops) {
            Some(summary) => println!(
                "{:<8} {} stops  fastest {}  average {}  total {}",
                snapshot.driver_label(driver_number),
                summary.stop_count,
                format::lap_time(Some(summary.fastest)),
                format::lap_time(Some(summary.average)),
                format::lap_time(Some(summary.total)),
            ),
            None => println!("{:<8} {}", snapshot.driver_label(driver_number), PLACEHOLDER),
        }
    }
    if let Some(stop) = fastest_pit_stop(&snapshot.pit_stops) {
        println!(
            "Fastest stop: {} on lap {} ({})",
            snapshot.driver_label(stop.driver_number),
            stop.lap_number,
            format::lap_time(stop.stop_duration),
        );
    }
}

fn results(snapshot: &SessionSnapshot) {
    for result in order_results(&snapshot.results) {
        println!(
            "{:<4} {:<8} {:>12} {:>5}",
            result.status().to_string(),
            snapshot.driver_label(result.driver_number),
            result
                .gap_to_leader
                .as_ref()
                .map(|g| g.to_string())
                .unwrap_or_else(|| PLACEHOLDER.to_string()),
            result
                .number_of_laps
                .map(|n| n.to_string())
                .unwrap_or_else(|| PLACEHOLDER.to_string()),
        );
    }
}

fn require_driver(snapshot: &SessionSnapshot, driver_number: u32) -> Result<u32, StintlabError> {
    if snapshot.driver_numbers().contains(&driver_number) {
        Ok(driver_number)
    } else {
        Err(StintlabError::InvalidUserInput {
            field: "driver".to_string(),
            reason: format!("no laps or stints for driver {}", driver_number),
        })
    }
}

fn run(args: Args) -> Result<(), StintlabError> {
    let config = AnalysisConfig::load(args.config.as_deref())?;
    if let Commands::Config { save } = args.command {
        println!(
            "{}",
            serde_json::to_string_pretty(&config)
                .map_err(|e| StintlabError::ConfigSerializeError { source: e })?
        );
        if save {
            match &args.config {
                Some(path) => config.save_to(path)?,
                None => config.save()?,
            }
        }
        return Ok(());
    }

    let snapshot = SessionSnapshot::load(&args.data)?;
    if let Some(title) = snapshot.title() {
        println!("{}\n", title);
    }
    match args.command {
        Commands::Summary => summary(&snapshot),
        Commands::Compounds {
            driver,
            threshold,
            exclude_laps,
            include_pit_out,
        } => compounds(
            &snapshot,
            &config,
            driver,
            threshold,
            exclude_laps.into_iter().collect(),
            include_pit_out,
        )?,
        Commands::Stints {
            driver,
            exclude_laps,
        } => stints(&snapshot, &config, driver, exclude_laps.into_iter().collect())?,
        Commands::Consistency {
            teams,
            exclude_laps,
        } => consistency(&snapshot, &config, teams, exclude_laps.into_iter().collect()),
        Commands::Degradation {
            teams,
            exclude_laps,
        } => degradation(&snapshot, &config, teams, exclude_laps.into_iter().collect()),
        Commands::Pits => pits(&snapshot),
        Commands::Results => results(&snapshot),
        Commands::Config { .. } => {}
    }
    Ok(())
}

fn main() {
    colog::init();

    let args = Args::parse();
    if let Err(e) = run(args) {
        error!("{}", e);
        std::process::exit(1);
    }
}
