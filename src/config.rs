use std::fs::{self, File};
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::StintlabError;
use crate::analytics::ConsistencyOptions;
use crate::analytics::consistency::{DEFAULT_MIN_LAPS, DEFAULT_OUTLIER_FACTOR};
use crate::analytics::degradation::DEFAULT_EDGE_WINDOW;

const CONFIG_DIR_NAME: &str = "stintlab";
const CONFIG_FILE_NAME: &str = "config.json";
const DEFAULT_SLOW_LAP_DELTA_S: f64 = 5.;

/// Thresholds used by the analysis commands.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Seconds above the typical lap time after which a lap counts as a slow-down lap
    pub slow_lap_delta_s: f64,
    pub outlier_factor: f64,
    pub min_consistency_laps: usize,
    /// Laps averaged at each end of a stint for the degradation delta
    pub degradation_window: usize,
    pub include_pit_out_laps: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            slow_lap_delta_s: DEFAULT_SLOW_LAP_DELTA_S,
            outlier_factor: DEFAULT_OUTLIER_FACTOR,
            min_consistency_laps: DEFAULT_MIN_LAPS,
            degradation_window: DEFAULT_EDGE_WINDOW,
            include_pit_out_laps: false,
        }
    }
}

impl AnalysisConfig {
    pub fn default_path() -> Result<PathBuf, StintlabError> {
        Ok(dirs::config_dir()
            .ok_or(StintlabError::NoConfigDir)?
            .join(CONFIG_DIR_NAME)
            .join(CONFIG_FILE_NAME))
    }

    /// Loads the config from `path`, or defaults when the file does not exist.
    pub fn from_file(path: &Path) -> Result<Self, StintlabError> {
        if !path.exists() {
            debug!("No config file at {:?}, using defaults", path);
            return Ok(Self::default());
        }
        let file = File::open(path).map_err(|e| StintlabError::ConfigIOError { source: e })?;
        let config: Self = serde_json::from_reader(file)
            .map_err(|e| StintlabError::ConfigSerializeError { source: e })?;
        config.validate()?;
        info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Loads the config from the platform config directory.
    pub fn from_local_file() -> Result<Self, StintlabError> {
        Self::from_file(&Self::default_path()?)
    }

    /// Loads `path` when given, otherwise the local config file.
    ///
    /// Defaults are only substituted when the platform has no config directory.
    /// An unreadable or invalid file is an error so it is never overwritten by a
    /// later save.
    pub fn load(path: Option<&Path>) -> Result<Self, StintlabError> {
        match path {
            Some(path) => Self::from_file(path),
            None => Self::defaults_without_config_dir(Self::from_local_file()),
        }
    }

    fn defaults_without_config_dir(
        loaded: Result<Self, StintlabError>,
    ) -> Result<Self, StintlabError> {
        match loaded {
            Err(StintlabError::NoConfigDir) => {
                warn!("No config directory on this platform, using defaults");
                Ok(Self::default())
            }
            other => other,
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<(), StintlabError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| StintlabError::ConfigIOError { source: e })?;
        }
        let file = File::create(path).map_err(|e| StintlabError::ConfigIOError { source: e })?;
        serde_json::to_writer_pretty(file, self)
            .map_err(|e| StintlabError::ConfigSerializeError { source: e })
    }

    pub fn save(&self) -> Result<(), StintlabError> {
        self.save_to(&Self::default_path()?)
    }

    pub fn validate(&self) -> Result<(), StintlabError> {
        if !self.slow_lap_delta_s.is_finite() || self.slow_lap_delta_s < 0. {
            return Err(StintlabError::InvalidConfig {
                field: "slow_lap_delta_s".to_string(),
                reason: "must be a non-negative number of seconds".to_string(),
            });
        }
        if !self.outlier_factor.is_finite() || self.outlier_factor < 1. {
            return Err(StintlabError::InvalidConfig {
                field: "outlier_factor".to_string(),
                reason: "must be at least 1.0".to_string(),
            });
        }
        if self.degradation_window == 0 {
            return Err(StintlabError::InvalidConfig {
                field: "degradation_window".to_string(),
                reason: "must be at least one lap".to_string(),
            });
        }
        Ok(())
    }

    pub fn consistency_options(&self) -> ConsistencyOptions {
        ConsistencyOptions {
            outlier_factor: self.outlier_factor,
            min_laps: self.min_consistency_laps,
        }
    }
}
