// Error types for stintlab

use snafu::Snafu;
use std::io;

#[derive(Debug, Snafu)]
pub enum StintlabError {
    // Config management errors
    #[snafu(display("Could not find application data directory to save config file"))]
    NoConfigDir,
    #[snafu(display("Error reading or writing config file"))]
    ConfigIOError { source: io::Error },
    #[snafu(display("Error serializing config file"))]
    ConfigSerializeError { source: serde_json::Error },
    #[snafu(display("Invalid config value: {field} - {reason}"))]
    InvalidConfig { field: String, reason: String },

    // Snapshot loading errors
    #[snafu(display("Error reading snapshot file: {path}"))]
    SnapshotIOError { path: String, source: io::Error },
    #[snafu(display("Error parsing snapshot file: {path}"))]
    SnapshotParseError {
        path: String,
        source: serde_json::Error,
    },
    #[snafu(display("Missing snapshot file: {path}"))]
    MissingSnapshotFile { path: String },

    // User input validation errors
    #[snafu(display("Invalid user input: {field} - {reason}"))]
    InvalidUserInput { field: String, reason: String },
}
