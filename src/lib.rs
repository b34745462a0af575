// Library interface for stintlab
// This allows integration tests to access internal modules

pub mod analytics;
pub mod config;
pub mod errors;
pub mod format;
pub mod request;
pub mod session;

// Re-export commonly used types
pub use analytics::{CompoundPace, CompoundPaceOptions, StintLaps};
pub use config::AnalysisConfig;
pub use errors::StintlabError;
pub use request::{RequestGeneration, RequestTicket};
pub use session::{Driver, Lap, PitStop, SessionResult, SessionSnapshot, Stint};
