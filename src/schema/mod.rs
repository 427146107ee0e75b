//! Schema module - Configuration and data model types for motor design search.

mod candidate;
mod config;
mod evolution;
mod run_log;

pub use candidate::*;
pub use config::*;
pub use evolution::*;
pub use run_log::*;
