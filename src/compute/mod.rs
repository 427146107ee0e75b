//! Compute module - Simulator boundary, evaluation pipeline and search.

mod alignment;
mod analytic;
mod simulator;
mod sweep;

pub mod evolution;

pub use alignment::*;
pub use analytic::*;
pub use simulator::*;
pub use sweep::*;
