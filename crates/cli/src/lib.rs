//! Designspace instance generation with interchangeable work distributors.

pub mod cli;
pub mod config;
pub mod distribute;
pub mod generate;
pub mod io;
pub mod load_sources;
pub mod parallel;

pub use distribute::{PhaseTimings, RunReport, Strategy, run};
pub use generate::generate_and_write;
pub use parallel::BatchResult;
