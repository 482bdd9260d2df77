pub mod runner;

pub use runner::{GraderStats, RunReport, Runner};
