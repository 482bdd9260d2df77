pub mod api;
pub mod config;
pub mod engine;
pub mod errors;
pub mod judge;
pub mod model;
pub mod providers;
pub mod reconcile;
pub mod report;
pub mod storage;
pub mod workbench;
