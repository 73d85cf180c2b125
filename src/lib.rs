pub mod atlas;
pub mod catalog;
pub mod config;
pub mod download;
pub mod feedback;
pub mod loganalysis;
pub mod logging;
pub mod paths;
pub mod state;
pub mod telemetry;
