pub mod checkpoint;
pub mod commands;
pub mod config;
pub mod dataset;
pub mod delivery;
pub mod error;
pub mod format;
pub mod progression;
pub mod run;
