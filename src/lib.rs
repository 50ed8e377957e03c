pub mod config;
pub mod experiment;
pub mod job;
pub mod runner;
pub mod stats;
pub mod trace;

pub mod image;
pub mod plot;
pub mod report;
pub mod table;

pub mod error;
pub mod flags;
pub mod logging;
