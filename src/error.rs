use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type for the study harness
#[derive(Error, Debug)]
pub enum StudyError {
    #[error("Configuration error: {0}")]
    ConfigError(#[from] ConfigError),

    #[error("Trace error: {0}")]
    TraceError(#[from] TraceError),

    #[error("Job error: {0}")]
    JobError(#[from] JobError),

    #[error("Table error: {0}")]
    TableError(#[from] TableError),

    #[error("Plot error: {0}")]
    PlotError(String),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Errors related to simulator configurations
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{0}': {1}")]
    FileReadError(PathBuf, #[source] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("Unrecognized replacement policy: '{0}'")]
    UnknownPolicy(String),

    #[error("Unknown cache parameter: '{0}'. Expected 'sets' or 'ways'.")]
    UnknownParam(String),

    #[error("No cache level named '{0}'")]
    UnknownLevel(String),

    #[error("{field} of '{level}' must be a power of two, got {value}")]
    NotPowerOfTwo {
        level: String,
        field: &'static str,
        value: usize,
    },
}

/// Errors related to trace files
#[derive(Error, Debug)]
pub enum TraceError {
    #[error("Trace file name has no numeric id: '{0}'")]
    MissingId(String),

    #[error("Duplicate trace id {0}")]
    DuplicateId(u32),

    #[error("Unknown trace id {0}")]
    UnknownId(u32),

    #[error("Failed to download '{0}': {1}")]
    DownloadError(String, String),

    #[error("IO error on '{0}': {1}")]
    IoError(PathBuf, #[source] std::io::Error),
}

/// Errors related to simulator jobs
#[derive(Error, Debug)]
pub enum JobError {
    #[error("Job id must be unique: '{0}'")]
    DuplicateId(String),

    #[error("Failed to launch simulator for job '{0}': {1}")]
    SpawnError(String, #[source] std::io::Error),

    #[error("Simulator exited with {1} for job '{0}', see {2}")]
    SimulatorFailed(String, std::process::ExitStatus, PathBuf),

    #[error("Job '{0}' produced no result file at {1}")]
    MissingResult(String, PathBuf),

    #[error("Failed to parse results of job '{0}': {1}")]
    ParseError(String, #[source] serde_json::Error),

    #[error("Invalid configuration for job '{0}': {1}")]
    ConfigError(String, #[source] ConfigError),

    #[error("IO error on '{0}': {1}")]
    IoError(PathBuf, #[source] std::io::Error),

    #[error("Simulator command is empty")]
    EmptyCommand,

    #[error("Worker thread panicked")]
    WorkerPanic,
}

/// Errors related to result tables
#[derive(Error, Debug)]
pub enum TableError {
    #[error("Shape {shape:?} needs {expected} values, got {got}")]
    ShapeMismatch {
        shape: Vec<usize>,
        expected: usize,
        got: usize,
    },

    #[error("Unknown dimension '{0}'")]
    UnknownDim(String),

    #[error("Unknown coordinate '{1}' in dimension '{0}'")]
    UnknownCoord(String, String),

    #[error("Expected a {expected}-D table, got {got} dimensions")]
    WrongRank { expected: usize, got: usize },

    #[error("Index {0:?} out of bounds")]
    OutOfBounds(Vec<usize>),

    #[error("Duplicate cell {0:?}")]
    DuplicateCell(Vec<String>),

    #[error("Coordinate '{0}' is not numeric")]
    NonNumericCoord(String),
}

/// Type alias for Result with StudyError
pub type StudyResult<T> = Result<T, StudyError>;
