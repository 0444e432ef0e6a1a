//! Error types for the TLCD solver

use thiserror::Error;

/// Main error type for dynamic analysis operations
#[derive(Error, Debug)]
pub enum DynaError {
    #[error("Structure has no stories")]
    EmptyStructure,

    #[error("Invalid story {index}: {reason}")]
    InvalidStory { index: usize, reason: String },

    #[error("Invalid TLCD: {0}")]
    InvalidTlcd(String),

    #[error("Invalid excitation: {0}")]
    InvalidExcitation(String),

    #[error("Excitation duration ({excitation}s) exceeds analysis duration ({analysis}s)")]
    ExcitationTooLong { excitation: f64, analysis: f64 },

    #[error("Tabulated excitation has no sample covering t = {time}s (samples span {first}s to {last}s)")]
    ExcitationOutOfRange { time: f64, first: f64, last: f64 },

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Matrix dimension mismatch: {0}")]
    DimensionMismatch(String),

    #[error("Singular {0} matrix - check masses and time step")]
    SingularMatrix(&'static str),

    #[error("Frequency sweep cancelled after {completed} of {total} frequencies")]
    Cancelled { completed: usize, total: usize },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Parse error on line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

/// Result type for dynamic analysis operations
pub type DynaResult<T> = Result<T, DynaError>;
