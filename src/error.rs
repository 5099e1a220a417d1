use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum DasError {
    #[error("invalid hostname: {0}")]
    #[diagnostic(help("the DAS host must start with http:// or https://"))]
    InvalidHost(String),

    #[error("DAS request failed: {0}")]
    Http(String),

    #[error("DAS returned status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("DAS returned a malformed response: {0}")]
    MalformedResponse(String),

    #[error("DAS query failed: {0}")]
    QueryFailed(String),

    #[error("Incorrect response from DAS:\n{0}")]
    ShapeMismatch(String),

    #[error("data type must be mc or data, got {0:?}")]
    InvalidDatatype(String),

    #[error("dataset name must not be empty")]
    InvalidDatasetName(String),

    #[error("missing field in DAS record: {0}")]
    MissingField(String),

    #[error("field {field} must be {expected}")]
    FieldType {
        field: String,
        expected: &'static str,
    },

    #[error("invalid creation_time {0:?}: expected YYYY-MM-DD HH:MM:SS")]
    TimestampParse(String),

    #[error("cannot derive process name from dataset {0}")]
    #[diagnostic(help("pass --process explicitly"))]
    ProcessName(String),

    #[error("dataset already present in store: {0}")]
    DuplicateDataset(String),

    #[error("dataset not found in store: {0}")]
    DatasetNotFound(String),

    #[error("store error: {0}")]
    Store(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),

    #[error("failed to load client credentials: {0}")]
    Credentials(String),

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("confirmation prompt failed: {0}")]
    Prompt(String),
}
