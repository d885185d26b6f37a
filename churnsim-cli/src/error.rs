use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("State hash mismatch: expected {expected}, got {actual}")]
    HashMismatch { expected: String, actual: String },
}
