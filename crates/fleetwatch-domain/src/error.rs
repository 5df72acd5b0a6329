use thiserror::Error;

pub type DomainResult<T> = Result<T, DomainError>;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Invalid fuel type: {0}")]
    InvalidFuelType(String),

    #[error("Malformed telemetry payload: {0}")]
    MalformedPayload(String),

    #[error("Repository error: {0}")]
    RepositoryError(#[from] anyhow::Error),
}
