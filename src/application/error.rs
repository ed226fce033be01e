use thiserror::Error;

use crate::{domain::error::DomainError, infra::error::InfraError};

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }

    /// Process exit code used by the command-line entry point.
    pub fn exit_code(&self) -> i32 {
        match self {
            AppError::Domain(DomainError::Validation { .. }) | AppError::Validation(_) => 2,
            AppError::Infra(InfraError::Configuration { .. }) => 3,
            AppError::Infra(InfraError::Io(_)) => 4,
            AppError::Infra(InfraError::Telemetry(_))
            | AppError::Infra(InfraError::Http { .. })
            | AppError::Unexpected(_) => 1,
        }
    }
}
