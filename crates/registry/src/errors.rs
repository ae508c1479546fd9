//! Error types for the notary registry

use notary_types::{Address, ContentHash, RegistrationId};
use thiserror::Error;

/// Failure of a single registry operation.
///
/// Every variant is detected before any state is touched, so a returned
/// error always means nothing was committed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized: {caller} may not modify registration {id}")]
    Unauthorized { id: RegistrationId, caller: Address },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid target: {0}")]
    InvalidTarget(String),

    #[error("Content {hash} is already registered as {existing}")]
    DuplicateContent {
        hash: ContentHash,
        existing: RegistrationId,
    },

    #[error("Conflict: {0}")]
    Conflict(String),
}

/// Category of a [`RegistryError`], for callers that only branch on the kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    Unauthorized,
    InvalidInput,
    InvalidTarget,
    DuplicateContent,
    Conflict,
}

impl RegistryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RegistryError::NotFound(_) => ErrorKind::NotFound,
            RegistryError::Unauthorized { .. } => ErrorKind::Unauthorized,
            RegistryError::InvalidInput(_) => ErrorKind::InvalidInput,
            RegistryError::InvalidTarget(_) => ErrorKind::InvalidTarget,
            RegistryError::DuplicateContent { .. } => ErrorKind::DuplicateContent,
            RegistryError::Conflict(_) => ErrorKind::Conflict,
        }
    }

    pub(crate) fn registration_not_found(id: RegistrationId) -> Self {
        RegistryError::NotFound(format!("registration {id}"))
    }
}

pub type Result<T> = std::result::Result<T, RegistryError>;
