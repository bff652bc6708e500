use thiserror::Error;

/// Errors surfaced by the storage modules (organization store, roster,
/// counters, credentials). The HTTP layer maps these onto status codes.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0}")]
    Invalid(String),

    #[error("organization not found: {0}")]
    UnknownOrg(String),

    #[error("email already registered")]
    DuplicateEmail,

    #[error("invalid credentials")]
    BadCredentials,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl StoreError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        StoreError::Invalid(msg.into())
    }
}
