//! Error types for synchronization runs

use thiserror::Error;

use crate::provider::ProviderError;

/// Errors that abort a synchronization run
#[derive(Debug, Error)]
pub enum SyncError {
    /// The caller's user name could not be determined
    #[error("Unable to determine user name from the active AWS credentials: {0}")]
    Identity(#[source] ProviderError),

    /// The caller's public IP address could not be determined
    #[error("Unable to determine public IP address: {0}")]
    PublicIp(#[source] ProviderError),

    /// User or location cannot form a rule identity
    #[error("Invalid rule identity: {0}")]
    InvalidIdentity(String),

    /// No security group matched the given name
    #[error("Security group not found: {0}")]
    GroupNotFound(String),

    /// A security group API call failed
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

impl SyncError {
    pub fn invalid_identity(message: impl Into<String>) -> Self {
        Self::InvalidIdentity(message.into())
    }

    pub fn group_not_found(name: impl Into<String>) -> Self {
        Self::GroupNotFound(name.into())
    }
}

/// Result type for synchronization operations
pub type SyncResult<T> = Result<T, SyncError>;
