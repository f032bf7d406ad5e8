//! Account Error Types

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, AccountError>;

/// Account and quota errors
#[derive(Error, Debug)]
pub enum AccountError {
    /// User record not found
    #[error("Unknown user: {0}")]
    UnknownUser(String),

    /// Unknown subscription tier name
    #[error("Unknown tier: {0}")]
    UnknownTier(String),

    /// Backing store failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl AccountError {
    /// Get user-friendly message
    pub fn user_message(&self) -> &str {
        match self {
            AccountError::UnknownUser(_) => "Account not found.",
            AccountError::UnknownTier(_) => "That subscription tier does not exist.",
            AccountError::Storage(_) => "Account data is temporarily unavailable.",
            AccountError::Config(_) => "Service configuration error.",
        }
    }
}

impl From<AccountError> for concierge_core::CoreError {
    fn from(err: AccountError) -> Self {
        concierge_core::CoreError::Other(err.to_string())
    }
}
