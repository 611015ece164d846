//! Error types for the Netwarden service.

use thiserror::Error;

/// Main error type for Netwarden operations.
#[derive(Error, Debug)]
pub enum NetwardenError {
    /// The client address is not an IPv4 or IPv6 literal
    #[error("bad client IP address received: {0:?}")]
    InvalidAddress(String),

    /// The mask is wider than the address family allows
    #[error("bad network mask /{mask} for {family} address")]
    InvalidMask {
        /// Requested prefix length
        mask: u8,
        /// "IPv4" or "IPv6"
        family: &'static str,
    },

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl NetwardenError {
    /// Whether the error was caused by the client's request rather than the service.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            NetwardenError::InvalidAddress(_) | NetwardenError::InvalidMask { .. }
        )
    }
}

/// Result type alias for Netwarden operations.
pub type Result<T> = std::result::Result<T, NetwardenError>;
