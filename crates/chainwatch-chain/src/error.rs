//! Error types for chain operations.

use chainwatch_core::ErrorKind;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChainError {
    #[error("Failed to connect to chain: {0}")]
    Connection(String),

    #[error("Timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("Storage query failed: {0}")]
    Storage(String),

    #[error("Subxt error: {0}")]
    Subxt(#[from] subxt::Error),

    #[error("Decode error: {0}")]
    Decode(#[from] subxt::error::DecodeError),

    #[error("Invalid data: {0}")]
    InvalidData(String),
}

impl ChainError {
    /// Session-level error for a failed connection attempt.
    pub fn into_connect_error(self) -> ErrorKind {
        match self {
            ChainError::Timeout(_) => ErrorKind::ConnectionTimeout,
            other => ErrorKind::ConnectionRefused(other.to_string()),
        }
    }

    /// Session-level error for a failed balance read.
    pub fn into_balance_error(self) -> ErrorKind {
        match self {
            ChainError::Timeout(_) => ErrorKind::BalanceFetchTimeout,
            other => ErrorKind::BalanceFetchFailed(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_timeouts_map_to_timeout_kinds() {
        let timeout = || ChainError::Timeout(Duration::from_secs(3));
        assert_eq!(timeout().into_connect_error(), ErrorKind::ConnectionTimeout);
        assert_eq!(timeout().into_balance_error(), ErrorKind::BalanceFetchTimeout);
    }

    #[test]
    fn test_other_errors_keep_their_message() {
        let err = ChainError::Connection("handshake rejected".to_string());
        match err.into_connect_error() {
            ErrorKind::ConnectionRefused(msg) => assert!(msg.contains("handshake rejected")),
            other => panic!("unexpected {other:?}"),
        }

        let err = ChainError::InvalidData("bad address".to_string());
        assert_eq!(
            err.into_balance_error(),
            ErrorKind::BalanceFetchFailed("Invalid data: bad address".to_string())
        );
    }
}
