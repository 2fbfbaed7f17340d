//! Error taxonomy shared by every layer of the session.
//!
//! Connection errors surface through `ConnectionStatus::Failed`, balance
//! errors through the `error` field of a cache entry. None of them is fatal.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    #[error("Connection timed out")]
    ConnectionTimeout,

    #[error("Endpoint unreachable: {0}")]
    ConnectionRefused(String),

    #[error("Balance fetch timed out")]
    BalanceFetchTimeout,

    #[error("Balance fetch failed: {0}")]
    BalanceFetchFailed(String),

    /// A result arrived for a request that has since been superseded.
    #[error("Result discarded: superseded by a newer request")]
    StaleGenerationDiscarded,

    /// The wallet is locked; the request was recorded and will run on unlock.
    #[error("Wallet locked: request deferred until unlock")]
    LockedOperationDeferred,

    #[error("Unknown chain: {0}")]
    UnknownChain(String),
}

impl ErrorKind {
    /// Whether this error should be shown to the user.
    ///
    /// Discarded generations and deferred requests are bookkeeping, not failures.
    pub fn is_user_visible(&self) -> bool {
        !matches!(
            self,
            ErrorKind::StaleGenerationDiscarded | ErrorKind::LockedOperationDeferred
        )
    }

    /// Whether this error came from opening a chain connection.
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            ErrorKind::ConnectionTimeout | ErrorKind::ConnectionRefused(_)
        )
    }
}
