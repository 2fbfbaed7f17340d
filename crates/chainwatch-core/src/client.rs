//! The chain transport capability consumed by the session.
//!
//! The session never speaks a wire protocol itself. It opens a handle, reads
//! balances through it and closes it, all through this trait.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::ErrorKind;
use crate::types::{Account, Balance};

#[async_trait]
pub trait ChainClient: Send + Sync + 'static {
    /// A live connection to one endpoint.
    ///
    /// Cloning must be cheap; in-flight reads hold a clone for their duration
    /// while the connection manager keeps sole responsibility for closing it.
    type Handle: Clone + Send + Sync + 'static;

    /// Open a connection, giving up after `timeout`.
    async fn connect(&self, endpoint: &str, timeout: Duration) -> Result<Self::Handle, ErrorKind>;

    /// Read the current balance of `account`.
    async fn fetch_balance(
        &self,
        handle: &Self::Handle,
        account: &Account,
    ) -> Result<Balance, ErrorKind>;

    /// Release the connection.
    async fn close(&self, handle: Self::Handle);
}
