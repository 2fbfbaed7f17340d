//! Connection and balance session for a multi-chain wallet.
//!
//! Three inputs change independently: the selected chain, the tracked account
//! and the keyring lock state. This crate reconciles them into one connection
//! and one balance:
//! - `connection`: at most one live chain connection, last request wins
//! - `balance`: per (chain, account) balance cache with coalesced refreshes
//! - `gate`: suspends all chain I/O while the wallet is locked
//! - `session`: the task that owns all of the above, and its handle
//! - `view`: the read model UI frontends subscribe to

pub mod balance;
pub mod completion;
pub mod connection;
pub mod gate;
pub mod keyring;
pub mod session;
pub mod view;

#[cfg(test)]
mod testing;

pub use balance::BalanceTracker;
pub use completion::{Completion, Io};
pub use connection::{ConnectOutcome, ConnectionManager, ConnectionState};
pub use gate::{SessionGate, SessionState};
pub use keyring::bind_keyring;
pub use session::{SessionError, SessionHandle, SessionSettings};
pub use view::SessionView;
