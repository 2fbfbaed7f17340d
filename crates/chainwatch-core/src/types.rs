//! Core domain types for chain connections and balances.

use std::hash::{Hash, Hasher};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::error::ErrorKind;

/// Chain balances are `u128` on every supported runtime.
pub type Amount = u128;

/// A chain the wallet can connect to.
///
/// Identity is the RPC endpoint: two entries with the same endpoint are the
/// same chain regardless of their display metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainInfo {
    pub name: String,
    pub endpoint: String,
    #[serde(default = "default_token_symbol")]
    pub token_symbol: String,
    #[serde(default = "default_token_decimals")]
    pub token_decimals: u8,
}

fn default_token_symbol() -> String {
    "UNIT".to_string()
}

fn default_token_decimals() -> u8 {
    12
}

impl ChainInfo {
    pub fn new(name: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            endpoint: endpoint.into(),
            token_symbol: default_token_symbol(),
            token_decimals: default_token_decimals(),
        }
    }

    /// Set the native token display metadata.
    pub fn with_token(mut self, symbol: impl Into<String>, decimals: u8) -> Self {
        self.token_symbol = symbol.into();
        self.token_decimals = decimals;
        self
    }
}

impl PartialEq for ChainInfo {
    fn eq(&self, other: &Self) -> bool {
        self.endpoint == other.endpoint
    }
}

impl Eq for ChainInfo {}

impl Hash for ChainInfo {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.endpoint.hash(state);
    }
}

impl std::fmt::Display for ChainInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name, self.endpoint)
    }
}

/// Opaque account identifier (an SS58 address) owned by the keyring.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Account(String);

impl Account {
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Abbreviated form for status lines, e.g. `15oF4u…6Sp5`.
    pub fn short(&self) -> String {
        let chars: Vec<char> = self.0.chars().collect();
        if chars.len() <= 12 {
            return self.0.clone();
        }
        let head: String = chars[..6].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{head}…{tail}")
    }
}

impl std::fmt::Display for Account {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Account {
    fn from(address: &str) -> Self {
        Self::new(address)
    }
}

impl From<String> for Account {
    fn from(address: String) -> Self {
        Self(address)
    }
}

/// Account balance on one chain.
///
/// `total` is always `free + reserved`; the fields are private so that the
/// invariant holds for every value that exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Balance {
    total: Amount,
    free: Amount,
    reserved: Amount,
    as_of_ms: u64,
}

impl Balance {
    pub fn new(free: Amount, reserved: Amount, as_of_ms: u64) -> Result<Self, ErrorKind> {
        let total = free.checked_add(reserved).ok_or_else(|| {
            ErrorKind::BalanceFetchFailed(format!(
                "balance overflow: free {free} + reserved {reserved}"
            ))
        })?;
        Ok(Self {
            total,
            free,
            reserved,
            as_of_ms,
        })
    }

    /// An empty balance, as reported for accounts with no storage entry.
    pub fn zero(as_of_ms: u64) -> Self {
        Self {
            total: 0,
            free: 0,
            reserved: 0,
            as_of_ms,
        }
    }

    pub fn total(&self) -> Amount {
        self.total
    }

    pub fn free(&self) -> Amount {
        self.free
    }

    pub fn reserved(&self) -> Amount {
        self.reserved
    }

    /// Unix timestamp (milliseconds) at which the chain reported this value.
    pub fn as_of_ms(&self) -> u64 {
        self.as_of_ms
    }
}

/// Current wall-clock time as Unix milliseconds.
pub fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Connection status as seen by consumers.
///
/// The live client handle stays inside the connection manager; this snapshot
/// only carries the chain each state refers to.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConnectionStatus {
    #[default]
    Disconnected,
    Connecting(ChainInfo),
    Connected(ChainInfo),
    Failed(ChainInfo, ErrorKind),
}

impl ConnectionStatus {
    /// The chain this state refers to, if any.
    pub fn chain(&self) -> Option<&ChainInfo> {
        match self {
            ConnectionStatus::Disconnected => None,
            ConnectionStatus::Connecting(chain)
            | ConnectionStatus::Connected(chain)
            | ConnectionStatus::Failed(chain, _) => Some(chain),
        }
    }

    pub fn is_connecting(&self) -> bool {
        matches!(self, ConnectionStatus::Connecting(_))
    }

    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionStatus::Connected(_))
    }

    pub fn error(&self) -> Option<&ErrorKind> {
        match self {
            ConnectionStatus::Failed(_, reason) => Some(reason),
            _ => None,
        }
    }

    /// Short label for status indicators.
    pub fn label(&self) -> &'static str {
        match self {
            ConnectionStatus::Disconnected => "Disconnected",
            ConnectionStatus::Connecting(_) => "Connecting",
            ConnectionStatus::Connected(_) => "Connected",
            ConnectionStatus::Failed(_, _) => "Failed",
        }
    }
}

/// Cache key for a balance: one account on one chain.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub endpoint: String,
    pub account: Account,
}

impl CacheKey {
    pub fn new(chain: &ChainInfo, account: &Account) -> Self {
        Self {
            endpoint: chain.endpoint.clone(),
            account: account.clone(),
        }
    }
}

/// Last known balance for a `(chain, account)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BalanceCacheEntry {
    /// Last successfully fetched value. Kept across failed refreshes.
    pub balance: Option<Balance>,
    /// True only while the first fetch for this pair is outstanding.
    pub loading: bool,
    /// Error from the most recent refresh, cleared on success.
    pub error: Option<ErrorKind>,
}

impl BalanceCacheEntry {
    /// Entry for a pair seen for the first time, with its first fetch issued.
    pub fn pending() -> Self {
        Self {
            balance: None,
            loading: true,
            error: None,
        }
    }

    /// Whether the value shown is older than the last refresh attempt.
    pub fn is_stale(&self) -> bool {
        self.balance.is_some() && self.error.is_some()
    }
}
