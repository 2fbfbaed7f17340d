//! Catalog of chains the wallet knows how to reach.
//!
//! The registry is immutable once built. A configuration change replaces the
//! whole list through [`ChainRegistry::replace`], which reports the chains that
//! disappeared so their cached balances can be dropped.

use crate::types::ChainInfo;

/// Built-in chains: (name, endpoint, token symbol, decimals).
///
/// Since the Polkadot 2.0 migration balances live on Asset Hub, so Asset Hub
/// comes first for each network; the relay chains are kept for older accounts.
const BUILTIN_CHAINS: &[(&str, &str, &str, u8)] = &[
    (
        "Polkadot Asset Hub",
        "wss://polkadot-asset-hub-rpc.polkadot.io",
        "DOT",
        10,
    ),
    (
        "Kusama Asset Hub",
        "wss://kusama-asset-hub-rpc.polkadot.io",
        "KSM",
        12,
    ),
    (
        "Westend Asset Hub",
        "wss://westend-asset-hub-rpc.polkadot.io",
        "WND",
        12,
    ),
    (
        "Paseo Asset Hub",
        "wss://sys.ibp.network/asset-hub-paseo",
        "PAS",
        10,
    ),
    ("Polkadot", "wss://rpc.ibp.network/polkadot", "DOT", 10),
    ("Kusama", "wss://rpc.ibp.network/kusama", "KSM", 12),
    ("Westend", "wss://westend-rpc.polkadot.io", "WND", 12),
    ("Paseo", "wss://rpc.ibp.network/paseo", "PAS", 10),
];

/// Ordered list of known chains, unique by endpoint.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChainRegistry {
    chains: Vec<ChainInfo>,
}

impl ChainRegistry {
    /// Build a registry. Later duplicates of an endpoint are dropped.
    pub fn new(chains: Vec<ChainInfo>) -> Self {
        let mut unique: Vec<ChainInfo> = Vec::with_capacity(chains.len());
        for chain in chains {
            if unique.iter().any(|c| c.endpoint == chain.endpoint) {
                tracing::warn!("Ignoring duplicate chain endpoint {}", chain.endpoint);
                continue;
            }
            unique.push(chain);
        }
        Self { chains: unique }
    }

    /// The default catalog of Polkadot-family chains.
    pub fn builtin() -> Self {
        Self::new(
            BUILTIN_CHAINS
                .iter()
                .map(|(name, endpoint, symbol, decimals)| {
                    ChainInfo::new(*name, *endpoint).with_token(*symbol, *decimals)
                })
                .collect(),
        )
    }

    /// Look up a chain by endpoint.
    pub fn get(&self, endpoint: &str) -> Option<&ChainInfo> {
        self.chains.iter().find(|c| c.endpoint == endpoint)
    }

    /// Find a chain by exact endpoint or case-insensitive name.
    pub fn find(&self, query: &str) -> Option<&ChainInfo> {
        self.get(query).or_else(|| {
            self.chains
                .iter()
                .find(|c| c.name.eq_ignore_ascii_case(query))
        })
    }

    pub fn contains(&self, endpoint: &str) -> bool {
        self.get(endpoint).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChainInfo> {
        self.chains.iter()
    }

    pub fn len(&self) -> usize {
        self.chains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }

    /// Replace the whole catalog. Returns the chains that were removed.
    pub fn replace(&mut self, chains: Vec<ChainInfo>) -> Vec<ChainInfo> {
        let next = Self::new(chains);
        let removed: Vec<ChainInfo> = self
            .chains
            .iter()
            .filter(|c| !next.contains(&c.endpoint))
            .cloned()
            .collect();
        *self = next;
        removed
    }
}
