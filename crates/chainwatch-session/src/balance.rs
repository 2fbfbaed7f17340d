//! Balance cache and refresh coordination.
//!
//! Balances are cached per `(chain endpoint, account)` in a bounded LRU. At
//! most one refresh per key is in flight; further requests for that key are
//! coalesced into it. A refresh always lands in the entry for the chain it was
//! issued against, so a late result from a previous chain can never show up
//! under the newly selected one.

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use chainwatch_core::{
    Account, Balance, BalanceCacheEntry, CacheKey, ChainClient, ChainInfo, ErrorKind,
};
use futures::FutureExt;
use lru::LruCache;

use crate::completion::{Completion, Io};

pub struct BalanceTracker<C: ChainClient> {
    client: Arc<C>,
    cache: LruCache<CacheKey, BalanceCacheEntry>,
    /// Outstanding refresh per key, tagged with the ticket it was issued under.
    in_flight: HashMap<CacheKey, u64>,
    next_ticket: u64,
    account: Option<Account>,
    active: bool,
    refresh_timeout: Duration,
}

impl<C: ChainClient> BalanceTracker<C> {
    pub fn new(client: Arc<C>, capacity: NonZeroUsize, refresh_timeout: Duration) -> Self {
        Self {
            client,
            cache: LruCache::new(capacity),
            in_flight: HashMap::new(),
            next_ticket: 0,
            account: None,
            active: false,
            refresh_timeout,
        }
    }

    /// Start tracking `account` on the current connection.
    ///
    /// Without a connection the request is only recorded; it is applied by
    /// [`on_connected`](Self::on_connected).
    pub fn track(
        &mut self,
        account: Account,
        connection: Option<(&ChainInfo, &C::Handle)>,
    ) -> Option<Io<C::Handle>> {
        self.account = Some(account.clone());
        self.active = true;
        match connection {
            Some((chain, handle)) => self.refresh(chain, handle, &account),
            None => {
                tracing::debug!("Tracking {} once a chain is connected", account.short());
                None
            }
        }
    }

    /// A connection was established; refresh the tracked account on it.
    pub fn on_connected(&mut self, chain: &ChainInfo, handle: &C::Handle) -> Option<Io<C::Handle>> {
        if !self.active {
            return None;
        }
        let account = self.account.clone()?;
        self.refresh(chain, handle, &account)
    }

    /// Periodic revalidation of the tracked account.
    pub fn poll(&mut self, chain: &ChainInfo, handle: &C::Handle) -> Option<Io<C::Handle>> {
        self.on_connected(chain, handle)
    }

    /// Halt tracking. The cache and refreshes already in flight are kept.
    pub fn stop(&mut self) {
        if self.active {
            tracing::debug!("Balance tracking stopped");
        }
        self.active = false;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn tracked_account(&self) -> Option<&Account> {
        self.account.as_ref()
    }

    /// Cached entry for `(chain, account)`, marking it recently used.
    pub fn current_balance(
        &mut self,
        account: &Account,
        chain: &ChainInfo,
    ) -> Option<BalanceCacheEntry> {
        self.cache.get(&CacheKey::new(chain, account)).cloned()
    }

    /// Cached entry for `(chain, account)` without touching LRU order.
    pub fn peek(&self, account: &Account, chain: &ChainInfo) -> Option<&BalanceCacheEntry> {
        self.cache.peek(&CacheKey::new(chain, account))
    }

    pub fn is_in_flight(&self, account: &Account, chain: &ChainInfo) -> bool {
        self.in_flight.contains_key(&CacheKey::new(chain, account))
    }

    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }

    /// Apply a finished refresh. Returns false if the result was dropped.
    ///
    /// Only the refresh currently in flight for `key` is applied; one issued
    /// before an eviction of its chain is ignored.
    pub fn complete(
        &mut self,
        key: CacheKey,
        ticket: u64,
        result: Result<Balance, ErrorKind>,
    ) -> bool {
        if self.in_flight.get(&key) != Some(&ticket) {
            tracing::debug!(
                "Dropping superseded balance for {} / {}",
                key.endpoint,
                key.account.short()
            );
            return false;
        }
        self.in_flight.remove(&key);

        let entry = self
            .cache
            .get_or_insert_mut(key.clone(), BalanceCacheEntry::default);
        match result {
            Ok(balance) => {
                tracing::debug!(
                    "Balance for {} on {}: {}",
                    key.account.short(),
                    key.endpoint,
                    balance.total()
                );
                entry.balance = Some(balance);
                entry.error = None;
            }
            Err(error) => {
                tracing::warn!(
                    "Balance refresh for {} on {} failed: {}",
                    key.account.short(),
                    key.endpoint,
                    error
                );
                entry.error = Some(error);
            }
        }
        entry.loading = false;
        true
    }

    /// Drop every entry and in-flight marker for a chain.
    pub fn evict_chain(&mut self, endpoint: &str) -> usize {
        let keys: Vec<CacheKey> = self
            .cache
            .iter()
            .filter(|(key, _)| key.endpoint == endpoint)
            .map(|(key, _)| key.clone())
            .collect();
        for key in &keys {
            self.cache.pop(key);
        }
        self.in_flight.retain(|key, _| key.endpoint != endpoint);
        if !keys.is_empty() {
            tracing::debug!("Evicted {} balance(s) for {}", keys.len(), endpoint);
        }
        keys.len()
    }

    fn refresh(
        &mut self,
        chain: &ChainInfo,
        handle: &C::Handle,
        account: &Account,
    ) -> Option<Io<C::Handle>> {
        let key = CacheKey::new(chain, account);
        if self.in_flight.contains_key(&key) {
            tracing::debug!(
                "Refresh for {} on {} already in flight",
                account.short(),
                chain.endpoint
            );
            return None;
        }

        // A known value is shown as-is while it is revalidated.
        if self.cache.get(&key).is_none() {
            self.cache.put(key.clone(), BalanceCacheEntry::pending());
        }
        self.next_ticket += 1;
        let ticket = self.next_ticket;
        self.in_flight.insert(key.clone(), ticket);

        let client = self.client.clone();
        let handle = handle.clone();
        let account = account.clone();
        let timeout = self.refresh_timeout;
        Some(
            async move {
                let result =
                    match tokio::time::timeout(timeout, client.fetch_balance(&handle, &account))
                        .await
                    {
                        Ok(result) => result,
                        Err(_) => Err(ErrorKind::BalanceFetchTimeout),
                    };
                Completion::Balance {
                    key,
                    ticket,
                    result,
                }
            }
            .boxed(),
        )
    }
}
