//! Wallet lock gate over the connection and balance layers.
//!
//! While locked no chain I/O happens: the connection is torn down, tracking
//! is stopped, and incoming requests are only recorded. Unlocking replays the
//! last requested chain and then the last requested account, once.

use std::sync::Arc;

use chainwatch_core::{Account, BalanceCacheEntry, ChainClient, ChainInfo, ChainRegistry, ErrorKind};

use crate::balance::BalanceTracker;
use crate::completion::{Completion, Io};
use crate::connection::{ConnectOutcome, ConnectionManager};
use crate::session::SessionSettings;
use crate::view::SessionView;

/// Lock state and the requests waiting for the next unlock.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SessionState {
    pub unlocked: bool,
    pub pending_chain_request: Option<ChainInfo>,
    pub pending_account_request: Option<Account>,
}

pub struct SessionGate<C: ChainClient> {
    registry: ChainRegistry,
    connections: ConnectionManager<C>,
    balances: BalanceTracker<C>,
    state: SessionState,
    last_chain: Option<ChainInfo>,
    last_account: Option<Account>,
}

impl<C: ChainClient> SessionGate<C> {
    /// Create a gate in the locked state.
    pub fn new(client: Arc<C>, registry: ChainRegistry, settings: &SessionSettings) -> Self {
        Self {
            registry,
            connections: ConnectionManager::new(client.clone(), settings.connect_timeout),
            balances: BalanceTracker::new(
                client,
                settings.cache_capacity,
                settings.balance_timeout,
            ),
            state: SessionState::default(),
            last_chain: None,
            last_account: None,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn is_unlocked(&self) -> bool {
        self.state.unlocked
    }

    pub fn registry(&self) -> &ChainRegistry {
        &self.registry
    }

    pub fn connections(&self) -> &ConnectionManager<C> {
        &self.connections
    }

    pub fn balances(&self) -> &BalanceTracker<C> {
        &self.balances
    }

    /// Resolve a chain by endpoint or name in the registry.
    pub fn resolve(&self, query: &str) -> Result<ChainInfo, ErrorKind> {
        self.registry
            .find(query)
            .cloned()
            .ok_or_else(|| ErrorKind::UnknownChain(query.to_string()))
    }

    /// Request a chain. While locked the request is recorded and
    /// `LockedOperationDeferred` is returned.
    pub fn select_chain(&mut self, chain: ChainInfo) -> Result<Vec<Io<C::Handle>>, ErrorKind> {
        if !self.state.unlocked {
            tracing::info!("Wallet locked; {} selected for unlock", chain);
            self.last_chain = Some(chain.clone());
            self.state.pending_chain_request = Some(chain);
            return Err(ErrorKind::LockedOperationDeferred);
        }
        Ok(self.connect_to(chain))
    }

    /// Request balance tracking for an account. While locked the request is
    /// recorded and `LockedOperationDeferred` is returned.
    pub fn track(&mut self, account: Account) -> Result<Vec<Io<C::Handle>>, ErrorKind> {
        if !self.state.unlocked {
            tracing::info!("Wallet locked; tracking {} on unlock", account.short());
            self.last_account = Some(account.clone());
            self.state.pending_account_request = Some(account);
            return Err(ErrorKind::LockedOperationDeferred);
        }
        Ok(self.start_tracking(account))
    }

    pub fn on_lock(&mut self) -> Vec<Io<C::Handle>> {
        if !self.state.unlocked {
            return Vec::new();
        }
        tracing::info!("Wallet locked; suspending chain I/O");
        self.state.unlocked = false;
        self.state.pending_chain_request = self.last_chain.clone();
        self.state.pending_account_request = self.last_account.clone();
        self.balances.stop();
        self.connections.disconnect_all().into_iter().collect()
    }

    pub fn on_unlock(&mut self) -> Vec<Io<C::Handle>> {
        if self.state.unlocked {
            return Vec::new();
        }
        tracing::info!("Wallet unlocked");
        self.state.unlocked = true;

        let mut io = Vec::new();
        if let Some(chain) = self.state.pending_chain_request.take() {
            io.extend(self.connect_to(chain));
        }
        if let Some(account) = self.state.pending_account_request.take() {
            io.extend(self.start_tracking(account));
        }
        io
    }

    /// Periodic balance revalidation.
    pub fn poll(&mut self) -> Vec<Io<C::Handle>> {
        if !self.state.unlocked {
            return Vec::new();
        }
        match self.connections.connected() {
            Some((chain, handle)) => self.balances.poll(chain, handle).into_iter().collect(),
            None => Vec::new(),
        }
    }

    pub fn handle_completion(&mut self, completion: Completion<C::Handle>) -> Vec<Io<C::Handle>> {
        match completion {
            Completion::Connect {
                generation,
                chain,
                result,
            } => match self.connections.complete_connect(generation, chain, result) {
                ConnectOutcome::Connected => {
                    if !self.state.unlocked {
                        return Vec::new();
                    }
                    match self.connections.connected() {
                        Some((chain, handle)) => self
                            .balances
                            .on_connected(chain, handle)
                            .into_iter()
                            .collect(),
                        None => Vec::new(),
                    }
                }
                ConnectOutcome::Failed => Vec::new(),
                ConnectOutcome::Discarded(close) => close.into_iter().collect(),
            },
            Completion::Balance {
                key,
                ticket,
                result,
            } => {
                self.balances.complete(key, ticket, result);
                Vec::new()
            }
            Completion::Closed { endpoint } => {
                tracing::debug!("Connection to {} closed", endpoint);
                Vec::new()
            }
        }
    }

    /// Replace the chain catalog, dropping state for chains that went away.
    pub fn reload_registry(&mut self, chains: Vec<ChainInfo>) -> Vec<Io<C::Handle>> {
        let removed = self.registry.replace(chains);
        let mut io = Vec::new();
        for chain in &removed {
            tracing::info!("Chain {} removed from registry", chain);
            self.balances.evict_chain(&chain.endpoint);
            if self.connections.selected_chain() == Some(chain) {
                io.extend(self.connections.disconnect_all());
            }
            if self.state.pending_chain_request.as_ref() == Some(chain) {
                self.state.pending_chain_request = None;
            }
            if self.last_chain.as_ref() == Some(chain) {
                self.last_chain = None;
            }
        }
        io
    }

    /// Cached balance for `(chain, account)`, marking it recently used.
    pub fn current_balance(
        &mut self,
        account: &Account,
        chain: &ChainInfo,
    ) -> Option<BalanceCacheEntry> {
        self.balances.current_balance(account, chain)
    }

    /// Release the connection for good.
    pub fn shutdown(&mut self) -> Vec<Io<C::Handle>> {
        self.balances.stop();
        self.connections.disconnect_all().into_iter().collect()
    }

    pub fn view(&self) -> SessionView {
        let connection = self.connections.current_state();
        let locked = !self.state.unlocked;
        let selected_chain = if locked {
            self.state.pending_chain_request.clone()
        } else {
            connection.chain().cloned()
        };
        let account = self.last_account.clone();

        let entry = match (&selected_chain, &account) {
            (Some(chain), Some(account)) if !locked => self.balances.peek(account, chain),
            _ => None,
        };
        let error = connection
            .error()
            .cloned()
            .or_else(|| entry.and_then(|e| e.error.clone()));

        SessionView {
            locked,
            is_connecting: connection.is_connecting(),
            connection,
            selected_chain,
            account,
            balance: entry.and_then(|e| e.balance),
            is_loading: entry.is_some_and(|e| e.loading),
            error,
        }
    }

    fn connect_to(&mut self, chain: ChainInfo) -> Vec<Io<C::Handle>> {
        self.last_chain = Some(chain.clone());
        self.connections.select_chain(chain).into_iter().collect()
    }

    fn start_tracking(&mut self, account: Account) -> Vec<Io<C::Handle>> {
        self.last_account = Some(account.clone());
        self.balances
            .track(account, self.connections.connected())
            .into_iter()
            .collect()
    }
}
