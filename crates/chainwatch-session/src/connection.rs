//! Single live chain connection with last-request-wins switching.
//!
//! Every `select_chain` and `disconnect_all` bumps a generation counter. A
//! connection attempt carries the generation it was started under, and its
//! result is only applied if that generation is still current. Superseded
//! attempts run to completion and any handle they produce is closed.

use std::sync::Arc;
use std::time::Duration;

use chainwatch_core::{ChainClient, ChainInfo, ConnectionStatus, ErrorKind};
use futures::FutureExt;
use tokio::sync::watch;

use crate::completion::{Completion, Io};

/// Connection state, including the live handle when connected.
pub enum ConnectionState<H> {
    Disconnected,
    Connecting(ChainInfo),
    Connected(ChainInfo, H),
    Failed(ChainInfo, ErrorKind),
}

impl<H> ConnectionState<H> {
    /// Handle-free snapshot for consumers.
    pub fn status(&self) -> ConnectionStatus {
        match self {
            ConnectionState::Disconnected => ConnectionStatus::Disconnected,
            ConnectionState::Connecting(chain) => ConnectionStatus::Connecting(chain.clone()),
            ConnectionState::Connected(chain, _) => ConnectionStatus::Connected(chain.clone()),
            ConnectionState::Failed(chain, reason) => {
                ConnectionStatus::Failed(chain.clone(), reason.clone())
            }
        }
    }

    /// The chain being connected to or connected to.
    fn active_chain(&self) -> Option<&ChainInfo> {
        match self {
            ConnectionState::Connecting(chain) | ConnectionState::Connected(chain, _) => {
                Some(chain)
            }
            _ => None,
        }
    }
}

/// What applying a connection result did.
pub enum ConnectOutcome<H> {
    Connected,
    Failed,
    /// The result belonged to a superseded request. If it produced a handle,
    /// the returned operation closes it.
    Discarded(Option<Io<H>>),
}

pub struct ConnectionManager<C: ChainClient> {
    client: Arc<C>,
    state: ConnectionState<C::Handle>,
    generation: u64,
    connect_timeout: Duration,
    status_tx: watch::Sender<ConnectionStatus>,
}

impl<C: ChainClient> ConnectionManager<C> {
    pub fn new(client: Arc<C>, connect_timeout: Duration) -> Self {
        let (status_tx, _) = watch::channel(ConnectionStatus::Disconnected);
        Self {
            client,
            state: ConnectionState::Disconnected,
            generation: 0,
            connect_timeout,
            status_tx,
        }
    }

    /// Snapshot of the current state.
    pub fn current_state(&self) -> ConnectionStatus {
        self.state.status()
    }

    /// Subscribe to state transitions. Dropping the receiver unsubscribes.
    pub fn subscribe(&self) -> watch::Receiver<ConnectionStatus> {
        self.status_tx.subscribe()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// The chain and handle of the live connection, if connected.
    pub fn connected(&self) -> Option<(&ChainInfo, &C::Handle)> {
        match &self.state {
            ConnectionState::Connected(chain, handle) => Some((chain, handle)),
            _ => None,
        }
    }

    /// The chain the current state refers to, if any.
    pub fn selected_chain(&self) -> Option<&ChainInfo> {
        match &self.state {
            ConnectionState::Disconnected => None,
            ConnectionState::Connecting(chain)
            | ConnectionState::Connected(chain, _)
            | ConnectionState::Failed(chain, _) => Some(chain),
        }
    }

    /// Request a switch to `chain`.
    ///
    /// A no-op if `chain` is already connected or being connected to.
    /// Otherwise any live handle is closed before the new attempt opens, and
    /// any attempt still in flight is superseded.
    pub fn select_chain(&mut self, chain: ChainInfo) -> Option<Io<C::Handle>> {
        if let Some(active) = self.state.active_chain()
            && active.endpoint == chain.endpoint
        {
            tracing::debug!("Already on {}, ignoring select", chain.endpoint);
            return None;
        }

        self.generation += 1;
        let previous = self.take_handle();
        tracing::info!("Connecting to {} (generation {})", chain, self.generation);
        self.set_state(ConnectionState::Connecting(chain.clone()));
        Some(self.connect_io(self.generation, chain, previous))
    }

    /// Force `Disconnected`, superseding any attempt in flight.
    pub fn disconnect_all(&mut self) -> Option<Io<C::Handle>> {
        self.generation += 1;
        let was_disconnected = matches!(self.state, ConnectionState::Disconnected);
        let previous = self.take_handle();
        if !was_disconnected {
            tracing::info!("Disconnecting (generation {})", self.generation);
            self.set_state(ConnectionState::Disconnected);
        }
        previous.map(|(endpoint, handle)| self.close_io(endpoint, handle))
    }

    /// Apply the result of a connection attempt.
    pub fn complete_connect(
        &mut self,
        generation: u64,
        chain: ChainInfo,
        result: Result<C::Handle, ErrorKind>,
    ) -> ConnectOutcome<C::Handle> {
        if generation != self.generation {
            tracing::debug!(
                "{} for {} (generation {}, current {})",
                ErrorKind::StaleGenerationDiscarded,
                chain.endpoint,
                generation,
                self.generation
            );
            return ConnectOutcome::Discarded(
                result
                    .ok()
                    .map(|handle| self.close_io(chain.endpoint, handle)),
            );
        }

        match result {
            Ok(handle) => {
                tracing::info!("Connected to {}", chain);
                self.set_state(ConnectionState::Connected(chain, handle));
                ConnectOutcome::Connected
            }
            Err(reason) => {
                tracing::warn!("Failed to connect to {}: {}", chain, reason);
                self.set_state(ConnectionState::Failed(chain, reason));
                ConnectOutcome::Failed
            }
        }
    }

    /// Move the live handle out. The caller publishes the next state.
    fn take_handle(&mut self) -> Option<(String, C::Handle)> {
        match std::mem::replace(&mut self.state, ConnectionState::Disconnected) {
            ConnectionState::Connected(chain, handle) => Some((chain.endpoint, handle)),
            other => {
                self.state = other;
                None
            }
        }
    }

    fn set_state(&mut self, state: ConnectionState<C::Handle>) {
        self.state = state;
        self.status_tx.send_replace(self.state.status());
    }

    fn connect_io(
        &self,
        generation: u64,
        chain: ChainInfo,
        previous: Option<(String, C::Handle)>,
    ) -> Io<C::Handle> {
        let client = self.client.clone();
        let timeout = self.connect_timeout;
        async move {
            // The old handle is released before the new endpoint is dialled.
            if let Some((endpoint, handle)) = previous {
                tracing::debug!("Closing connection to {}", endpoint);
                client.close(handle).await;
            }
            let result =
                match tokio::time::timeout(timeout, client.connect(&chain.endpoint, timeout)).await
                {
                    Ok(result) => result,
                    Err(_) => Err(ErrorKind::ConnectionTimeout),
                };
            Completion::Connect {
                generation,
                chain,
                result,
            }
        }
        .boxed()
    }

    fn close_io(&self, endpoint: String, handle: C::Handle) -> Io<C::Handle> {
        let client = self.client.clone();
        async move {
            tracing::debug!("Closing connection to {}", endpoint);
            client.close(handle).await;
            Completion::Closed { endpoint }
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Call, ScriptedClient, chain};

    fn manager() -> (Arc<ScriptedClient>, ConnectionManager<ScriptedClient>) {
        let client = Arc::new(ScriptedClient::default());
        let manager = ConnectionManager::new(client.clone(), Duration::from_secs(10));
        (client, manager)
    }

    async fn complete(
        manager: &mut ConnectionManager<ScriptedClient>,
        io: Io<crate::testing::MockHandle>,
    ) -> ConnectOutcome<crate::testing::MockHandle> {
        match io.await {
            Completion::Connect {
                generation,
                chain,
                result,
            } => manager.complete_connect(generation, chain, result),
            other => panic!("unexpected completion {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_select_connects() {
        let (client, mut manager) = manager();
        let a = chain("A");

        let io = manager.select_chain(a.clone()).unwrap();
        assert_eq!(manager.current_state(), ConnectionStatus::Connecting(a.clone()));

        assert!(matches!(complete(&mut manager, io).await, ConnectOutcome::Connected));
        assert_eq!(manager.current_state(), ConnectionStatus::Connected(a.clone()));
        assert_eq!(client.calls(), vec![Call::Connect(a.endpoint)]);
    }

    #[tokio::test]
    async fn test_select_same_chain_is_noop() {
        let (client, mut manager) = manager();
        let a = chain("A");

        let io = manager.select_chain(a.clone()).unwrap();
        assert!(manager.select_chain(a.clone()).is_none());
        complete(&mut manager, io).await;
        assert!(manager.select_chain(a.clone()).is_none());
        assert_eq!(client.connect_count(), 1);
        assert_eq!(manager.generation(), 1);
    }

    #[tokio::test]
    async fn test_last_request_wins() {
        let (client, mut manager) = manager();
        let a = chain("A");
        let b = chain("B");

        let io_a = manager.select_chain(a.clone()).unwrap();
        let io_b = manager.select_chain(b.clone()).unwrap();

        // A resolves first but was superseded; its handle gets closed.
        match complete(&mut manager, io_a).await {
            ConnectOutcome::Discarded(Some(close)) => {
                assert!(matches!(close.await, Completion::Closed { .. }));
            }
            _ => panic!("stale attempt must be discarded"),
        }
        assert_eq!(manager.current_state(), ConnectionStatus::Connecting(b.clone()));

        assert!(matches!(complete(&mut manager, io_b).await, ConnectOutcome::Connected));
        assert_eq!(manager.current_state(), ConnectionStatus::Connected(b.clone()));
        assert!(client.calls().contains(&Call::Close(a.endpoint)));
    }

    #[tokio::test]
    async fn test_switch_closes_previous_before_connecting() {
        let (client, mut manager) = manager();
        let a = chain("A");
        let b = chain("B");

        let io = manager.select_chain(a.clone()).unwrap();
        complete(&mut manager, io).await;

        let io = manager.select_chain(b.clone()).unwrap();
        assert!(manager.connected().is_none());
        complete(&mut manager, io).await;

        assert_eq!(
            client.calls(),
            vec![
                Call::Connect(a.endpoint.clone()),
                Call::Close(a.endpoint),
                Call::Connect(b.endpoint.clone()),
            ]
        );
        assert_eq!(manager.connected().unwrap().0, &b);
    }

    #[tokio::test]
    async fn test_failure_then_retry() {
        let (client, mut manager) = manager();
        let a = chain("A");
        client.refuse(&a.endpoint);

        let io = manager.select_chain(a.clone()).unwrap();
        assert!(matches!(complete(&mut manager, io).await, ConnectOutcome::Failed));
        assert!(matches!(
            manager.current_state(),
            ConnectionStatus::Failed(_, ErrorKind::ConnectionRefused(_))
        ));

        // Re-selecting a failed chain retries.
        assert!(manager.select_chain(a).is_some());
        assert_eq!(client.connect_count(), 2);
    }

    #[tokio::test]
    async fn test_disconnect_discards_in_flight() {
        let (_client, mut manager) = manager();
        let a = chain("A");

        let io = manager.select_chain(a).unwrap();
        assert!(manager.disconnect_all().is_none());
        assert_eq!(manager.current_state(), ConnectionStatus::Disconnected);

        assert!(matches!(
            complete(&mut manager, io).await,
            ConnectOutcome::Discarded(Some(_))
        ));
        assert_eq!(manager.current_state(), ConnectionStatus::Disconnected);
    }

    #[tokio::test]
    async fn test_disconnect_closes_live_handle() {
        let (client, mut manager) = manager();
        let a = chain("A");

        let io = manager.select_chain(a.clone()).unwrap();
        complete(&mut manager, io).await;

        let close = manager.disconnect_all().unwrap();
        close.await;
        assert_eq!(client.calls().last(), Some(&Call::Close(a.endpoint)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_timeout() {
        struct Hanging;

        #[async_trait::async_trait]
        impl ChainClient for Hanging {
            type Handle = ();

            async fn connect(&self, _endpoint: &str, _timeout: Duration) -> Result<(), ErrorKind> {
                futures::future::pending().await
            }

            async fn fetch_balance(
                &self,
                _handle: &(),
                _account: &chainwatch_core::Account,
            ) -> Result<chainwatch_core::Balance, ErrorKind> {
                futures::future::pending().await
            }

            async fn close(&self, _handle: ()) {}
        }

        let mut manager = ConnectionManager::new(Arc::new(Hanging), Duration::from_secs(10));
        let a = chain("A");
        let io = manager.select_chain(a.clone()).unwrap();
        match io.await {
            Completion::Connect {
                generation,
                chain,
                result,
            } => {
                assert_eq!(result.unwrap_err(), ErrorKind::ConnectionTimeout);
                manager.complete_connect(generation, chain, Err(ErrorKind::ConnectionTimeout));
            }
            other => panic!("unexpected completion {:?}", other),
        }
        assert_eq!(
            manager.current_state(),
            ConnectionStatus::Failed(a, ErrorKind::ConnectionTimeout)
        );
    }

    #[tokio::test]
    async fn test_subscribers_see_transitions() {
        let (_client, mut manager) = manager();
        let mut rx = manager.subscribe();
        let a = chain("A");

        let io = manager.select_chain(a.clone()).unwrap();
        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), ConnectionStatus::Connecting(a.clone()));

        complete(&mut manager, io).await;
        assert_eq!(*rx.borrow_and_update(), ConnectionStatus::Connected(a));
    }
}
