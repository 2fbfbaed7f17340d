//! The session task and the handle frontends talk to it through.
//!
//! One tokio task owns the gate, the connection and the balance cache. It
//! reacts to three sources: commands from handles, completions of chain I/O,
//! and the poll timer. Chain I/O futures are polled on this same task, so all
//! state changes are serialized without locks.

use std::num::NonZeroUsize;
use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;

use chainwatch_core::{Account, BalanceCacheEntry, ChainClient, ChainInfo, ChainRegistry, ErrorKind};
use futures::StreamExt;
use futures::stream::FuturesUnordered;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::MissedTickBehavior;

use crate::completion::Io;
use crate::gate::SessionGate;
use crate::view::SessionView;

const COMMAND_CHANNEL_CAPACITY: usize = 64;

/// Tunables for a session.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub connect_timeout: Duration,
    pub balance_timeout: Duration,
    pub poll_interval: Duration,
    pub cache_capacity: NonZeroUsize,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            balance_timeout: Duration::from_secs(5),
            poll_interval: Duration::from_secs(12),
            cache_capacity: NonZeroUsize::new(64).unwrap_or(NonZeroUsize::MIN),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("Session has shut down")]
    Closed,

    #[error(transparent)]
    Request(#[from] ErrorKind),
}

impl SessionError {
    /// True when the request was only recorded because the wallet is locked.
    pub fn is_deferred(&self) -> bool {
        matches!(
            self,
            SessionError::Request(ErrorKind::LockedOperationDeferred)
        )
    }
}

/// Commands handled by the session task.
enum Command {
    SelectChain {
        chain: ChainInfo,
        reply: oneshot::Sender<Result<(), ErrorKind>>,
    },
    SelectByName {
        query: String,
        reply: oneshot::Sender<Result<ChainInfo, ErrorKind>>,
    },
    Track {
        account: Account,
        reply: oneshot::Sender<Result<(), ErrorKind>>,
    },
    Lock,
    Unlock,
    ReloadRegistry(Vec<ChainInfo>),
    Chains {
        reply: oneshot::Sender<Vec<ChainInfo>>,
    },
    CurrentBalance {
        account: Account,
        chain: ChainInfo,
        reply: oneshot::Sender<Option<BalanceCacheEntry>>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

/// Handle to a running session. Cheap to clone.
#[derive(Clone)]
pub struct SessionHandle {
    command_tx: mpsc::Sender<Command>,
    view_rx: watch::Receiver<SessionView>,
}

impl SessionHandle {
    /// Start a session on the current tokio runtime. It begins locked.
    pub fn spawn<C: ChainClient>(
        client: C,
        registry: ChainRegistry,
        settings: SessionSettings,
    ) -> Self {
        let gate = SessionGate::new(Arc::new(client), registry, &settings);
        let (view_tx, view_rx) = watch::channel(gate.view());
        let (command_tx, command_rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);

        let runtime = SessionRuntime {
            gate,
            pending: FuturesUnordered::new(),
            view_tx,
        };
        tokio::spawn(runtime.run(command_rx, settings.poll_interval));

        Self {
            command_tx,
            view_rx,
        }
    }

    /// Switch to `chain`. Deferred while locked.
    pub async fn select_chain(&self, chain: ChainInfo) -> Result<(), SessionError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::SelectChain { chain, reply }).await?;
        Ok(rx.await.map_err(|_| SessionError::Closed)??)
    }

    /// Switch to a registry chain given by name or endpoint.
    pub async fn select_by_name(&self, query: &str) -> Result<ChainInfo, SessionError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::SelectByName {
            query: query.to_string(),
            reply,
        })
        .await?;
        Ok(rx.await.map_err(|_| SessionError::Closed)??)
    }

    /// Track the balance of `account`. Deferred while locked.
    pub async fn track(&self, account: Account) -> Result<(), SessionError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Track { account, reply }).await?;
        Ok(rx.await.map_err(|_| SessionError::Closed)??)
    }

    pub async fn lock(&self) -> Result<(), SessionError> {
        self.send(Command::Lock).await
    }

    pub async fn unlock(&self) -> Result<(), SessionError> {
        self.send(Command::Unlock).await
    }

    /// Replace the chain catalog.
    pub async fn reload_registry(&self, chains: Vec<ChainInfo>) -> Result<(), SessionError> {
        self.send(Command::ReloadRegistry(chains)).await
    }

    /// The current chain catalog.
    pub async fn chains(&self) -> Result<Vec<ChainInfo>, SessionError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Chains { reply }).await?;
        rx.await.map_err(|_| SessionError::Closed)
    }

    /// Cached balance for any `(chain, account)` pair.
    pub async fn current_balance(
        &self,
        account: Account,
        chain: ChainInfo,
    ) -> Result<Option<BalanceCacheEntry>, SessionError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::CurrentBalance {
            account,
            chain,
            reply,
        })
        .await?;
        rx.await.map_err(|_| SessionError::Closed)
    }

    /// Subscribe to view updates. Dropping the receiver unsubscribes.
    pub fn subscribe(&self) -> watch::Receiver<SessionView> {
        self.view_rx.clone()
    }

    /// Latest published view.
    pub fn view(&self) -> SessionView {
        self.view_rx.borrow().clone()
    }

    /// Close the connection and stop the session task.
    pub async fn shutdown(&self) -> Result<(), SessionError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Shutdown { reply }).await?;
        rx.await.map_err(|_| SessionError::Closed)
    }

    async fn send(&self, command: Command) -> Result<(), SessionError> {
        self.command_tx
            .send(command)
            .await
            .map_err(|_| SessionError::Closed)
    }
}

struct SessionRuntime<C: ChainClient> {
    gate: SessionGate<C>,
    pending: FuturesUnordered<Io<C::Handle>>,
    view_tx: watch::Sender<SessionView>,
}

impl<C: ChainClient> SessionRuntime<C> {
    async fn run(mut self, mut commands: mpsc::Receiver<Command>, poll_interval: Duration) {
        let mut ticker = tokio::time::interval_at(
            tokio::time::Instant::now() + poll_interval,
            poll_interval,
        );
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(command) => {
                        if let ControlFlow::Break(reply) = self.handle_command(command) {
                            self.close().await;
                            let _ = reply.send(());
                            return;
                        }
                    }
                    None => break,
                },
                Some(completion) = self.pending.next(), if !self.pending.is_empty() => {
                    let io = self.gate.handle_completion(completion);
                    self.schedule(io);
                }
                _ = ticker.tick() => {
                    let io = self.gate.poll();
                    self.schedule(io);
                }
            }
            self.publish();
        }

        tracing::debug!("All session handles dropped");
        self.close().await;
    }

    /// Apply one command. Breaks with the reply channel on shutdown.
    fn handle_command(&mut self, command: Command) -> ControlFlow<oneshot::Sender<()>> {
        match command {
            Command::SelectChain { chain, reply } => {
                let result = self.gate.select_chain(chain).map(|io| self.schedule(io));
                let _ = reply.send(result);
            }
            Command::SelectByName { query, reply } => {
                let result = self.gate.resolve(&query).and_then(|chain| {
                    let io = self.gate.select_chain(chain.clone())?;
                    self.schedule(io);
                    Ok(chain)
                });
                let _ = reply.send(result);
            }
            Command::Track { account, reply } => {
                let result = self.gate.track(account).map(|io| self.schedule(io));
                let _ = reply.send(result);
            }
            Command::Lock => {
                let io = self.gate.on_lock();
                self.schedule(io);
            }
            Command::Unlock => {
                let io = self.gate.on_unlock();
                self.schedule(io);
            }
            Command::ReloadRegistry(chains) => {
                let io = self.gate.reload_registry(chains);
                self.schedule(io);
            }
            Command::Chains { reply } => {
                let _ = reply.send(self.gate.registry().iter().cloned().collect());
            }
            Command::CurrentBalance {
                account,
                chain,
                reply,
            } => {
                let _ = reply.send(self.gate.current_balance(&account, &chain));
            }
            Command::Shutdown { reply } => return ControlFlow::Break(reply),
        }
        ControlFlow::Continue(())
    }

    fn schedule(&mut self, io: Vec<Io<C::Handle>>) {
        self.pending.extend(io);
    }

    fn publish(&self) {
        let view = self.gate.view();
        self.view_tx.send_if_modified(|current| {
            if *current == view {
                false
            } else {
                *current = view;
                true
            }
        });
    }

    /// Release the live connection and let outstanding I/O settle.
    async fn close(&mut self) {
        let io = self.gate.shutdown();
        self.schedule(io);
        while let Some(completion) = self.pending.next().await {
            // Late results may carry handles that also need closing.
            let io = self.gate.handle_completion(completion);
            self.schedule(io);
        }
        self.publish();
        tracing::info!("Session closed");
    }
}
