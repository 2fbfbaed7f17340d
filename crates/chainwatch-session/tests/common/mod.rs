//! Mock chain transport with per-endpoint latency, for session tests.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chainwatch_core::{Account, Balance, ChainClient, ChainInfo, ChainRegistry, ErrorKind};
use chainwatch_session::{SessionHandle, SessionSettings, SessionView};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockHandle {
    pub id: u64,
    pub endpoint: String,
}

#[derive(Default)]
struct Inner {
    connects: Vec<String>,
    fetches: Vec<(String, String)>,
    closes: Vec<String>,
    open: HashMap<u64, String>,
    next_id: u64,
    connect_delay: HashMap<String, Duration>,
    fetch_delay: Duration,
    refused: HashSet<String>,
    balances: HashMap<(String, String), Result<Balance, ErrorKind>>,
}

/// Shared-state mock; clones observe the same calls.
#[derive(Clone, Default)]
pub struct MockClient {
    inner: Arc<Mutex<Inner>>,
}

impl MockClient {
    pub fn set_connect_delay(&self, endpoint: &str, delay: Duration) {
        self.inner
            .lock()
            .unwrap()
            .connect_delay
            .insert(endpoint.to_string(), delay);
    }

    pub fn set_fetch_delay(&self, delay: Duration) {
        self.inner.lock().unwrap().fetch_delay = delay;
    }

    pub fn refuse(&self, endpoint: &str) {
        self.inner
            .lock()
            .unwrap()
            .refused
            .insert(endpoint.to_string());
    }

    pub fn set_balance(&self, endpoint: &str, account: &str, result: Result<Balance, ErrorKind>) {
        self.inner
            .lock()
            .unwrap()
            .balances
            .insert((endpoint.to_string(), account.to_string()), result);
    }

    pub fn connects(&self) -> Vec<String> {
        self.inner.lock().unwrap().connects.clone()
    }

    pub fn fetches(&self) -> Vec<(String, String)> {
        self.inner.lock().unwrap().fetches.clone()
    }

    pub fn closes(&self) -> Vec<String> {
        self.inner.lock().unwrap().closes.clone()
    }

    /// Endpoints of handles opened and not yet closed.
    pub fn open_endpoints(&self) -> Vec<String> {
        let mut open: Vec<String> = self.inner.lock().unwrap().open.values().cloned().collect();
        open.sort();
        open
    }
}

#[async_trait]
impl ChainClient for MockClient {
    type Handle = MockHandle;

    async fn connect(&self, endpoint: &str, _timeout: Duration) -> Result<MockHandle, ErrorKind> {
        let delay = {
            let mut inner = self.inner.lock().unwrap();
            inner.connects.push(endpoint.to_string());
            inner.connect_delay.get(endpoint).copied().unwrap_or_default()
        };
        tokio::time::sleep(delay).await;

        let mut inner = self.inner.lock().unwrap();
        if inner.refused.contains(endpoint) {
            return Err(ErrorKind::ConnectionRefused(endpoint.to_string()));
        }
        inner.next_id += 1;
        let id = inner.next_id;
        inner.open.insert(id, endpoint.to_string());
        Ok(MockHandle {
            id,
            endpoint: endpoint.to_string(),
        })
    }

    async fn fetch_balance(
        &self,
        handle: &MockHandle,
        account: &Account,
    ) -> Result<Balance, ErrorKind> {
        let delay = {
            let mut inner = self.inner.lock().unwrap();
            inner
                .fetches
                .push((handle.endpoint.clone(), account.as_str().to_string()));
            inner.fetch_delay
        };
        tokio::time::sleep(delay).await;

        self.inner
            .lock()
            .unwrap()
            .balances
            .get(&(handle.endpoint.clone(), account.as_str().to_string()))
            .cloned()
            .unwrap_or_else(|| Err(ErrorKind::BalanceFetchFailed("unknown account".to_string())))
    }

    async fn close(&self, handle: MockHandle) {
        let mut inner = self.inner.lock().unwrap();
        inner.closes.push(handle.endpoint.clone());
        inner.open.remove(&handle.id);
    }
}

pub fn chain(name: &str) -> ChainInfo {
    ChainInfo::new(name, format!("ws://{}.test", name.to_lowercase())).with_token("UNIT", 12)
}

pub fn balance(free: u128, reserved: u128) -> Balance {
    Balance::new(free, reserved, 0).unwrap()
}

pub fn registry() -> ChainRegistry {
    ChainRegistry::new(vec![chain("A"), chain("B"), chain("X")])
}

/// Settings with polling far enough out not to disturb call counts.
pub fn quiet_settings() -> SessionSettings {
    SessionSettings {
        connect_timeout: Duration::from_secs(10),
        balance_timeout: Duration::from_secs(5),
        poll_interval: Duration::from_secs(3600),
        cache_capacity: NonZeroUsize::new(16).unwrap(),
    }
}

pub fn spawn(client: &MockClient, settings: SessionSettings) -> SessionHandle {
    SessionHandle::spawn(client.clone(), registry(), settings)
}

/// Wait until the published view satisfies `pred`.
pub async fn wait_for(
    session: &SessionHandle,
    pred: impl FnMut(&SessionView) -> bool,
) -> SessionView {
    let mut rx = session.subscribe();
    tokio::time::timeout(Duration::from_secs(600), rx.wait_for(pred))
        .await
        .expect("timed out waiting for view")
        .expect("session closed")
        .clone()
}

/// Let in-flight work settle.
pub async fn settle() {
    tokio::time::sleep(Duration::from_secs(30)).await;
}
