//! Scripted chain client for unit tests.
//!
//! Every call completes immediately with a preconfigured result and is
//! recorded, so tests can drive `Io` futures by hand and inspect exactly what
//! reached the transport.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chainwatch_core::{Account, Balance, ChainClient, ChainInfo, ErrorKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Call {
    Connect(String),
    Fetch(String, String),
    Close(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct MockHandle {
    pub id: u64,
    pub endpoint: String,
}

#[derive(Default)]
pub(crate) struct ScriptedClient {
    calls: Mutex<Vec<Call>>,
    refused: Mutex<HashSet<String>>,
    balances: Mutex<HashMap<(String, String), Result<Balance, ErrorKind>>>,
    next_id: Mutex<u64>,
}

impl ScriptedClient {
    pub fn refuse(&self, endpoint: &str) {
        self.refused.lock().unwrap().insert(endpoint.to_string());
    }

    pub fn set_balance(&self, endpoint: &str, account: &str, result: Result<Balance, ErrorKind>) {
        self.balances
            .lock()
            .unwrap()
            .insert((endpoint.to_string(), account.to_string()), result);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn connect_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::Connect(_)))
            .count()
    }

    pub fn fetch_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::Fetch(_, _)))
            .count()
    }
}

#[async_trait]
impl ChainClient for ScriptedClient {
    type Handle = MockHandle;

    async fn connect(&self, endpoint: &str, _timeout: Duration) -> Result<MockHandle, ErrorKind> {
        self.calls
            .lock()
            .unwrap()
            .push(Call::Connect(endpoint.to_string()));
        if self.refused.lock().unwrap().contains(endpoint) {
            return Err(ErrorKind::ConnectionRefused(endpoint.to_string()));
        }
        let mut next_id = self.next_id.lock().unwrap();
        *next_id += 1;
        Ok(MockHandle {
            id: *next_id,
            endpoint: endpoint.to_string(),
        })
    }

    async fn fetch_balance(
        &self,
        handle: &MockHandle,
        account: &Account,
    ) -> Result<Balance, ErrorKind> {
        self.calls.lock().unwrap().push(Call::Fetch(
            handle.endpoint.clone(),
            account.as_str().to_string(),
        ));
        self.balances
            .lock()
            .unwrap()
            .get(&(handle.endpoint.clone(), account.as_str().to_string()))
            .cloned()
            .unwrap_or_else(|| Err(ErrorKind::BalanceFetchFailed("no script".to_string())))
    }

    async fn close(&self, handle: MockHandle) {
        self.calls.lock().unwrap().push(Call::Close(handle.endpoint));
    }
}

pub(crate) fn chain(name: &str) -> ChainInfo {
    ChainInfo::new(name, format!("ws://{}", name.to_lowercase())).with_token("UNIT", 12)
}

pub(crate) fn balance(free: u128, reserved: u128) -> Balance {
    Balance::new(free, reserved, 0).unwrap()
}
