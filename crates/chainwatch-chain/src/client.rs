//! WebSocket RPC transport for Polkadot-SDK chains, built on subxt.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chainwatch_core::{Account, Balance, ChainClient, ErrorKind};
use subxt::backend::rpc::RpcClient;
use subxt::{OnlineClient, PolkadotConfig};

use crate::account;
use crate::error::ChainError;

/// An open connection to one endpoint. Clones share the same socket.
#[derive(Clone)]
pub struct RpcHandle {
    endpoint: Arc<str>,
    client: OnlineClient<PolkadotConfig>,
}

impl RpcHandle {
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn client(&self) -> &OnlineClient<PolkadotConfig> {
        &self.client
    }
}

impl std::fmt::Debug for RpcHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcHandle")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

/// Chain transport speaking JSON-RPC over WebSocket.
#[derive(Debug, Clone)]
pub struct RpcChainClient {
    balance_timeout: Duration,
}

impl RpcChainClient {
    pub fn new(balance_timeout: Duration) -> Self {
        Self { balance_timeout }
    }

    /// Connect to `endpoint` and download its metadata.
    pub async fn connect_rpc(endpoint: &str) -> Result<RpcHandle, ChainError> {
        tracing::info!("Connecting to {}", endpoint);

        let rpc_client = RpcClient::from_url(endpoint)
            .await
            .map_err(|e| ChainError::Connection(e.to_string()))?;
        let client = OnlineClient::<PolkadotConfig>::from_rpc_client(rpc_client.clone()).await?;

        // Log chain name to verify metadata
        if let Ok(name) = rpc_client
            .request::<String>("system_chain", subxt::ext::subxt_rpcs::rpc_params![])
            .await
        {
            tracing::info!("Connected to {} ({})", endpoint, name);
        }

        Ok(RpcHandle {
            endpoint: Arc::from(endpoint),
            client,
        })
    }
}

impl Default for RpcChainClient {
    fn default() -> Self {
        Self::new(Duration::from_secs(5))
    }
}

#[async_trait]
impl ChainClient for RpcChainClient {
    type Handle = RpcHandle;

    async fn connect(&self, endpoint: &str, timeout: Duration) -> Result<RpcHandle, ErrorKind> {
        let result = match tokio::time::timeout(timeout, Self::connect_rpc(endpoint)).await {
            Ok(result) => result,
            Err(_) => Err(ChainError::Timeout(timeout)),
        };
        result.map_err(|e| {
            tracing::warn!("Failed to connect to {}: {}", endpoint, e);
            e.into_connect_error()
        })
    }

    async fn fetch_balance(
        &self,
        handle: &RpcHandle,
        account: &Account,
    ) -> Result<Balance, ErrorKind> {
        let fetch = account::fetch_balance(&handle.client, account);
        let result = match tokio::time::timeout(self.balance_timeout, fetch).await {
            Ok(result) => result,
            Err(_) => Err(ChainError::Timeout(self.balance_timeout)),
        };
        result.map_err(|e| {
            tracing::warn!(
                "Balance of {} on {} unavailable: {}",
                account.short(),
                handle.endpoint,
                e
            );
            e.into_balance_error()
        })
    }

    async fn close(&self, handle: RpcHandle) {
        // The socket closes once the last clone of the client is dropped.
        tracing::debug!("Closing connection to {}", handle.endpoint);
        drop(handle);
    }
}
