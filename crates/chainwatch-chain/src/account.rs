//! Account balance queries.

use std::str::FromStr;

use chainwatch_core::{Account, Amount, Balance, unix_millis};
use subxt::dynamic::{At, DecodedValueThunk, Value};
use subxt::utils::AccountId32;
use subxt::{OnlineClient, PolkadotConfig};

use crate::error::ChainError;

/// The `data` part of `System.Account`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AccountBalance {
    pub free: Amount,
    pub reserved: Amount,
    pub frozen: Amount,
}

impl AccountBalance {
    pub fn into_balance(self, as_of_ms: u64) -> Result<Balance, ChainError> {
        Balance::new(self.free, self.reserved, as_of_ms)
            .map_err(|e| ChainError::InvalidData(e.to_string()))
    }
}

/// Parse an SS58 address.
pub fn parse_account(account: &Account) -> Result<AccountId32, ChainError> {
    AccountId32::from_str(account.as_str())
        .map_err(|e| ChainError::InvalidData(format!("{}: {}", account.short(), e)))
}

/// Read `System.Account` at the latest block. Accounts without an entry hold nothing.
pub async fn get_account_balance(
    client: &OnlineClient<PolkadotConfig>,
    account: &AccountId32,
) -> Result<AccountBalance, ChainError> {
    let storage_query = subxt::dynamic::storage(
        "System",
        "Account",
        vec![Value::from_bytes(account.clone())],
    );

    let result: Option<DecodedValueThunk> = client
        .storage()
        .at_latest()
        .await?
        .fetch(&storage_query)
        .await?;

    let Some(value) = result else {
        return Ok(AccountBalance::default());
    };

    let decoded = value.to_value()?;

    // AccountInfo = { nonce, consumers, providers, sufficients, data: AccountData }
    let data = decoded
        .at("data")
        .ok_or_else(|| ChainError::Storage("System.Account has no data field".to_string()))?;

    let field = |name: &str| {
        data.at(name)
            .and_then(|v: &Value<u32>| v.as_u128())
            .unwrap_or(0)
    };

    Ok(AccountBalance {
        free: field("free"),
        reserved: field("reserved"),
        frozen: field("frozen"),
    })
}

/// Fetch and convert the balance of `account` in one go.
pub async fn fetch_balance(
    client: &OnlineClient<PolkadotConfig>,
    account: &Account,
) -> Result<Balance, ChainError> {
    let account_id = parse_account(account)?;
    get_account_balance(client, &account_id)
        .await?
        .into_balance(unix_millis())
}
