//! Read model for UI frontends.

use chainwatch_core::{Account, Balance, ChainInfo, ConnectionStatus, ErrorKind, format_balance};

/// Everything a frontend needs to render connection and balance state.
///
/// `balance`, `is_loading` and `error` always describe `account` on
/// `selected_chain`; nothing from another chain is ever reported here.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionView {
    pub locked: bool,
    pub connection: ConnectionStatus,
    /// Chain shown in the header. While locked, the chain that will be
    /// reconnected on unlock.
    pub selected_chain: Option<ChainInfo>,
    pub account: Option<Account>,
    pub balance: Option<Balance>,
    pub is_connecting: bool,
    pub is_loading: bool,
    /// Connection failure, or the last balance refresh error.
    pub error: Option<ErrorKind>,
}

impl SessionView {
    /// View of a freshly started, locked session.
    pub fn locked() -> Self {
        Self {
            locked: true,
            connection: ConnectionStatus::Disconnected,
            selected_chain: None,
            account: None,
            balance: None,
            is_connecting: false,
            is_loading: false,
            error: None,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_connected()
    }

    /// Balance formatted in the selected chain's token.
    pub fn display_balance(&self) -> Option<String> {
        let chain = self.selected_chain.as_ref()?;
        self.balance
            .as_ref()
            .map(|balance| format_balance(balance, chain))
    }
}
