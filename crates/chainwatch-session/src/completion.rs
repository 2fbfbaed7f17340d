//! Results of chain I/O, fed back into the session one at a time.

use chainwatch_core::{Balance, CacheKey, ChainInfo, ErrorKind};
use futures::future::BoxFuture;

/// A pending chain operation. The session polls these on its own task.
pub type Io<H> = BoxFuture<'static, Completion<H>>;

/// Outcome of one chain operation.
pub enum Completion<H> {
    /// A connection attempt finished. Only applies if `generation` is current.
    Connect {
        generation: u64,
        chain: ChainInfo,
        result: Result<H, ErrorKind>,
    },
    /// A balance refresh finished for `key`. `ticket` identifies the request.
    Balance {
        key: CacheKey,
        ticket: u64,
        result: Result<Balance, ErrorKind>,
    },
    /// A connection handle was released.
    Closed { endpoint: String },
}

impl<H> std::fmt::Debug for Completion<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Completion::Connect {
                generation,
                chain,
                result,
            } => f
                .debug_struct("Connect")
                .field("generation", generation)
                .field("chain", &chain.endpoint)
                .field("ok", &result.is_ok())
                .finish(),
            Completion::Balance {
                key,
                ticket,
                result,
            } => f
                .debug_struct("Balance")
                .field("key", key)
                .field("ticket", ticket)
                .field("result", result)
                .finish(),
            Completion::Closed { endpoint } => {
                f.debug_struct("Closed").field("endpoint", endpoint).finish()
            }
        }
    }
}
