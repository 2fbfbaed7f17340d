pub mod account;
pub mod client;
pub mod error;

pub use account::AccountBalance;
pub use client::*;
pub use error::*;
