// DeFiLending client library

pub mod blockchain;
pub mod cli;
pub mod config;
pub mod core;
pub mod mocks;
pub mod types;
pub mod utils;

// Re-exports for convenience
pub use blockchain::{BlockchainClient, LendingPoolContract, TokenContract, TxSigner};
pub use config::Config;
pub use types::{CallOpts, ClientError, ClientResult, EventRecord, FilterOpts, PendingTx, TxOpts, WatchOpts};
