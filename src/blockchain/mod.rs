pub mod abi;
pub mod bindings;
pub mod contract;
pub mod contracts;
pub mod events;
pub mod rpc;
pub mod signer;
pub mod subscription;

pub use abi::ContractAbi;
pub use contract::{ContractHandle, LogIter};
pub use contracts::{LendingPoolContract, TokenContract};
pub use events::IndexedFilter;
pub use rpc::{connect, BlockchainClient, RpcConnection, TransportKind};
pub use signer::TxSigner;
pub use subscription::Subscription;
