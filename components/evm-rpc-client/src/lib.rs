extern crate serde;

#[macro_use]
extern crate serde_derive;

#[macro_use]
extern crate serde_json;

pub mod rpc_client;

#[cfg(any(test, feature = "mock"))]
pub mod mock_evm_rpc;

pub use evm_codec;
pub use rpc_client::{EvmRpc, RpcError, TransactionReceipt, TransactionRequest};
