pub mod abi;

pub use abi::{AbiError, Value};
pub use alloy_primitives::{address, Address, TxHash as TransactionHash, U256};

/// Address of the contract created by `sender` in its transaction number `nonce`.
pub fn contract_address(sender: &Address, nonce: u64) -> Address {
    sender.create(nonce)
}
