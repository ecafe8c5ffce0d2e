use evm_codec::{Address, TransactionHash, Value};
use thiserror::Error;

use crate::types::{ArtifactKind, ConfigurationMethod};

/// Handle on a submitted transaction. Deployments carry the address the contract
/// will live at once confirmed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingTransaction {
    pub hash: TransactionHash,
    pub contract_address: Option<Address>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Confirmation {
    Confirmed { block_height: u64 },
    Reverted(String),
    TimedOut,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("transaction rejected: {0}")]
    Submission(String),
    #[error("transaction reverted: {0}")]
    Reverted(String),
    #[error("unable to load artifact: {0}")]
    Artifact(String),
}

/// Boundary between the orchestration logic and a chain. Submission returns as soon
/// as the transaction is accepted; `wait_for_confirmation` blocks until it is final.
pub trait LedgerClient {
    fn deploy(
        &self,
        artifact: ArtifactKind,
        constructor_args: &[Value],
    ) -> Result<PendingTransaction, LedgerError>;

    fn call(
        &self,
        target: &Address,
        method: ConfigurationMethod,
        args: &[Value],
    ) -> Result<PendingTransaction, LedgerError>;

    fn wait_for_confirmation(&self, transaction: &PendingTransaction) -> Confirmation;
}

impl<L: LedgerClient + ?Sized> LedgerClient for &L {
    fn deploy(
        &self,
        artifact: ArtifactKind,
        constructor_args: &[Value],
    ) -> Result<PendingTransaction, LedgerError> {
        (**self).deploy(artifact, constructor_args)
    }

    fn call(
        &self,
        target: &Address,
        method: ConfigurationMethod,
        args: &[Value],
    ) -> Result<PendingTransaction, LedgerError> {
        (**self).call(target, method, args)
    }

    fn wait_for_confirmation(&self, transaction: &PendingTransaction) -> Confirmation {
        (**self).wait_for_confirmation(transaction)
    }
}

impl<L: LedgerClient + ?Sized> LedgerClient for Box<L> {
    fn deploy(
        &self,
        artifact: ArtifactKind,
        constructor_args: &[Value],
    ) -> Result<PendingTransaction, LedgerError> {
        (**self).deploy(artifact, constructor_args)
    }

    fn call(
        &self,
        target: &Address,
        method: ConfigurationMethod,
        args: &[Value],
    ) -> Result<PendingTransaction, LedgerError> {
        (**self).call(target, method, args)
    }

    fn wait_for_confirmation(&self, transaction: &PendingTransaction) -> Confirmation {
        (**self).wait_for_confirmation(transaction)
    }
}
