mod artifacts;

pub use artifacts::ArtifactStore;

use std::sync::Mutex;
use std::time::{Duration, Instant};

use evm_codec::{abi, contract_address, Address, Value};
use evm_rpc_client::{EvmRpc, TransactionRequest};

use crate::ledger::{Confirmation, LedgerClient, LedgerError, PendingTransaction};
use crate::types::{ArtifactKind, ConfigurationMethod};
use deploy_system_kit::log::Context;
use deploy_system_kit::slog;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvmLedgerSettings {
    pub deployer: Address,
    pub confirmation_timeout: Duration,
    pub polling_interval: Duration,
    pub gas_limit: Option<u64>,
}

/// `LedgerClient` backed by a JSON-RPC node holding the deployer's key unlocked.
pub struct EvmLedger {
    rpc: EvmRpc,
    artifacts: ArtifactStore,
    settings: EvmLedgerSettings,
    cached_nonce: Mutex<Option<u64>>,
    ctx: Context,
}

impl EvmLedger {
    pub fn new(
        rpc: EvmRpc,
        artifacts: ArtifactStore,
        settings: EvmLedgerSettings,
        ctx: &Context,
    ) -> EvmLedger {
        EvmLedger {
            rpc,
            artifacts,
            settings,
            cached_nonce: Mutex::new(None),
            ctx: ctx.clone(),
        }
    }

    pub fn settings(&self) -> &EvmLedgerSettings {
        &self.settings
    }

    /// Checks that the node answers and that every artifact of the plan can be loaded,
    /// before the first transaction goes out.
    pub fn check_readiness(&self, artifacts: &[ArtifactKind]) -> Result<u64, LedgerError> {
        let chain_id = self
            .rpc
            .get_chain_id()
            .map_err(|e| LedgerError::Submission(format!("node unreachable: {}", e)))?;
        for artifact in artifacts.iter() {
            self.artifacts.bytecode(*artifact)?;
        }
        Ok(chain_id)
    }

    fn submit(
        &self,
        to: Option<Address>,
        data: &[u8],
    ) -> Result<PendingTransaction, LedgerError> {
        let mut cached_nonce = self
            .cached_nonce
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let nonce = match *cached_nonce {
            Some(nonce) => nonce,
            None => self
                .rpc
                .get_transaction_count(&self.settings.deployer)
                .map_err(|e| {
                    LedgerError::Submission(format!(
                        "unable to retrieve nonce of {}: {}",
                        self.settings.deployer, e
                    ))
                })?,
        };

        let mut request =
            TransactionRequest::new(self.settings.deployer, to, data).with_nonce(nonce);
        if let Some(gas_limit) = self.settings.gas_limit {
            request = request.with_gas(gas_limit);
        }

        match self.rpc.send_transaction(&request) {
            Ok(hash) => {
                *cached_nonce = Some(nonce + 1);
                let contract_address = match to {
                    None => Some(contract_address(&self.settings.deployer, nonce)),
                    Some(_) => None,
                };
                Ok(PendingTransaction {
                    hash,
                    contract_address,
                })
            }
            Err(e) => {
                // Refetched from the node on the next submission.
                *cached_nonce = None;
                Err(LedgerError::Submission(e.to_string()))
            }
        }
    }
}

impl LedgerClient for EvmLedger {
    fn deploy(
        &self,
        artifact: ArtifactKind,
        constructor_args: &[Value],
    ) -> Result<PendingTransaction, LedgerError> {
        let bytecode = self.artifacts.bytecode(artifact)?;
        let data = abi::encode_deployment(&bytecode, constructor_args);
        let pending = self.submit(None, &data)?;
        self.ctx.try_log(|logger| {
            slog::debug!(
                logger,
                "{} deployment broadcasted ({}), expected at {:?}",
                artifact.contract_name(),
                pending.hash,
                pending.contract_address
            )
        });
        Ok(pending)
    }

    fn call(
        &self,
        target: &Address,
        method: ConfigurationMethod,
        args: &[Value],
    ) -> Result<PendingTransaction, LedgerError> {
        let data = abi::encode_function_call(method.signature(), args)
            .map_err(|e| LedgerError::Submission(e.to_string()))?;
        self.submit(Some(*target), &data)
    }

    fn wait_for_confirmation(&self, transaction: &PendingTransaction) -> Confirmation {
        let started_at = Instant::now();
        loop {
            match self.rpc.get_transaction_receipt(&transaction.hash) {
                Ok(Some(receipt)) => {
                    let block_height = receipt.block_height().unwrap_or_default();
                    if !receipt.is_success() {
                        return Confirmation::Reverted(format!(
                            "transaction {} failed in block {}",
                            transaction.hash, block_height
                        ));
                    }
                    let expected = match transaction.contract_address {
                        None => return Confirmation::Confirmed { block_height },
                        Some(expected) => expected,
                    };
                    if let Some(actual) = receipt.contract_address {
                        if expected != actual {
                            return Confirmation::Reverted(format!(
                                "contract created at {}, expected {}",
                                actual, expected
                            ));
                        }
                    }
                    match self.rpc.get_code(&expected) {
                        Ok(code) if code.is_empty() => {
                            return Confirmation::Reverted(format!(
                                "no code deployed at {} after block {}",
                                expected, block_height
                            ))
                        }
                        Ok(_) => return Confirmation::Confirmed { block_height },
                        Err(e) => self.ctx.try_log(|logger| {
                            slog::warn!(logger, "unable to fetch code at {}: {}", expected, e)
                        }),
                    }
                }
                Ok(None) => {}
                Err(e) => self.ctx.try_log(|logger| {
                    slog::warn!(
                        logger,
                        "unable to fetch receipt of {}: {}",
                        transaction.hash,
                        e
                    )
                }),
            }

            if started_at.elapsed() >= self.settings.confirmation_timeout {
                return Confirmation::TimedOut;
            }
            std::thread::sleep(self.settings.polling_interval);
        }
    }
}
