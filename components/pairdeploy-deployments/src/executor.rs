use evm_codec::{Address, TransactionHash, Value};

use crate::errors::DeploymentError;
use crate::ledger::{Confirmation, LedgerClient, LedgerError, PendingTransaction};
use crate::types::{ArtifactKind, ConfigurationMethod, DeploymentResult};
use deploy_system_kit::log::Context;
use deploy_system_kit::slog;

/// A step whose symbolic references have all been replaced by concrete values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedStep {
    Deploy {
        unit: String,
        artifact: ArtifactKind,
        constructor_args: Vec<Value>,
    },
    Call {
        name: String,
        target: Address,
        method: ConfigurationMethod,
        args: Vec<Value>,
    },
}

impl ResolvedStep {
    pub fn name(&self) -> &str {
        match self {
            ResolvedStep::Deploy { unit, .. } => unit,
            ResolvedStep::Call { name, .. } => name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutput {
    Deployed(DeploymentResult),
    Configured(TransactionHash),
}

impl StepOutput {
    pub fn transaction_hash(&self) -> TransactionHash {
        match self {
            StepOutput::Deployed(result) => result.transaction_hash,
            StepOutput::Configured(hash) => *hash,
        }
    }
}

/// Outcome of a group of independent deployments: what got confirmed, and the
/// first error met, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConcurrentOutcome {
    pub confirmed: Vec<StepOutput>,
    pub error: Option<DeploymentError>,
}

pub struct StepExecutor<'a, L: LedgerClient + ?Sized> {
    ledger: &'a L,
    ctx: Context,
}

impl<'a, L: LedgerClient + ?Sized> StepExecutor<'a, L> {
    pub fn new(ledger: &'a L, ctx: &Context) -> StepExecutor<'a, L> {
        StepExecutor {
            ledger,
            ctx: ctx.clone(),
        }
    }

    /// Submits the step and blocks until the ledger reports its fate. Never retries.
    pub fn execute(&self, step: &ResolvedStep) -> Result<StepOutput, DeploymentError> {
        let pending = self.submit(step)?;
        self.await_confirmation(step, &pending)
    }

    /// Submits every step back to back, then waits for each of them in submission
    /// order. Steps already submitted are still awaited after a failure; steps not yet
    /// submitted when a submission fails are dropped.
    pub fn execute_concurrently(&self, steps: &[ResolvedStep]) -> ConcurrentOutcome {
        let mut submitted = vec![];
        let mut error = None;

        for step in steps.iter() {
            match self.submit(step) {
                Ok(pending) => submitted.push((step, pending)),
                Err(e) => {
                    error = Some(e);
                    break;
                }
            }
        }

        let mut confirmed = vec![];
        for (step, pending) in submitted.iter() {
            match self.await_confirmation(step, pending) {
                Ok(output) => confirmed.push(output),
                Err(e) => {
                    if error.is_none() {
                        error = Some(e);
                    }
                }
            }
        }

        ConcurrentOutcome { confirmed, error }
    }

    fn submit(&self, step: &ResolvedStep) -> Result<PendingTransaction, DeploymentError> {
        let result = match step {
            ResolvedStep::Deploy {
                artifact,
                constructor_args,
                ..
            } => self.ledger.deploy(*artifact, constructor_args),
            ResolvedStep::Call {
                target,
                method,
                args,
                ..
            } => self.ledger.call(target, *method, args),
        };

        let pending = result.map_err(|detail| DeploymentError::StepFailed {
            step: step.name().to_string(),
            detail,
        })?;

        if let ResolvedStep::Deploy { .. } = step {
            if pending.contract_address.is_none() {
                return Err(DeploymentError::StepFailed {
                    step: step.name().to_string(),
                    detail: LedgerError::Submission(format!(
                        "deployment {} did not report a contract address",
                        pending.hash
                    )),
                });
            }
        }

        self.ctx.try_log(|logger| {
            slog::debug!(
                logger,
                "{} submitted in transaction {}",
                step.name(),
                pending.hash
            )
        });
        Ok(pending)
    }

    fn await_confirmation(
        &self,
        step: &ResolvedStep,
        pending: &PendingTransaction,
    ) -> Result<StepOutput, DeploymentError> {
        match self.ledger.wait_for_confirmation(pending) {
            Confirmation::Confirmed { block_height } => {
                self.ctx.try_log(|logger| {
                    slog::debug!(
                        logger,
                        "{} confirmed at block {}",
                        step.name(),
                        block_height
                    )
                });
                match (step, pending.contract_address) {
                    (
                        ResolvedStep::Deploy {
                            unit, artifact, ..
                        },
                        Some(address),
                    ) => Ok(StepOutput::Deployed(DeploymentResult {
                        unit: unit.clone(),
                        artifact: *artifact,
                        address,
                        transaction_hash: pending.hash,
                        confirmed: true,
                    })),
                    _ => Ok(StepOutput::Configured(pending.hash)),
                }
            }
            Confirmation::Reverted(detail) => {
                self.ctx.try_log(|logger| {
                    slog::warn!(logger, "{} reverted: {}", step.name(), detail)
                });
                Err(DeploymentError::StepFailed {
                    step: step.name().to_string(),
                    detail: LedgerError::Reverted(detail),
                })
            }
            Confirmation::TimedOut => {
                self.ctx.try_log(|logger| {
                    slog::warn!(logger, "{} not confirmed in time", step.name())
                });
                Err(DeploymentError::ConfirmationTimeout {
                    step: step.name().to_string(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    struct ScriptedLedger {
        confirmations: RefCell<Vec<Confirmation>>,
        submissions: RefCell<Vec<String>>,
        reject_deploys: bool,
    }

    impl ScriptedLedger {
        fn new(mut confirmations: Vec<Confirmation>) -> ScriptedLedger {
            confirmations.reverse();
            ScriptedLedger {
                confirmations: RefCell::new(confirmations),
                submissions: RefCell::new(vec![]),
                reject_deploys: false,
            }
        }

        fn next_hash(&self) -> TransactionHash {
            TransactionHash::with_last_byte(self.submissions.borrow().len() as u8)
        }
    }

    impl LedgerClient for ScriptedLedger {
        fn deploy(
            &self,
            artifact: ArtifactKind,
            _constructor_args: &[Value],
        ) -> Result<PendingTransaction, LedgerError> {
            if self.reject_deploys {
                return Err(LedgerError::Submission("nonce too low".into()));
            }
            self.submissions.borrow_mut().push(artifact.to_string());
            let n = self.submissions.borrow().len() as u8;
            Ok(PendingTransaction {
                hash: self.next_hash(),
                contract_address: Some(Address::with_last_byte(n)),
            })
        }

        fn call(
            &self,
            _target: &Address,
            method: ConfigurationMethod,
            _args: &[Value],
        ) -> Result<PendingTransaction, LedgerError> {
            self.submissions.borrow_mut().push(method.to_string());
            Ok(PendingTransaction {
                hash: self.next_hash(),
                contract_address: None,
            })
        }

        fn wait_for_confirmation(&self, _transaction: &PendingTransaction) -> Confirmation {
            self.confirmations
                .borrow_mut()
                .pop()
                .unwrap_or(Confirmation::Confirmed { block_height: 1 })
        }
    }

    fn deploy(artifact: ArtifactKind) -> ResolvedStep {
        ResolvedStep::Deploy {
            unit: artifact.to_string(),
            artifact,
            constructor_args: vec![],
        }
    }

    #[test]
    fn confirmed_deployment_yields_confirmed_result() {
        let ledger = ScriptedLedger::new(vec![]);
        let executor = StepExecutor::new(&ledger, &Context::empty());
        let output = executor.execute(&deploy(ArtifactKind::Router)).unwrap();
        match output {
            StepOutput::Deployed(result) => {
                assert_eq!(result.unit, "Router");
                assert_eq!(result.address, Address::with_last_byte(1));
                assert!(result.confirmed);
            }
            other => panic!("unexpected output {:?}", other),
        }
    }

    #[test]
    fn confirmed_call_yields_its_transaction_hash() {
        let ledger = ScriptedLedger::new(vec![]);
        let executor = StepExecutor::new(&ledger, &Context::empty());
        let step = ResolvedStep::Call {
            name: "PairFactory.setRouterAllowed(0x02, true)".into(),
            target: Address::with_last_byte(5),
            method: ConfigurationMethod::SetRouterAllowed,
            args: vec![Value::Address(Address::with_last_byte(2)), Value::Bool(true)],
        };
        assert_eq!(
            executor.execute(&step).unwrap(),
            StepOutput::Configured(TransactionHash::with_last_byte(1))
        );
    }

    #[test]
    fn reverted_call_maps_to_step_failed() {
        let ledger = ScriptedLedger::new(vec![Confirmation::Reverted("not owner".into())]);
        let executor = StepExecutor::new(&ledger, &Context::empty());
        let step = ResolvedStep::Call {
            name: "PairFactory.transferOwnership(0x01)".into(),
            target: Address::with_last_byte(5),
            method: ConfigurationMethod::TransferOwnership,
            args: vec![Value::Address(Address::with_last_byte(1))],
        };
        let err = executor.execute(&step).unwrap_err();
        assert_eq!(
            err,
            DeploymentError::StepFailed {
                step: "PairFactory.transferOwnership(0x01)".into(),
                detail: LedgerError::Reverted("not owner".into()),
            }
        );
    }

    #[test]
    fn timeout_maps_to_confirmation_timeout() {
        let ledger = ScriptedLedger::new(vec![Confirmation::TimedOut]);
        let executor = StepExecutor::new(&ledger, &Context::empty());
        let err = executor.execute(&deploy(ArtifactKind::LinearCurve)).unwrap_err();
        assert_eq!(
            err,
            DeploymentError::ConfirmationTimeout {
                step: "LinearCurve".into()
            }
        );
    }

    #[test]
    fn rejected_submission_is_not_awaited() {
        let mut ledger = ScriptedLedger::new(vec![Confirmation::TimedOut]);
        ledger.reject_deploys = true;
        let executor = StepExecutor::new(&ledger, &Context::empty());
        let err = executor.execute(&deploy(ArtifactKind::Router)).unwrap_err();
        assert!(matches!(
            err,
            DeploymentError::StepFailed {
                detail: LedgerError::Submission(_),
                ..
            }
        ));
        assert_eq!(ledger.confirmations.borrow().len(), 1);
    }

    #[test]
    fn concurrent_group_awaits_every_submission() {
        let ledger = ScriptedLedger::new(vec![
            Confirmation::Confirmed { block_height: 3 },
            Confirmation::Reverted("out of gas".into()),
            Confirmation::Confirmed { block_height: 3 },
        ]);
        let executor = StepExecutor::new(&ledger, &Context::empty());
        let outcome = executor.execute_concurrently(&[
            deploy(ArtifactKind::ExponentialCurve),
            deploy(ArtifactKind::LinearCurve),
            deploy(ArtifactKind::QuadraticCurve),
        ]);
        assert_eq!(outcome.confirmed.len(), 2);
        assert!(ledger.confirmations.borrow().is_empty());
        assert_eq!(
            outcome.error.and_then(|e| e.step().map(|s| s.to_string())),
            Some("LinearCurve".to_string())
        );
    }
}
