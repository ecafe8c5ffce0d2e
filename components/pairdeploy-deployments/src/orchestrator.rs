use std::fmt;
use std::sync::mpsc::{Receiver, Sender};

use evm_codec::{Address, Value};

use crate::errors::{DeploymentError, PlanError};
use crate::executor::{ResolvedStep, StepExecutor, StepOutput};
use crate::ledger::LedgerClient;
use crate::types::{
    Argument, DeploymentPlan, RunState, StepBatch, StepSpecification, TransactionOutcome,
    TransactionReport,
};
use deploy_system_kit::log::Context;
use deploy_system_kit::slog;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrchestratorState {
    Pending(usize),
    Running(usize),
    Succeeded,
    Failed(usize, DeploymentError),
}

impl OrchestratorState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrchestratorState::Succeeded | OrchestratorState::Failed(..)
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeploymentFailure {
    /// Zero-based index of the failing registry entry.
    pub step_index: usize,
    pub step_name: String,
    pub error: DeploymentError,
    pub run_state: RunState,
}

impl fmt::Display for DeploymentFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "step {} ({}) failed: {}",
            self.step_index + 1,
            self.step_name,
            self.error
        )
    }
}

impl std::error::Error for DeploymentFailure {}

#[derive(Debug, Clone)]
pub enum DeploymentEvent {
    TransactionConfirmed(TransactionReport),
    Interrupted(DeploymentFailure),
    DeploymentCompleted(RunState),
}

pub enum DeploymentCommand {
    Start,
}

/// Replaces every symbolic reference of `step` with the confirmed address recorded in
/// `run_state`. Fails before anything reaches the ledger.
pub fn resolve_step(
    step: &StepSpecification,
    run_state: &RunState,
) -> Result<ResolvedStep, DeploymentError> {
    let name = step.name();
    let resolve = |argument: &Argument| -> Result<Value, DeploymentError> {
        match argument {
            Argument::Literal(value) => Ok(*value),
            Argument::AddressOf(unit) => run_state
                .address_of(unit)
                .map(Value::Address)
                .ok_or_else(|| DeploymentError::UnresolvedReference {
                    step: name.clone(),
                    reference: unit.clone(),
                }),
        }
    };

    match step {
        StepSpecification::Deploy(unit) => Ok(ResolvedStep::Deploy {
            unit: unit.name.clone(),
            artifact: unit.artifact,
            constructor_args: unit
                .constructor_args
                .iter()
                .map(&resolve)
                .collect::<Result<_, _>>()?,
        }),
        StepSpecification::Configure(config) => {
            let target: Address = match resolve(&config.target)? {
                Value::Address(address) => address,
                _ => {
                    return Err(PlanError::LiteralTarget {
                        step: name.clone(),
                    }
                    .into())
                }
            };
            let args = config
                .args
                .iter()
                .map(&resolve)
                .collect::<Result<_, _>>()?;
            Ok(ResolvedStep::Call {
                name: name.clone(),
                target,
                method: config.method,
                args,
            })
        }
    }
}

/// Walks a deployment plan one registry entry at a time. Every transaction of an entry
/// is confirmed before the next entry is looked at, and the first error is final.
pub struct Orchestrator<'a, L: LedgerClient + ?Sized> {
    plan: DeploymentPlan,
    executor: StepExecutor<'a, L>,
    state: OrchestratorState,
    run_state: RunState,
    event_tx: Option<Sender<DeploymentEvent>>,
    ctx: Context,
}

impl<'a, L: LedgerClient + ?Sized> Orchestrator<'a, L> {
    pub fn new(plan: DeploymentPlan, ledger: &'a L, ctx: &Context) -> Orchestrator<'a, L> {
        Orchestrator {
            plan,
            executor: StepExecutor::new(ledger, ctx),
            state: OrchestratorState::Pending(0),
            run_state: RunState::new(),
            event_tx: None,
            ctx: ctx.clone(),
        }
    }

    pub fn with_event_channel(mut self, event_tx: Sender<DeploymentEvent>) -> Self {
        self.event_tx = Some(event_tx);
        self
    }

    pub fn state(&self) -> &OrchestratorState {
        &self.state
    }

    pub fn run_state(&self) -> &RunState {
        &self.run_state
    }

    pub fn plan(&self) -> &DeploymentPlan {
        &self.plan
    }

    /// Performs a single transition of the state machine. Terminal states are left
    /// untouched.
    pub fn advance(&mut self) -> &OrchestratorState {
        let next = match self.state.clone() {
            OrchestratorState::Pending(0) if !self.plan.batches.is_empty() => {
                match self.plan.locate_violation() {
                    Ok(()) => OrchestratorState::Running(0),
                    Err((index, e)) => self.fail(index, e.into()),
                }
            }
            OrchestratorState::Pending(index) if index >= self.plan.batches.len() => {
                self.ctx.try_log(|logger| {
                    slog::info!(
                        logger,
                        "deployment '{}' completed: {} units deployed",
                        self.plan.name,
                        self.run_state.len()
                    )
                });
                self.emit(DeploymentEvent::DeploymentCompleted(self.run_state.clone()));
                OrchestratorState::Succeeded
            }
            OrchestratorState::Pending(index) => OrchestratorState::Running(index),
            OrchestratorState::Running(index) => {
                let batch = self.plan.batches[index].clone();
                match self.execute_batch(&batch) {
                    Ok(()) => OrchestratorState::Pending(index + 1),
                    Err(e) => self.fail(index, e),
                }
            }
            terminal => terminal,
        };
        self.state = next;
        &self.state
    }

    /// Drives the plan to a terminal state.
    pub fn run(&mut self) -> Result<RunState, DeploymentFailure> {
        while !self.state.is_terminal() {
            self.advance();
        }
        match &self.state {
            OrchestratorState::Failed(index, error) => Err(self.failure(*index, error.clone())),
            _ => Ok(self.run_state.clone()),
        }
    }

    fn execute_batch(&mut self, batch: &StepBatch) -> Result<(), DeploymentError> {
        self.ctx.try_log(|logger| {
            slog::info!(
                logger,
                "starting step {} ({}): {} transaction(s)",
                batch.id,
                batch.name,
                batch.steps.len()
            )
        });

        if batch.is_concurrent() {
            let steps = batch
                .steps
                .iter()
                .map(|step| resolve_step(step, &self.run_state))
                .collect::<Result<Vec<_>, _>>()?;
            let outcome = self.executor.execute_concurrently(&steps);
            for output in outcome.confirmed.into_iter() {
                let step = steps.iter().find(|s| match &output {
                    StepOutput::Deployed(result) => s.name() == result.unit,
                    StepOutput::Configured(_) => false,
                });
                if let Some(step) = step {
                    self.record(batch.id, step, output);
                }
            }
            if let Some(error) = outcome.error {
                return Err(error);
            }
        } else {
            for step in batch.steps.iter() {
                let resolved = resolve_step(step, &self.run_state)?;
                let output = self.executor.execute(&resolved)?;
                self.record(batch.id, &resolved, output);
            }
        }
        Ok(())
    }

    fn record(&mut self, batch: usize, step: &ResolvedStep, output: StepOutput) {
        let transaction_hash = output.transaction_hash();
        let outcome = match (&output, step) {
            (StepOutput::Deployed(result), _) => TransactionOutcome::Deployed(result.address),
            (
                StepOutput::Configured(_),
                ResolvedStep::Call {
                    target,
                    method,
                    args,
                    ..
                },
            ) => TransactionOutcome::Called {
                target: *target,
                method: *method,
                args: args.clone(),
            },
            (StepOutput::Configured(_), ResolvedStep::Deploy { .. }) => return,
        };
        let report = TransactionReport {
            batch,
            name: step.name().to_string(),
            transaction_hash,
            outcome,
        };
        if let StepOutput::Deployed(result) = output {
            self.run_state.record_deployment(result);
        }
        self.ctx
            .try_log(|logger| slog::info!(logger, "{}", report));
        self.run_state.record_transaction(report.clone());
        self.emit(DeploymentEvent::TransactionConfirmed(report));
    }

    fn fail(&self, index: usize, error: DeploymentError) -> OrchestratorState {
        let failure = self.failure(index, error.clone());
        self.ctx
            .try_log(|logger| slog::error!(logger, "{}", failure));
        self.emit(DeploymentEvent::Interrupted(failure));
        OrchestratorState::Failed(index, error)
    }

    fn failure(&self, index: usize, error: DeploymentError) -> DeploymentFailure {
        let step_name = match error.step() {
            Some(step) => step.to_string(),
            None => self
                .plan
                .batches
                .get(index)
                .map(|b| b.name.clone())
                .unwrap_or_else(|| self.plan.name.clone()),
        };
        DeploymentFailure {
            step_index: index,
            step_name,
            error,
            run_state: self.run_state.clone(),
        }
    }

    fn emit(&self, event: DeploymentEvent) {
        if let Some(ref event_tx) = self.event_tx {
            let _ = event_tx.send(event);
        }
    }
}

/// Waits for the operator's go, then runs `plan` to completion, reporting progress on
/// `deployment_event_tx`. Meant to be spawned on its own thread.
pub fn apply_deployment_plan<L: LedgerClient + ?Sized>(
    plan: DeploymentPlan,
    ledger: &L,
    deployment_event_tx: Sender<DeploymentEvent>,
    deployment_command_rx: Receiver<DeploymentCommand>,
    ctx: &Context,
) {
    match deployment_command_rx.recv() {
        Ok(DeploymentCommand::Start) => {}
        Err(_) => return,
    }

    let mut orchestrator =
        Orchestrator::new(plan, ledger, ctx).with_event_channel(deployment_event_tx);
    let _ = orchestrator.run();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permissions::router_allow_step;
    use crate::types::{ArtifactKind, DeployableUnit, DeploymentResult};
    use evm_codec::TransactionHash;

    fn confirmed(unit: ArtifactKind, address: u8) -> DeploymentResult {
        DeploymentResult {
            unit: unit.to_string(),
            artifact: unit,
            address: Address::with_last_byte(address),
            transaction_hash: TransactionHash::with_last_byte(address),
            confirmed: true,
        }
    }

    #[test]
    fn resolves_references_from_run_state() {
        let mut run_state = RunState::new();
        run_state.record_deployment(confirmed(ArtifactKind::PairFactory, 5));
        run_state.record_deployment(confirmed(ArtifactKind::Router, 6));

        let step = StepSpecification::Configure(router_allow_step());
        let resolved = resolve_step(&step, &run_state).unwrap();
        assert_eq!(
            resolved,
            ResolvedStep::Call {
                name: "PairFactory.setRouterAllowed(Router, true)".into(),
                target: Address::with_last_byte(5),
                method: crate::types::ConfigurationMethod::SetRouterAllowed,
                args: vec![Value::Address(Address::with_last_byte(6)), Value::Bool(true)],
            }
        );
    }

    #[test]
    fn missing_reference_is_reported() {
        let step = StepSpecification::Deploy(DeployableUnit::new(
            ArtifactKind::Router,
            vec![Argument::address_of("PairFactory")],
        ));
        let err = resolve_step(&step, &RunState::new()).unwrap_err();
        assert_eq!(
            err,
            DeploymentError::UnresolvedReference {
                step: "Router".into(),
                reference: "PairFactory".into(),
            }
        );
    }

    #[test]
    fn failure_display_uses_one_based_step_number() {
        let failure = DeploymentFailure {
            step_index: 4,
            step_name: "PairFactory".into(),
            error: DeploymentError::ConfirmationTimeout {
                step: "PairFactory".into(),
            },
            run_state: RunState::new(),
        };
        assert_eq!(
            failure.to_string(),
            "step 5 (PairFactory) failed: step 'PairFactory' was not confirmed in time"
        );
    }
}
