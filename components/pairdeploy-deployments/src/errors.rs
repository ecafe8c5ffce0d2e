use thiserror::Error;

use crate::ledger::LedgerError;

/// Configuration errors detected before anything is submitted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanError {
    #[error("batch {batch} does not contain any step")]
    EmptyBatch { batch: usize },
    #[error("unit '{unit}' is declared more than once")]
    DuplicateUnit { unit: String },
    #[error("step '{step}' references '{reference}', which is not deployed by an earlier step")]
    ForwardReference { step: String, reference: String },
    #[error("step '{step}' must target a deployed unit, not a literal address")]
    LiteralTarget { step: String },
    #[error("step '{step}' does not wait for its confirmation")]
    UnconfirmedStep { step: String },
    #[error("step '{step}' is scheduled after the ownership transfer '{transfer}'")]
    StepAfterOwnershipTransfer { step: String, transfer: String },
}

impl PlanError {
    /// Step the violation was found on, when it belongs to one.
    pub fn step(&self) -> Option<&str> {
        match self {
            PlanError::EmptyBatch { .. } => None,
            PlanError::DuplicateUnit { unit: step }
            | PlanError::ForwardReference { step, .. }
            | PlanError::LiteralTarget { step }
            | PlanError::UnconfirmedStep { step }
            | PlanError::StepAfterOwnershipTransfer { step, .. } => Some(step),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeploymentError {
    #[error("invalid deployment plan: {0}")]
    InvalidPlan(PlanError),
    #[error("step '{step}' references '{reference}', which has no confirmed address")]
    UnresolvedReference { step: String, reference: String },
    #[error("step '{step}' failed: {detail}")]
    StepFailed { step: String, detail: LedgerError },
    #[error("step '{step}' was not confirmed in time")]
    ConfirmationTimeout { step: String },
}

impl DeploymentError {
    pub fn step(&self) -> Option<&str> {
        match self {
            DeploymentError::InvalidPlan(error) => error.step(),
            DeploymentError::UnresolvedReference { step, .. }
            | DeploymentError::StepFailed { step, .. }
            | DeploymentError::ConfirmationTimeout { step } => Some(step),
        }
    }
}

impl From<PlanError> for DeploymentError {
    fn from(error: PlanError) -> Self {
        match error {
            PlanError::ForwardReference { step, reference } => {
                DeploymentError::UnresolvedReference { step, reference }
            }
            error => DeploymentError::InvalidPlan(error),
        }
    }
}
