#[macro_use]
extern crate serde_derive;

#[allow(unused_imports)]
#[macro_use]
extern crate serde_json;

pub mod errors;
pub mod executor;
pub mod ledger;
pub mod orchestrator;
pub mod permissions;
pub mod registry;
pub mod types;

#[cfg(feature = "onchain")]
pub mod onchain;

pub use evm_codec;

pub use errors::{DeploymentError, PlanError};
pub use executor::{ResolvedStep, StepExecutor, StepOutput};
pub use ledger::{Confirmation, LedgerClient, LedgerError, PendingTransaction};
pub use orchestrator::{
    apply_deployment_plan, DeploymentCommand, DeploymentEvent, DeploymentFailure, Orchestrator,
    OrchestratorState,
};
pub use permissions::PermissionConfigurator;
pub use registry::{protocol_deployment_plan, RunParameters};
pub use types::{DeploymentPlan, RunState};
