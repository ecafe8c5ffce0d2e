use std::collections::HashSet;
use std::fmt;

use evm_codec::{Address, TransactionHash, Value, U256};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use crate::errors::PlanError;

/// Compiled contracts the orchestrator knows how to instantiate. The variant name
/// doubles as the unit name used for symbolic references.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter, EnumString,
)]
pub enum ArtifactKind {
    PairEnumerableETH,
    PairMissingEnumerableETH,
    PairEnumerableERC20,
    PairMissingEnumerableERC20,
    PairFactory,
    Router,
    ExponentialCurve,
    LinearCurve,
    QuadraticCurve,
}

impl ArtifactKind {
    /// Name of the compiled contract, as found in the build artifacts.
    pub fn contract_name(&self) -> &'static str {
        match self {
            ArtifactKind::PairEnumerableETH => "LSSVMPairEnumerableETH",
            ArtifactKind::PairMissingEnumerableETH => "LSSVMPairMissingEnumerableETH",
            ArtifactKind::PairEnumerableERC20 => "LSSVMPairEnumerableERC20",
            ArtifactKind::PairMissingEnumerableERC20 => "LSSVMPairMissingEnumerableERC20",
            ArtifactKind::PairFactory => "LSSVMPairFactory",
            ArtifactKind::Router => "LSSVMRouter",
            ArtifactKind::ExponentialCurve => "ExponentialCurve",
            ArtifactKind::LinearCurve => "LinearCurve",
            ArtifactKind::QuadraticCurve => "QuadraticCurve",
        }
    }

    pub fn is_bonding_curve(&self) -> bool {
        matches!(
            self,
            ArtifactKind::ExponentialCurve
                | ArtifactKind::LinearCurve
                | ArtifactKind::QuadraticCurve
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
pub enum ConfigurationMethod {
    #[strum(serialize = "setRouterAllowed")]
    #[serde(rename = "setRouterAllowed")]
    SetRouterAllowed,
    #[strum(serialize = "setBondingCurveAllowed")]
    #[serde(rename = "setBondingCurveAllowed")]
    SetBondingCurveAllowed,
    #[strum(serialize = "transferOwnership")]
    #[serde(rename = "transferOwnership")]
    TransferOwnership,
}

impl ConfigurationMethod {
    pub fn signature(&self) -> &'static str {
        match self {
            ConfigurationMethod::SetRouterAllowed => "setRouterAllowed(address,bool)",
            ConfigurationMethod::SetBondingCurveAllowed => "setBondingCurveAllowed(address,bool)",
            ConfigurationMethod::TransferOwnership => "transferOwnership(address)",
        }
    }

    pub fn is_allow_list(&self) -> bool {
        !matches!(self, ConfigurationMethod::TransferOwnership)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Argument {
    Literal(Value),
    AddressOf(String),
}

impl Argument {
    pub fn address_of(unit: impl Into<String>) -> Argument {
        Argument::AddressOf(unit.into())
    }

    pub fn address(address: Address) -> Argument {
        Argument::Literal(Value::Address(address))
    }

    pub fn bool(flag: bool) -> Argument {
        Argument::Literal(Value::Bool(flag))
    }

    pub fn uint(value: U256) -> Argument {
        Argument::Literal(Value::Uint(value))
    }

    pub fn reference(&self) -> Option<&str> {
        match self {
            Argument::AddressOf(unit) => Some(unit),
            Argument::Literal(_) => None,
        }
    }
}

impl fmt::Display for Argument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Argument::Literal(value) => write!(f, "{}", value),
            Argument::AddressOf(unit) => write!(f, "{}", unit),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DeployableUnit {
    pub name: String,
    pub artifact: ArtifactKind,
    pub constructor_args: Vec<Argument>,
}

impl DeployableUnit {
    pub fn new(artifact: ArtifactKind, constructor_args: Vec<Argument>) -> DeployableUnit {
        DeployableUnit {
            name: artifact.to_string(),
            artifact,
            constructor_args,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ConfigurationStep {
    pub target: Argument,
    pub method: ConfigurationMethod,
    pub args: Vec<Argument>,
    pub requires_confirmation: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StepSpecification {
    Deploy(DeployableUnit),
    Configure(ConfigurationStep),
}

impl StepSpecification {
    pub fn name(&self) -> String {
        match self {
            StepSpecification::Deploy(unit) => unit.name.clone(),
            StepSpecification::Configure(step) => format!(
                "{}.{}({})",
                step.target,
                step.method,
                step.args
                    .iter()
                    .map(|a| a.to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        }
    }

    /// Every unit name this step needs resolved before it can be submitted.
    pub fn references(&self) -> Vec<&str> {
        match self {
            StepSpecification::Deploy(unit) => unit
                .constructor_args
                .iter()
                .filter_map(|a| a.reference())
                .collect(),
            StepSpecification::Configure(step) => step
                .target
                .reference()
                .into_iter()
                .chain(step.args.iter().filter_map(|a| a.reference()))
                .collect(),
        }
    }

    pub fn is_deployment(&self) -> bool {
        matches!(self, StepSpecification::Deploy(_))
    }

    pub fn is_ownership_transfer(&self) -> bool {
        matches!(
            self,
            StepSpecification::Configure(ConfigurationStep {
                method: ConfigurationMethod::TransferOwnership,
                ..
            })
        )
    }
}

/// One numbered entry of the plan. Several deployments grouped in a batch share no
/// dependency and may be submitted together; configuration calls always run one by one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct StepBatch {
    pub id: usize,
    pub name: String,
    pub steps: Vec<StepSpecification>,
}

impl StepBatch {
    pub fn is_concurrent(&self) -> bool {
        self.steps.len() > 1 && self.steps.iter().all(|s| s.is_deployment())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DeploymentPlan {
    pub name: String,
    pub batches: Vec<StepBatch>,
}

impl DeploymentPlan {
    /// Checks the plan is executable as written: references point backwards, unit
    /// names are unique, configuration calls target deployed units and nothing
    /// follows an ownership transfer.
    pub fn validate(&self) -> Result<(), PlanError> {
        self.locate_violation().map_err(|(_, error)| error)
    }

    /// Like `validate`, also returning the position of the batch the violation sits in.
    pub fn locate_violation(&self) -> Result<(), (usize, PlanError)> {
        let mut declared: HashSet<&str> = HashSet::new();
        let mut transfer_seen: Option<String> = None;

        for (index, batch) in self.batches.iter().enumerate() {
            Self::check_batch(batch, &mut declared, &mut transfer_seen)
                .map_err(|error| (index, error))?;
        }
        Ok(())
    }

    fn check_batch<'p>(
        batch: &'p StepBatch,
        declared: &mut HashSet<&'p str>,
        transfer_seen: &mut Option<String>,
    ) -> Result<(), PlanError> {
        if batch.steps.is_empty() {
            return Err(PlanError::EmptyBatch { batch: batch.id });
        }
        let concurrent = batch.is_concurrent();
        let mut declared_in_batch = vec![];

        for step in batch.steps.iter() {
            if let Some(transfer) = transfer_seen {
                return Err(PlanError::StepAfterOwnershipTransfer {
                    step: step.name(),
                    transfer: transfer.clone(),
                });
            }

            for reference in step.references() {
                if !declared.contains(reference) {
                    return Err(PlanError::ForwardReference {
                        step: step.name(),
                        reference: reference.to_string(),
                    });
                }
            }

            match step {
                StepSpecification::Deploy(unit) => {
                    if declared.contains(unit.name.as_str())
                        || declared_in_batch.contains(&unit.name.as_str())
                    {
                        return Err(PlanError::DuplicateUnit {
                            unit: unit.name.clone(),
                        });
                    }
                    if concurrent {
                        declared_in_batch.push(unit.name.as_str());
                    } else {
                        declared.insert(unit.name.as_str());
                    }
                }
                StepSpecification::Configure(config) => {
                    if config.target.reference().is_none() {
                        return Err(PlanError::LiteralTarget { step: step.name() });
                    }
                    if !config.requires_confirmation {
                        return Err(PlanError::UnconfirmedStep { step: step.name() });
                    }
                }
            }

            if step.is_ownership_transfer() {
                *transfer_seen = Some(step.name());
            }
        }
        declared.extend(declared_in_batch);
        Ok(())
    }

    pub fn transactions_count(&self) -> usize {
        self.batches.iter().map(|b| b.steps.len()).sum()
    }

    pub fn units(&self) -> impl Iterator<Item = &DeployableUnit> {
        self.batches
            .iter()
            .flat_map(|b| b.steps.iter())
            .filter_map(|s| match s {
                StepSpecification::Deploy(unit) => Some(unit),
                StepSpecification::Configure(_) => None,
            })
    }

    pub fn to_file_content(&self) -> Result<Vec<u8>, String> {
        let content = serde_yaml::to_string(self)
            .map_err(|e| format!("failed serializing deployment\n{}", e))?;
        Ok(content.into_bytes())
    }
}

/// Created once a deployment is confirmed, never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct DeploymentResult {
    pub unit: String,
    pub artifact: ArtifactKind,
    pub address: Address,
    pub transaction_hash: TransactionHash,
    pub confirmed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransactionOutcome {
    Deployed(Address),
    Called {
        target: Address,
        method: ConfigurationMethod,
        args: Vec<Value>,
    },
}

/// Operator-facing record of a confirmed transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct TransactionReport {
    pub batch: usize,
    pub name: String,
    pub transaction_hash: TransactionHash,
    pub outcome: TransactionOutcome,
}

impl fmt::Display for TransactionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.outcome {
            TransactionOutcome::Deployed(address) => {
                write!(f, "{} deployed at address {}", self.name, address)
            }
            TransactionOutcome::Called { .. } => {
                write!(f, "{} confirmed in {}", self.name, self.transaction_hash)
            }
        }
    }
}

/// Addresses and transactions confirmed so far in the current run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct RunState {
    deployments: IndexMap<String, DeploymentResult>,
    transactions: Vec<TransactionReport>,
}

impl RunState {
    pub fn new() -> RunState {
        RunState::default()
    }

    pub fn get(&self, unit: &str) -> Option<&DeploymentResult> {
        self.deployments.get(unit)
    }

    pub fn address_of(&self, unit: &str) -> Option<Address> {
        self.deployments.get(unit).map(|d| d.address)
    }

    pub fn contains(&self, unit: &str) -> bool {
        self.deployments.contains_key(unit)
    }

    /// Results are immutable: a unit recorded twice keeps its first result.
    pub(crate) fn record_deployment(&mut self, result: DeploymentResult) {
        self.deployments
            .entry(result.unit.clone())
            .or_insert(result);
    }

    pub(crate) fn record_transaction(&mut self, report: TransactionReport) {
        self.transactions.push(report);
    }

    pub fn deployments(&self) -> impl Iterator<Item = &DeploymentResult> {
        self.deployments.values()
    }

    pub fn addresses(&self) -> IndexMap<String, Address> {
        self.deployments
            .iter()
            .map(|(name, result)| (name.clone(), result.address))
            .collect()
    }

    pub fn unit_names(&self) -> Vec<&str> {
        self.deployments.keys().map(|k| k.as_str()).collect()
    }

    pub fn transactions(&self) -> &[TransactionReport] {
        &self.transactions
    }

    pub fn len(&self) -> usize {
        self.deployments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deployments.is_empty()
    }
}
