pub mod types;

use std::path::PathBuf;

use evm_rpc_client::EvmRpc;
use pairdeploy_deployments::onchain::{ArtifactStore, EvmLedger, EvmLedgerSettings};
use pairdeploy_deployments::registry::{protocol_deployment_plan, RunParameters};
use pairdeploy_deployments::types::{ArtifactKind, DeploymentPlan};
use pairdeploy_files::{NetworkManifest, ProjectManifest};
use deploy_system_kit::log::Context;

pub fn get_run_parameters(manifest: &ProjectManifest) -> RunParameters {
    RunParameters {
        fee_recipient: manifest.protocol.fee_recipient,
        fee_multiplier: manifest.protocol.fee_multiplier,
        admin: manifest.protocol.admin,
    }
}

/// Builds the protocol plan for this project and rejects it if it is not executable.
pub fn get_deployment_plan(manifest: &ProjectManifest) -> Result<DeploymentPlan, String> {
    let mut plan = protocol_deployment_plan(&get_run_parameters(manifest));
    plan.name = manifest.project.name.clone();
    plan.validate()
        .map_err(|e| format!("deployment plan invalid: {}", e))?;
    Ok(plan)
}

pub fn get_plan_artifacts(plan: &DeploymentPlan) -> Vec<ArtifactKind> {
    plan.units().map(|unit| unit.artifact).collect()
}

pub fn locate_artifacts(
    manifest: &ProjectManifest,
    plan: &DeploymentPlan,
) -> Vec<(ArtifactKind, Result<PathBuf, String>)> {
    let store = ArtifactStore::new(&manifest.project.artifacts_location);
    get_plan_artifacts(plan)
        .into_iter()
        .map(|artifact| {
            let location = store.locate(artifact).map_err(|e| e.to_string());
            (artifact, location)
        })
        .collect()
}

pub fn get_ledger(
    manifest: &ProjectManifest,
    network_manifest: &NetworkManifest,
    ctx: &Context,
) -> Result<EvmLedger, String> {
    let rpc = EvmRpc::new(network_manifest.network.node_rpc_address.as_str())
        .map_err(|e| format!("unable to create rpc client: {}", e))?;
    let settings = EvmLedgerSettings {
        deployer: network_manifest.network.deployer,
        confirmation_timeout: network_manifest.network.confirmation_timeout,
        polling_interval: network_manifest.network.polling_interval,
        gas_limit: network_manifest.network.gas_limit,
    };
    Ok(EvmLedger::new(
        rpc,
        ArtifactStore::new(&manifest.project.artifacts_location),
        settings,
        ctx,
    ))
}
