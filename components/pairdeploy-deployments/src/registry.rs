use evm_codec::{address, Address, U256};
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;

use crate::permissions::{curve_allow_step, ownership_transfer_step, router_allow_step};
use crate::types::{
    ArtifactKind, Argument, DeployableUnit, DeploymentPlan, StepBatch, StepSpecification,
};

pub const DEFAULT_ADMIN: Address = address!("1021BB533a5c04B7F9E0cE55c9C3Cd539A7aFc95");

pub const DEFAULT_FEE_MULTIPLIER: U256 = U256::ZERO;

pub const PAIR_TEMPLATES: [ArtifactKind; 4] = [
    ArtifactKind::PairEnumerableETH,
    ArtifactKind::PairMissingEnumerableETH,
    ArtifactKind::PairEnumerableERC20,
    ArtifactKind::PairMissingEnumerableERC20,
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RunParameters {
    pub fee_recipient: Address,
    pub fee_multiplier: U256,
    pub admin: Address,
}

impl Default for RunParameters {
    fn default() -> Self {
        RunParameters {
            fee_recipient: DEFAULT_ADMIN,
            fee_multiplier: DEFAULT_FEE_MULTIPLIER,
            admin: DEFAULT_ADMIN,
        }
    }
}

pub fn bonding_curves() -> Vec<ArtifactKind> {
    ArtifactKind::iter().filter(|a| a.is_bonding_curve()).collect()
}

/// The full protocol bring-up, in execution order. Purely declarative: every address
/// produced by an earlier step is referenced by unit name.
pub fn protocol_deployment_plan(parameters: &RunParameters) -> DeploymentPlan {
    let mut batches: Vec<(String, Vec<StepSpecification>)> = vec![];

    for template in PAIR_TEMPLATES.iter() {
        batches.push((
            template.to_string(),
            vec![StepSpecification::Deploy(DeployableUnit::new(*template, vec![]))],
        ));
    }

    let mut factory_args: Vec<Argument> = PAIR_TEMPLATES
        .iter()
        .map(|t| Argument::address_of(t.to_string()))
        .collect();
    factory_args.push(Argument::address(parameters.fee_recipient));
    factory_args.push(Argument::uint(parameters.fee_multiplier));
    batches.push((
        ArtifactKind::PairFactory.to_string(),
        vec![StepSpecification::Deploy(DeployableUnit::new(
            ArtifactKind::PairFactory,
            factory_args,
        ))],
    ));

    batches.push((
        ArtifactKind::Router.to_string(),
        vec![StepSpecification::Deploy(DeployableUnit::new(
            ArtifactKind::Router,
            vec![Argument::address_of(ArtifactKind::PairFactory.to_string())],
        ))],
    ));

    batches.push((
        "RouterAllowList".to_string(),
        vec![StepSpecification::Configure(router_allow_step())],
    ));

    let curves = bonding_curves();
    batches.push((
        "BondingCurves".to_string(),
        curves
            .iter()
            .map(|c| StepSpecification::Deploy(DeployableUnit::new(*c, vec![])))
            .collect(),
    ));

    batches.push((
        "BondingCurveAllowList".to_string(),
        curves
            .iter()
            .map(|c| StepSpecification::Configure(curve_allow_step(&c.to_string())))
            .collect(),
    ));

    batches.push((
        "OwnershipTransfer".to_string(),
        vec![StepSpecification::Configure(ownership_transfer_step(
            parameters.admin,
        ))],
    ));

    DeploymentPlan {
        name: "protocol".to_string(),
        batches: batches
            .into_iter()
            .enumerate()
            .map(|(i, (name, steps))| StepBatch {
                id: i + 1,
                name,
                steps,
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn default_admin_matches_source_address() {
        assert_eq!(
            DEFAULT_ADMIN,
            Address::from_str("0x1021BB533a5c04B7F9E0cE55c9C3Cd539A7aFc95").unwrap()
        );
        assert_eq!(
            DEFAULT_ADMIN.to_string(),
            "0x1021BB533a5c04B7F9E0cE55c9C3Cd539A7aFc95"
        );
    }

    #[test]
    fn curves_are_listed_in_declaration_order() {
        assert_eq!(
            bonding_curves(),
            vec![
                ArtifactKind::ExponentialCurve,
                ArtifactKind::LinearCurve,
                ArtifactKind::QuadraticCurve
            ]
        );
    }
}
