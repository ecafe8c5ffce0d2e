use pairdeploy_deployments::permissions::{curve_allow_step, ownership_transfer_step};
use pairdeploy_deployments::registry::{protocol_deployment_plan, RunParameters, DEFAULT_ADMIN};
use pairdeploy_deployments::types::{
    ArtifactKind, Argument, ConfigurationMethod, ConfigurationStep, DeployableUnit,
    DeploymentPlan, StepBatch, StepSpecification,
};
use pairdeploy_deployments::evm_codec::U256;
use pairdeploy_deployments::PlanError;
use pretty_assertions::assert_eq;

fn batch(id: usize, steps: Vec<StepSpecification>) -> StepBatch {
    StepBatch {
        id,
        name: format!("entry-{}", id),
        steps,
    }
}

fn deploy(artifact: ArtifactKind, args: Vec<Argument>) -> StepSpecification {
    StepSpecification::Deploy(DeployableUnit::new(artifact, args))
}

#[test]
fn protocol_plan_lists_ten_entries_in_order() {
    let plan = protocol_deployment_plan(&RunParameters::default());
    let names: Vec<Vec<String>> = plan
        .batches
        .iter()
        .map(|b| b.steps.iter().map(|s| s.name()).collect())
        .collect();

    assert_eq!(plan.batches.len(), 10);
    assert_eq!(plan.transactions_count(), 14);
    assert_eq!(
        plan.batches.iter().map(|b| b.id).collect::<Vec<_>>(),
        (1..=10).collect::<Vec<_>>()
    );
    assert_eq!(names[0], vec!["PairEnumerableETH"]);
    assert_eq!(names[3], vec!["PairMissingEnumerableERC20"]);
    assert_eq!(names[4], vec!["PairFactory"]);
    assert_eq!(names[5], vec!["Router"]);
    assert_eq!(names[6], vec!["PairFactory.setRouterAllowed(Router, true)"]);
    assert_eq!(
        names[7],
        vec!["ExponentialCurve", "LinearCurve", "QuadraticCurve"]
    );
    assert_eq!(
        names[8],
        vec![
            "PairFactory.setBondingCurveAllowed(ExponentialCurve, true)",
            "PairFactory.setBondingCurveAllowed(LinearCurve, true)",
            "PairFactory.setBondingCurveAllowed(QuadraticCurve, true)",
        ]
    );
    assert_eq!(
        names[9],
        vec![format!("PairFactory.transferOwnership({})", DEFAULT_ADMIN)]
    );
    assert!(plan.validate().is_ok());
}

#[test]
fn only_curve_deployments_run_concurrently() {
    let plan = protocol_deployment_plan(&RunParameters::default());
    let concurrent: Vec<usize> = plan
        .batches
        .iter()
        .filter(|b| b.is_concurrent())
        .map(|b| b.id)
        .collect();
    assert_eq!(concurrent, vec![8]);
}

#[test]
fn factory_takes_templates_then_fee_parameters() {
    let parameters = RunParameters {
        fee_multiplier: U256::from(42),
        ..RunParameters::default()
    };
    let plan = protocol_deployment_plan(&parameters);
    let factory = plan
        .units()
        .find(|u| u.artifact == ArtifactKind::PairFactory)
        .unwrap();
    assert_eq!(
        factory.constructor_args,
        vec![
            Argument::address_of("PairEnumerableETH"),
            Argument::address_of("PairMissingEnumerableETH"),
            Argument::address_of("PairEnumerableERC20"),
            Argument::address_of("PairMissingEnumerableERC20"),
            Argument::address(DEFAULT_ADMIN),
            Argument::uint(U256::from(42)),
        ]
    );
}

#[test]
fn every_configuration_step_waits_for_confirmation() {
    let plan = protocol_deployment_plan(&RunParameters::default());
    for step in plan.batches.iter().flat_map(|b| b.steps.iter()) {
        if let StepSpecification::Configure(config) = step {
            assert!(config.requires_confirmation);
            assert_eq!(config.target, Argument::address_of("PairFactory"));
        }
    }
}

#[test]
fn rejects_forward_references() {
    let plan = DeploymentPlan {
        name: "test".into(),
        batches: vec![
            batch(
                1,
                vec![deploy(
                    ArtifactKind::Router,
                    vec![Argument::address_of("PairFactory")],
                )],
            ),
            batch(2, vec![deploy(ArtifactKind::PairFactory, vec![])]),
        ],
    };
    assert_eq!(
        plan.validate(),
        Err(PlanError::ForwardReference {
            step: "Router".into(),
            reference: "PairFactory".into(),
        })
    );
}

#[test]
fn rejects_references_inside_a_concurrent_batch() {
    let plan = DeploymentPlan {
        name: "test".into(),
        batches: vec![batch(
            1,
            vec![
                deploy(ArtifactKind::PairFactory, vec![]),
                deploy(
                    ArtifactKind::Router,
                    vec![Argument::address_of("PairFactory")],
                ),
            ],
        )],
    };
    assert!(matches!(
        plan.validate(),
        Err(PlanError::ForwardReference { .. })
    ));
}

#[test]
fn rejects_duplicate_units_and_empty_batches() {
    let duplicated = DeploymentPlan {
        name: "test".into(),
        batches: vec![
            batch(1, vec![deploy(ArtifactKind::LinearCurve, vec![])]),
            batch(2, vec![deploy(ArtifactKind::LinearCurve, vec![])]),
        ],
    };
    assert_eq!(
        duplicated.validate(),
        Err(PlanError::DuplicateUnit {
            unit: "LinearCurve".into()
        })
    );

    let empty = DeploymentPlan {
        name: "test".into(),
        batches: vec![batch(1, vec![])],
    };
    assert_eq!(empty.validate(), Err(PlanError::EmptyBatch { batch: 1 }));
}

#[test]
fn violations_are_located_by_batch_position() {
    let plan = DeploymentPlan {
        name: "test".into(),
        batches: vec![
            batch(1, vec![deploy(ArtifactKind::PairFactory, vec![])]),
            batch(
                2,
                vec![deploy(ArtifactKind::Router, vec![Argument::address_of("Ghost")])],
            ),
        ],
    };
    let (index, error) = plan.locate_violation().unwrap_err();
    assert_eq!(index, 1);
    assert_eq!(error.step(), Some("Router"));

    let duplicated = DeploymentPlan {
        name: "test".into(),
        batches: vec![
            batch(1, vec![deploy(ArtifactKind::LinearCurve, vec![])]),
            batch(2, vec![deploy(ArtifactKind::LinearCurve, vec![])]),
        ],
    };
    assert_eq!(
        duplicated.locate_violation().map_err(|(index, _)| index),
        Err(1)
    );
    assert!(protocol_deployment_plan(&RunParameters::default())
        .locate_violation()
        .is_ok());
}

#[test]
fn rejects_steps_after_ownership_transfer() {
    let plan = DeploymentPlan {
        name: "test".into(),
        batches: vec![
            batch(1, vec![deploy(ArtifactKind::PairFactory, vec![])]),
            batch(2, vec![deploy(ArtifactKind::LinearCurve, vec![])]),
            batch(
                3,
                vec![StepSpecification::Configure(ownership_transfer_step(
                    DEFAULT_ADMIN,
                ))],
            ),
            batch(
                4,
                vec![StepSpecification::Configure(curve_allow_step("LinearCurve"))],
            ),
        ],
    };
    assert!(matches!(
        plan.validate(),
        Err(PlanError::StepAfterOwnershipTransfer { .. })
    ));
}

#[test]
fn rejects_literal_targets_and_unconfirmed_steps() {
    let literal = DeploymentPlan {
        name: "test".into(),
        batches: vec![batch(
            1,
            vec![StepSpecification::Configure(ConfigurationStep {
                target: Argument::address(DEFAULT_ADMIN),
                method: ConfigurationMethod::TransferOwnership,
                args: vec![Argument::address(DEFAULT_ADMIN)],
                requires_confirmation: true,
            })],
        )],
    };
    assert!(matches!(
        literal.validate(),
        Err(PlanError::LiteralTarget { .. })
    ));

    let mut step = ownership_transfer_step(DEFAULT_ADMIN);
    step.requires_confirmation = false;
    let unconfirmed = DeploymentPlan {
        name: "test".into(),
        batches: vec![
            batch(1, vec![deploy(ArtifactKind::PairFactory, vec![])]),
            batch(2, vec![StepSpecification::Configure(step)]),
        ],
    };
    assert!(matches!(
        unconfirmed.validate(),
        Err(PlanError::UnconfirmedStep { .. })
    ));
}

#[test]
fn plan_renders_as_yaml() {
    let plan = protocol_deployment_plan(&RunParameters::default());
    let content = String::from_utf8(plan.to_file_content().unwrap()).unwrap();
    assert!(content.contains("name: protocol"));
    assert!(content.contains("PairFactory"));
    assert!(content.contains("setBondingCurveAllowed"));
}
