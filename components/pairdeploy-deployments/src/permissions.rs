use evm_codec::{Address, TransactionHash, Value};

use crate::errors::DeploymentError;
use crate::executor::{ResolvedStep, StepExecutor, StepOutput};
use crate::ledger::LedgerClient;
use crate::types::{ArtifactKind, Argument, ConfigurationMethod, ConfigurationStep};
use deploy_system_kit::log::Context;
use deploy_system_kit::slog;

fn factory() -> Argument {
    Argument::address_of(ArtifactKind::PairFactory.to_string())
}

/// `setRouterAllowed(router, true)` on the factory.
pub fn router_allow_step() -> ConfigurationStep {
    ConfigurationStep {
        target: factory(),
        method: ConfigurationMethod::SetRouterAllowed,
        args: vec![
            Argument::address_of(ArtifactKind::Router.to_string()),
            Argument::bool(true),
        ],
        requires_confirmation: true,
    }
}

/// `setBondingCurveAllowed(curve, true)` on the factory.
pub fn curve_allow_step(curve: &str) -> ConfigurationStep {
    ConfigurationStep {
        target: factory(),
        method: ConfigurationMethod::SetBondingCurveAllowed,
        args: vec![Argument::address_of(curve), Argument::bool(true)],
        requires_confirmation: true,
    }
}

/// Hands the factory over to `admin`. Must be the last step of any plan.
pub fn ownership_transfer_step(admin: Address) -> ConfigurationStep {
    ConfigurationStep {
        target: factory(),
        method: ConfigurationMethod::TransferOwnership,
        args: vec![Argument::address(admin)],
        requires_confirmation: true,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalizedPermissions {
    pub router_allowed: TransactionHash,
    pub curves_allowed: Vec<(Address, TransactionHash)>,
    pub ownership_transferred: TransactionHash,
}

/// Runs the allow-list and ownership transfer calls against already deployed
/// contracts. This is how a run interrupted after the deployments is completed by hand.
pub struct PermissionConfigurator<'a, L: LedgerClient + ?Sized> {
    executor: StepExecutor<'a, L>,
    ctx: Context,
}

impl<'a, L: LedgerClient + ?Sized> PermissionConfigurator<'a, L> {
    pub fn new(ledger: &'a L, ctx: &Context) -> PermissionConfigurator<'a, L> {
        PermissionConfigurator {
            executor: StepExecutor::new(ledger, ctx),
            ctx: ctx.clone(),
        }
    }

    pub fn finalize(
        &self,
        factory: Address,
        router: Address,
        curves: &[Address],
        admin: Address,
    ) -> Result<FinalizedPermissions, DeploymentError> {
        let router_allowed = self.submit(
            factory,
            ConfigurationMethod::SetRouterAllowed,
            vec![Value::Address(router), Value::Bool(true)],
        )?;

        let mut curves_allowed = vec![];
        for curve in curves.iter() {
            let hash = self.submit(
                factory,
                ConfigurationMethod::SetBondingCurveAllowed,
                vec![Value::Address(*curve), Value::Bool(true)],
            )?;
            curves_allowed.push((*curve, hash));
        }

        let ownership_transferred = self.submit(
            factory,
            ConfigurationMethod::TransferOwnership,
            vec![Value::Address(admin)],
        )?;

        self.ctx.try_log(|logger| {
            slog::info!(
                logger,
                "factory {} finalized, owned by {}",
                factory,
                admin
            )
        });

        Ok(FinalizedPermissions {
            router_allowed,
            curves_allowed,
            ownership_transferred,
        })
    }

    fn submit(
        &self,
        target: Address,
        method: ConfigurationMethod,
        args: Vec<Value>,
    ) -> Result<TransactionHash, DeploymentError> {
        let name = format!(
            "{}.{}({})",
            target,
            method,
            args.iter()
                .map(|a| a.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        );
        let step = ResolvedStep::Call {
            name,
            target,
            method,
            args,
        };
        match self.executor.execute(&step)? {
            StepOutput::Configured(hash) => Ok(hash),
            StepOutput::Deployed(result) => unreachable!(
                "configuration call {} produced deployment output for {}",
                result.transaction_hash, result.unit
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::StepSpecification;

    #[test]
    fn allow_list_steps_target_the_factory() {
        for step in [router_allow_step(), curve_allow_step("LinearCurve")] {
            assert_eq!(step.target, Argument::address_of("PairFactory"));
            assert!(step.method.is_allow_list());
            assert_eq!(step.args[1], Argument::bool(true));
            assert!(step.requires_confirmation);
        }
    }

    #[test]
    fn ownership_transfer_names_admin_as_sole_argument() {
        let admin = Address::with_last_byte(0xad);
        let step = ownership_transfer_step(admin);
        assert_eq!(step.args, vec![Argument::address(admin)]);
        assert!(StepSpecification::Configure(step).is_ownership_transfer());
    }
}
