#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::HashMap;

use pairdeploy_deployments::evm_codec::{Address, TransactionHash, Value};
use pairdeploy_deployments::ledger::{Confirmation, LedgerClient, LedgerError, PendingTransaction};
use pairdeploy_deployments::types::{ArtifactKind, ConfigurationMethod};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submitted {
    Deploy {
        artifact: ArtifactKind,
        args: Vec<Value>,
    },
    Call {
        target: Address,
        method: ConfigurationMethod,
        args: Vec<Value>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub transaction: Submitted,
    pub hash: TransactionHash,
    pub submitted_at: u64,
    pub confirmed_at: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Target {
    Deploy(ArtifactKind),
    Call(ConfigurationMethod),
}

/// In-memory ledger with a logical clock: every submission and every observed
/// confirmation moves the clock forward by one.
#[derive(Default)]
pub struct MockLedger {
    clock: Cell<u64>,
    submissions: RefCell<Vec<Submission>>,
    confirmations: HashMap<Target, Vec<Confirmation>>,
    rejections: HashMap<Target, String>,
}

impl MockLedger {
    pub fn new() -> MockLedger {
        MockLedger::default()
    }

    /// Scripts the confirmation of the next submissions matching `target`; the
    /// following ones confirm normally.
    pub fn confirm_with(mut self, target: Target, confirmation: Confirmation) -> MockLedger {
        self.confirmations
            .entry(target)
            .or_default()
            .push(confirmation);
        self
    }

    pub fn reject(mut self, target: Target, reason: &str) -> MockLedger {
        self.rejections.insert(target, reason.to_string());
        self
    }

    pub fn submissions(&self) -> Vec<Submission> {
        self.submissions.borrow().clone()
    }

    pub fn submitted(&self) -> Vec<Submitted> {
        self.submissions
            .borrow()
            .iter()
            .map(|s| s.transaction.clone())
            .collect()
    }

    pub fn count_calls(&self, method: ConfigurationMethod) -> usize {
        self.submitted()
            .iter()
            .filter(|s| matches!(s, Submitted::Call { method: m, .. } if *m == method))
            .count()
    }

    pub fn address_for(index: usize) -> Address {
        Address::left_padding_from(&(0x1000 + index as u64).to_be_bytes())
    }

    fn tick(&self) -> u64 {
        let now = self.clock.get() + 1;
        self.clock.set(now);
        now
    }

    fn record(&self, transaction: Submitted, target: Target) -> Result<PendingTransaction, LedgerError> {
        if let Some(reason) = self.rejections.get(&target) {
            return Err(LedgerError::Submission(reason.clone()));
        }
        let mut submissions = self.submissions.borrow_mut();
        let index = submissions.len();
        let hash = TransactionHash::left_padding_from(&(index as u64 + 1).to_be_bytes());
        let contract_address = match transaction {
            Submitted::Deploy { .. } => Some(MockLedger::address_for(index)),
            Submitted::Call { .. } => None,
        };
        submissions.push(Submission {
            transaction,
            hash,
            submitted_at: self.tick(),
            confirmed_at: None,
        });
        Ok(PendingTransaction {
            hash,
            contract_address,
        })
    }
}

impl LedgerClient for MockLedger {
    fn deploy(
        &self,
        artifact: ArtifactKind,
        constructor_args: &[Value],
    ) -> Result<PendingTransaction, LedgerError> {
        self.record(
            Submitted::Deploy {
                artifact,
                args: constructor_args.to_vec(),
            },
            Target::Deploy(artifact),
        )
    }

    fn call(
        &self,
        target: &Address,
        method: ConfigurationMethod,
        args: &[Value],
    ) -> Result<PendingTransaction, LedgerError> {
        self.record(
            Submitted::Call {
                target: *target,
                method,
                args: args.to_vec(),
            },
            Target::Call(method),
        )
    }

    fn wait_for_confirmation(&self, transaction: &PendingTransaction) -> Confirmation {
        let now = self.tick();
        let mut submissions = self.submissions.borrow_mut();
        let position = submissions
            .iter()
            .position(|s| s.hash == transaction.hash)
            .expect("unknown transaction");

        let target = match &submissions[position].transaction {
            Submitted::Deploy { artifact, .. } => Target::Deploy(*artifact),
            Submitted::Call { method, .. } => Target::Call(*method),
        };
        let previous = submissions[..position]
            .iter()
            .filter(|s| match (&s.transaction, target) {
                (Submitted::Deploy { artifact, .. }, Target::Deploy(a)) => *artifact == a,
                (Submitted::Call { method, .. }, Target::Call(m)) => *method == m,
                _ => false,
            })
            .count();

        submissions[position].confirmed_at = Some(now);
        self.confirmations
            .get(&target)
            .and_then(|scripted| scripted.get(previous).cloned())
            .unwrap_or(Confirmation::Confirmed { block_height: now })
    }
}
