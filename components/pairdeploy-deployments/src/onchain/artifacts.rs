use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::ledger::LedgerError;
use crate::types::ArtifactKind;

#[derive(Deserialize)]
struct CompiledArtifact {
    #[serde(rename = "contractName")]
    contract_name: Option<String>,
    bytecode: String,
}

/// Compiled contracts laid out the way Hardhat writes them:
/// `<root>/**/<ContractName>.json`, each holding a hex `bytecode` field.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: &Path) -> ArtifactStore {
        ArtifactStore {
            root: root.to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn locate(&self, artifact: ArtifactKind) -> Result<PathBuf, LedgerError> {
        let file_name = format!("{}.json", artifact.contract_name());
        WalkDir::new(&self.root)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .find(|entry| entry.file_type().is_file() && entry.file_name() == file_name.as_str())
            .map(|entry| entry.into_path())
            .ok_or_else(|| {
                LedgerError::Artifact(format!(
                    "{} not found under {}",
                    file_name,
                    self.root.display()
                ))
            })
    }

    pub fn bytecode(&self, artifact: ArtifactKind) -> Result<Vec<u8>, LedgerError> {
        let path = self.locate(artifact)?;
        let content = fs::read(&path).map_err(|e| {
            LedgerError::Artifact(format!("unable to read {}: {}", path.display(), e))
        })?;
        let compiled: CompiledArtifact = serde_json::from_slice(&content).map_err(|e| {
            LedgerError::Artifact(format!("unable to parse {}: {}", path.display(), e))
        })?;

        if let Some(name) = &compiled.contract_name {
            if name != artifact.contract_name() {
                return Err(LedgerError::Artifact(format!(
                    "{} describes contract {}, expected {}",
                    path.display(),
                    name,
                    artifact.contract_name()
                )));
            }
        }

        let raw = compiled
            .bytecode
            .strip_prefix("0x")
            .unwrap_or(&compiled.bytecode);
        let bytecode = hex::decode(raw).map_err(|e| {
            LedgerError::Artifact(format!("invalid bytecode in {}: {}", path.display(), e))
        })?;
        if bytecode.is_empty() {
            return Err(LedgerError::Artifact(format!(
                "{} has no bytecode, is the contract abstract?",
                artifact.contract_name()
            )));
        }
        Ok(bytecode)
    }
}
