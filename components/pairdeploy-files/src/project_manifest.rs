use std::path::{Path, PathBuf};
use std::str::FromStr;

use evm_codec::{Address, U256};

use crate::{get_project_root, read_content};

pub const DEFAULT_ADMIN: &str = "0x1021BB533a5c04B7F9E0cE55c9C3Cd539A7aFc95";
pub const DEFAULT_FEE_MULTIPLIER: U256 = U256::ZERO;
pub const DEFAULT_ARTIFACTS_PATH: &str = "artifacts";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ProjectManifestFile {
    pub project: ProjectConfigFile,
    pub protocol: Option<ProtocolConfigFile>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ProjectConfigFile {
    pub name: String,
    pub description: Option<String>,
    pub artifacts_path: Option<String>,
}

/// Large multipliers (1e18 based) do not fit a TOML integer, so decimal or `0x` prefixed
/// strings spanning the whole uint256 range are accepted as well.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum QuantityFile {
    Integer(u64),
    Text(String),
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ProtocolConfigFile {
    pub fee_recipient: Option<String>,
    pub fee_multiplier: Option<QuantityFile>,
    pub admin: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectConfig {
    pub name: String,
    pub description: String,
    pub artifacts_location: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolConfig {
    pub fee_recipient: Address,
    pub fee_multiplier: U256,
    pub admin: Address,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectManifest {
    pub project: ProjectConfig,
    pub protocol: ProtocolConfig,
    pub location: PathBuf,
}

fn parse_address(field: &str, value: Option<&String>) -> Result<Address, String> {
    let value = value.map(|v| v.as_str()).unwrap_or(DEFAULT_ADMIN);
    Address::from_str(value)
        .map_err(|e| format!("protocol.{} is not a valid address: {}", field, e))
}

impl ProjectManifest {
    pub fn from_path(location: &Path) -> Result<ProjectManifest, String> {
        let content = read_content(location)?;
        let project_manifest_file: ProjectManifestFile = match toml::from_slice(&content[..]) {
            Ok(s) => s,
            Err(e) => {
                return Err(format!("Pairdeploy.toml file malformatted {:?}", e));
            }
        };
        ProjectManifest::from_project_manifest_file(project_manifest_file, location)
    }

    pub fn from_project_manifest_file(
        project_manifest_file: ProjectManifestFile,
        manifest_location: &Path,
    ) -> Result<ProjectManifest, String> {
        let project_root = get_project_root(manifest_location)?;
        let artifacts_path = project_manifest_file
            .project
            .artifacts_path
            .unwrap_or(DEFAULT_ARTIFACTS_PATH.to_string());
        let artifacts_location = {
            let path = PathBuf::from(&artifacts_path);
            if path.is_relative() {
                project_root.join(path)
            } else {
                path
            }
        };

        let project = ProjectConfig {
            name: project_manifest_file.project.name,
            description: project_manifest_file
                .project
                .description
                .unwrap_or_default(),
            artifacts_location,
        };

        let protocol_file = project_manifest_file.protocol.unwrap_or(ProtocolConfigFile {
            fee_recipient: None,
            fee_multiplier: None,
            admin: None,
        });
        let fee_multiplier = match protocol_file.fee_multiplier {
            None => DEFAULT_FEE_MULTIPLIER,
            Some(QuantityFile::Integer(value)) => U256::from(value),
            Some(QuantityFile::Text(value)) => U256::from_str(value.trim()).map_err(|e| {
                format!("protocol.fee_multiplier '{}' is not an integer: {}", value, e)
            })?,
        };
        let protocol = ProtocolConfig {
            fee_recipient: parse_address("fee_recipient", protocol_file.fee_recipient.as_ref())?,
            fee_multiplier,
            admin: parse_address("admin", protocol_file.admin.as_ref())?,
        };

        Ok(ProjectManifest {
            project,
            protocol,
            location: manifest_location.to_path_buf(),
        })
    }

    pub fn root_dir(&self) -> Result<PathBuf, String> {
        get_project_root(&self.location)
    }
}
