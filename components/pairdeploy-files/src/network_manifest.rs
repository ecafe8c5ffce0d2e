use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use evm_codec::Address;
use url::Url;

use crate::{get_project_root, read_content, SETTINGS_DIR};

pub const DEFAULT_DEVNET_RPC_ADDRESS: &str = "http://127.0.0.1:8545";
// First account of the default hardhat/anvil mnemonic.
pub const DEFAULT_DEVNET_DEPLOYER: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Network {
    Devnet,
    Testnet,
    Mainnet,
}

impl Network {
    pub fn settings_file_name(&self) -> &'static str {
        match self {
            Network::Devnet => "Devnet.toml",
            Network::Testnet => "Testnet.toml",
            Network::Mainnet => "Mainnet.toml",
        }
    }

    pub fn default_polling_interval(&self) -> u64 {
        match self {
            Network::Devnet => 1,
            _ => 10,
        }
    }

    pub fn default_confirmation_timeout(&self) -> u64 {
        match self {
            Network::Devnet => 120,
            _ => 600,
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Network::Devnet => write!(f, "devnet"),
            Network::Testnet => write!(f, "testnet"),
            Network::Mainnet => write!(f, "mainnet"),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct NetworkManifestFile {
    pub network: NetworkConfigFile,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct NetworkConfigFile {
    pub name: String,
    pub node_rpc_address: Option<String>,
    pub deployer: Option<String>,
    pub confirmation_timeout: Option<u64>,
    pub polling_interval: Option<u64>,
    pub gas_limit: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkConfig {
    pub name: String,
    pub node_rpc_address: Url,
    pub deployer: Address,
    pub confirmation_timeout: Duration,
    pub polling_interval: Duration,
    pub gas_limit: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkManifest {
    pub network: NetworkConfig,
    pub kind: Network,
}

impl NetworkManifest {
    pub fn from_project_manifest_location(
        project_manifest_location: &Path,
        network: Network,
    ) -> Result<NetworkManifest, String> {
        let location = get_project_root(project_manifest_location)?
            .join(SETTINGS_DIR)
            .join(network.settings_file_name());
        NetworkManifest::from_path(&location, network)
    }

    pub fn from_path(location: &Path, network: Network) -> Result<NetworkManifest, String> {
        let content = read_content(location)?;
        let network_manifest_file: NetworkManifestFile = toml::from_slice(&content[..])
            .map_err(|e| {
                format!(
                    "{} file malformatted {:?}",
                    network.settings_file_name(),
                    e
                )
            })?;
        NetworkManifest::from_network_manifest_file(&network_manifest_file, network)
    }

    pub fn from_network_manifest_file(
        network_manifest_file: &NetworkManifestFile,
        network: Network,
    ) -> Result<NetworkManifest, String> {
        let settings = &network_manifest_file.network;

        let node_rpc_address = match (&settings.node_rpc_address, network) {
            (Some(address), _) => address.clone(),
            (None, Network::Devnet) => DEFAULT_DEVNET_RPC_ADDRESS.to_string(),
            (None, _) => {
                return Err(format!(
                    "node_rpc_address missing (located in ./settings/{})",
                    network.settings_file_name()
                ))
            }
        };
        let node_rpc_address = Url::parse(&node_rpc_address)
            .map_err(|e| format!("unable to parse {} as a url\n{:?}", node_rpc_address, e))?;

        let deployer = match (&settings.deployer, network) {
            (Some(deployer), _) => deployer.clone(),
            (None, Network::Devnet) => DEFAULT_DEVNET_DEPLOYER.to_string(),
            (None, _) => {
                return Err(format!(
                    "deployer missing (located in ./settings/{})",
                    network.settings_file_name()
                ))
            }
        };
        let deployer = Address::from_str(&deployer).map_err(|e| {
            format!(
                "deployer (located in ./settings/{}) is invalid: {}",
                network.settings_file_name(),
                e
            )
        })?;

        let polling_interval = settings
            .polling_interval
            .unwrap_or(network.default_polling_interval());
        if polling_interval == 0 {
            return Err("polling_interval must be at least 1 second".into());
        }

        Ok(NetworkManifest {
            network: NetworkConfig {
                name: settings.name.clone(),
                node_rpc_address,
                deployer,
                confirmation_timeout: Duration::from_secs(
                    settings
                        .confirmation_timeout
                        .unwrap_or(network.default_confirmation_timeout()),
                ),
                polling_interval: Duration::from_secs(polling_interval),
                gas_limit: settings.gas_limit,
            },
            kind: network,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(content: &str, network: Network) -> Result<NetworkManifest, String> {
        let file: NetworkManifestFile = toml::from_str(content).map_err(|e| e.to_string())?;
        NetworkManifest::from_network_manifest_file(&file, network)
    }

    #[test]
    fn devnet_settings_fall_back_to_local_node() {
        let manifest = parse("[network]\nname = \"devnet\"\n", Network::Devnet).unwrap();
        assert_eq!(
            manifest.network.node_rpc_address.as_str(),
            "http://127.0.0.1:8545/"
        );
        assert_eq!(manifest.network.deployer.to_string(), DEFAULT_DEVNET_DEPLOYER);
        assert_eq!(manifest.network.polling_interval, Duration::from_secs(1));
        assert_eq!(manifest.network.confirmation_timeout, Duration::from_secs(120));
        assert_eq!(manifest.network.gas_limit, None);
    }

    #[test]
    fn testnet_requires_node_and_deployer() {
        let err = parse("[network]\nname = \"testnet\"\n", Network::Testnet).unwrap_err();
        assert!(err.starts_with("node_rpc_address missing"));

        let err = parse(
            "[network]\nname = \"testnet\"\nnode_rpc_address = \"https://rpc.sepolia.org\"\n",
            Network::Testnet,
        )
        .unwrap_err();
        assert!(err.starts_with("deployer missing"));
    }

    #[test]
    fn explicit_settings_are_kept() {
        let manifest = parse(
            r#"
[network]
name = "mainnet"
node_rpc_address = "https://eth.example.org"
deployer = "0x1021BB533a5c04B7F9E0cE55c9C3Cd539A7aFc95"
confirmation_timeout = 900
polling_interval = 15
gas_limit = 8000000
"#,
            Network::Mainnet,
        )
        .unwrap();
        assert_eq!(manifest.kind, Network::Mainnet);
        assert_eq!(manifest.network.polling_interval, Duration::from_secs(15));
        assert_eq!(manifest.network.confirmation_timeout, Duration::from_secs(900));
        assert_eq!(manifest.network.gas_limit, Some(8_000_000));
    }

    #[test]
    fn zero_polling_interval_is_rejected() {
        assert!(parse(
            "[network]\nname = \"devnet\"\npolling_interval = 0\n",
            Network::Devnet
        )
        .is_err());
    }
}
