use pairdeploy_files::{
    DEFAULT_ADMIN, DEFAULT_ARTIFACTS_PATH, DEFAULT_DEVNET_DEPLOYER, DEFAULT_DEVNET_RPC_ADDRESS,
    DEFAULT_FEE_MULTIPLIER, PROJECT_MANIFEST_FILE_NAME, SETTINGS_DIR,
};

use super::changes::{Changes, DirectoryCreation, FileCreation};

pub struct GetChangesForNewProject {
    project_path: String,
    project_name: String,
    changes: Vec<Changes>,
}

impl GetChangesForNewProject {
    pub fn new(project_path: String, project_name: String) -> Self {
        Self {
            project_path: format!("{}/{}", project_path, project_name),
            project_name,
            changes: vec![],
        }
    }

    pub fn run(&mut self) -> Result<Vec<Changes>, String> {
        if self.project_name.is_empty() || self.project_name.contains(['/', '\\']) {
            return Err(format!("invalid project name '{}'", self.project_name));
        }
        self.create_root_directory();
        self.create_artifacts_directory();
        self.create_settings_directory();
        self.create_pairdeploy_toml();
        self.create_environment_devnet_toml();
        self.create_environment_testnet_toml();
        self.create_environment_mainnet_toml();
        self.create_gitignore();
        Ok(self.changes.clone())
    }

    fn create_root_directory(&mut self) {
        let change = DirectoryCreation {
            comment: format!("{} {}", green!("Created directory"), self.project_name),
            name: self.project_name.clone(),
            path: self.project_path.clone(),
        };
        self.changes.push(Changes::AddDirectory(change));
    }

    fn create_artifacts_directory(&mut self) {
        self.changes
            .push(self.get_changes_for_new_root_dir(DEFAULT_ARTIFACTS_PATH.into()));
    }

    fn create_settings_directory(&mut self) {
        self.changes
            .push(self.get_changes_for_new_root_dir(SETTINGS_DIR.into()));
    }

    fn create_pairdeploy_toml(&mut self) {
        let content = format!(
            r#"[project]
name = "{}"
description = ""
# Directory holding the compiled contracts (<ContractName>.json with a `bytecode` field)
artifacts_path = "{}"

[protocol]
fee_recipient = "{}"
# Protocol fee multiplier, 1e18 based. Quote it when it exceeds a 64 bits integer.
fee_multiplier = "{}"
# Receives the factory ownership once every allow-list call is confirmed
admin = "{}"
"#,
            self.project_name,
            DEFAULT_ARTIFACTS_PATH,
            DEFAULT_ADMIN,
            DEFAULT_FEE_MULTIPLIER,
            DEFAULT_ADMIN
        );
        let name = PROJECT_MANIFEST_FILE_NAME.into();
        self.changes
            .push(self.get_changes_for_new_file(name, content));
    }

    fn create_environment_devnet_toml(&mut self) {
        let content = format!(
            r#"[network]
name = "devnet"
node_rpc_address = "{}"
# Must be unlocked on the node
deployer = "{}"
confirmation_timeout = 120
polling_interval = 1
"#,
            DEFAULT_DEVNET_RPC_ADDRESS, DEFAULT_DEVNET_DEPLOYER
        );
        let name = format!("{}/Devnet.toml", SETTINGS_DIR);
        self.changes
            .push(self.get_changes_for_new_file(name, content));
    }

    fn create_environment_testnet_toml(&mut self) {
        let content = r#"[network]
name = "testnet"
node_rpc_address = "http://127.0.0.1:8545"
# deployer = "<YOUR UNLOCKED TESTNET ACCOUNT HERE>"
confirmation_timeout = 600
polling_interval = 10
# gas_limit = 8000000
"#
        .into();
        let name = format!("{}/Testnet.toml", SETTINGS_DIR);
        self.changes
            .push(self.get_changes_for_new_file(name, content));
    }

    fn create_environment_mainnet_toml(&mut self) {
        let content = r#"[network]
name = "mainnet"
node_rpc_address = "http://127.0.0.1:8545"
# deployer = "<YOUR UNLOCKED MAINNET ACCOUNT HERE>"
confirmation_timeout = 600
polling_interval = 10
# gas_limit = 8000000
"#
        .into();
        let name = format!("{}/Mainnet.toml", SETTINGS_DIR);
        self.changes
            .push(self.get_changes_for_new_file(name, content));
    }

    fn create_gitignore(&mut self) {
        let content = r#"**/settings/Mainnet.toml
**/settings/Testnet.toml
cache/
logs
*.log
node_modules
"#
        .into();
        let name = ".gitignore".into();
        self.changes
            .push(self.get_changes_for_new_file(name, content));
    }

    fn get_changes_for_new_root_dir(&self, name: String) -> Changes {
        let dir = format!("{}/{}", self.project_path, name);
        Changes::AddDirectory(DirectoryCreation {
            comment: format!("{} {}", green!("Created directory"), name),
            name,
            path: dir,
        })
    }

    fn get_changes_for_new_file(&self, name: String, content: String) -> Changes {
        let path = format!("{}/{}", self.project_path, name);
        Changes::AddFile(FileCreation {
            comment: format!("{} {}", green!("Created file"), name),
            name,
            content,
            path,
        })
    }
}
