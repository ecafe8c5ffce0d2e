extern crate serde;

#[macro_use]
extern crate serde_derive;

pub extern crate url;

mod network_manifest;
mod project_manifest;

pub use network_manifest::{
    Network, NetworkConfig, NetworkConfigFile, NetworkManifest, NetworkManifestFile,
    DEFAULT_DEVNET_DEPLOYER, DEFAULT_DEVNET_RPC_ADDRESS,
};
pub use project_manifest::{
    ProjectConfig, ProjectConfigFile, ProjectManifest, ProjectManifestFile, ProtocolConfig,
    ProtocolConfigFile, QuantityFile, DEFAULT_ADMIN, DEFAULT_ARTIFACTS_PATH, DEFAULT_FEE_MULTIPLIER,
};

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

pub const PROJECT_MANIFEST_FILE_NAME: &str = "Pairdeploy.toml";
pub const SETTINGS_DIR: &str = "settings";

/// Resolves the project manifest: an explicit path is taken as is, otherwise the
/// current directory and its parents are searched.
pub fn get_manifest_location(path: Option<String>) -> Option<PathBuf> {
    if let Some(path) = path {
        let manifest_path = PathBuf::from(path);
        if !manifest_path.exists() {
            return None;
        }
        return Some(manifest_path);
    }

    let mut current_dir = std::env::current_dir().ok()?;
    loop {
        current_dir.push(PROJECT_MANIFEST_FILE_NAME);
        if current_dir.exists() {
            return Some(current_dir);
        }
        current_dir.pop();
        if !current_dir.pop() {
            return None;
        }
    }
}

pub fn get_project_root(manifest_location: &Path) -> Result<PathBuf, String> {
    manifest_location
        .parent()
        .map(|p| p.to_path_buf())
        .ok_or(format!(
            "unable to get parent directory of {}",
            manifest_location.display()
        ))
}

pub fn read_content(path: &Path) -> Result<Vec<u8>, String> {
    fs::read(path).map_err(|e| format!("unable to read file {}\n{:?}", path.display(), e))
}

pub fn write_content(path: &Path, content: &[u8]) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| format!("unable to create parent directory\n{}", e))?;
    }
    let mut file = File::create(path)
        .map_err(|e| format!("unable to open file {}\n{}", path.display(), e))?;
    file.write_all(content)
        .map_err(|e| format!("unable to write file {}\n{}", path.display(), e))?;
    Ok(())
}
