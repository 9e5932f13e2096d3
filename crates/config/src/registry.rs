use std::{
    fs, io,
    path::{Path, PathBuf},
};

use blockchat_ops_common::files;
use blockchat_ops_types::{ChainId, Deployments};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("no deployment registry for chain {chain_id} at {}", .path.display())]
    NotFound { chain_id: ChainId, path: PathBuf },
    #[error("deployment registry at {} is not parseable", .path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Chain-keyed registry of deployed contracts: one JSON file per chain
/// id under `root`, read wholesale and replaced wholesale.
#[derive(Debug, Clone)]
pub struct DeploymentRegistry {
    root: PathBuf,
}

impl DeploymentRegistry {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path_for(&self, chain_id: ChainId) -> PathBuf {
        self.root.join(format!("{chain_id}.json"))
    }

    /// Read the full registry for a chain. Fails with `NotFound` when no
    /// file exists; first-time deploys should use `get_or_default`.
    pub fn get(&self, chain_id: ChainId) -> Result<Deployments, RegistryError> {
        let path = self.path_for(chain_id);
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(RegistryError::NotFound { chain_id, path });
            }
            Err(err) => return Err(err.into()),
        };
        serde_json::from_str(&text).map_err(|source| RegistryError::Corrupt { path, source })
    }

    /// Like `get`, but an absent file yields an empty registry.
    pub fn get_or_default(&self, chain_id: ChainId) -> Result<Deployments, RegistryError> {
        match self.get(chain_id) {
            Ok(deployments) => Ok(deployments),
            Err(RegistryError::NotFound { .. }) => Ok(Deployments::new()),
            Err(err) => Err(err),
        }
    }

    /// Replace the on-disk registry for a chain. Write-to-temp-then-rename:
    /// a crash mid-write leaves the previous complete file readable.
    pub fn set(&self, chain_id: ChainId, deployments: &Deployments) -> Result<(), RegistryError> {
        let path = self.path_for(chain_id);
        let text = serde_json::to_string_pretty(deployments)
            .expect("deployments serialize to JSON");
        files::write_atomic(&path, text.as_bytes())?;
        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}
