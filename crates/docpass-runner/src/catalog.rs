//! Package discovery and filesystem probes.

use std::path::{Path, PathBuf};

use docpass_core::{InventoryProbe, PackageId};

use crate::config::RunnerConfig;
use crate::error::{RunnerError, RunnerResult};

/// The packages available under the documentation root, in name order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageCatalog {
    packages: Vec<PackageId>,
}

impl PackageCatalog {
    /// Every subdirectory of `docs_root` containing the marker file is a package.
    pub fn discover(config: &RunnerConfig) -> RunnerResult<Self> {
        let root = &config.docs_root;
        if !root.is_dir() {
            return Err(RunnerError::DocsRootMissing(root.clone()));
        }

        let entries = std::fs::read_dir(root).map_err(|e| RunnerError::io(root, e))?;
        let mut packages = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| RunnerError::io(root, e))?;
            let path = entry.path();
            if !path.is_dir() || !path.join(&config.marker_file).is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                packages.push(PackageId::new(name));
            }
        }
        packages.sort();

        tracing::debug!(
            docs_root = %root.display(),
            count = packages.len(),
            "discovered documentation packages"
        );
        Ok(Self { packages })
    }

    pub fn packages(&self) -> &[PackageId] {
        &self.packages
    }

    pub fn contains(&self, package: &PackageId) -> bool {
        self.packages.binary_search(package).is_ok()
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }
}

/// Reports a package's inventory as missing when its inventory file is absent.
#[derive(Debug, Clone)]
pub struct FsInventoryProbe {
    inventory_dir: PathBuf,
    inventory_file: String,
}

impl FsInventoryProbe {
    pub fn new(config: &RunnerConfig) -> Self {
        Self {
            inventory_dir: config.inventory_dir.clone(),
            inventory_file: config.inventory_file.clone(),
        }
    }

    pub fn inventory_path(&self, package: &PackageId) -> PathBuf {
        self.inventory_dir
            .join(package.as_str())
            .join(&self.inventory_file)
    }
}

impl InventoryProbe for FsInventoryProbe {
    fn missing_inventory(&self, package: &PackageId) -> bool {
        !self.inventory_path(package).is_file()
    }
}

/// Fail when a package's generated `_api` directory exists but is empty.
///
/// An empty directory is left behind by an interrupted API generation step;
/// building over it produces dangling toctree references that no retry can fix.
pub fn check_generated_outputs(config: &RunnerConfig, packages: &[PackageId]) -> RunnerResult<()> {
    let Some(generated) = config.generated_api_dir.as_deref() else {
        return Ok(());
    };
    for package in packages {
        let api_dir = generated.join(package.as_str()).join("_api");
        if is_empty_dir(&api_dir)? {
            return Err(RunnerError::StaleGeneratedOutput {
                package: package.to_string(),
                path: api_dir,
            });
        }
    }
    Ok(())
}

fn is_empty_dir(path: &Path) -> RunnerResult<bool> {
    if !path.is_dir() {
        return Ok(false);
    }
    let mut entries = std::fs::read_dir(path).map_err(|e| RunnerError::io(path, e))?;
    Ok(entries.next().is_none())
}
