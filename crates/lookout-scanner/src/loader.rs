//! Platform definition loading from TOML files.

use crate::definition::PlatformDefinition;
use crate::error::{Result, ScanError};
use lookout_core::Platform;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Directory name searched for at the workspace root.
pub const DEFAULT_DIR_NAME: &str = "platform-definitions";

/// Loader for platform definitions from TOML files.
#[derive(Debug, Clone)]
pub struct PlatformLoader {
    definitions_dir: PathBuf,
}

impl PlatformLoader {
    /// Create a new loader with the given definitions directory.
    pub fn new(definitions_dir: impl Into<PathBuf>) -> Result<Self> {
        let definitions_dir = definitions_dir.into();

        if !definitions_dir.is_dir() {
            return Err(ScanError::DirectoryNotFound {
                path: definitions_dir.display().to_string(),
            });
        }

        Ok(Self { definitions_dir })
    }

    /// Create a loader using the default definitions directory.
    ///
    /// Walks up from the current directory looking for a workspace root
    /// that contains `platform-definitions/`, then falls back to a relative path.
    pub fn with_default_dir() -> Result<Self> {
        let mut current_dir = std::env::current_dir()?;

        loop {
            let candidate = current_dir.join(DEFAULT_DIR_NAME);
            let cargo_toml = current_dir.join("Cargo.toml");
            if candidate.is_dir() && cargo_toml.exists() {
                let is_workspace = std::fs::read_to_string(&cargo_toml)
                    .map(|contents| contents.contains("[workspace]"))
                    .unwrap_or(false);
                if is_workspace {
                    return Self::new(candidate);
                }
            }

            match current_dir.parent() {
                Some(parent) => current_dir = parent.to_path_buf(),
                None => break,
            }
        }

        Self::new(DEFAULT_DIR_NAME)
    }

    /// Directory this loader reads from.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.definitions_dir
    }

    /// Load a single platform definition.
    pub fn load(&self, platform: Platform) -> Result<PlatformDefinition> {
        let filename = format!("{}.toml", platform.as_str());
        let path = Self::find_file(&self.definitions_dir, &filename)?.ok_or_else(|| {
            ScanError::DefinitionNotFound {
                platform: platform.to_string(),
            }
        })?;

        let definition = Self::load_from_path(&path)?;
        definition.validate(&path.display().to_string())?;

        debug!(
            platform = %platform,
            name = %definition.name(),
            sources = definition.sources.len(),
            "loaded platform definition"
        );

        Ok(definition)
    }

    /// Load all platform definitions.
    ///
    /// Invalid definitions are logged as warnings and skipped.
    pub fn load_all(&self) -> Result<Vec<PlatformDefinition>> {
        let mut definitions = Vec::new();

        Self::walk_and_load_recursive(&self.definitions_dir, &mut definitions)?;

        info!(
            count = definitions.len(),
            dir = %self.definitions_dir.display(),
            "loaded platform definitions"
        );

        Ok(definitions)
    }

    fn walk_and_load_recursive(dir: &Path, definitions: &mut Vec<PlatformDefinition>) -> Result<()> {
        let mut entries = std::fs::read_dir(dir)?
            .map(|entry| entry.map(|e| e.path()))
            .collect::<std::io::Result<Vec<_>>>()?;
        entries.sort();

        for path in entries {
            if path.is_dir() {
                Self::walk_and_load_recursive(&path, definitions)?;
                continue;
            }
            if path.extension().and_then(|s| s.to_str()) != Some("toml") {
                continue;
            }

            match Self::load_from_path(&path) {
                Ok(definition) => {
                    if let Err(e) = definition.validate(&path.display().to_string()) {
                        warn!(
                            path = %path.display(),
                            error = %e,
                            "skipping invalid platform definition"
                        );
                        continue;
                    }
                    definitions.push(definition);
                }
                Err(e) => {
                    warn!(
                        path = %path.display(),
                        error = %e,
                        "failed to load platform definition"
                    );
                }
            }
        }

        Ok(())
    }

    fn find_file(dir: &Path, filename: &str) -> Result<Option<PathBuf>> {
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();

            if path.is_dir() {
                if let Some(found) = Self::find_file(&path, filename)? {
                    return Ok(Some(found));
                }
            } else if path.file_name().and_then(|s| s.to_str()) == Some(filename) {
                return Ok(Some(path));
            }
        }

        Ok(None)
    }

    fn load_from_path(path: &Path) -> Result<PlatformDefinition> {
        let contents = std::fs::read_to_string(path)?;

        toml::from_str(&contents).map_err(|e| ScanError::Definition {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
    }
}
