//! In-memory platform definition registry.

use crate::definition::PlatformDefinition;
use crate::error::{Result, ScanError};
use crate::loader::PlatformLoader;
use lookout_core::Platform;
use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard};
use tracing::{info, warn};

/// Cache of platform definitions keyed by platform.
#[derive(Clone, Default)]
pub struct PlatformRegistry {
    definitions: Arc<RwLock<BTreeMap<Platform, Arc<PlatformDefinition>>>>,
}

impl PlatformRegistry {
    /// Create a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry and load all definitions from the given loader.
    pub fn load_from(loader: &PlatformLoader) -> Result<Self> {
        let registry = Self::new();
        registry.reload(loader)?;
        Ok(registry)
    }

    /// Replace the cache with freshly loaded definitions.
    ///
    /// When two files define the same platform, the first one (in path order) wins.
    pub fn reload(&self, loader: &PlatformLoader) -> Result<()> {
        let definitions = loader.load_all()?;

        let mut fresh = BTreeMap::new();
        for definition in definitions {
            let platform = definition.id();
            if fresh.contains_key(&platform) {
                warn!(%platform, "duplicate platform definition ignored");
                continue;
            }
            fresh.insert(platform, Arc::new(definition));
        }

        let count = fresh.len();
        *self
            .definitions
            .write()
            .unwrap_or_else(PoisonError::into_inner) = fresh;

        info!(count, "reloaded platform definitions");
        Ok(())
    }

    /// Add or replace one definition.
    pub fn insert(&self, definition: PlatformDefinition) {
        self.definitions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(definition.id(), Arc::new(definition));
    }

    fn read(&self) -> RwLockReadGuard<'_, BTreeMap<Platform, Arc<PlatformDefinition>>> {
        self.definitions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Get a definition by platform.
    pub fn get(&self, platform: Platform) -> Result<Arc<PlatformDefinition>> {
        self.read()
            .get(&platform)
            .cloned()
            .ok_or_else(|| ScanError::DefinitionNotFound {
                platform: platform.to_string(),
            })
    }

    #[must_use]
    pub fn contains(&self, platform: Platform) -> bool {
        self.read().contains_key(&platform)
    }

    /// All definitions in platform order.
    #[must_use]
    pub fn get_all(&self) -> Vec<Arc<PlatformDefinition>> {
        self.read().values().cloned().collect()
    }

    /// Platforms with a loaded definition.
    #[must_use]
    pub fn platforms(&self) -> Vec<Platform> {
        self.read().keys().copied().collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }
}
