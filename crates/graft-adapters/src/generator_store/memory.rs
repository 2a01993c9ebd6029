//! In-memory generator registry with built-in generators.

use std::{
    collections::BTreeMap,
    sync::{Arc, RwLock},
};

use graft_core::{
    application::{ApplicationError, ports::GeneratorRegistry},
    domain::{DomainValidator as validator, Generator, GeneratorId},
    error::GraftResult,
};
use tracing::debug;

use crate::builtin_generators;

/// Thread-safe in-memory generator registry.
#[derive(Clone, Default)]
pub struct InMemoryRegistry {
    inner: Arc<RwLock<BTreeMap<GeneratorId, Arc<dyn Generator>>>>,
}

impl InMemoryRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with the built-in generators loaded.
    pub fn with_builtin() -> GraftResult<Self> {
        let registry = Self::new();
        registry.load_builtin()?;
        Ok(registry)
    }

    /// Load built-in generators.
    pub fn load_builtin(&self) -> GraftResult<()> {
        for generator in builtin_generators::all_generators()? {
            self.insert(generator)?;
        }
        Ok(())
    }

    /// Get the number of generators.
    pub fn len(&self) -> usize {
        self.inner.read().map(|inner| inner.len()).unwrap_or(0)
    }

    /// Check if registry is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn ids(inner: &BTreeMap<GeneratorId, Arc<dyn Generator>>) -> Vec<String> {
        inner.keys().map(ToString::to_string).collect()
    }
}

impl std::fmt::Debug for InMemoryRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let ids = self
            .inner
            .read()
            .map(|inner| Self::ids(&inner))
            .unwrap_or_default();
        f.debug_struct("InMemoryRegistry").field("generators", &ids).finish()
    }
}

impl GeneratorRegistry for InMemoryRegistry {
    fn lookup(&self, id: &GeneratorId) -> GraftResult<Arc<dyn Generator>> {
        let inner = self
            .inner
            .read()
            .map_err(|_| ApplicationError::StoreLockError)?;

        inner.get(id).cloned().ok_or_else(|| {
            ApplicationError::UnknownGenerator {
                id: id.clone(),
                available: Self::ids(&inner),
            }
            .into()
        })
    }

    fn list(&self) -> GraftResult<Vec<Arc<dyn Generator>>> {
        let inner = self
            .inner
            .read()
            .map_err(|_| ApplicationError::StoreLockError)?;

        Ok(inner.values().cloned().collect())
    }

    fn insert(&self, generator: Arc<dyn Generator>) -> GraftResult<()> {
        // Validate before insertion
        validator::validate_descriptor(generator.descriptor())?;

        let mut inner = self
            .inner
            .write()
            .map_err(|_| ApplicationError::StoreLockError)?;

        let id = generator.id().clone();
        if inner.insert(id.clone(), generator).is_some() {
            debug!(generator = %id, "replaced registered generator");
        }
        Ok(())
    }
}
