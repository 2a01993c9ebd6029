//! Generator Service - generator listing and description.
//!
//! Separated from PlanService for single responsibility.

use std::sync::Arc;

use serde::Serialize;

use crate::{
    application::ports::GeneratorRegistry,
    domain::{DomainValidator as validator, FlagSpec, Generator, GeneratorDescriptor, GeneratorId},
    error::GraftResult,
};

/// Information about a generator for display purposes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratorInfo {
    pub id: String,
    pub group: String,
    pub summary: String,
    pub flags: Vec<FlagSpec>,
    pub positional: Vec<String>,
    pub composes: Vec<String>,
}

impl From<&GeneratorDescriptor> for GeneratorInfo {
    fn from(d: &GeneratorDescriptor) -> Self {
        Self {
            id: d.id.to_string(),
            group: d.group.to_string(),
            summary: d.summary.clone(),
            flags: d.flags.clone(),
            positional: d.positional.clone(),
            composes: d.composes.iter().map(ToString::to_string).collect(),
        }
    }
}

/// Service for generator queries and registration.
pub struct GeneratorService {
    registry: Arc<dyn GeneratorRegistry>,
}

impl GeneratorService {
    pub fn new(registry: Arc<dyn GeneratorRegistry>) -> Self {
        Self { registry }
    }

    /// List all generators.
    pub fn list(&self) -> GraftResult<Vec<GeneratorInfo>> {
        Ok(self
            .registry
            .list()?
            .iter()
            .map(|g| GeneratorInfo::from(g.descriptor()))
            .collect())
    }

    /// Describe one generator.
    pub fn describe(&self, id: &GeneratorId) -> GraftResult<GeneratorInfo> {
        let generator = self.registry.lookup(id)?;
        Ok(GeneratorInfo::from(generator.descriptor()))
    }

    /// Validate and register a generator.
    pub fn register(&self, generator: Arc<dyn Generator>) -> GraftResult<()> {
        validator::validate_descriptor(generator.descriptor())?;
        self.registry.insert(generator)
    }
}
