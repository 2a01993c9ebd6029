//! Command handlers, one module per subcommand.
//!
//! Handlers translate arguments into service calls and print results. No
//! business logic lives here.

pub mod completions;
pub mod config;
pub mod describe;
pub mod flags;
pub mod init;
pub mod list;
pub mod run;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use graft_adapters::{InMemoryRegistry, LocalProjectLoader, generator_loader};
use graft_core::application::{GeneratorService, PlanService};
use graft_core::domain::GeneratorId;

use crate::config::AppConfig;
use crate::error::{CliError, CliResult, IntoCli};

/// Registry and project location shared by the commands.
pub struct Workspace {
    pub root: PathBuf,
    pub registry: Arc<InMemoryRegistry>,
}

impl Workspace {
    /// Built-in generators plus any manifest generators found for `root`.
    ///
    /// `generators_dir` (from the command line) wins over the configured
    /// directory.
    pub fn open(root: &Path, generators_dir: Option<&Path>, config: &AppConfig) -> CliResult<Self> {
        let registry = Arc::new(
            InMemoryRegistry::with_builtin().with_cli_context(|| "loading built-in generators")?,
        );
        let service = GeneratorService::new(registry.clone());

        let dir = generators_dir.or(config.generators.manifest_dir.as_deref());
        for generator in generator_loader::discover(dir, root)? {
            service.register(Arc::new(generator))?;
        }
        debug!(generators = registry.len(), root = %root.display(), "workspace ready");

        Ok(Self {
            root: root.to_path_buf(),
            registry,
        })
    }

    pub fn generators(&self) -> GeneratorService {
        GeneratorService::new(self.registry.clone())
    }

    /// Reads the project as configured.
    pub fn loader(&self, config: &AppConfig) -> LocalProjectLoader {
        LocalProjectLoader::new(&self.root)
            .with_ignore(config.project.ignore.iter().cloned())
            .with_max_file_bytes(config.project.max_file_bytes)
    }

    /// Planner over the project on disk, with `YEAR` available to templates.
    pub fn planner(&self, config: &AppConfig) -> PlanService {
        PlanService::new(self.registry.clone(), Arc::new(self.loader(config)))
            .with_variable("YEAR", chrono::Local::now().format("%Y").to_string())
    }
}

/// Current directory, as commands default to it.
pub fn current_dir() -> CliResult<PathBuf> {
    std::env::current_dir().with_cli_context(|| "failed to read the current directory")
}

/// Parse generator ids, accepting comma-separated lists.
pub fn parse_ids<'a>(raw: impl IntoIterator<Item = &'a str>) -> CliResult<Vec<GeneratorId>> {
    let ids = raw
        .into_iter()
        .flat_map(|s| s.split(','))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| GeneratorId::new(s).map_err(|e| CliError::Core(e.into())))
        .collect::<CliResult<Vec<_>>>()?;
    if ids.is_empty() {
        return Err(CliError::InvalidInput {
            message: "no generator given".into(),
            source: None,
        });
    }
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_ids_splits_commas_and_trims() {
        let ids = parse_ids(["readme, gitignore", "project"]).unwrap();
        let ids: Vec<&str> = ids.iter().map(GeneratorId::as_str).collect();
        assert_eq!(ids, vec!["readme", "gitignore", "project"]);
    }

    #[test]
    fn parse_ids_rejects_empty_and_invalid() {
        assert!(matches!(parse_ids([","]), Err(CliError::InvalidInput { .. })));
        assert!(matches!(parse_ids(["bad id"]), Err(CliError::Core(_))));
    }

    #[test]
    fn workspace_has_builtins_without_manifests() {
        let temp = tempfile::TempDir::new().unwrap();
        let workspace = Workspace::open(temp.path(), None, &AppConfig::default()).unwrap();
        let ids: Vec<String> = workspace
            .generators()
            .list()
            .unwrap()
            .into_iter()
            .map(|g| g.id)
            .collect();
        assert!(ids.iter().any(|id| id == "readme"));
        assert!(ids.iter().any(|id| id == "project"));
    }
}
