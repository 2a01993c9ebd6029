//! Filesystem-based generator loader.
//!
//! Discovers and parses `generator.toml` manifests from a directory tree,
//! turning each into a [`ManifestGenerator`] ready for the registry.
//!
//! # Directory layout expected
//!
//! ```text
//! generators/
//! ├── phoenix-context/
//! │   ├── generator.toml       ← manifest (required)
//! │   └── files/
//! │       └── context.ex       ← referenced by `template = "files/context.ex"`
//! └── ci/
//!     └── generator.toml
//! ```
//!
//! # `generator.toml` format
//!
//! ```toml
//! [generator]
//! id       = "phoenix-context"
//! group    = "phoenix"            # optional; defaults to the id
//! summary  = "Add a context module"
//! composes = ["readme"]           # optional
//! positional = ["name"]           # optional; bound to {{name}}
//!
//! [[flags]]
//! name    = "module"
//! type    = "string"              # boolean | string | integer | list
//! default = "Accounts"            # optional
//! help    = "Module name"
//!
//! [[operations]]
//! op       = "create-file"
//! path     = "lib/{{module}}.ex"
//! template = "files/context.ex"   # or `content = "..."`
//!
//! [[operations]]
//! op       = "ensure-config-value"
//! path     = "config/app.json"
//! key      = "contexts.{{module}}"
//! value    = true
//! strategy = "prefer-existing"    # optional
//!
//! [[operations]]
//! op     = "list-insert"
//! path   = "config/app.json"
//! key    = "things"
//! value  = "{{module}}"
//! dedupe = "equal"                # optional; or "field:<name>"
//! ```
//!
//! Every string in an operation is rendered with the run's variables, the
//! generator's flag values, and its positional arguments.

use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::Deserialize;
use tracing::{debug, info, instrument, warn};
use walkdir::WalkDir;

use graft_core::{
    application::ApplicationError,
    domain::{
        ConfigValue, DedupeBy, DomainError, FileContent, FlagSpec, Generator, GeneratorArgs,
        GeneratorDescriptor, GeneratorId, Group, KeyPath, MergeStrategy, PatchKind, ProjectView,
        RelativePath, RenderContext,
    },
    error::GraftResult,
};

/// Manifest file name.
pub const MANIFEST: &str = "generator.toml";

/// Environment variable naming an extra generators directory.
pub const GENERATORS_DIR_ENV: &str = "GRAFT_GENERATORS_DIR";

// ── Manifest types ────────────────────────────────────────────────────────────

/// Deserialised representation of a `generator.toml` file.
#[derive(Debug, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct GeneratorManifest {
    pub generator: GeneratorSection,
    #[serde(default)]
    pub flags: Vec<FlagSpec>,
    #[serde(default)]
    pub operations: Vec<OperationEntry>,
}

/// `[generator]` section: identity and composition.
#[derive(Debug, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct GeneratorSection {
    pub id: GeneratorId,
    pub group: Option<Group>,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub composes: Vec<GeneratorId>,
    #[serde(default)]
    pub positional: Vec<String>,
}

/// One entry under `[[operations]]`. Strings may hold `{{VAR}}` placeholders.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(tag = "op", rename_all = "kebab-case", deny_unknown_fields)]
pub enum OperationEntry {
    CreateFile {
        path: String,
        content: Option<String>,
        /// File next to the manifest holding the content.
        template: Option<String>,
    },
    EnsureConfigValue {
        path: String,
        key: String,
        value: toml::Value,
        #[serde(default)]
        strategy: MergeStrategy,
    },
    ListInsert {
        path: String,
        key: String,
        value: toml::Value,
        dedupe: Option<String>,
    },
}

/// Operation with its file content resolved.
#[derive(Debug, Clone, PartialEq)]
enum Step {
    CreateFile {
        path: String,
        source: String,
    },
    EnsureConfigValue {
        path: String,
        key: String,
        value: ConfigValue,
        strategy: MergeStrategy,
    },
    ListInsert {
        path: String,
        key: String,
        value: ConfigValue,
        dedupe: DedupeBy,
    },
}

// ── Generator ─────────────────────────────────────────────────────────────────

/// A generator defined by a manifest.
#[derive(Debug, Clone)]
pub struct ManifestGenerator {
    descriptor: GeneratorDescriptor,
    steps: Vec<Step>,
}

impl ManifestGenerator {
    /// Load the manifest in `dir`.
    #[instrument(fields(dir = %dir.display()))]
    pub fn from_dir(dir: &Path) -> GraftResult<Self> {
        let manifest_path = dir.join(MANIFEST);
        let raw = fs::read_to_string(&manifest_path)
            .map_err(|e| load_failed(&manifest_path, format!("failed to read: {e}")))?;
        let manifest: GeneratorManifest = toml::from_str(&raw)
            .map_err(|e| load_failed(&manifest_path, format!("failed to parse: {e}")))?;
        Self::from_manifest(manifest, dir)
    }

    /// Build from a parsed manifest; `template` paths resolve against `dir`.
    pub fn from_manifest(manifest: GeneratorManifest, dir: &Path) -> GraftResult<Self> {
        let section = manifest.generator;
        let mut descriptor = GeneratorDescriptor::new(section.id).summary(section.summary);
        if let Some(group) = section.group {
            descriptor = descriptor.in_group(group);
        }
        descriptor.flags = manifest.flags;
        descriptor.positional = section.positional;
        descriptor.composes = section.composes;

        let steps = manifest
            .operations
            .into_iter()
            .map(|entry| resolve_step(entry, dir))
            .collect::<GraftResult<Vec<_>>>()?;

        Ok(Self { descriptor, steps })
    }

    /// Flag values and positionals by name.
    fn variables(&self, args: &GeneratorArgs) -> Vec<(String, String)> {
        let flags = args.flags().map(|(name, value)| (name.to_string(), value.render()));
        let positional = self
            .descriptor
            .positional
            .iter()
            .cloned()
            .zip(args.positional().iter().cloned());
        flags.chain(positional).collect()
    }
}

fn load_failed(path: &Path, reason: String) -> ApplicationError {
    ApplicationError::LoadFailed {
        path: path.to_path_buf(),
        reason,
    }
}

fn resolve_step(entry: OperationEntry, dir: &Path) -> GraftResult<Step> {
    Ok(match entry {
        OperationEntry::CreateFile {
            path,
            content,
            template,
        } => {
            let source = match (content, template) {
                (Some(content), None) => content,
                (None, Some(template)) => {
                    let file = dir.join(&template);
                    fs::read_to_string(&file)
                        .map_err(|e| load_failed(&file, format!("failed to read template: {e}")))?
                }
                _ => {
                    return Err(load_failed(
                        &dir.join(MANIFEST),
                        format!("create-file '{path}' needs exactly one of `content` or `template`"),
                    )
                    .into());
                }
            };
            Step::CreateFile { path, source }
        }
        OperationEntry::EnsureConfigValue {
            path,
            key,
            value,
            strategy,
        } => Step::EnsureConfigValue {
            path,
            key,
            value: to_json(value, dir)?,
            strategy,
        },
        OperationEntry::ListInsert {
            path,
            key,
            value,
            dedupe,
        } => Step::ListInsert {
            path,
            key,
            value: to_json(value, dir)?,
            dedupe: dedupe.as_deref().unwrap_or("equal").parse()?,
        },
    })
}

fn to_json(value: toml::Value, dir: &Path) -> GraftResult<ConfigValue> {
    serde_json::to_value(value)
        .map_err(|e| load_failed(&dir.join(MANIFEST), format!("unsupported value: {e}")).into())
}

/// Render every string inside `value`.
fn render_value(value: &ConfigValue, context: &RenderContext) -> ConfigValue {
    match value {
        ConfigValue::String(s) => ConfigValue::String(context.render(s)),
        ConfigValue::Array(items) => {
            ConfigValue::Array(items.iter().map(|v| render_value(v, context)).collect())
        }
        ConfigValue::Object(map) => ConfigValue::Object(
            map.iter()
                .map(|(k, v)| (context.render(k), render_value(v, context)))
                .collect(),
        ),
        other => other.clone(),
    }
}

impl Generator for ManifestGenerator {
    fn descriptor(&self) -> &GeneratorDescriptor {
        &self.descriptor
    }

    fn run(&self, view: &ProjectView<'_>, args: &GeneratorArgs) -> Result<Vec<PatchKind>, DomainError> {
        let variables = self.variables(args);
        let context = variables
            .iter()
            .fold(RenderContext::new(view.project_name()), |context, (k, v)| {
                context.with_variable(k.as_str(), v.as_str())
            });
        let path = |p: &str| RelativePath::try_new(context.render(p));
        let key = |k: &str| KeyPath::parse(&context.render(k));

        self.steps
            .iter()
            .map(|step| -> Result<PatchKind, DomainError> {
                Ok(match step {
                    Step::CreateFile { path: p, source } => {
                        let content = variables
                            .iter()
                            .fold(FileContent::template(source.as_str()), |content, (k, v)| {
                                content.with_variable(k.as_str(), v.as_str())
                            });
                        PatchKind::create_file(path(p)?, content)
                    }
                    Step::EnsureConfigValue {
                        path: p,
                        key: k,
                        value,
                        strategy,
                    } => PatchKind::ensure_value(path(p)?, key(k)?, render_value(value, &context))
                        .with_strategy(*strategy),
                    Step::ListInsert {
                        path: p,
                        key: k,
                        value,
                        dedupe,
                    } => PatchKind::list_insert(path(p)?, key(k)?, render_value(value, &context))
                        .with_dedupe(dedupe.clone()),
                })
            })
            .collect()
    }
}

// ── Loader ────────────────────────────────────────────────────────────────────

/// Loads [`ManifestGenerator`]s from a directory of generator directories.
///
/// Every directory (at any depth) holding a `generator.toml` is one generator.
/// Directories whose manifest is invalid emit a `WARN` log and are skipped;
/// they do not prevent other generators from loading.
pub struct FilesystemGeneratorLoader {
    generators_dir: PathBuf,
}

impl FilesystemGeneratorLoader {
    pub fn new(generators_dir: impl Into<PathBuf>) -> Self {
        Self {
            generators_dir: generators_dir.into(),
        }
    }

    /// Load every valid generator under the directory.
    ///
    /// # Errors
    ///
    /// Returns [`ApplicationError::LoadFailed`] if the directory does not exist
    /// or cannot be walked.
    #[instrument(skip(self), fields(dir = %self.generators_dir.display()))]
    pub fn load_all(&self) -> GraftResult<Vec<ManifestGenerator>> {
        if !self.generators_dir.is_dir() {
            return Err(load_failed(&self.generators_dir, "generators directory not found".into()).into());
        }

        let mut generators = Vec::new();
        for entry in WalkDir::new(&self.generators_dir).sort_by_file_name() {
            let entry = entry.map_err(|e| load_failed(&self.generators_dir, format!("directory walk error: {e}")))?;
            if !entry.file_type().is_file() || entry.file_name() != MANIFEST {
                continue;
            }
            let Some(dir) = entry.path().parent() else { continue };

            match ManifestGenerator::from_dir(dir) {
                Ok(generator) => {
                    debug!(id = %generator.id(), "loaded generator");
                    generators.push(generator);
                }
                Err(e) => {
                    // One bad manifest must not block all others.
                    warn!(
                        dir   = %dir.display(),
                        error = %e,
                        "skipping generator directory due to load error"
                    );
                }
            }
        }

        debug!(count = generators.len(), "finished loading generators");
        Ok(generators)
    }
}

/// Load manifest generators from the first directory that exists among:
/// `explicit`, `$GRAFT_GENERATORS_DIR`, then `<project>/.graft/generators`.
///
/// Returns an empty list when none exists.
#[instrument(skip_all)]
pub fn discover(explicit: Option<&Path>, project_root: &Path) -> GraftResult<Vec<ManifestGenerator>> {
    for candidate in candidate_paths(explicit, project_root) {
        if !candidate.is_dir() {
            debug!(path = %candidate.display(), "path does not exist, skipping");
            continue;
        }
        let generators = FilesystemGeneratorLoader::new(&candidate).load_all()?;
        info!(
            path  = %candidate.display(),
            count = generators.len(),
            "manifest generators loaded"
        );
        return Ok(generators);
    }
    Ok(Vec::new())
}

fn candidate_paths(explicit: Option<&Path>, project_root: &Path) -> Vec<PathBuf> {
    let mut paths = Vec::with_capacity(3);
    if let Some(dir) = explicit {
        paths.push(dir.to_path_buf());
    }
    if let Ok(env_dir) = std::env::var(GENERATORS_DIR_ENV) {
        paths.push(PathBuf::from(env_dir));
    }
    paths.push(project_root.join(".graft").join("generators"));
    paths
}

// ── Tests ─────────────────────────────────────────────────────────────────────
