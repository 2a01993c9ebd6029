//! Generators that ship with Graft.
//!
//! [`all_generators`] is the single entry point; the registry loads it at
//! startup. Manifest generators found on disk are registered on top (see
//! [`crate::generator_loader`]).

use std::sync::Arc;

use graft_core::domain::{
    ConfigValue, DedupeBy, DomainError, FileContent, FlagSpec, FlagValue, Generator,
    GeneratorArgs, GeneratorDescriptor, GeneratorId, Group, KeyPath, MergeStrategy, NodePath,
    PatchKind, ProjectView, RelativePath,
};
use graft_core::error::GraftResult;

/// Default configuration file for the `config-*` generators.
pub const DEFAULT_CONFIG_FILE: &str = "graft.json";

const DEFAULT_GITIGNORE: &[&str] = &[".env", "*.log", "/target"];

const README_TEMPLATE: &str = "# {{TITLE}}\n\n{{DESCRIPTION}}\n";

/// Every built-in generator.
pub fn all_generators() -> GraftResult<Vec<Arc<dyn Generator>>> {
    Ok(vec![
        Arc::new(Readme::new()?),
        Arc::new(Gitignore::new()?),
        Arc::new(ConfigSet::new()?),
        Arc::new(ConfigAppend::new()?),
        Arc::new(Project::new()?),
    ])
}

fn id(value: &str) -> Result<GeneratorId, DomainError> {
    GeneratorId::new(value)
}

fn group(value: &str) -> Result<Group, DomainError> {
    Group::new(value)
}

/// `--value` text as JSON when it parses, as a plain string otherwise.
pub fn parse_value(text: &str) -> ConfigValue {
    serde_json::from_str(text).unwrap_or_else(|_| ConfigValue::String(text.to_string()))
}

// ── readme ──────────────────────────────────────────────────────────────────

/// Creates `README.md`.
pub struct Readme {
    descriptor: GeneratorDescriptor,
}

impl Readme {
    pub fn new() -> Result<Self, DomainError> {
        Ok(Self {
            descriptor: GeneratorDescriptor::new(id("readme")?)
                .in_group(group("docs")?)
                .summary("Create README.md for the project")
                .flag(FlagSpec::string("title").help("Heading; defaults to the project name"))
                .flag(FlagSpec::string("description").help("Paragraph under the heading")),
        })
    }
}

impl Generator for Readme {
    fn descriptor(&self) -> &GeneratorDescriptor {
        &self.descriptor
    }

    fn run(&self, view: &ProjectView<'_>, args: &GeneratorArgs) -> Result<Vec<PatchKind>, DomainError> {
        let title = args.string("title").unwrap_or(view.project_name());
        let description = args
            .string("description")
            .unwrap_or("Generated with graft.");
        Ok(vec![PatchKind::create_file(
            RelativePath::try_new("README.md")?,
            FileContent::template(README_TEMPLATE)
                .with_variable("TITLE", title)
                .with_variable("DESCRIPTION", description),
        )])
    }
}

// ── gitignore ───────────────────────────────────────────────────────────────

/// Makes sure `.gitignore` lists the requested entries.
///
/// Creates the file when it is missing; otherwise appends only the lines it
/// lacks, as a raw edit of its last line.
pub struct Gitignore {
    descriptor: GeneratorDescriptor,
}

impl Gitignore {
    pub fn new() -> Result<Self, DomainError> {
        Ok(Self {
            descriptor: GeneratorDescriptor::new(id("gitignore")?)
                .summary("Ensure .gitignore contains the given entries")
                .flag(
                    FlagSpec::list("entry")
                        .default_value(FlagValue::List(
                            DEFAULT_GITIGNORE.iter().map(|s| s.to_string()).collect(),
                        ))
                        .help("Pattern to ignore; repeat for several"),
                ),
        })
    }
}

impl Generator for Gitignore {
    fn descriptor(&self) -> &GeneratorDescriptor {
        &self.descriptor
    }

    fn run(&self, view: &ProjectView<'_>, args: &GeneratorArgs) -> Result<Vec<PatchKind>, DomainError> {
        let path = RelativePath::try_new(".gitignore")?;
        let wanted = args.list("entry");

        let Some(tree) = view.tree(&path)? else {
            let body: String = wanted.iter().map(|e| format!("{e}\n")).collect();
            return Ok(vec![PatchKind::create_file(path, FileContent::literal(body))]);
        };

        let present: Vec<&str> = tree
            .children()
            .iter()
            .map(|line| line.text().trim())
            .collect();
        let mut missing: Vec<&str> = Vec::new();
        for entry in wanted {
            if !present.contains(&entry.as_str()) && !missing.contains(&entry.as_str()) {
                missing.push(entry);
            }
        }
        if missing.is_empty() {
            return Ok(Vec::new());
        }

        let appended: String = missing.iter().map(|e| format!("{e}\n")).collect();
        let edit = match tree.child_count().checked_sub(1) {
            Some(last) => {
                let mut text = tree.child(last).map(|n| n.text().to_string()).unwrap_or_default();
                if !text.ends_with('\n') {
                    text.push('\n');
                }
                text.push_str(&appended);
                PatchKind::raw_edit(path, NodePath::root().child(last), text)
            }
            None => PatchKind::raw_edit(path, NodePath::root(), appended),
        };
        Ok(vec![edit])
    }
}

// ── config-set / config-append ──────────────────────────────────────────────

fn config_flags(descriptor: GeneratorDescriptor) -> GeneratorDescriptor {
    descriptor
        .flag(
            FlagSpec::string("file")
                .default_value(FlagValue::String(DEFAULT_CONFIG_FILE.into()))
                .help("Configuration file to edit"),
        )
        .flag(FlagSpec::string("key").help("Dotted key path, e.g. deps.web"))
        .flag(FlagSpec::string("value").help("JSON value; bare words are strings"))
}

struct ConfigTarget {
    path: RelativePath,
    key_path: KeyPath,
    value: ConfigValue,
}

fn config_target(generator: &GeneratorId, args: &GeneratorArgs) -> Result<ConfigTarget, DomainError> {
    Ok(ConfigTarget {
        path: RelativePath::try_new(args.require(generator, "file")?)?,
        key_path: KeyPath::parse(args.require(generator, "key")?)?,
        value: parse_value(args.require(generator, "value")?),
    })
}

/// Sets one configuration value.
pub struct ConfigSet {
    descriptor: GeneratorDescriptor,
}

impl ConfigSet {
    pub fn new() -> Result<Self, DomainError> {
        let descriptor = GeneratorDescriptor::new(id("config-set")?)
            .in_group(group("config")?)
            .summary("Ensure a configuration key holds a value");
        Ok(Self {
            descriptor: config_flags(descriptor).flag(
                FlagSpec::string("strategy")
                    .default_value(FlagValue::String(MergeStrategy::Reject.to_string()))
                    .help("reject, prefer-existing, prefer-incoming or merge-list"),
            ),
        })
    }
}

impl Generator for ConfigSet {
    fn descriptor(&self) -> &GeneratorDescriptor {
        &self.descriptor
    }

    fn run(&self, _: &ProjectView<'_>, args: &GeneratorArgs) -> Result<Vec<PatchKind>, DomainError> {
        let target = config_target(self.id(), args)?;
        let strategy = args.string("strategy").unwrap_or("reject").parse::<MergeStrategy>()?;
        Ok(vec![
            PatchKind::ensure_value(target.path, target.key_path, target.value).with_strategy(strategy),
        ])
    }
}

/// Appends to a configuration list.
pub struct ConfigAppend {
    descriptor: GeneratorDescriptor,
}

impl ConfigAppend {
    pub fn new() -> Result<Self, DomainError> {
        let descriptor = GeneratorDescriptor::new(id("config-append")?)
            .in_group(group("config")?)
            .summary("Append a value to a configuration list unless present");
        Ok(Self {
            descriptor: config_flags(descriptor).flag(
                FlagSpec::string("dedupe")
                    .default_value(FlagValue::String("equal".into()))
                    .help("equal, or field:<name> to compare one field of objects"),
            ),
        })
    }
}

impl Generator for ConfigAppend {
    fn descriptor(&self) -> &GeneratorDescriptor {
        &self.descriptor
    }

    fn run(&self, _: &ProjectView<'_>, args: &GeneratorArgs) -> Result<Vec<PatchKind>, DomainError> {
        let target = config_target(self.id(), args)?;
        let dedupe = args.string("dedupe").unwrap_or("equal").parse::<DedupeBy>()?;
        Ok(vec![
            PatchKind::list_insert(target.path, target.key_path, target.value).with_dedupe(dedupe),
        ])
    }
}

// ── project ─────────────────────────────────────────────────────────────────

/// Baseline project files: records the project in `graft.json`, then runs
/// `readme` and `gitignore`.
pub struct Project {
    descriptor: GeneratorDescriptor,
}

impl Project {
    pub fn new() -> Result<Self, DomainError> {
        Ok(Self {
            descriptor: GeneratorDescriptor::new(id("project")?)
                .summary("Baseline project files (graft.json, README.md, .gitignore)")
                .flag(
                    // Shared with `readme`, so one --description feeds both.
                    FlagSpec::string("description")
                        .group(group("docs")?)
                        .help("Project description"),
                )
                .composes(id("readme")?)
                .composes(id("gitignore")?),
        })
    }
}

impl Generator for Project {
    fn descriptor(&self) -> &GeneratorDescriptor {
        &self.descriptor
    }

    fn run(&self, view: &ProjectView<'_>, args: &GeneratorArgs) -> Result<Vec<PatchKind>, DomainError> {
        let path = RelativePath::try_new(DEFAULT_CONFIG_FILE)?;
        let mut ops = vec![
            PatchKind::ensure_value(
                path.clone(),
                KeyPath::parse("name")?,
                ConfigValue::String(view.project_name().to_string()),
            )
            .with_strategy(MergeStrategy::PreferExisting),
        ];
        if let Some(description) = args.string("description") {
            ops.push(PatchKind::ensure_value(
                path,
                KeyPath::parse("description")?,
                ConfigValue::String(description.to_string()),
            ));
        }
        Ok(ops)
    }
}
