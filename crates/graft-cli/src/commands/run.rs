//! Implementation of the `graft run` command.
//!
//! Plan → show diff → confirm → apply. Nothing is written before the user
//! (or `--yes`) agrees, and a plan with conflicts is never applied.

use std::sync::Arc;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tracing::{info, instrument};

use graft_adapters::LocalFilesystem;
use graft_core::application::{ApplyReport, ApplyService, ProjectLoader as _};
use graft_core::domain::{DomainError, FileDiff, GeneratorRequest, MergedChangeSet};

use crate::{
    cli::{GlobalArgs, RunArgs},
    commands::{Workspace, current_dir, parse_ids},
    config::AppConfig,
    error::{CliError, CliResult},
    output::OutputManager,
};

/// JSON shape of a run.
#[derive(Serialize)]
struct RunSummary<'a> {
    change_set: &'a MergedChangeSet,
    diffs: &'a [FileDiff],
    applied: Option<&'a ApplyReport>,
}

/// Execute `graft run`.
#[instrument(skip_all, fields(generators = %args.generators))]
pub fn execute(
    args: RunArgs,
    global: GlobalArgs,
    config: AppConfig,
    output: OutputManager,
) -> CliResult<()> {
    let root = match &args.project {
        Some(dir) => dir.clone(),
        None => current_dir()?,
    };
    let workspace = Workspace::open(&root, args.generators_dir.as_deref(), &config)?;
    let planner = workspace.planner(&config);

    // Every request sees the whole argument list; the run-wide flag namespace
    // routes each flag to the generators that declared it.
    let requests: Vec<GeneratorRequest> = parse_ids([args.generators.as_str()])?
        .into_iter()
        .map(|id| GeneratorRequest::new(id, args.args.clone()))
        .collect();

    let spinner = spinner(&output, "Planning...");
    let merged = workspace
        .loader(&config)
        .load()
        .and_then(|snapshot| planner.merge(&snapshot, &requests));
    if let Some(bar) = &spinner {
        bar.finish_and_clear();
    }
    let change_set = merged?;

    let applier = ApplyService::new(Arc::new(LocalFilesystem::new()), &root)
        .with_context_lines(config.output.diff_context);

    if change_set.has_conflicts() {
        if output.is_json() {
            output.json(&RunSummary {
                change_set: &change_set,
                diffs: &[],
                applied: None,
            })?;
        }
        return Err(CliError::Core(DomainError::Conflicts(change_set.report).into()));
    }

    if change_set.is_empty() {
        if output.is_json() {
            output.json(&RunSummary {
                change_set: &change_set,
                diffs: &[],
                applied: None,
            })?;
        } else {
            output.success("Nothing to do, the project already has every change")?;
        }
        return Ok(());
    }

    let diffs = applier.render(&change_set)?;
    if !output.is_json() {
        for diff in &diffs {
            output.diff(diff)?;
        }
        output.print("")?;
        output.info(&format!(
            "{} file(s) would change ({} operation(s))",
            diffs.len(),
            change_set.operations().count()
        ))?;
    }

    if args.dry_run {
        if output.is_json() {
            output.json(&RunSummary {
                change_set: &change_set,
                diffs: &diffs,
                applied: None,
            })?;
        } else {
            output.info("Dry run: nothing was written")?;
        }
        return Ok(());
    }

    if !args.yes && !global.quiet && !output.is_json() && !confirm()? {
        return Err(CliError::Cancelled);
    }

    let report = applier.apply(&change_set)?;
    info!(run_id = %report.run_id, files = report.len(), "Run applied");

    if output.is_json() {
        output.json(&RunSummary {
            change_set: &change_set,
            diffs: &diffs,
            applied: Some(&report),
        })?;
    } else {
        output.success(&format!(
            "Applied: {} created, {} modified",
            report.created.len(),
            report.modified.len()
        ))?;
    }
    Ok(())
}

fn spinner(output: &OutputManager, message: &'static str) -> Option<ProgressBar> {
    if output.is_quiet() || !output.supports_color() {
        return None;
    }
    let bar = ProgressBar::new_spinner().with_message(message);
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
        bar.set_style(style);
    }
    bar.enable_steady_tick(Duration::from_millis(80));
    Some(bar)
}

#[cfg(feature = "interactive")]
fn confirm() -> CliResult<bool> {
    use std::io::IsTerminal as _;

    if !std::io::stdin().is_terminal() {
        return Err(CliError::InvalidInput {
            message: "cannot ask for confirmation without a terminal; pass --yes to apply".into(),
            source: None,
        });
    }
    dialoguer::Confirm::new()
        .with_prompt("Apply these changes?")
        .default(true)
        .interact()
        .map_err(|e| CliError::IoError {
            message: "failed to read confirmation input".into(),
            source: std::io::Error::other(e),
        })
}

#[cfg(not(feature = "interactive"))]
fn confirm() -> CliResult<bool> {
    Err(CliError::FeatureNotAvailable {
        feature: "interactive",
    })
}
