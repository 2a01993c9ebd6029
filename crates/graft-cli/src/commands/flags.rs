//! Implementation of the `graft flags` command.
//!
//! Prints every flag form the given generators accept together, and which
//! generators each form reaches. An ambiguous namespace is an error listing
//! every ambiguous name and the qualified forms that resolve it.

use graft_core::domain::AcceptedFlag;

use crate::{
    cli::FlagsArgs,
    commands::{Workspace, current_dir, parse_ids},
    config::AppConfig,
    error::CliResult,
    output::OutputManager,
};

pub fn execute(args: FlagsArgs, config: AppConfig, output: OutputManager) -> CliResult<()> {
    let workspace = Workspace::open(&current_dir()?, args.generators_dir.as_deref(), &config)?;
    let ids = parse_ids(args.generators.iter().map(String::as_str))?;
    let namespace = workspace.planner(&config).resolve_flags(&ids)?;

    if output.is_json() {
        output.json(&namespace)?;
        return Ok(());
    }

    output.header("Accepted flags:")?;
    for accepted in namespace.accepted() {
        output.print(&format!("  {}", accepted_line(accepted)))?;
    }
    Ok(())
}

fn accepted_line(accepted: &AcceptedFlag) -> String {
    let targets: Vec<&str> = accepted.targets.iter().map(|t| t.generator.as_str()).collect();
    let mut line = format!(
        "--{} <{}> → {}",
        accepted.accepted,
        accepted.flag_type,
        targets.join(", ")
    );
    if !accepted.help.is_empty() {
        line.push_str(&format!("  ({})", accepted.help));
    }
    line
}
