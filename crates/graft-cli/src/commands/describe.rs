//! Implementation of the `graft describe` command.

use graft_core::domain::FlagSpec;

use crate::{
    cli::DescribeArgs,
    commands::{Workspace, current_dir, parse_ids},
    config::AppConfig,
    error::CliResult,
    output::OutputManager,
};

pub fn execute(args: DescribeArgs, config: AppConfig, output: OutputManager) -> CliResult<()> {
    let workspace = Workspace::open(&current_dir()?, args.generators_dir.as_deref(), &config)?;
    let ids = parse_ids([args.generator.as_str()])?;
    let service = workspace.generators();

    for id in &ids {
        let info = service.describe(id)?;
        if output.is_json() {
            output.json(&info)?;
            continue;
        }

        output.header(&info.id)?;
        if !info.summary.is_empty() {
            output.print(&format!("  {}", info.summary))?;
        }
        output.print(&format!("  group:    {}", info.group))?;
        if !info.positional.is_empty() {
            let names: Vec<String> = info.positional.iter().map(|p| format!("<{p}>")).collect();
            output.print(&format!("  args:     {}", names.join(" ")))?;
        }
        if !info.composes.is_empty() {
            output.print(&format!("  composes: {}", info.composes.join(", ")))?;
        }
        if !info.flags.is_empty() {
            output.print("  flags:")?;
            for flag in &info.flags {
                output.print(&format!("    {}", flag_line(flag)))?;
            }
        }
    }
    Ok(())
}

fn flag_line(flag: &FlagSpec) -> String {
    let mut line = format!("--{} <{}>", flag.name, flag.flag_type);
    if let Some(group) = &flag.group {
        line.push_str(&format!(" [group {group}]"));
    }
    if let Some(default) = &flag.default {
        line.push_str(&format!(" (default: {})", default.render()));
    }
    if !flag.help.is_empty() {
        line.push_str(&format!("  {}", flag.help));
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use graft_core::domain::{FlagValue, Group};

    #[test]
    fn flag_line_shows_type_group_and_default() {
        let flag = FlagSpec::string("description")
            .group(Group::new("docs").unwrap())
            .default_value(FlagValue::String("hi".into()))
            .help("One-line summary");
        assert_eq!(
            flag_line(&flag),
            "--description <string> [group docs] (default: hi)  One-line summary"
        );
    }
}
