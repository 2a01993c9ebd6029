//! Implementation of the `graft list` command.

use crate::{
    cli::{ListArgs, ListFormat},
    commands::{Workspace, current_dir},
    config::AppConfig,
    error::CliResult,
    output::OutputManager,
};

pub fn execute(args: ListArgs, config: AppConfig, output: OutputManager) -> CliResult<()> {
    let workspace = Workspace::open(&current_dir()?, args.generators_dir.as_deref(), &config)?;
    let generators = workspace.generators().list()?;

    let format = if output.is_json() { ListFormat::Json } else { args.format };
    match format {
        ListFormat::Table => {
            output.header("Available Generators:")?;
            let width = generators.iter().map(|g| g.id.len()).max().unwrap_or(0);
            for generator in &generators {
                output.print(&format!(
                    "  {:<width$}  [{}] {}",
                    generator.id, generator.group, generator.summary
                ))?;
            }
        }

        // JSON goes through `json()` so it is printed even with --quiet.
        ListFormat::Json => output.json(&generators)?,

        ListFormat::List => {
            for generator in &generators {
                println!("{}", generator.id);
            }
        }

        ListFormat::Csv => {
            println!("id,group,composes,summary");
            for generator in &generators {
                println!(
                    "{},{},{},{}",
                    generator.id,
                    generator.group,
                    generator.composes.join(" "),
                    csv_field(&generator.summary)
                );
            }
        }
    }

    Ok(())
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_field_quotes_only_when_needed() {
        assert_eq!(csv_field("plain"), "plain");
        assert_eq!(csv_field("a, b"), "\"a, b\"");
        assert_eq!(csv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
    }
}
