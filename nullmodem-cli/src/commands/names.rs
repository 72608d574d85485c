//! Name commands: friendly names, busy port names, utility help.

use anyhow::{Context, Result};
use console::style;
use nullmodem::{FriendlyNameRecord, NullModemManager, PortPairFriendlyNames};
use std::io::Write as _;

use crate::{Cli, print_json, spinner};

fn print_record(record: Option<&FriendlyNameRecord>) {
    if let Some(record) = record {
        eprintln!("      {:<8} {}", record.name, record.friendly_name);
    }
}

/// Utility-help command implementation: `setupc help`, verbatim to stdout.
pub(crate) fn cmd_utility_help(manager: &NullModemManager) -> Result<()> {
    let text = manager.help().context("Failed to run setupc help")?;
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(text.as_bytes())?;
    stdout.flush()?;
    Ok(())
}

/// List-names command implementation.
pub(crate) fn cmd_list_names(cli: &Cli, manager: &NullModemManager, json: bool) -> Result<()> {
    let groups: Vec<PortPairFriendlyNames> = manager
        .list_friendly_names()
        .context("Failed to list friendly names")?;

    if json {
        return print_json(&groups);
    }

    if groups.is_empty() {
        if !cli.quiet {
            eprintln!("{} No friendly names listed", style("ℹ").blue());
        }
        return Ok(());
    }

    for group in &groups {
        eprintln!(
            "  {}",
            style(format!("Pair {}", group.id)).cyan().bold()
        );
        print_record(group.bus.as_ref());
        print_record(group.a.as_ref());
        print_record(group.b.as_ref());
    }
    Ok(())
}

/// Update-names command implementation.
pub(crate) fn cmd_update_names(cli: &Cli, manager: &NullModemManager) -> Result<()> {
    let pb = spinner(cli, "Updating friendly names...");
    let updated = manager.update_friendly_names();
    pb.finish_and_clear();
    updated.context("Failed to update friendly names")?;

    if !cli.quiet {
        eprintln!("{} Friendly names updated", style("✓").green());
    }
    Ok(())
}

/// Busy-names command implementation.
pub(crate) fn cmd_busy_names(
    cli: &Cli,
    manager: &NullModemManager,
    prefix: &str,
    filter: Option<u32>,
    json: bool,
) -> Result<()> {
    let names = manager
        .busy_names(filter, prefix)
        .context("Failed to list busy port names")?;

    if json {
        return print_json(&names);
    }

    if names.is_empty() {
        if !cli.quiet {
            eprintln!("{} No busy names match {prefix}", style("ℹ").blue());
        }
        return Ok(());
    }

    eprintln!("{}", names.join(" "));
    Ok(())
}
