//! Port pair commands: list, add, change, remove.

use anyhow::{Context, Result, bail};
use console::style;
use dialoguer::{Confirm, theme::ColorfulTheme};
use nullmodem::{NullModemManager, PortBuilder, PortDescriptor, PortOrder, PortPair, Signal};
use std::io::IsTerminal;

use crate::{Cli, CliError, map_prompt_error, print_json, spinner};

/// Settings of an endpoint that differ from the driver defaults.
fn non_default_settings(port: &PortDescriptor) -> Vec<String> {
    let switches = [
        (port.emulate_baud_rate, "EmuBR"),
        (port.emulate_overrun, "EmuOverrun"),
        (port.plug_in_mode, "PlugInMode"),
        (port.exclusive_mode, "ExclusiveMode"),
        (port.hidden_mode, "HiddenMode"),
        (port.all_data_bits, "AllDataBits"),
    ];
    let mut settings: Vec<String> = switches
        .iter()
        .filter(|(enabled, _)| *enabled)
        .map(|(_, name)| (*name).to_string())
        .collect();

    let signals = [
        ("cts", port.cts, Signal::DEFAULT_CTS),
        ("dsr", port.dsr, Signal::DEFAULT_DSR),
        ("dcd", port.dcd, Signal::DEFAULT_DCD),
        ("ri", port.ri, Signal::DEFAULT_RI),
    ];
    for (name, signal, default) in signals {
        if signal != default {
            settings.push(format!("{name}={signal}"));
        }
    }

    if port.emulate_noise > 0.0 {
        settings.push(format!("EmuNoise={}", port.emulate_noise));
    }
    if port.add_rtto > 0 {
        settings.push(format!("AddRTTO={}", port.add_rtto));
    }
    if port.add_rito > 0 {
        settings.push(format!("AddRITO={}", port.add_rito));
    }
    settings
}

fn endpoint_line(pair: &PortPair, order: PortOrder) -> String {
    match pair.endpoint(order) {
        Some(port) => {
            let settings = non_default_settings(port).join(" ");
            format!("{:<8} {:<8} {}", port.device_name, port.port_name, settings)
                .trim_end()
                .to_string()
        },
        None => format!("{:<8} {}", order.device_name(pair.id), "(not listed)"),
    }
}

/// Print pairs to stderr.
pub(crate) fn print_pairs(pairs: &[PortPair]) {
    for pair in pairs {
        let (a, b) = pair.port_names();
        eprintln!(
            "  {} {}",
            style(&pair.name).cyan().bold(),
            style(format!("{a} <-> {b}")).dim()
        );
        for order in [PortOrder::A, PortOrder::B] {
            eprintln!("      {}", endpoint_line(pair, order));
        }
    }
}

/// List command implementation.
pub(crate) fn cmd_list(cli: &Cli, manager: &NullModemManager, json: bool) -> Result<()> {
    let pairs = manager.list().context("Failed to list port pairs")?;

    if json {
        return print_json(&pairs);
    }

    if pairs.is_empty() {
        if !cli.quiet {
            eprintln!("{} No port pairs installed", style("ℹ").blue());
        }
        return Ok(());
    }

    eprintln!("{}", style(format!("{} port pair(s):", pairs.len())).bold());
    print_pairs(&pairs);
    Ok(())
}

/// Add command implementation.
pub(crate) fn cmd_add(
    cli: &Cli,
    manager: &NullModemManager,
    a: &PortBuilder,
    b: &PortBuilder,
    id: Option<u32>,
) -> Result<()> {
    let before = manager
        .list()
        .context("Failed to read installed port pairs")?;

    let pb = spinner(cli, "Installing port pair...");
    let added = manager.add_pair(a, b, id);
    pb.finish_and_clear();

    if !added.context("Failed to install port pair")? {
        bail!("setupc did not install the pair (is a port name already in use?)");
    }

    if !cli.quiet {
        let new_pairs: Vec<PortPair> = manager
            .pairs()
            .into_iter()
            .filter(|pair| !before.iter().any(|old| old.id == pair.id))
            .collect();
        eprintln!("{} Installed port pair", style("✓").green());
        print_pairs(&new_pairs);
    }
    Ok(())
}

/// Change command implementation.
pub(crate) fn cmd_change(
    cli: &Cli,
    manager: &NullModemManager,
    id: u32,
    order: PortOrder,
    options: &PortBuilder,
) -> Result<()> {
    let device = order.device_name(id);

    let pb = spinner(cli, &format!("Changing {device}..."));
    let changed = manager.change_pair(id, order, options);
    pb.finish_and_clear();

    if !changed.with_context(|| format!("Failed to change {device}"))? {
        bail!("setupc rejected the options for {device}");
    }

    if !cli.quiet {
        eprintln!("{} Changed {device}", style("✓").green());
        if let Some(pair) = manager.pair(id) {
            print_pairs(&[pair]);
        }
    }
    Ok(())
}

/// Remove command implementation.
pub(crate) fn cmd_remove(cli: &Cli, manager: &NullModemManager, id: u32) -> Result<()> {
    manager
        .list()
        .context("Failed to read installed port pairs")?;

    let pb = spinner(cli, &format!("Removing pair {id}..."));
    let removed = manager.remove_pair(id);
    pb.finish_and_clear();

    if !removed.with_context(|| format!("Failed to remove pair {id}"))? {
        bail!("setupc did not report pair {id} as fully removed");
    }

    if !cli.quiet {
        eprintln!("{} Removed pair {id}", style("✓").green());
    }
    Ok(())
}

/// Ask before removing `count` pairs.
fn confirm_remove_all(cli: &Cli, count: usize) -> Result<()> {
    if cli.non_interactive {
        return Err(
            CliError::Usage("remove-all needs --yes in non-interactive mode".to_string()).into(),
        );
    }
    if !std::io::stdin().is_terminal() {
        return Err(CliError::Usage(
            "remove-all needs --yes when stdin is not a terminal".to_string(),
        )
        .into());
    }

    let confirmed = Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt(format!("Remove all {count} port pair(s)?"))
        .default(false)
        .interact()
        .map_err(map_prompt_error)?;
    if confirmed {
        Ok(())
    } else {
        Err(CliError::Cancelled("Removal cancelled".to_string()).into())
    }
}

/// Remove-all command implementation.
pub(crate) fn cmd_remove_all(cli: &Cli, manager: &NullModemManager, yes: bool) -> Result<()> {
    let pairs = manager
        .list()
        .context("Failed to read installed port pairs")?;
    if pairs.is_empty() {
        if !cli.quiet {
            eprintln!("{} No port pairs installed", style("ℹ").blue());
        }
        return Ok(());
    }

    if !yes {
        confirm_remove_all(cli, pairs.len())?;
    }

    let pb = spinner(cli, &format!("Removing {} port pair(s)...", pairs.len()));
    let removed = manager.remove_all_pairs();
    pb.finish_and_clear();

    if !removed.context("Failed to remove port pairs")? {
        let left = manager.registry().ids();
        bail!("Not every pair was fully removed (still listed: {left:?})");
    }

    if !cli.quiet {
        eprintln!(
            "{} Removed {} port pair(s)",
            style("✓").green(),
            pairs.len()
        );
    }
    Ok(())
}
