//! `setupc` command lines.
//!
//! Every invocation has the shape
//!
//! ```text
//! setupc.exe --output <logfile> --silent <operation> [operands...]
//! ```
//!
//! `--silent` suppresses the interactive dialogs the utility would otherwise
//! block on.

use crate::port::PortOrder;
use std::path::Path;

/// Pattern passed to `busynames` when no port number is given.
pub const BUSY_NAMES_WILDCARD: &str = "*?";

/// One `setupc` operation with its operands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetupCommand {
    /// `help`
    Help,
    /// `--detail-prms list`
    List,
    /// `--detail-prms listfnames`
    ListFriendlyNames,
    /// `updatefnames`
    UpdateFriendlyNames,
    /// `--detail-prms busynames <pattern>`
    BusyNames {
        /// Name pattern, e.g. `COM*?` or `COM5`.
        pattern: String,
    },
    /// `install [id] <a> <b>`
    Install {
        /// Explicit bus number; the driver picks one when `None`.
        id: Option<u32>,
        /// Rendered options of the first endpoint.
        a: String,
        /// Rendered options of the second endpoint.
        b: String,
    },
    /// `change CNC<order><id> <options>`
    Change {
        /// Bus number.
        id: u32,
        /// Endpoint to change.
        order: PortOrder,
        /// Rendered options.
        options: String,
    },
    /// `remove <id>`
    Remove {
        /// Bus number.
        id: u32,
    },
}

impl SetupCommand {
    /// `busynames` pattern for `prefix` and an optional port number.
    pub fn busy_names(prefix: &str, filter: Option<u32>) -> Self {
        let pattern = match filter {
            Some(n) => format!("{prefix}{n}"),
            None => format!("{prefix}{BUSY_NAMES_WILDCARD}"),
        };
        Self::BusyNames { pattern }
    }

    /// Operation-specific arguments.
    pub fn operation_args(&self) -> Vec<String> {
        match self {
            Self::Help => vec!["help".to_string()],
            Self::List => vec!["--detail-prms".to_string(), "list".to_string()],
            Self::ListFriendlyNames => {
                vec!["--detail-prms".to_string(), "listfnames".to_string()]
            },
            Self::UpdateFriendlyNames => vec!["updatefnames".to_string()],
            Self::BusyNames { pattern } => vec![
                "--detail-prms".to_string(),
                "busynames".to_string(),
                pattern.clone(),
            ],
            Self::Install { id, a, b } => {
                let mut args = vec!["install".to_string()];
                if let Some(id) = id {
                    args.push(id.to_string());
                }
                args.push(a.clone());
                args.push(b.clone());
                args
            },
            Self::Change { id, order, options } => vec![
                "change".to_string(),
                order.device_name(*id),
                options.clone(),
            ],
            Self::Remove { id } => vec!["remove".to_string(), id.to_string()],
        }
    }

    /// Full argument list including the fixed `--output` / `--silent` prefix.
    pub fn to_args(&self, log_file: &Path) -> Vec<String> {
        let mut args = vec![
            "--output".to_string(),
            log_file.display().to_string(),
            "--silent".to_string(),
        ];
        args.extend(self.operation_args());
        args
    }

    /// Whether the command changes driver state.
    pub fn is_mutating(&self) -> bool {
        matches!(
            self,
            Self::Install { .. } | Self::Change { .. } | Self::Remove { .. }
        )
    }
}
