//! `setupc` control-utility protocol: command lines in, text out.

pub mod command;
pub mod listing;
pub mod outcome;

// Re-export common types
pub use command::SetupCommand;
pub use listing::{parse_busy_names, parse_detailed_list, parse_friendly_names};
pub use outcome::{
    count_removed_lines, is_change_rejected, is_install_dialog_failure, is_remove_complete,
};
