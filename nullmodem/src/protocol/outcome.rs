//! Success heuristics for mutating `setupc` commands.
//!
//! `setupc` does not report refused operations through its exit code, so the
//! outcome is read from its output. Each check is a separate predicate so it
//! can be replaced once a more reliable signal is available.

/// Marker printed when `install` hits a dialog, e.g. a port name conflict.
pub const INSTALL_DIALOG_MARKER: &str = "DIALOG";

/// Marker printed when `change` rejects an option value.
pub const CHANGE_INVALID_MARKER: &str = "Invalid";

/// Prefix of the lines `remove` prints per removed device.
pub const REMOVED_LINE_PREFIX: &str = "Removed";

/// Devices removed with one pair: its bus and both ports.
pub const REMOVED_LINES_PER_PAIR: usize = 3;

/// Whether `install` output reports a failure through an interactive dialog.
///
/// ```text
/// DIALOG: {
///     The port name COM3 is already used for other device \Device\com0com11.
/// } ... ERROR
///
/// Install not completed!
/// ```
pub fn is_install_dialog_failure(output: &str) -> bool {
    output.contains(INSTALL_DIALOG_MARKER)
}

/// Whether `change` output reports a rejected option value.
pub fn is_change_rejected(output: &str) -> bool {
    output.contains(CHANGE_INVALID_MARKER)
}

/// Number of lines of `remove` output that start with `Removed`.
///
/// ```text
/// Disabled  root\com0com \Device\00000278
/// Removed  root\com0com \Device\00000278
/// Removed CNCA2 com0com\port
/// Removed CNCB2 com0com\port
/// ComDB: COM5 - released
/// ComDB: COM6 - released
/// ```
pub fn count_removed_lines(output: &str) -> usize {
    output
        .lines()
        .filter(|line| line.starts_with(REMOVED_LINE_PREFIX))
        .count()
}

/// Whether `remove` output shows the bus and both ports removed.
pub fn is_remove_complete(output: &str) -> bool {
    count_removed_lines(output) == REMOVED_LINES_PER_PAIR
}

#[cfg(test)]
mod tests {
    use super::*;

    const REMOVE_OK: &str = "Disabled  root\\com0com \\Device\\00000278\r\n\
Removed  root\\com0com \\Device\\00000278\r\n\
Removed CNCA2 com0com\\port\r\n\
Removed CNCB2 com0com\\port\r\n\
ComDB: COM5 - released\r\n\
ComDB: COM6 - released\r\n";

    #[test]
    fn test_install_dialog_failure() {
        let failed = "CNCA2 PortName=COM5\nDIALOG: {\n  The port name COM3 is already used\n} ... ERROR\n\nInstall not completed!\n";
        assert!(is_install_dialog_failure(failed));

        let ok = "CNCA1 PortName=COM3\nCNCB1 PortName=COM4\nComDB: COM3 - logged as \"in use\"\n";
        assert!(!is_install_dialog_failure(ok));
    }

    #[test]
    fn test_change_rejected() {
        let rejected = "       CNCA0 PortName=COM1,EmuBR=yes\nInvalid value 'ye1s'\n       CNCB0 PortName=COM2\n";
        assert!(is_change_rejected(rejected));
        assert!(!is_change_rejected("       CNCA0 PortName=COM1,EmuBR=yes,EmuOverrun=yes\n"));
    }

    #[test]
    fn test_remove_complete_needs_exactly_three() {
        assert_eq!(count_removed_lines(REMOVE_OK), 3);
        assert!(is_remove_complete(REMOVE_OK));

        let partial = "Removed  root\\com0com \\Device\\00000278\nRemoved CNCA2 com0com\\port\n";
        assert_eq!(count_removed_lines(partial), 2);
        assert!(!is_remove_complete(partial));

        let extra = format!("{REMOVE_OK}Removed CNCA9 com0com\\port\n");
        assert!(!is_remove_complete(&extra));
    }

    #[test]
    fn test_remove_line_must_start_with_marker() {
        assert_eq!(count_removed_lines("Not Removed\nwas Removed\n"), 0);
        assert_eq!(count_removed_lines("   Removed CNCA2 com0com\\port\n"), 0);
        assert_eq!(count_removed_lines("\tRemoved CNCB2\nRemoved CNCA2\n"), 1);
        assert_eq!(count_removed_lines(""), 0);
    }
}
