//! Host-side discovery of the com0com installation.

use crate::error::{Error, Result};
use std::path::{Path, PathBuf};

/// Product name com0com registers its uninstaller under.
pub const PRODUCT_NAME: &str = "com0com";

/// File name of the control utility inside the install directory.
pub const UTILITY_FILE_NAME: &str = "setupc.exe";

/// Uninstall key of a native install.
#[cfg(windows)]
const UNINSTALL_KEY: &str = r"SOFTWARE\Microsoft\Windows\CurrentVersion\Uninstall\com0com";

/// Uninstall key of a 32-bit install on 64-bit Windows.
#[cfg(windows)]
const UNINSTALL_KEY_WOW64: &str =
    r"SOFTWARE\WOW6432Node\Microsoft\Windows\CurrentVersion\Uninstall\com0com";

/// Finds the directory com0com is installed in.
pub trait InstallLocator {
    /// Install directory, or `None` when com0com is not installed.
    fn lookup_install_path(&self) -> Option<PathBuf>;
}

/// Reads the install location from the Windows uninstall registry.
///
/// Always returns `None` on other platforms.
#[derive(Debug, Clone, Copy, Default)]
pub struct RegistryLocator;

#[cfg(windows)]
impl RegistryLocator {
    fn read_install_location(key: &str) -> Option<PathBuf> {
        use winreg::RegKey;
        use winreg::enums::HKEY_LOCAL_MACHINE;

        let hklm = RegKey::predef(HKEY_LOCAL_MACHINE);
        let uninstall = hklm.open_subkey(key).ok()?;
        let location: String = uninstall.get_value("InstallLocation").ok()?;
        let location = location.trim();
        (!location.is_empty()).then(|| PathBuf::from(location))
    }
}

impl InstallLocator for RegistryLocator {
    #[cfg(windows)]
    fn lookup_install_path(&self) -> Option<PathBuf> {
        let found = Self::read_install_location(UNINSTALL_KEY)
            .or_else(|| Self::read_install_location(UNINSTALL_KEY_WOW64));
        match &found {
            Some(path) => log::debug!("{PRODUCT_NAME} install location: {}", path.display()),
            None => log::debug!("{PRODUCT_NAME} not found in uninstall registry"),
        }
        found
    }

    #[cfg(not(windows))]
    fn lookup_install_path(&self) -> Option<PathBuf> {
        log::debug!("{PRODUCT_NAME} registry lookup is only available on Windows");
        None
    }
}

/// A fixed, caller-chosen install directory.
#[derive(Debug, Clone)]
pub struct FixedLocator(pub PathBuf);

impl InstallLocator for FixedLocator {
    fn lookup_install_path(&self) -> Option<PathBuf> {
        Some(self.0.clone())
    }
}

/// Path of the control utility under `root`.
///
/// `root` must be an existing directory that contains `setupc.exe`.
pub fn resolve_utility(root: &Path) -> Result<PathBuf> {
    if !root.is_dir() {
        return Err(Error::InstallationNotFound(format!(
            "{} is not a directory",
            root.display()
        )));
    }
    let utility = root.join(UTILITY_FILE_NAME);
    if !utility.is_file() {
        return Err(Error::InstallationNotFound(format!(
            "{UTILITY_FILE_NAME} not found in {}",
            root.display()
        )));
    }
    Ok(utility)
}
