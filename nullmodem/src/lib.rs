//! # nullmodem
//!
//! A library for managing com0com virtual null-modem port pairs.
//!
//! com0com ships a console utility, `setupc.exe`, that installs, changes and
//! removes pairs of cross-connected virtual serial ports. This crate drives
//! that utility and keeps an in-memory picture of the installed pairs:
//!
//! - Locating the installation and `setupc.exe`
//! - Building endpoint option strings (`PortName=COM5,EmuBR=yes`)
//! - Parsing `list`, `listfnames` and `busynames` output
//! - Reading install/change/remove outcomes from the utility's text
//! - A registry of pairs that is resynced after every mutation
//!
//! ## Terminology
//!
//! A *pair* is a bus `CNCBUS<n>` with two endpoints `CNCA<n>` and `CNCB<n>`.
//! `n` is the pair's identity. Each endpoint carries a user-visible port name
//! such as `COM5`.
//!
//! ## Features
//!
//! - `serde`: Serialization support for data types
//!
//! ## Example
//!
//! ```rust,no_run
//! use nullmodem::{ManagerConfig, NullModemManager, PortOrder, PortBuilder};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let manager = NullModemManager::with_root(
//!         r"C:\Program Files (x86)\com0com",
//!         &ManagerConfig::default(),
//!     )?;
//!
//!     for pair in manager.list()? {
//!         let (a, b) = pair.port_names();
//!         println!("{}: {a} <-> {b}", pair.name);
//!     }
//!
//!     let mut options = PortBuilder::new();
//!     options.emulate_baud_rate(true);
//!     manager.change_pair(0, PortOrder::A, &options)?;
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod device;
pub mod error;
pub mod exec;
pub mod host;
pub mod manager;
pub mod port;
pub mod protocol;
pub mod registry;

// Re-exports for convenience
pub use {
    device::{DeviceKind, FriendlyNameRecord, PortPairFriendlyNames},
    error::{Error, Result},
    exec::{ExecOutput, Executor, ProcessExecutor},
    host::{FixedLocator, InstallLocator, RegistryLocator},
    manager::{ManagerConfig, NullModemManager, PairState},
    port::{PortBuilder, PortDescriptor, PortOrder, PortPair, Signal, SignalSource},
    protocol::SetupCommand,
    registry::PairRegistry,
};
