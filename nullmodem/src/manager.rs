//! Port pair manager.
//!
//! [`NullModemManager`] drives `setupc` and keeps a [`PairRegistry`] in step
//! with the driver. Every mutating operation has the same shape:
//!
//! ```text
//! pre-flight check (no I/O)
//!   -> run setupc
//!   -> read the outcome from its output
//!   -> resync the registry with `list`, whatever happened above
//! ```
//!
//! so the registry is never stale when a call returns, even when the call
//! itself failed.
//!
//! ## Example
//!
//! ```rust,no_run
//! use nullmodem::{ManagerConfig, NullModemManager, PortBuilder};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let manager = NullModemManager::from_registry(&ManagerConfig::default())?;
//!     manager.list()?;
//!
//!     let mut a = PortBuilder::new();
//!     a.port_name("COM5").emulate_baud_rate(true);
//!     let mut b = PortBuilder::new();
//!     b.port_name("COM6");
//!
//!     if manager.add_pair(&a, &b, None)? {
//!         for pair in manager.pairs() {
//!             println!("{}: {:?}", pair.name, pair.port_names());
//!         }
//!     }
//!     Ok(())
//! }
//! ```

use crate::device::{FriendlyNameRecord, PortPairFriendlyNames};
use crate::error::{Error, Result};
use crate::exec::{DEFAULT_TIMEOUT, ExecOutput, Executor, ProcessExecutor};
use crate::host::{FixedLocator, InstallLocator, RegistryLocator, resolve_utility};
use crate::port::{PortBuilder, PortDescriptor, PortOrder, PortPair};
use crate::protocol::listing::{parse_busy_names, parse_detailed_list, parse_friendly_names};
use crate::protocol::outcome::{
    count_removed_lines, is_change_rejected, is_install_dialog_failure, is_remove_complete,
};
use crate::protocol::SetupCommand;
use crate::registry::PairRegistry;
use log::{debug, info, warn};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Default file `setupc` writes its log to, relative to the current directory.
pub const DEFAULT_LOG_FILE: &str = "nme.log";

/// Default port-name prefix for `busynames`.
pub const DEFAULT_BUSY_PREFIX: &str = "COM";

/// Manager configuration.
#[derive(Debug, Clone)]
pub struct ManagerConfig {
    /// Time budget per `setupc` run (used by the default executor).
    pub timeout: Duration,
    /// File passed to `setupc --output`.
    pub log_file: PathBuf,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            log_file: PathBuf::from(DEFAULT_LOG_FILE),
        }
    }
}

impl ManagerConfig {
    /// Set the time budget per run.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the `--output` log file.
    #[must_use]
    pub fn with_log_file(mut self, log_file: impl Into<PathBuf>) -> Self {
        self.log_file = log_file.into();
        self
    }
}

/// Lifecycle of a pair identity as seen by the manager.
///
/// `Absent -> Installing -> Present -> Removing -> Absent`, with
/// `ChangeInProgress` as a sub-state of `Present`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairState {
    /// Not known to the registry.
    Absent,
    /// An `install` for this id is running.
    Installing,
    /// Listed by the driver.
    Present,
    /// A `change` for this id is running.
    ChangeInProgress,
    /// A `remove` for this id is running.
    Removing,
}

impl PairState {
    /// Whether the pair counts as present (changing pairs still do).
    pub fn is_present(self) -> bool {
        matches!(self, Self::Present | Self::ChangeInProgress)
    }
}

impl fmt::Display for PairState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Absent => "absent",
            Self::Installing => "installing",
            Self::Present => "present",
            Self::ChangeInProgress => "changing",
            Self::Removing => "removing",
        };
        f.write_str(label)
    }
}

/// Marks an id as in transition until dropped.
struct Transition<'a> {
    states: &'a Mutex<BTreeMap<u32, PairState>>,
    id: u32,
}

impl Drop for Transition<'_> {
    fn drop(&mut self) {
        lock_ignoring_poison(self.states).remove(&self.id);
    }
}

fn lock_ignoring_poison<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Combine the result of an operation with the result of its cleanup step.
///
/// The operation's own error wins; a cleanup error behind it is only logged.
fn after_cleanup<T>(primary: Result<T>, cleanup: Result<()>, step: &str) -> Result<T> {
    match (primary, cleanup) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(e)) => Err(e),
        (Err(e), Ok(())) => Err(e),
        (Err(e), Err(cleanup_err)) => {
            warn!("{step} after failed operation also failed: {cleanup_err}");
            Err(e)
        },
    }
}

/// Group endpoints into pairs by bus id, ordered by id.
///
/// A pair with only one listed endpoint is kept; the same endpoint listed
/// twice is malformed output.
fn group_endpoints(endpoints: Vec<PortDescriptor>) -> Result<Vec<PortPair>> {
    let mut pairs: BTreeMap<u32, PortPair> = BTreeMap::new();
    for port in endpoints {
        let pair = pairs
            .entry(port.bus_id)
            .or_insert_with(|| PortPair::new(port.bus_id));
        let slot = pair.endpoint_mut(port.order);
        if slot.is_some() {
            return Err(Error::malformed(
                &port.device_name,
                "endpoint listed more than once",
            ));
        }
        *slot = Some(port);
    }
    Ok(pairs.into_values().collect())
}

/// Group friendly-name records into one entry per bus id, ordered by id.
fn group_friendly_names(records: Vec<FriendlyNameRecord>) -> Result<Vec<PortPairFriendlyNames>> {
    let mut groups: BTreeMap<u32, PortPairFriendlyNames> = BTreeMap::new();
    for record in records {
        let group = groups
            .entry(record.id)
            .or_insert_with(|| PortPairFriendlyNames::new(record.id));
        let slot = group.slot_mut(record.kind);
        if slot.is_some() {
            return Err(Error::malformed(
                &record.name,
                "friendly name listed more than once",
            ));
        }
        *slot = Some(record);
    }
    Ok(groups.into_values().collect())
}

/// Manages com0com port pairs through `setupc`.
///
/// `setupc` runs are serialized by one lock held from building the command
/// until the registry is updated. Reads of the registry never take it.
pub struct NullModemManager {
    root: PathBuf,
    utility: PathBuf,
    log_file: PathBuf,
    executor: Box<dyn Executor>,
    registry: Arc<PairRegistry>,
    command_lock: Mutex<()>,
    transitions: Mutex<BTreeMap<u32, PairState>>,
}

impl fmt::Debug for NullModemManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NullModemManager")
            .field("root", &self.root)
            .field("utility", &self.utility)
            .field("log_file", &self.log_file)
            .field("pairs", &self.registry.len())
            .finish_non_exhaustive()
    }
}

impl NullModemManager {
    /// Create a manager for the installation found by `locator`.
    ///
    /// Fails with [`Error::InstallationNotFound`] when the locator finds
    /// nothing or the directory has no `setupc.exe`. The registry starts
    /// empty; call [`Self::list`] to populate it.
    pub fn new(
        locator: &dyn InstallLocator,
        executor: Box<dyn Executor>,
        config: &ManagerConfig,
    ) -> Result<Self> {
        let root = locator.lookup_install_path().ok_or_else(|| {
            Error::InstallationNotFound("install location is not registered".to_string())
        })?;
        let utility = resolve_utility(&root)?;
        let log_file = if config.log_file.is_absolute() {
            config.log_file.clone()
        } else {
            std::env::current_dir()?.join(&config.log_file)
        };
        debug!(
            "Using {} (log: {})",
            utility.display(),
            log_file.display()
        );

        Ok(Self {
            root,
            utility,
            log_file,
            executor,
            registry: Arc::new(PairRegistry::new()),
            command_lock: Mutex::new(()),
            transitions: Mutex::new(BTreeMap::new()),
        })
    }

    /// Create a manager for the installation recorded in the Windows registry.
    pub fn from_registry(config: &ManagerConfig) -> Result<Self> {
        Self::new(
            &RegistryLocator,
            Box::new(ProcessExecutor::new(config.timeout)),
            config,
        )
    }

    /// Create a manager for an installation in `root`.
    pub fn with_root(root: impl Into<PathBuf>, config: &ManagerConfig) -> Result<Self> {
        Self::new(
            &FixedLocator(root.into()),
            Box::new(ProcessExecutor::new(config.timeout)),
            config,
        )
    }

    /// Use `registry` instead of the manager's own, e.g. to share it.
    #[must_use]
    pub fn with_registry(mut self, registry: Arc<PairRegistry>) -> Self {
        self.registry = registry;
        self
    }

    /// Install directory.
    pub fn install_root(&self) -> &Path {
        &self.root
    }

    /// Path of `setupc.exe`.
    pub fn utility_path(&self) -> &Path {
        &self.utility
    }

    /// File passed to `--output`.
    pub fn log_file(&self) -> &Path {
        &self.log_file
    }

    /// Shared handle to the registry.
    pub fn registry(&self) -> Arc<PairRegistry> {
        Arc::clone(&self.registry)
    }

    /// Pairs as of the last listing, ordered by id.
    pub fn pairs(&self) -> Vec<PortPair> {
        self.registry.all()
    }

    /// Pair `id` as of the last listing.
    pub fn pair(&self, id: u32) -> Option<PortPair> {
        self.registry.get(id)
    }

    /// Lifecycle state of `id`.
    pub fn state(&self, id: u32) -> PairState {
        if let Some(state) = lock_ignoring_poison(&self.transitions).get(&id) {
            return *state;
        }
        if self.registry.contains(id) {
            PairState::Present
        } else {
            PairState::Absent
        }
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        lock_ignoring_poison(&self.command_lock)
    }

    fn begin(&self, id: u32, state: PairState) -> Transition<'_> {
        lock_ignoring_poison(&self.transitions).insert(id, state);
        Transition {
            states: &self.transitions,
            id,
        }
    }

    fn run(&self, command: &SetupCommand) -> Result<ExecOutput> {
        let line = command.operation_args().join(" ");
        if command.is_mutating() {
            info!("setupc {line}");
        } else {
            debug!("setupc {line}");
        }
        let args = command.to_args(&self.log_file);
        self.executor.execute(&self.utility, &self.root, &args)
    }

    fn list_locked(&self) -> Result<Vec<PortPair>> {
        let output = self.run(&SetupCommand::List)?;
        let pairs = group_endpoints(parse_detailed_list(&output.stdout)?)?;
        self.registry.replace_all(pairs.iter().cloned());
        Ok(pairs)
    }

    /// Resync the registry after `outcome`, whatever it was.
    fn resync_after<T>(&self, outcome: Result<T>) -> Result<T> {
        let resync = self.list_locked().map(|_| ());
        after_cleanup(outcome, resync, "Resync")
    }

    fn update_friendly_names_locked(&self) -> Result<()> {
        self.run(&SetupCommand::UpdateFriendlyNames).map(|_| ())
    }

    fn remove_locked(&self, id: u32) -> Result<bool> {
        let _transition = self.begin(id, PairState::Removing);
        let output = self.run(&SetupCommand::Remove { id })?;
        let removed = is_remove_complete(&output.stdout);
        if removed {
            info!("Removed pair {id}");
        } else {
            warn!(
                "Removing pair {id} removed {} device(s), expected 3",
                count_removed_lines(&output.stdout)
            );
        }
        Ok(removed)
    }

    /// Output of `setupc help`, verbatim.
    pub fn help(&self) -> Result<String> {
        let _guard = self.lock();
        Ok(self.run(&SetupCommand::Help)?.stdout)
    }

    /// List the driver's pairs and replace the registry with them.
    ///
    /// On error the registry keeps its previous snapshot.
    pub fn list(&self) -> Result<Vec<PortPair>> {
        let _guard = self.lock();
        self.list_locked()
    }

    /// List friendly names per pair.
    ///
    /// The registry is resynced afterwards whether or not the listing worked.
    pub fn list_friendly_names(&self) -> Result<Vec<PortPairFriendlyNames>> {
        let _guard = self.lock();
        let names = self
            .run(&SetupCommand::ListFriendlyNames)
            .and_then(|output| parse_friendly_names(&output.stdout))
            .and_then(group_friendly_names);
        self.resync_after(names)
    }

    /// Ask the driver to regenerate friendly names. Pair state is untouched.
    pub fn update_friendly_names(&self) -> Result<()> {
        let _guard = self.lock();
        self.update_friendly_names_locked()
    }

    /// Port names in use that match `prefix` and an optional number.
    ///
    /// With no `filter` every name starting with `prefix` is listed.
    pub fn busy_names(&self, filter: Option<u32>, prefix: &str) -> Result<Vec<String>> {
        let _guard = self.lock();
        let output = self.run(&SetupCommand::busy_names(prefix, filter))?;
        Ok(parse_busy_names(&output.stdout))
    }

    /// Install a new pair with endpoint options `a` and `b`.
    ///
    /// With `id` set, the pair gets that bus number and the call fails with
    /// [`Error::DuplicateIdentity`] if the registry already has it. Returns
    /// `false` when `setupc` reports the install through a dialog (e.g. a
    /// port name already in use).
    pub fn add_pair(&self, a: &PortBuilder, b: &PortBuilder, id: Option<u32>) -> Result<bool> {
        let _guard = self.lock();
        if let Some(id) = id.filter(|id| self.registry.contains(*id)) {
            return Err(Error::DuplicateIdentity(id));
        }
        let command = SetupCommand::Install {
            id,
            a: a.render()?,
            b: b.render()?,
        };

        let _transition = id.map(|id| self.begin(id, PairState::Installing));
        let installed = self.run(&command).map(|output| {
            let ok = !is_install_dialog_failure(&output.stdout);
            if !ok {
                warn!("setupc install stopped at a dialog, pair not created");
            }
            ok
        });
        let installed = after_cleanup(
            installed,
            self.update_friendly_names_locked(),
            "Friendly name update",
        );
        let installed = self.resync_after(installed);

        if matches!(installed, Ok(true)) {
            match id {
                Some(id) => info!("Installed pair {id}"),
                None => info!("Installed pair, registry now holds {}", self.registry.len()),
            }
        }
        installed
    }

    /// Change the options of endpoint `order` of pair `id`.
    ///
    /// Returns `false` when `setupc` rejects an option value.
    pub fn change_pair(&self, id: u32, order: PortOrder, config: &PortBuilder) -> Result<bool> {
        let _guard = self.lock();
        let command = SetupCommand::Change {
            id,
            order,
            options: config.render()?,
        };

        let _transition = self.begin(id, PairState::ChangeInProgress);
        let changed = self.run(&command).map(|output| {
            let ok = !is_change_rejected(&output.stdout);
            if ok {
                info!("Changed {}", order.device_name(id));
            } else {
                warn!("setupc rejected options for {}", order.device_name(id));
            }
            ok
        });
        self.resync_after(changed)
    }

    /// Remove pair `id`.
    ///
    /// `id` is checked against the registry as of the last listing, so call
    /// [`Self::list`] first if the driver may have changed since. Returns
    /// `false` unless the bus and both ports were reported removed.
    pub fn remove_pair(&self, id: u32) -> Result<bool> {
        let _guard = self.lock();
        if !self.registry.contains(id) {
            return Err(Error::UnknownIdentity(id));
        }
        let removed = self.remove_locked(id);
        self.resync_after(removed)
    }

    /// Remove every pair in the registry, one after another.
    ///
    /// Returns `true` only if every removal succeeded. A `false` removal does
    /// not stop the others; a hard error does. The registry is resynced once
    /// at the end.
    pub fn remove_all_pairs(&self) -> Result<bool> {
        let _guard = self.lock();
        let ids = self.registry.ids();
        let removed = ids
            .into_iter()
            .try_fold(true, |all, id| self.remove_locked(id).map(|ok| all & ok));
        self.resync_after(removed)
    }
}
