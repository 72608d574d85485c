//! Port configuration builder.
//!
//! Collects `key=value` options for one endpoint and renders them in the
//! comma-joined form `setupc` expects, e.g. `PortName=COM5,EmuBR=yes`.
//!
//! ## Example
//!
//! ```rust
//! use nullmodem::PortBuilder;
//!
//! let mut a = PortBuilder::new();
//! a.port_name("COM5").emulate_baud_rate(true).ring_indicator(false);
//! assert_eq!(a.render().unwrap(), "PortName=COM5,EmuBR=yes,ri=!on");
//! ```

use super::Signal;
use crate::error::{Error, Result};
use std::str::FromStr;

/// Builder for the option string of one endpoint.
///
/// Keys are case-sensitive. Setting a key again replaces its value but keeps
/// the position where it was first inserted, so rendering is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PortBuilder {
    options: Vec<(String, String)>,
}

fn yes_no(enable: bool) -> &'static str {
    if enable { "yes" } else { "no" }
}

impl PortBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an option, replacing any previous value for `key`.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        let key = key.into();
        let value = value.into();
        match self.options.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => *existing = value,
            None => self.options.push((key, value)),
        }
        self
    }

    /// Current value of `key`, if set.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.options
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Remove every option.
    pub fn reset(&mut self) {
        self.options.clear();
    }

    /// Number of options set.
    pub fn len(&self) -> usize {
        self.options.len()
    }

    /// Whether no option is set.
    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }

    /// Render as `key1=value1,key2=value2,...` in first-insertion order.
    ///
    /// An empty builder is rejected with [`Error::EmptyConfiguration`].
    pub fn render(&self) -> Result<String> {
        if self.options.is_empty() {
            return Err(Error::EmptyConfiguration);
        }
        Ok(self
            .options
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(","))
    }

    /// Port name, e.g. `COM5`.
    pub fn port_name(&mut self, name: impl Into<String>) -> &mut Self {
        self.set("PortName", name)
    }

    /// Enable or disable baud rate emulation (`EmuBR`).
    pub fn emulate_baud_rate(&mut self, enable: bool) -> &mut Self {
        self.set("EmuBR", yes_no(enable))
    }

    /// Enable or disable buffer overrun emulation (`EmuOverrun`).
    pub fn emulate_overrun(&mut self, enable: bool) -> &mut Self {
        self.set("EmuOverrun", yes_no(enable))
    }

    /// Enable or disable plug-in mode.
    pub fn plug_in_mode(&mut self, enable: bool) -> &mut Self {
        self.set("PlugInMode", yes_no(enable))
    }

    /// Enable or disable exclusive mode.
    pub fn exclusive_mode(&mut self, enable: bool) -> &mut Self {
        self.set("ExclusiveMode", yes_no(enable))
    }

    /// Enable or disable hidden mode.
    pub fn hidden_mode(&mut self, enable: bool) -> &mut Self {
        self.set("HiddenMode", yes_no(enable))
    }

    /// Enable or disable passing all data bits.
    pub fn all_data_bits(&mut self, enable: bool) -> &mut Self {
        self.set("AllDataBits", yes_no(enable))
    }

    /// Tie the ring indicator permanently on or off.
    ///
    /// Unlike the other switches this takes `on` / `!on`, not `yes` / `no`.
    pub fn ring_indicator(&mut self, enable: bool) -> &mut Self {
        self.set("ri", if enable { "on" } else { "!on" })
    }

    /// CTS wiring.
    pub fn cts(&mut self, signal: Signal) -> &mut Self {
        self.set("cts", signal.to_string())
    }

    /// DSR wiring.
    pub fn dsr(&mut self, signal: Signal) -> &mut Self {
        self.set("dsr", signal.to_string())
    }

    /// DCD wiring.
    pub fn dcd(&mut self, signal: Signal) -> &mut Self {
        self.set("dcd", signal.to_string())
    }

    /// RI wiring.
    pub fn ri(&mut self, signal: Signal) -> &mut Self {
        self.set("ri", signal.to_string())
    }

    /// Probability of corrupting a transmitted byte (`EmuNoise`).
    pub fn emulate_noise(&mut self, probability: f32) -> &mut Self {
        self.set("EmuNoise", probability.to_string())
    }

    /// Additional read total timeout in milliseconds (`AddRTTO`).
    pub fn add_rtto(&mut self, millis: u32) -> &mut Self {
        self.set("AddRTTO", millis.to_string())
    }

    /// Additional read interval timeout in milliseconds (`AddRITO`).
    pub fn add_rito(&mut self, millis: u32) -> &mut Self {
        self.set("AddRITO", millis.to_string())
    }
}

impl FromStr for PortBuilder {
    type Err = Error;

    /// Parse `key=value,key=value` back into a builder.
    fn from_str(s: &str) -> Result<Self> {
        let mut builder = Self::new();
        for segment in s.split(',').map(str::trim).filter(|seg| !seg.is_empty()) {
            let (key, value) = segment
                .split_once('=')
                .ok_or_else(|| Error::Config(format!("expected key=value, got '{segment}'")))?;
            let key = key.trim();
            if key.is_empty() {
                return Err(Error::Config(format!("missing key in '{segment}'")));
            }
            builder.set(key, value.trim());
        }
        if builder.is_empty() {
            return Err(Error::Config("port configuration is empty".to_string()));
        }
        Ok(builder)
    }
}
