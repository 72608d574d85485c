//! Virtual port pair data model.
//!
//! com0com exposes each pair as a bus (`CNCBUS<n>`) with two endpoints,
//! `CNCA<n>` and `CNCB<n>`. Both endpoints share the bus number, which is also
//! the pair's identity.
//!
//! ```text
//!            CNCBUS0
//!     +--------+--------+
//!     |                 |
//!  CNCA0 (COM1) <-> CNCB0 (COM2)
//! ```

pub mod builder;

use crate::device::{BUS_PREFIX, PORT_PREFIX};
use crate::error::{Error, Result};
use std::fmt;
use std::str::FromStr;

pub use builder::PortBuilder;

/// Which side of a pair an endpoint is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PortOrder {
    /// First endpoint (`CNCA<n>`).
    A,
    /// Second endpoint (`CNCB<n>`).
    B,
}

impl PortOrder {
    /// The letter used in device tokens.
    pub fn letter(self) -> char {
        match self {
            Self::A => 'A',
            Self::B => 'B',
        }
    }

    /// Parse a device-token order letter.
    pub fn from_letter(c: char) -> Option<Self> {
        match c {
            'A' | 'a' => Some(Self::A),
            'B' | 'b' => Some(Self::B),
            _ => None,
        }
    }

    /// The device name of this endpoint on bus `id`, e.g. `CNCB3`.
    pub fn device_name(self, id: u32) -> String {
        format!("{PORT_PREFIX}{}{id}", self.letter())
    }
}

impl fmt::Display for PortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

impl FromStr for PortOrder {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut chars = s.trim().chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Self::from_letter(c)
                .ok_or_else(|| Error::Config(format!("invalid port order '{s}', expected A or B"))),
            _ => Err(Error::Config(format!(
                "invalid port order '{s}', expected A or B"
            ))),
        }
    }
}

/// Pin a modem input line is wired to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SignalSource {
    /// Remote RTS.
    Rrts,
    /// Local RTS.
    Lrts,
    /// Remote DTR.
    Rdtr,
    /// Local DTR.
    Ldtr,
    /// Remote OUT1.
    Rout1,
    /// Local OUT1.
    Lout1,
    /// Remote OUT2.
    Rout2,
    /// Local OUT2.
    Lout2,
    /// Remote port opened.
    Ropen,
    /// Local port opened.
    Lopen,
    /// Always on.
    On,
}

impl SignalSource {
    /// Token used by the control utility.
    pub fn token(self) -> &'static str {
        match self {
            Self::Rrts => "rrts",
            Self::Lrts => "lrts",
            Self::Rdtr => "rdtr",
            Self::Ldtr => "ldtr",
            Self::Rout1 => "rout1",
            Self::Lout1 => "lout1",
            Self::Rout2 => "rout2",
            Self::Lout2 => "lout2",
            Self::Ropen => "ropen",
            Self::Lopen => "lopen",
            Self::On => "on",
        }
    }

    /// Parse a control-utility token.
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "rrts" => Some(Self::Rrts),
            "lrts" => Some(Self::Lrts),
            "rdtr" => Some(Self::Rdtr),
            "ldtr" => Some(Self::Ldtr),
            "rout1" => Some(Self::Rout1),
            "lout1" => Some(Self::Lout1),
            "rout2" => Some(Self::Rout2),
            "lout2" => Some(Self::Lout2),
            "ropen" => Some(Self::Ropen),
            "lopen" => Some(Self::Lopen),
            "on" => Some(Self::On),
            _ => None,
        }
    }
}

/// Wiring of one modem input line (`cts`, `dsr`, `dcd` or `ri`).
///
/// Rendered as `[!]<source>`, where `!` inverts the line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Signal {
    /// Pin the line follows.
    pub source: SignalSource,
    /// Whether the line is inverted.
    pub inverted: bool,
}

impl Signal {
    /// A line following `source`.
    pub const fn new(source: SignalSource) -> Self {
        Self {
            source,
            inverted: false,
        }
    }

    /// A line following the inverse of `source`.
    pub const fn inverted(source: SignalSource) -> Self {
        Self {
            source,
            inverted: true,
        }
    }

    /// Default CTS wiring (`rrts`).
    pub const DEFAULT_CTS: Self = Self::new(SignalSource::Rrts);
    /// Default DSR wiring (`rdtr`).
    pub const DEFAULT_DSR: Self = Self::new(SignalSource::Rdtr);
    /// Default DCD wiring (`rdtr`).
    pub const DEFAULT_DCD: Self = Self::new(SignalSource::Rdtr);
    /// Default RI wiring (`!on`, never asserted).
    pub const DEFAULT_RI: Self = Self::inverted(SignalSource::On);
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.inverted {
            write!(f, "!{}", self.source.token())
        } else {
            f.write_str(self.source.token())
        }
    }
}

impl FromStr for Signal {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (inverted, token) = match s.strip_prefix('!') {
            Some(rest) => (true, rest),
            None => (false, s),
        };
        let source = SignalSource::from_token(token)
            .ok_or_else(|| Error::Config(format!("unknown signal source '{s}'")))?;
        Ok(Self { source, inverted })
    }
}

/// State of one endpoint as reported by `setupc --detail-prms list`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PortDescriptor {
    /// Bus number shared by both endpoints of the pair.
    pub bus_id: u32,
    /// Side of the pair.
    pub order: PortOrder,
    /// Driver device name, e.g. `CNCA0`.
    pub device_name: String,
    /// User-visible port name, e.g. `COM1`.
    pub port_name: String,
    /// Baud rate emulation (`EmuBR`).
    pub emulate_baud_rate: bool,
    /// Buffer overrun emulation (`EmuOverrun`).
    pub emulate_overrun: bool,
    /// Plug-in mode: the port is only visible while its peer is open.
    pub plug_in_mode: bool,
    /// Exclusive mode: the port is hidden while open.
    pub exclusive_mode: bool,
    /// Hidden mode: the port is hidden from enumeration.
    pub hidden_mode: bool,
    /// All data bits are passed through regardless of byte size.
    pub all_data_bits: bool,
    /// CTS wiring.
    pub cts: Signal,
    /// DSR wiring.
    pub dsr: Signal,
    /// DCD wiring.
    pub dcd: Signal,
    /// RI wiring.
    pub ri: Signal,
    /// Probability of a transmitted byte being corrupted (`EmuNoise`).
    pub emulate_noise: f32,
    /// Additional read total timeout in ms (`AddRTTO`).
    pub add_rtto: u32,
    /// Additional read interval timeout in ms (`AddRITO`).
    pub add_rito: u32,
}

impl PortDescriptor {
    /// A descriptor with the driver's defaults for every option.
    pub fn new(bus_id: u32, order: PortOrder, port_name: impl Into<String>) -> Self {
        Self {
            bus_id,
            order,
            device_name: order.device_name(bus_id),
            port_name: port_name.into(),
            emulate_baud_rate: false,
            emulate_overrun: false,
            plug_in_mode: false,
            exclusive_mode: false,
            hidden_mode: false,
            all_data_bits: false,
            cts: Signal::DEFAULT_CTS,
            dsr: Signal::DEFAULT_DSR,
            dcd: Signal::DEFAULT_DCD,
            ri: Signal::DEFAULT_RI,
            emulate_noise: 0.0,
            add_rtto: 0,
            add_rito: 0,
        }
    }
}

/// A virtual port pair, keyed by its bus number.
///
/// Either endpoint may be missing when the driver lists only one side.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PortPair {
    /// Pair identity (the bus number).
    pub id: u32,
    /// Bus device name, `CNCBUS<id>`.
    pub name: String,
    /// First endpoint.
    pub a: Option<PortDescriptor>,
    /// Second endpoint.
    pub b: Option<PortDescriptor>,
}

impl PortPair {
    /// An empty pair with identity `id`.
    pub fn new(id: u32) -> Self {
        Self {
            id,
            name: format!("{BUS_PREFIX}{id}"),
            a: None,
            b: None,
        }
    }

    /// Endpoint on the given side.
    pub fn endpoint(&self, order: PortOrder) -> Option<&PortDescriptor> {
        match order {
            PortOrder::A => self.a.as_ref(),
            PortOrder::B => self.b.as_ref(),
        }
    }

    /// Mutable slot for the given side.
    pub fn endpoint_mut(&mut self, order: PortOrder) -> &mut Option<PortDescriptor> {
        match order {
            PortOrder::A => &mut self.a,
            PortOrder::B => &mut self.b,
        }
    }

    /// Whether both endpoints are present.
    pub fn is_complete(&self) -> bool {
        self.a.is_some() && self.b.is_some()
    }

    /// Port names of both sides, `-` for a missing side.
    pub fn port_names(&self) -> (&str, &str) {
        fn name(p: Option<&PortDescriptor>) -> &str {
            p.map_or("-", |d| d.port_name.as_str())
        }
        (name(self.a.as_ref()), name(self.b.as_ref()))
    }
}
