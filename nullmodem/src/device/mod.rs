//! Device tokens and friendly-name records.
//!
//! Every com0com device is named by a token: `CNCBUS<n>` for a pair's bus and
//! `CNCA<n>` / `CNCB<n>` for its two ports.

use crate::port::PortOrder;

/// Common prefix of port device tokens (`CNCA0`, `CNCB0`).
pub const PORT_PREFIX: &str = "CNC";

/// Prefix of bus device tokens (`CNCBUS0`).
pub const BUS_PREFIX: &str = "CNCBUS";

/// Kind of device a friendly name belongs to.
///
/// Only ports have an order, so a bus record can never carry one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DeviceKind {
    /// The pair's bus device.
    Bus,
    /// One of the pair's ports.
    Port(PortOrder),
}

impl DeviceKind {
    /// Order of the port, `None` for the bus.
    pub fn order(&self) -> Option<PortOrder> {
        match self {
            Self::Bus => None,
            Self::Port(order) => Some(*order),
        }
    }
}

/// Split a device token into its kind and bus number.
///
/// Prefixes are matched case-insensitively; `CNCBUS` is tried before the
/// port prefixes so `CNCBUS1` is never read as port `B`.
pub fn classify_token(token: &str) -> Option<(DeviceKind, u32)> {
    let upper = token.to_ascii_uppercase();
    let (kind, digits) = if let Some(rest) = upper.strip_prefix(BUS_PREFIX) {
        (DeviceKind::Bus, rest)
    } else {
        let rest = upper.strip_prefix(PORT_PREFIX)?;
        let mut chars = rest.chars();
        let order = PortOrder::from_letter(chars.next()?)?;
        (DeviceKind::Port(order), chars.as_str())
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok().map(|id| (kind, id))
}

/// One line of `setupc listfnames` output.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FriendlyNameRecord {
    /// Bus number.
    pub id: u32,
    /// Raw device token, e.g. `CNCBUS5`.
    pub name: String,
    /// Friendly name without surrounding quotes.
    pub friendly_name: String,
    /// Bus or port.
    pub kind: DeviceKind,
}

impl FriendlyNameRecord {
    /// Order of the port, `None` for a bus record.
    pub fn order(&self) -> Option<PortOrder> {
        self.kind.order()
    }
}

/// Friendly names of one pair, gathered from its bus and port records.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PortPairFriendlyNames {
    /// Bus number.
    pub id: u32,
    /// Record of the bus device.
    pub bus: Option<FriendlyNameRecord>,
    /// Record of the first port.
    pub a: Option<FriendlyNameRecord>,
    /// Record of the second port.
    pub b: Option<FriendlyNameRecord>,
}

impl PortPairFriendlyNames {
    /// An empty group for bus `id`.
    pub fn new(id: u32) -> Self {
        Self {
            id,
            bus: None,
            a: None,
            b: None,
        }
    }

    /// Slot for a record of the given kind.
    pub fn slot_mut(&mut self, kind: DeviceKind) -> &mut Option<FriendlyNameRecord> {
        match kind {
            DeviceKind::Bus => &mut self.bus,
            DeviceKind::Port(PortOrder::A) => &mut self.a,
            DeviceKind::Port(PortOrder::B) => &mut self.b,
        }
    }

    /// Friendly name of the bus, if listed.
    pub fn bus_friendly_name(&self) -> Option<&str> {
        self.bus.as_ref().map(|r| r.friendly_name.as_str())
    }
}
