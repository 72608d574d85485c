//! Parsers for `setupc` listing output.
//!
//! The utility has no documented output grammar. All positional assumptions
//! about its lines live in this module.
//!
//! ## Detailed list (`--detail-prms list`)
//!
//! ```text
//! CNCA0 PortName=COM1,EmuBR=no,EmuOverrun=no,PlugInMode=no,ExclusiveMode=no,HiddenMode=no,AllDataBits=no,cts=rrts,dsr=rdtr,dcd=rdtr,ri=!on,EmuNoise=0,AddRTTO=0,AddRITO=0
//! CNCB0 PortName=COM2,EmuBR=no,...
//! ```
//!
//! ## Friendly names (`--detail-prms listfnames`)
//!
//! ```text
//! CNCBUS0 FriendlyName="com0com - bus for serial port pair emulator 0 (COM1 <-> COM2)"
//! CNCA0 FriendlyName="com0com - serial port emulator CNCA0 (COM1)"
//! CNCB0 FriendlyName="com0com - serial port emulator CNCB0 (COM2)"
//! ```

use crate::device::{DeviceKind, FriendlyNameRecord, classify_token};
use crate::error::{Error, Result};
use crate::port::{PortDescriptor, Signal};
use log::{debug, trace};

/// Leading fields of a detailed-list line, in the order they must appear.
pub const REQUIRED_FIELDS: [&str; 7] = [
    "PortName",
    "EmuBR",
    "EmuOverrun",
    "PlugInMode",
    "ExclusiveMode",
    "HiddenMode",
    "AllDataBits",
];

/// Number of fields in a fully detailed line.
pub const MAX_FIELDS: usize = 14;

/// Key of the single field of a friendly-name line.
pub const FRIENDLY_NAME_KEY: &str = "FriendlyName";

/// Non-empty, trimmed lines of `text`.
fn content_lines(text: &str) -> impl Iterator<Item = &str> {
    text.lines().map(str::trim).filter(|line| !line.is_empty())
}

/// Split `<token> <rest>` at the first whitespace.
fn split_token<'a>(line: &'a str, what: &str) -> Result<(&'a str, &'a str)> {
    line.split_once(char::is_whitespace)
        .map(|(token, rest)| (token, rest.trim()))
        .ok_or_else(|| Error::malformed(line, format!("missing {what} after device token")))
}

fn parse_flag(line: &str, key: &str, value: &str) -> Result<bool> {
    match value {
        "yes" => Ok(true),
        "no" => Ok(false),
        other => Err(Error::malformed(
            line,
            format!("{key} must be yes or no, got '{other}'"),
        )),
    }
}

fn parse_number<T: std::str::FromStr>(line: &str, key: &str, value: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| Error::malformed(line, format!("{key} is not a number: '{value}'")))
}

/// Parse one endpoint line of the detailed list.
pub fn parse_detailed_line(line: &str) -> Result<PortDescriptor> {
    let line = line.trim();
    let (token, options) = split_token(line, "options")?;

    let (bus_id, order) = match classify_token(token) {
        Some((DeviceKind::Port(order), id)) => (id, order),
        Some((DeviceKind::Bus, _)) => {
            return Err(Error::malformed(line, "bus token in port listing"));
        },
        None => {
            return Err(Error::malformed(
                line,
                format!("unrecognized device token '{token}'"),
            ));
        },
    };

    let fields: Vec<(&str, &str)> = options
        .split(',')
        .map(|field| {
            field
                .split_once('=')
                .map(|(k, v)| (k.trim(), v.trim()))
                .ok_or_else(|| Error::malformed(line, format!("field '{field}' has no value")))
        })
        .collect::<Result<_>>()?;

    if fields.len() < REQUIRED_FIELDS.len() || fields.len() > MAX_FIELDS {
        return Err(Error::malformed(
            line,
            format!(
                "expected {}..={MAX_FIELDS} fields, got {}",
                REQUIRED_FIELDS.len(),
                fields.len()
            ),
        ));
    }

    for (index, expected) in REQUIRED_FIELDS.iter().enumerate() {
        let (key, _) = fields[index];
        if key != *expected {
            return Err(Error::malformed(
                line,
                format!("field {index} should be {expected}, got '{key}'"),
            ));
        }
    }

    let port_name = fields[0].1;
    if port_name.is_empty() {
        return Err(Error::malformed(line, "empty PortName"));
    }

    let mut port = PortDescriptor::new(bus_id, order, port_name);
    port.device_name = token.to_string();
    port.emulate_baud_rate = parse_flag(line, "EmuBR", fields[1].1)?;
    port.emulate_overrun = parse_flag(line, "EmuOverrun", fields[2].1)?;
    port.plug_in_mode = parse_flag(line, "PlugInMode", fields[3].1)?;
    port.exclusive_mode = parse_flag(line, "ExclusiveMode", fields[4].1)?;
    port.hidden_mode = parse_flag(line, "HiddenMode", fields[5].1)?;
    port.all_data_bits = parse_flag(line, "AllDataBits", fields[6].1)?;

    for &(key, value) in &fields[REQUIRED_FIELDS.len()..] {
        let signal = |value: &str| {
            value
                .parse::<Signal>()
                .map_err(|_| Error::malformed(line, format!("invalid {key} wiring '{value}'")))
        };
        match key {
            "cts" => port.cts = signal(value)?,
            "dsr" => port.dsr = signal(value)?,
            "dcd" => port.dcd = signal(value)?,
            "ri" => port.ri = signal(value)?,
            "EmuNoise" => port.emulate_noise = parse_number(line, key, value)?,
            "AddRTTO" => port.add_rtto = parse_number(line, key, value)?,
            "AddRITO" => port.add_rito = parse_number(line, key, value)?,
            _ => debug!("Ignoring unknown field {key}={value} on {token}"),
        }
    }

    Ok(port)
}

/// Parse the output of `setupc --detail-prms list`.
///
/// Any malformed line aborts the whole parse.
pub fn parse_detailed_list(text: &str) -> Result<Vec<PortDescriptor>> {
    let ports = content_lines(text)
        .map(parse_detailed_line)
        .collect::<Result<Vec<_>>>()?;
    trace!("Parsed {} endpoint line(s)", ports.len());
    Ok(ports)
}

/// Parse one line of the friendly-name listing.
pub fn parse_friendly_name_line(line: &str) -> Result<FriendlyNameRecord> {
    let line = line.trim();
    let (token, assignment) = split_token(line, FRIENDLY_NAME_KEY)?;

    let (kind, id) = classify_token(token).ok_or_else(|| {
        Error::malformed(line, format!("unrecognized device token '{token}'"))
    })?;

    let (key, value) = assignment
        .split_once('=')
        .ok_or_else(|| Error::malformed(line, "missing '='"))?;
    if key.trim() != FRIENDLY_NAME_KEY {
        return Err(Error::malformed(
            line,
            format!("expected {FRIENDLY_NAME_KEY}, got '{}'", key.trim()),
        ));
    }

    let value = value.trim();
    let friendly_name = value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value);

    Ok(FriendlyNameRecord {
        id,
        name: token.to_string(),
        friendly_name: friendly_name.to_string(),
        kind,
    })
}

/// Parse the output of `setupc --detail-prms listfnames`.
///
/// Records are returned in output order; grouping per pair is left to the
/// caller.
pub fn parse_friendly_names(text: &str) -> Result<Vec<FriendlyNameRecord>> {
    content_lines(text).map(parse_friendly_name_line).collect()
}

/// Parse the output of `setupc busynames`: one or more names per line.
pub fn parse_busy_names(text: &str) -> Vec<String> {
    text.split_whitespace().map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::{PortOrder, SignalSource};

    const PAIR_0: &str = "CNCA0 PortName=COM1,EmuBR=no,EmuOverrun=no,PlugInMode=no,ExclusiveMode=no,HiddenMode=no,AllDataBits=no,cts=rrts,dsr=rdtr,dcd=rdtr,ri=!on,EmuNoise=0,AddRTTO=0,AddRITO=0\n\
CNCB0 PortName=COM2,EmuBR=no,EmuOverrun=no,PlugInMode=no,ExclusiveMode=no,HiddenMode=no,AllDataBits=no,cts=rrts,dsr=rdtr,dcd=rdtr,ri=!on,EmuNoise=0,AddRTTO=0,AddRITO=0\n";

    fn assert_malformed(result: Result<PortDescriptor>, fragment: &str) {
        match result {
            Err(Error::MalformedRecord { reason, .. }) => {
                assert!(reason.contains(fragment), "reason was: {reason}");
            },
            other => panic!("expected MalformedRecord, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_detailed_pair() {
        let ports = parse_detailed_list(PAIR_0).unwrap();
        assert_eq!(ports.len(), 2);

        assert_eq!(ports[0].bus_id, 0);
        assert_eq!(ports[0].order, PortOrder::A);
        assert_eq!(ports[0].device_name, "CNCA0");
        assert_eq!(ports[0].port_name, "COM1");
        assert!(!ports[0].emulate_baud_rate);
        assert_eq!(ports[0].ri, Signal::DEFAULT_RI);

        assert_eq!(ports[1].order, PortOrder::B);
        assert_eq!(ports[1].port_name, "COM2");
        assert!(!ports[1].emulate_baud_rate);
    }

    #[test]
    fn test_parse_detailed_flags_and_extras() {
        let line = "CNCB12 PortName=COM20,EmuBR=yes,EmuOverrun=yes,PlugInMode=no,ExclusiveMode=yes,HiddenMode=no,AllDataBits=yes,cts=!lrts,dsr=ropen,dcd=rdtr,ri=on,EmuNoise=0.001,AddRTTO=10,AddRITO=20";
        let port = parse_detailed_line(line).unwrap();
        assert_eq!(port.bus_id, 12);
        assert!(port.emulate_baud_rate);
        assert!(port.emulate_overrun);
        assert!(!port.plug_in_mode);
        assert!(port.exclusive_mode);
        assert!(!port.hidden_mode);
        assert!(port.all_data_bits);
        assert_eq!(port.cts, Signal::inverted(SignalSource::Lrts));
        assert_eq!(port.dsr, Signal::new(SignalSource::Ropen));
        assert_eq!(port.ri, Signal::new(SignalSource::On));
        assert!((port.emulate_noise - 0.001).abs() < f32::EPSILON);
        assert_eq!(port.add_rtto, 10);
        assert_eq!(port.add_rito, 20);
    }

    #[test]
    fn test_parse_detailed_required_fields_only() {
        let line = "  CNCA3 PortName=COM7,EmuBR=no,EmuOverrun=no,PlugInMode=no,ExclusiveMode=no,HiddenMode=yes,AllDataBits=no\r";
        let port = parse_detailed_line(line).unwrap();
        assert_eq!(port.port_name, "COM7");
        assert!(port.hidden_mode);
        assert_eq!(port.cts, Signal::DEFAULT_CTS);
        assert_eq!(port.add_rtto, 0);
    }

    #[test]
    fn test_parse_detailed_skips_blank_lines() {
        let text = format!("\r\n\n{PAIR_0}\n   \n");
        assert_eq!(parse_detailed_list(&text).unwrap().len(), 2);
        assert!(parse_detailed_list("").unwrap().is_empty());
    }

    #[test]
    fn test_parse_detailed_ignores_unknown_trailing_field() {
        let line = "CNCA1 PortName=COM3,EmuBR=no,EmuOverrun=no,PlugInMode=no,ExclusiveMode=no,HiddenMode=no,AllDataBits=no,Future=1";
        assert_eq!(parse_detailed_line(line).unwrap().port_name, "COM3");
    }

    #[test]
    fn test_parse_detailed_rejects_bad_order() {
        let line = "CNCC0 PortName=COM1,EmuBR=no,EmuOverrun=no,PlugInMode=no,ExclusiveMode=no,HiddenMode=no,AllDataBits=no";
        assert_malformed(parse_detailed_line(line), "unrecognized device token");
    }

    #[test]
    fn test_parse_detailed_rejects_non_numeric_id() {
        let line = "CNCAx PortName=COM1,EmuBR=no,EmuOverrun=no,PlugInMode=no,ExclusiveMode=no,HiddenMode=no,AllDataBits=no";
        assert_malformed(parse_detailed_line(line), "unrecognized device token");
    }

    #[test]
    fn test_parse_detailed_rejects_short_line() {
        assert_malformed(
            parse_detailed_line("CNCA0 PortName=COM1,EmuBR=yes"),
            "expected 7..=14 fields, got 2",
        );
        assert_malformed(parse_detailed_line("CNCA0"), "missing options");
    }

    #[test]
    fn test_parse_detailed_rejects_misplaced_field() {
        let line = "CNCA0 EmuBR=no,PortName=COM1,EmuOverrun=no,PlugInMode=no,ExclusiveMode=no,HiddenMode=no,AllDataBits=no";
        assert_malformed(parse_detailed_line(line), "field 0 should be PortName");
    }

    #[test]
    fn test_parse_detailed_rejects_bad_values() {
        let flag = "CNCA0 PortName=COM1,EmuBR=maybe,EmuOverrun=no,PlugInMode=no,ExclusiveMode=no,HiddenMode=no,AllDataBits=no";
        assert_malformed(parse_detailed_line(flag), "EmuBR must be yes or no");

        let signal = "CNCA0 PortName=COM1,EmuBR=no,EmuOverrun=no,PlugInMode=no,ExclusiveMode=no,HiddenMode=no,AllDataBits=no,cts=bogus";
        assert_malformed(parse_detailed_line(signal), "invalid cts wiring");

        let number = "CNCA0 PortName=COM1,EmuBR=no,EmuOverrun=no,PlugInMode=no,ExclusiveMode=no,HiddenMode=no,AllDataBits=no,AddRTTO=-1";
        assert_malformed(parse_detailed_line(number), "AddRTTO is not a number");

        let empty = "CNCA0 PortName=,EmuBR=no,EmuOverrun=no,PlugInMode=no,ExclusiveMode=no,HiddenMode=no,AllDataBits=no";
        assert_malformed(parse_detailed_line(empty), "empty PortName");
    }

    #[test]
    fn test_parse_detailed_rejects_bus_token() {
        let line = "CNCBUS0 PortName=COM1,EmuBR=no,EmuOverrun=no,PlugInMode=no,ExclusiveMode=no,HiddenMode=no,AllDataBits=no";
        assert_malformed(parse_detailed_line(line), "bus token");
    }

    #[test]
    fn test_parse_detailed_list_aborts_on_first_bad_line() {
        let text = format!("{PAIR_0}ComDB: COM3 - logged as \"in use\"\n");
        match parse_detailed_list(&text) {
            Err(Error::MalformedRecord { line, .. }) => assert!(line.starts_with("ComDB:")),
            other => panic!("expected MalformedRecord, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_friendly_names() {
        let text = "CNCBUS5 FriendlyName=\"com0com - bus for serial port pair emulator 5 (COM5 <-> COM6)\"\r\n\
                    CNCA5 FriendlyName=\"com0com - serial port emulator CNCA5 (COM5)\"\r\n\
                    CNCB5 FriendlyName=\"com0com - serial port emulator CNCB5 (COM6)\"\r\n";
        let records = parse_friendly_names(text).unwrap();
        assert_eq!(records.len(), 3);

        assert_eq!(records[0].kind, DeviceKind::Bus);
        assert_eq!(records[0].id, 5);
        assert_eq!(records[0].order(), None);
        assert_eq!(records[0].name, "CNCBUS5");
        assert_eq!(
            records[0].friendly_name,
            "com0com - bus for serial port pair emulator 5 (COM5 <-> COM6)"
        );

        assert_eq!(records[1].kind, DeviceKind::Port(PortOrder::A));
        assert_eq!(records[2].order(), Some(PortOrder::B));
        assert_eq!(records[2].id, 5);
    }

    #[test]
    fn test_parse_friendly_name_keeps_inner_equals() {
        let record = parse_friendly_name_line("CNCA1 FriendlyName=\"a=b\"").unwrap();
        assert_eq!(record.friendly_name, "a=b");
    }

    #[test]
    fn test_parse_friendly_name_unquoted() {
        let record = parse_friendly_name_line("cncb2 FriendlyName=plain").unwrap();
        assert_eq!(record.friendly_name, "plain");
        assert_eq!(record.kind, DeviceKind::Port(PortOrder::B));
    }

    #[test]
    fn test_parse_friendly_names_rejects_garbage() {
        assert!(matches!(
            parse_friendly_names("CNCX1 FriendlyName=\"x\""),
            Err(Error::MalformedRecord { .. })
        ));
        assert!(matches!(
            parse_friendly_names("CNCA1 PortName=COM1"),
            Err(Error::MalformedRecord { .. })
        ));
        assert!(matches!(
            parse_friendly_names("CNCA1"),
            Err(Error::MalformedRecord { .. })
        ));
    }

    #[test]
    fn test_parse_busy_names() {
        assert_eq!(
            parse_busy_names("COM1 COM2\r\nCOM5\n"),
            vec!["COM1", "COM2", "COM5"]
        );
        assert!(parse_busy_names("\n").is_empty());
    }
}
