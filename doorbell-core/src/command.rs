//! Command ingress
//!
//! Bus messages, remote lamp reports and web requests are decoded once into
//! a [`Command`] at the transport boundary, then applied to the shared state
//! with [`apply`]. Applying never blocks and never performs I/O; anything that
//! needs I/O is flagged for the render tick.

use alloc::string::String;
use alloc::vec::Vec;
use serde::de::IgnoredAny;
use serde::Deserialize;

use crate::calendar::Now;
use crate::config::Settings;
use crate::context::Shared;
use crate::orchestrator::{active_name, OverrideContent};

/// Longest accepted command value, in bytes
pub const MAX_VALUE_LEN: usize = 1000;

/// A decoded command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Bus client (re)connected
    Connect,
    /// Show a text override
    Message(String),
    /// Arm pushed, or override with the named asset
    Push(Option<String>),
    /// Set the active art
    Active(String),
    /// Clear both deadlines
    Cancel,
    /// Show the connection status banner
    Status,
    /// Show the upgrade banner
    Upgrade,
    /// Power state reported by a remote lamp
    Lamp { device: String, on: bool },
}

/// Command variant without payload, for logging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CommandKind {
    Connect,
    Message,
    Push,
    Active,
    Cancel,
    Status,
    Upgrade,
    Lamp,
}

/// Command decoding errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CommandError {
    /// Not a command we handle
    Unknown,
    /// Payload is not valid JSON or not valid UTF-8
    Malformed,
    /// Value longer than [`MAX_VALUE_LEN`]
    TooLong,
    /// Required value missing
    MissingValue,
}

#[derive(Deserialize)]
struct PowerReport {
    #[serde(rename = "POWER")]
    power: Option<String>,
}

impl Command {
    pub fn kind(&self) -> CommandKind {
        match self {
            Command::Connect => CommandKind::Connect,
            Command::Message(_) => CommandKind::Message,
            Command::Push(_) => CommandKind::Push,
            Command::Active(_) => CommandKind::Active,
            Command::Cancel => CommandKind::Cancel,
            Command::Status => CommandKind::Status,
            Command::Upgrade => CommandKind::Upgrade,
            Command::Lamp { .. } => CommandKind::Lamp,
        }
    }

    /// Decode a command addressed to this device
    ///
    /// `payload` is a JSON string; any other JSON value is accepted and
    /// treated as no value.
    pub fn from_bus(suffix: &str, payload: &[u8]) -> Result<Self, CommandError> {
        let value = json_value(payload)?;
        match suffix {
            "connect" => Ok(Command::Connect),
            "message" => Ok(Command::Message(value)),
            "push" => Ok(Command::Push(non_empty(value))),
            "active" => Ok(Command::Active(value)),
            "cancel" => Ok(Command::Cancel),
            "wifi" | "ipv6" => Ok(Command::Status),
            "upgrade" => Ok(Command::Upgrade),
            _ => Err(CommandError::Unknown),
        }
    }

    /// Decode a `stat/<device>/RESULT` report
    pub fn from_lamp_report(device: &str, payload: &[u8]) -> Result<Self, CommandError> {
        let report: PowerReport =
            serde_json::from_slice(payload).map_err(|_| CommandError::Malformed)?;
        match report.power.as_deref() {
            Some("ON") => Ok(Command::Lamp {
                device: device.into(),
                on: true,
            }),
            Some("OFF") => Ok(Command::Lamp {
                device: device.into(),
                on: false,
            }),
            _ => Err(CommandError::MissingValue),
        }
    }

    /// Route a bus message by topic
    ///
    /// `command/<hostname>/<suffix>` carries commands for this device and
    /// `stat/<device>/RESULT` carries remote lamp reports. Any other topic
    /// yields `None`.
    pub fn from_topic(
        topic: &str,
        payload: &[u8],
        hostname: &str,
    ) -> Option<Result<Self, CommandError>> {
        let mut parts = topic.splitn(3, '/');
        match (parts.next()?, parts.next()?, parts.next()?) {
            ("command", host, suffix) if host == hostname => Some(Self::from_bus(suffix, payload)),
            ("stat", device, "RESULT") => Some(Self::from_lamp_report(device, payload)),
            _ => None,
        }
    }

    /// Decode a web request
    ///
    /// `query` is the raw query string, with or without the leading `?`.
    pub fn from_web(path: &str, query: Option<&str>) -> Result<Self, CommandError> {
        let value = match query {
            Some(q) => percent_decode(q.strip_prefix('?').unwrap_or(q))?,
            None => String::new(),
        };
        match path {
            "/push" => Ok(Command::Push(non_empty(value))),
            "/active" if value.is_empty() => Err(CommandError::MissingValue),
            "/active" => Ok(Command::Active(value)),
            "/message" => Ok(Command::Message(value)),
            _ => Err(CommandError::Unknown),
        }
    }
}

fn non_empty(value: String) -> Option<String> {
    (!value.is_empty()).then_some(value)
}

fn check_len(value: String) -> Result<String, CommandError> {
    if value.len() > MAX_VALUE_LEN {
        Err(CommandError::TooLong)
    } else {
        Ok(value)
    }
}

/// Value of a bus payload
fn json_value(payload: &[u8]) -> Result<String, CommandError> {
    if payload.iter().all(u8::is_ascii_whitespace) {
        return Ok(String::new());
    }
    if let Ok(value) = serde_json::from_slice::<String>(payload) {
        return check_len(value);
    }
    serde_json::from_slice::<IgnoredAny>(payload)
        .map(|_| String::new())
        .map_err(|_| CommandError::Malformed)
}

/// Decode `%XX` escapes and `+` as space
///
/// A `%` not followed by two hex digits is kept as is.
pub fn percent_decode(text: &str) -> Result<String, CommandError> {
    let bytes = text.as_bytes();
    let hex = |i: usize| bytes.get(i).and_then(|&b| (b as char).to_digit(16));
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'+' => out.push(b' '),
            b'%' => {
                if let (Some(hi), Some(lo)) = (hex(i + 1), hex(i + 2)) {
                    out.push((hi << 4 | lo) as u8);
                    i += 2;
                } else {
                    out.push(b'%');
                }
            }
            b => out.push(b),
        }
        i += 1;
    }
    let decoded = String::from_utf8(out).map_err(|_| CommandError::Malformed)?;
    check_len(decoded)
}

/// Apply a command to the shared state
pub fn apply(shared: &mut Shared, settings: &Settings, command: Command, now: Now) {
    let up = now.uptime;
    let hold = settings.hold_time;
    let display = &mut shared.display;

    match command {
        Command::Connect => {
            shared.connect_pending = true;
            display.invalidate();
        }
        Command::Message(text) => {
            if !text.is_empty() {
                display.request_override(OverrideContent::Message(text), None);
            }
        }
        Command::Push(Some(name)) if !display.has_pending_override() => {
            display.request_override(OverrideContent::Asset(name), None);
        }
        Command::Push(_) => display.press(up, hold),
        Command::Active(name) => display.set_active(&name, up, hold),
        Command::Cancel => display.cancel(),
        Command::Status => shared.status_requested = true,
        Command::Upgrade => {
            display.request_override(OverrideContent::Message(settings.upgrade_text.clone()), None);
        }
        Command::Lamp { device, on } => {
            let mut presence = display.presence();
            if !settings.tas_away.is_empty() && device == settings.tas_away {
                presence.away = !on;
            } else if !settings.tas_busy.is_empty() && device == settings.tas_busy {
                presence.busy = !on;
            } else {
                return;
            }
            display.set_presence(presence);
            let name = active_name(settings, presence);
            display.set_active(name, up, hold);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::{OverrideContent, Presence, Rendered};

    fn settings() -> Settings {
        Settings {
            tas_away: "study".into(),
            tas_busy: "desk".into(),
            ..Settings::default()
        }
    }

    fn shared() -> Shared {
        Shared::new(&settings())
    }

    const NOW: Now = Now {
        uptime: 100,
        wall: None,
    };

    #[test]
    fn test_topic_routing() {
        assert_eq!(
            Command::from_topic("command/bell/push", b"", "bell"),
            Some(Ok(Command::Push(None)))
        );
        assert_eq!(
            Command::from_topic("stat/desk/RESULT", br#"{"POWER":"OFF"}"#, "bell"),
            Some(Ok(Command::Lamp {
                device: "desk".into(),
                on: false
            }))
        );
        assert_eq!(
            Command::from_topic("command/bell/reboot", b"", "bell"),
            Some(Err(CommandError::Unknown))
        );
        assert_eq!(Command::from_topic("command/other/push", b"", "bell"), None);
        assert_eq!(Command::from_topic("stat/desk/POWER", b"ON", "bell"), None);
        assert_eq!(Command::from_topic("command/bell", b"", "bell"), None);
    }

    #[test]
    fn test_bus_decoding() {
        assert_eq!(Command::from_bus("connect", b""), Ok(Command::Connect));
        assert_eq!(
            Command::from_bus("message", br#""BACK/SOON""#),
            Ok(Command::Message("BACK/SOON".into()))
        );
        assert_eq!(Command::from_bus("push", b""), Ok(Command::Push(None)));
        assert_eq!(
            Command::from_bus("push", br#""B:Parcel""#),
            Ok(Command::Push(Some("B:Parcel".into())))
        );
        assert_eq!(Command::from_bus("wifi", b""), Ok(Command::Status));
        assert_eq!(Command::from_bus("ipv6", b""), Ok(Command::Status));
        assert_eq!(Command::from_bus("reboot", b""), Err(CommandError::Unknown));
    }

    #[test]
    fn test_bus_payload_errors() {
        assert_eq!(
            Command::from_bus("message", b"not json"),
            Err(CommandError::Malformed)
        );
        // Valid JSON that is not a string carries no value
        assert_eq!(Command::from_bus("push", b"42"), Ok(Command::Push(None)));

        let long = format!("\"{}\"", "x".repeat(MAX_VALUE_LEN + 1));
        assert_eq!(
            Command::from_bus("message", long.as_bytes()),
            Err(CommandError::TooLong)
        );
    }

    #[test]
    fn test_lamp_report() {
        assert_eq!(
            Command::from_lamp_report("study", br#"{"POWER":"OFF"}"#),
            Ok(Command::Lamp {
                device: "study".into(),
                on: false
            })
        );
        assert_eq!(
            Command::from_lamp_report("study", br#"{"Dimmer":40}"#),
            Err(CommandError::MissingValue)
        );
    }

    #[test]
    fn test_web_decoding() {
        assert_eq!(Command::from_web("/push", None), Ok(Command::Push(None)));
        assert_eq!(
            Command::from_web("/push", Some("?Y:Parcel")),
            Ok(Command::Push(Some("Y:Parcel".into())))
        );
        assert_eq!(
            Command::from_web("/message", Some("BACK+AT%2FTWO")),
            Ok(Command::Message("BACK AT/TWO".into()))
        );
        assert_eq!(
            Command::from_web("/active", Some("")),
            Err(CommandError::MissingValue)
        );
        assert_eq!(Command::from_web("/", None), Err(CommandError::Unknown));
    }

    #[test]
    fn test_percent_decode_edge_cases() {
        assert_eq!(percent_decode("100%"), Ok("100%".into()));
        assert_eq!(percent_decode("%zz"), Ok("%zz".into()));
        assert_eq!(percent_decode("caf%C3%A9"), Ok("café".into()));
        assert_eq!(percent_decode("%FF"), Err(CommandError::Malformed));
    }

    #[test]
    fn test_push_with_name_overrides_once() {
        let settings = settings();
        let mut shared = shared();
        apply(&mut shared, &settings, Command::Push(Some("B:Parcel".into())), NOW);
        assert!(shared.display.has_pending_override());
        assert_eq!(shared.display.pushed_until(), None);

        // A second named push while one is pending arms pushed instead
        apply(&mut shared, &settings, Command::Push(Some("Other".into())), NOW);
        assert_eq!(shared.display.pushed_until(), Some(130));
    }

    #[test]
    fn test_message_and_upgrade_queue_overrides() {
        let settings = settings();
        let mut shared = shared();
        apply(&mut shared, &settings, Command::Message(String::new()), NOW);
        assert!(!shared.display.has_pending_override());
        apply(&mut shared, &settings, Command::Upgrade, NOW);
        let tick = shared.display.decide(NOW, &settings);
        assert_eq!(
            tick.render.map(|r| r.target),
            Some(crate::orchestrator::Target::Override(OverrideContent::Message(
                "UPGRADING".into()
            )))
        );
    }

    #[test]
    fn test_connect_and_status_flag_work() {
        let settings = settings();
        let mut shared = shared();
        shared.display.decide(NOW, &settings);
        apply(&mut shared, &settings, Command::Connect, NOW);
        apply(&mut shared, &settings, Command::Status, NOW);
        assert!(shared.connect_pending);
        assert!(shared.status_requested);
        assert_eq!(shared.display.rendered(), Rendered::Redraw);
    }

    #[test]
    fn test_lamp_reports_set_presence_and_active() {
        let settings = settings();
        let mut shared = shared();
        let lamp = |device: &str, on: bool| Command::Lamp {
            device: device.into(),
            on,
        };

        apply(&mut shared, &settings, lamp("desk", false), NOW);
        assert_eq!(shared.display.presence(), Presence { away: false, busy: true });
        assert_eq!(shared.display.active_name(), "Y:Busy");

        apply(&mut shared, &settings, lamp("study", false), NOW);
        assert_eq!(shared.display.active_name(), "R:Away");

        apply(&mut shared, &settings, lamp("study", true), NOW);
        apply(&mut shared, &settings, lamp("desk", true), NOW);
        assert_eq!(shared.display.active_name(), "G:Wait");

        // Unknown devices are ignored
        apply(&mut shared, &settings, lamp("hall", false), NOW);
        assert_eq!(shared.display.presence(), Presence::default());
    }

    #[test]
    fn test_cancel() {
        let settings = settings();
        let mut shared = shared();
        apply(&mut shared, &settings, Command::Push(None), NOW);
        apply(&mut shared, &settings, Command::Cancel, NOW);
        assert_eq!(shared.display.pushed_until(), None);
    }
}
