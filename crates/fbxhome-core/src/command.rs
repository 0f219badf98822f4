// ── Command vocabulary ──
//
// Remote-control key codes, validated requests, and the closed table of
// inbound services. Everything here is checked before a single packet
// leaves the host.

use serde_json::{Map, Value};
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoStaticStr};

use crate::error::DispatchError;

/// Upper bound on `repeat` for a single command.
pub const MAX_REPEAT: u8 = 10;

/// Keys understood by the player's remote-control endpoint.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, AsRefStr, IntoStaticStr,
)]
#[strum(serialize_all = "snake_case")]
pub enum RemoteCode {
    Red,
    Green,
    Blue,
    Yellow,
    Power,
    List,
    Tv,
    #[strum(serialize = "0")]
    Digit0,
    #[strum(serialize = "1")]
    Digit1,
    #[strum(serialize = "2")]
    Digit2,
    #[strum(serialize = "3")]
    Digit3,
    #[strum(serialize = "4")]
    Digit4,
    #[strum(serialize = "5")]
    Digit5,
    #[strum(serialize = "6")]
    Digit6,
    #[strum(serialize = "7")]
    Digit7,
    #[strum(serialize = "8")]
    Digit8,
    #[strum(serialize = "9")]
    Digit9,
    Back,
    Swap,
    Info,
    Epg,
    Mail,
    Media,
    Help,
    Options,
    Pip,
    VolInc,
    VolDec,
    #[strum(serialize = "ok")]
    Confirm,
    Up,
    Right,
    Down,
    Left,
    PrgmInc,
    PrgmDec,
    Mute,
    Home,
    Rec,
    Bwd,
    Prev,
    Play,
    Fwd,
    Next,
}

impl RemoteCode {
    /// Wire name sent as the `key` query parameter.
    pub fn key(self) -> &'static str {
        self.into()
    }
}

/// A validated remote-control command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandRequest {
    code: RemoteCode,
    long_press: bool,
    repeat: u8,
}

impl CommandRequest {
    pub fn new(code: RemoteCode, long_press: bool, repeat: u64) -> Result<Self, DispatchError> {
        let repeat = u8::try_from(repeat)
            .ok()
            .filter(|r| *r <= MAX_REPEAT)
            .ok_or(DispatchError::InvalidRepeat {
                repeat,
                max: MAX_REPEAT,
            })?;
        Ok(Self {
            code,
            long_press,
            repeat,
        })
    }

    /// Validate a raw code name against the vocabulary.
    pub fn parse(code: &str, long_press: bool, repeat: u64) -> Result<Self, DispatchError> {
        let code = code
            .parse::<RemoteCode>()
            .map_err(|_| DispatchError::InvalidCode {
                code: code.to_owned(),
            })?;
        Self::new(code, long_press, repeat)
    }

    pub fn code(self) -> RemoteCode {
        self.code
    }

    pub fn long_press(self) -> bool {
        self.long_press
    }

    pub fn repeat(self) -> u8 {
        self.repeat
    }

    /// Physical key presses: a repeat of zero still sends the key once.
    pub fn presses(self) -> u32 {
        u32::from(self.repeat.max(1))
    }
}

// ── Inbound services ────────────────────────────────────────────────

/// Services exposed to hosts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum ServiceKind {
    Reboot,
    Remote,
    /// Alias for `remote` with code `power`.
    Power,
    /// Alias for `remote` with code `play`.
    Play,
    /// Turn every Wi-Fi radio on or off.
    Wifi,
}

/// A parsed, validated service invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceCall {
    Reboot,
    Remote(CommandRequest),
    SetWifi { enabled: bool },
}

type ParseFn = fn(&Map<String, Value>) -> Result<ServiceCall, DispatchError>;

struct ServiceSpec {
    kind: ServiceKind,
    fields: &'static [&'static str],
    parse: ParseFn,
}

const PRESS_FIELDS: &[&str] = &["long_press", "repeat"];

static SERVICES: [ServiceSpec; 5] = [
    ServiceSpec {
        kind: ServiceKind::Reboot,
        fields: &[],
        parse: |_| Ok(ServiceCall::Reboot),
    },
    ServiceSpec {
        kind: ServiceKind::Remote,
        fields: &["code", "long_press", "repeat"],
        parse: parse_remote,
    },
    ServiceSpec {
        kind: ServiceKind::Power,
        fields: PRESS_FIELDS,
        parse: |fields| parse_alias(RemoteCode::Power, fields),
    },
    ServiceSpec {
        kind: ServiceKind::Play,
        fields: PRESS_FIELDS,
        parse: |fields| parse_alias(RemoteCode::Play, fields),
    },
    ServiceSpec {
        kind: ServiceKind::Wifi,
        fields: &["enabled"],
        parse: parse_wifi,
    },
];

impl ServiceKind {
    /// Validate `fields` and build the call.
    pub fn parse_call(self, fields: &Map<String, Value>) -> Result<ServiceCall, DispatchError> {
        let spec = spec(self).ok_or_else(|| DispatchError::UnknownService {
            name: self.to_string(),
        })?;
        if let Some(unexpected) = fields.keys().find(|k| !spec.fields.contains(&k.as_str())) {
            return Err(DispatchError::InvalidField {
                field: unexpected.clone(),
                message: format!("not accepted by the {self} service"),
            });
        }
        (spec.parse)(fields)
    }
}

impl ServiceCall {
    /// Resolve a service by name and validate its fields.
    pub fn parse(name: &str, fields: &Map<String, Value>) -> Result<Self, DispatchError> {
        let kind = name
            .parse::<ServiceKind>()
            .map_err(|_| DispatchError::UnknownService {
                name: name.to_owned(),
            })?;
        kind.parse_call(fields)
    }
}

fn spec(kind: ServiceKind) -> Option<&'static ServiceSpec> {
    SERVICES.iter().find(|s| s.kind == kind)
}

fn parse_remote(fields: &Map<String, Value>) -> Result<ServiceCall, DispatchError> {
    let code = match fields.get("code") {
        Some(Value::String(code)) => code,
        Some(other) => return Err(invalid("code", format!("expected a string, got {other}"))),
        None => return Err(invalid("code", "required".into())),
    };
    let request = CommandRequest::parse(code, long_press(fields)?, repeat(fields)?)?;
    Ok(ServiceCall::Remote(request))
}

fn parse_wifi(fields: &Map<String, Value>) -> Result<ServiceCall, DispatchError> {
    match fields.get("enabled") {
        Some(Value::Bool(enabled)) => Ok(ServiceCall::SetWifi { enabled: *enabled }),
        Some(other) => Err(invalid("enabled", format!("expected a boolean, got {other}"))),
        None => Err(invalid("enabled", "required".into())),
    }
}

fn parse_alias(code: RemoteCode, fields: &Map<String, Value>) -> Result<ServiceCall, DispatchError> {
    let request = CommandRequest::new(code, long_press(fields)?, repeat(fields)?)?;
    Ok(ServiceCall::Remote(request))
}

fn long_press(fields: &Map<String, Value>) -> Result<bool, DispatchError> {
    match fields.get("long_press") {
        None | Some(Value::Null) => Ok(false),
        Some(Value::Bool(b)) => Ok(*b),
        Some(other) => Err(invalid("long_press", format!("expected a boolean, got {other}"))),
    }
}

fn repeat(fields: &Map<String, Value>) -> Result<u64, DispatchError> {
    match fields.get("repeat") {
        None | Some(Value::Null) => Ok(0),
        Some(value) => value.as_u64().ok_or_else(|| {
            invalid("repeat", format!("expected a non-negative integer, got {value}"))
        }),
    }
}

fn invalid(field: &str, message: String) -> DispatchError {
    DispatchError::InvalidField {
        field: field.to_owned(),
        message,
    }
}
