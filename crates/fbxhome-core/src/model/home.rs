// ── Home-automation domain types ──

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};

/// Node categories the engine tracks. Nodes of any other category are
/// ignored by the reconciler.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum HomeCategory {
    Alarm,
    Camera,
    /// Door/window sensor.
    Dws,
    Iohome,
    /// Keyfob.
    Kfb,
    Opener,
    /// Motion sensor.
    Pir,
    Rts,
    Shutter,
    BasicShutter,
}

impl HomeCategory {
    /// Product model shown for nodes of this category.
    pub fn model(self) -> &'static str {
        match self {
            Self::Pir => "F-HAPIR01A",
            Self::Camera => "F-HACAM01A",
            Self::Dws => "F-HADWS01A",
            Self::Kfb => "F-HAKFB01A",
            Self::Alarm => "F-MSEC07A",
            Self::Rts => "RTS",
            Self::Iohome => "IOHome",
            Self::Shutter => "Volet roulant",
            Self::BasicShutter => "Volet roulant basic",
            Self::Opener => "Ouvrant,Porte",
        }
    }

    /// Name of the signal endpoint carrying the node's state, for the
    /// categories that have one.
    pub fn state_endpoint(self) -> Option<&'static str> {
        match self {
            Self::Alarm | Self::BasicShutter => Some("state"),
            Self::Camera => Some("detection"),
            Self::Shutter | Self::Opener => Some("position_set"),
            Self::Dws | Self::Iohome | Self::Kfb | Self::Pir | Self::Rts => None,
        }
    }
}

/// Alarm panel state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AlarmState {
    Arming,
    ArmedAway,
    ArmedHome,
    Triggered,
    Disarmed,
}

impl AlarmState {
    /// Map the raw `state` signal value. Unknown values read as disarmed.
    pub fn from_signal(raw: &str) -> Self {
        match raw {
            "alarm1_arming" | "alarm2_arming" => Self::Arming,
            "alarm1_armed" => Self::ArmedAway,
            "alarm2_armed" => Self::ArmedHome,
            "alarm1_alert_timer" | "alarm2_alert_timer" | "alert" => Self::Triggered,
            _ => Self::Disarmed,
        }
    }
}

/// Sub-state of a stateful node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NodeState {
    Alarm { state: AlarmState },
    Camera { detection: bool },
    /// Position 0 (closed) to 100 (open), already corrected for inversion.
    Shutter { position: u8 },
    BasicShutter { closed: bool },
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn category_parses_snake_case() {
        assert_eq!(
            HomeCategory::from_str("basic_shutter").unwrap(),
            HomeCategory::BasicShutter
        );
        assert!(HomeCategory::from_str("thermostat").is_err());
    }

    #[test]
    fn alarm_signal_mapping() {
        assert_eq!(AlarmState::from_signal("alarm1_armed"), AlarmState::ArmedAway);
        assert_eq!(AlarmState::from_signal("alarm2_armed"), AlarmState::ArmedHome);
        assert_eq!(AlarmState::from_signal("alarm2_arming"), AlarmState::Arming);
        assert_eq!(AlarmState::from_signal("alert"), AlarmState::Triggered);
        assert_eq!(AlarmState::from_signal("idle"), AlarmState::Disarmed);
        assert_eq!(AlarmState::from_signal("???"), AlarmState::Disarmed);
    }
}
