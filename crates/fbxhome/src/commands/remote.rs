//! Remote-control, Wi-Fi and reboot handlers.

use fbxhome_core::{Integration, ServiceCall, ServiceKind};
use serde_json::{Map, Value};

use crate::cli::{Command, GlobalOpts, PressArgs, WifiState};
use crate::error::CliError;
use crate::output;

fn press_fields(press: &PressArgs) -> Map<String, Value> {
    let mut fields = Map::new();
    fields.insert("long_press".into(), Value::Bool(press.long_press));
    fields.insert("repeat".into(), Value::from(press.repeat));
    fields
}

/// Translate a command into a validated service call. No I/O.
pub fn service_call(cmd: &Command, global: &GlobalOpts) -> Result<ServiceCall, CliError> {
    let (kind, fields) = match cmd {
        Command::Remote(args) => {
            let mut fields = press_fields(&args.press);
            fields.insert("code".into(), Value::String(args.code.clone()));
            (ServiceKind::Remote, fields)
        }
        Command::Power(press) => (ServiceKind::Power, press_fields(press)),
        Command::Play(press) => (ServiceKind::Play, press_fields(press)),
        Command::Reboot => {
            if !global.yes {
                return Err(CliError::NonInteractiveRequiresYes {
                    action: "reboot".into(),
                });
            }
            (ServiceKind::Reboot, Map::new())
        }
        Command::Wifi(args) => {
            if args.state == WifiState::Off && !global.yes {
                return Err(CliError::NonInteractiveRequiresYes {
                    action: "turn Wi-Fi off".into(),
                });
            }
            let mut fields = Map::new();
            fields.insert("enabled".into(), Value::Bool(args.state == WifiState::On));
            (ServiceKind::Wifi, fields)
        }
        other => {
            return Err(CliError::Internal(format!("{other:?} is not a service")));
        }
    };
    kind.parse_call(&fields).map_err(CliError::from)
}

pub async fn execute(integration: &Integration, call: ServiceCall, global: &GlobalOpts) -> Result<(), CliError> {
    let message = match &call {
        ServiceCall::Reboot => "Reboot requested".to_owned(),
        ServiceCall::SetWifi { enabled: true } => "Wi-Fi on".to_owned(),
        ServiceCall::SetWifi { enabled: false } => "Wi-Fi off".to_owned(),
        ServiceCall::Remote(request) => format!(
            "Sent {}{} x{}",
            request.code(),
            if request.long_press() { " (long)" } else { "" },
            request.presses()
        ),
    };
    integration.execute(call).await?;
    output::print_output(&message, global.quiet);
    Ok(())
}
