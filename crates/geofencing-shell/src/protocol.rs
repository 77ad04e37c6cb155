// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Line protocol spoken on stdin/stdout.
//
// Input, one JSON object per line:
//   {"callbackId": "1", "action": "startMonitoringRegion", "args": ["home", 51.5, -0.12, 100]}
//   {"simulate": "enter", "identifier": "home"}            (with --simulate only)
//   {"simulate": "answerPrompt", "permission": "denied"}   (with --simulate only)
// Blank lines and lines starting with `#` are skipped.
//
// Output, one JSON object per line: serialised `Outbound` messages.

use serde::Deserialize;

use tracing::warn;

use geofencing_adapter::{GeofencingAdapter, Invocation, Outbound};
use geofencing_bridge::sim::SimulatedLocationServices;
use geofencing_core::error::{GeofenceError, Result};
use geofencing_core::types::{PermissionState, Transition};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SimulateAction {
    Enter,
    Exit,
    AnswerPrompt,
}

/// Drives the simulated platform from the input stream.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SimulateLine {
    pub simulate: SimulateAction,
    #[serde(default)]
    pub identifier: Option<String>,
    #[serde(default)]
    pub permission: Option<PermissionState>,
}

#[derive(Debug)]
pub enum InboundLine {
    Invocation(Invocation),
    Simulate(SimulateLine),
}

pub fn parse_line(line: &str) -> Result<Option<InboundLine>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    let value: serde_json::Value = serde_json::from_str(line)?;
    let inbound = if value.get("simulate").is_some() {
        InboundLine::Simulate(serde_json::from_value(value)?)
    } else {
        InboundLine::Invocation(serde_json::from_value(value)?)
    };
    Ok(Some(inbound))
}

pub fn encode(outbound: &Outbound) -> Result<String> {
    Ok(serde_json::to_string(outbound)?)
}

/// Apply a simulation line to the platform side.
pub fn simulate(sim: &SimulatedLocationServices, line: &SimulateLine) -> Result<()> {
    let identifier = || {
        line.identifier
            .as_deref()
            .ok_or_else(|| GeofenceError::InvalidArgument("simulation needs an identifier".into()))
    };
    let cross = |transition: Transition| -> Result<()> {
        let identifier = identifier()?;
        if sim.cross(identifier, transition) {
            Ok(())
        } else {
            Err(GeofenceError::InvalidArgument(format!(
                "no monitored region {identifier} wants {transition:?} crossings"
            )))
        }
    };
    match line.simulate {
        SimulateAction::Enter => cross(Transition::Enter)?,
        SimulateAction::Exit => cross(Transition::Exit)?,
        SimulateAction::AnswerPrompt => {
            let permission = line.permission.ok_or_else(|| {
                GeofenceError::InvalidArgument("answerPrompt needs a permission".into())
            })?;
            sim.answer_prompt(permission);
        }
    }
    Ok(())
}

/// Apply one input line. Invocations go to the adapter; simulation lines go
/// to the simulated platform, after everything read before them.
pub fn apply(
    adapter: &mut GeofencingAdapter,
    sim: Option<&SimulatedLocationServices>,
    line: InboundLine,
) {
    match line {
        InboundLine::Invocation(invocation) => adapter.handle(invocation),
        InboundLine::Simulate(command) => match sim {
            Some(sim) => {
                if let Err(e) = simulate(sim, &command) {
                    warn!("simulation line rejected: {e}");
                }
            }
            None => warn!("simulation line ignored, start with --simulate"),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geofencing_adapter::{ChannelShell, ShellEvent};
    use geofencing_bridge::traits::NativeAuthorization;
    use geofencing_core::AdapterConfig;
    use tokio::sync::mpsc;

    #[test]
    fn comments_and_blank_lines_are_skipped() {
        assert!(parse_line("").expect("parse").is_none());
        assert!(parse_line("   # warm-up").expect("parse").is_none());
    }

    #[test]
    fn invocation_line_decodes() {
        let line = r#"{"callbackId": "7", "action": "stopMonitoringRegion", "args": ["home"]}"#;
        let Some(InboundLine::Invocation(invocation)) = parse_line(line).expect("parse") else {
            panic!("expected invocation");
        };
        assert_eq!(invocation.callback_id.as_str(), "7");
        assert_eq!(invocation.action, "stopMonitoringRegion");
    }

    #[test]
    fn simulate_line_decodes() {
        let line = r#"{"simulate": "answerPrompt", "permission": "authorized-when-in-use"}"#;
        let Some(InboundLine::Simulate(sim)) = parse_line(line).expect("parse") else {
            panic!("expected simulation");
        };
        assert_eq!(sim.simulate, SimulateAction::AnswerPrompt);
        assert_eq!(sim.permission, Some(PermissionState::AuthorizedWhenInUse));
    }

    #[test]
    fn garbage_is_a_serialization_error() {
        assert!(matches!(
            parse_line("{oops"),
            Err(GeofenceError::Serialization(_))
        ));
    }

    #[test]
    fn answer_prompt_updates_the_simulator() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let sim = SimulatedLocationServices::new(tx);
        let line = SimulateLine {
            simulate: SimulateAction::AnswerPrompt,
            identifier: None,
            permission: Some(PermissionState::Denied),
        };
        simulate(&sim, &line).expect("simulate");
        assert_eq!(
            sim.authorization_status().expect("status"),
            PermissionState::Denied
        );
        assert!(rx.try_recv().is_ok());
    }

    #[test]
    fn crossing_without_identifier_is_rejected() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let sim = SimulatedLocationServices::new(tx);
        let line = SimulateLine {
            simulate: SimulateAction::Enter,
            identifier: None,
            permission: None,
        };
        assert!(simulate(&sim, &line).is_err());
    }

    #[test]
    fn crossing_an_unmonitored_region_is_rejected() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let sim = SimulatedLocationServices::new(tx);
        let line = SimulateLine {
            simulate: SimulateAction::Enter,
            identifier: Some("home".into()),
            permission: None,
        };
        assert!(matches!(
            simulate(&sim, &line),
            Err(GeofenceError::InvalidArgument(_))
        ));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn crossing_line_follows_the_start_read_before_it() {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let sim = SimulatedLocationServices::new(events_tx);
        let (shell, mut out) = ChannelShell::new();
        let adapter = GeofencingAdapter::new(
            Box::new(sim.clone()),
            Box::new(shell),
            events_rx,
            AdapterConfig::default(),
        );

        let (tx, rx) = mpsc::unbounded_channel();
        for line in [
            r#"{"callbackId":"s1","action":"startMonitoringRegion","args":["home",51.5,-0.12,100]}"#,
            r#"{"simulate":"enter","identifier":"home"}"#,
        ] {
            let inbound = parse_line(line).expect("parse").expect("not blank");
            tx.send(inbound).expect("send");
        }
        drop(tx);

        adapter
            .run_with(rx, move |adapter, line| apply(adapter, Some(&sim), line))
            .await;

        let mut messages = Vec::new();
        while let Ok(message) = out.try_recv() {
            messages.push(message);
        }
        assert_eq!(messages.len(), 2, "{messages:?}");
        assert!(matches!(
            &messages[0],
            Outbound::Result { callback_id, result } if callback_id.as_str() == "s1" && result.is_ok()
        ));
        assert!(matches!(
            &messages[1],
            Outbound::Event { event: ShellEvent::RegionEntered { identifier, .. } } if identifier == "home"
        ));
    }
}
