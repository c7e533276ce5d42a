//! Output formatting for CLI responses

use anyhow::Error;
use colored::Colorize;
use racing_wheel_g29_session::{Event, SessionStats};
use racing_wheel_hid_g29_protocol::{ChangeSet, FieldValue, WheelInputState};
use serde::Serialize;
use serde_json::json;

/// Uppercase hex bytes separated by spaces (`"F8 81 84 03"`).
pub fn hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{b:02X}"))
        .collect::<Vec<_>>()
        .join(" ")
}

#[derive(Serialize)]
struct EventLine<'a> {
    topic: &'a str,
    value: Payload<'a>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Payload<'a> {
    Field(FieldValue),
    Changes(&'a ChangeSet),
    All(&'a WheelInputState),
    Data(String),
}

/// One line describing a bus event.
pub fn format_event(event: &Event<'_>, json: bool) -> String {
    let topic = event.topic().to_string();
    if json {
        let payload = match event {
            Event::Field { value, .. } => Payload::Field(*value),
            Event::Changes(changes) => Payload::Changes(changes),
            Event::All(state) => Payload::All(state),
            Event::Data(frame) => Payload::Data(hex(frame)),
        };
        let line = EventLine {
            topic: &topic,
            value: payload,
        };
        return serde_json::to_string(&line)
            .unwrap_or_else(|e| format!(r#"{{"topic":"{topic}","error":"{e}"}}"#));
    }
    match event {
        Event::Field { value, .. } => format!("{topic:<28} {value}"),
        Event::Changes(changes) => {
            let fields = changes
                .iter()
                .map(|(field, value)| format!("{field}={value}"))
                .collect::<Vec<_>>()
                .join(" ");
            format!("{topic:<28} {fields}")
        }
        Event::All(state) => format!(
            "{topic:<28} turn={:.4} gas={:.4} brake={:.4} clutch={:.4} gear={}",
            state.wheel.turn,
            state.pedals.gas,
            state.pedals.brake,
            state.pedals.clutch,
            state.shifter.gear
        ),
        Event::Data(frame) => format!("{topic:<28} {}", hex(frame)),
    }
}

pub fn print_event(event: &Event<'_>, json: bool) {
    println!("{}", format_event(event, json));
}

/// Print the encoded reports for one command.
pub fn print_reports(kind: &str, reports: &[Vec<u8>], json: bool) {
    if json {
        let reports: Vec<String> = reports.iter().map(|r| hex(r)).collect();
        println!("{}", json!({ "command": kind, "reports": reports }));
    } else {
        for report in reports {
            println!("{}", hex(report));
        }
    }
}

pub fn print_summary(stats: &SessionStats, written: &[Vec<u8>], json: bool) {
    if json {
        let written: Vec<String> = written.iter().map(|r| hex(r)).collect();
        println!("{}", json!({ "stats": stats, "written": written }));
        return;
    }
    eprintln!(
        "{} {} frames processed, {} dropped, {} reports written",
        "Session complete:".green().bold(),
        stats.frames_processed,
        stats.frames_dropped,
        stats.reports_written
    );
}

/// Print error in JSON format
pub fn print_error_json(error: &Error) {
    let error_json = json!({
        "success": false,
        "error": { "message": error.to_string() }
    });
    println!("{error_json}");
}

/// Print error in human-readable format
pub fn print_error_human(error: &Error) {
    eprintln!("{} {}", "Error:".red().bold(), error);

    let mut source = error.source();
    while let Some(err) = source {
        eprintln!("  {} {}", "Caused by:".yellow(), err);
        source = err.source();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use insta::assert_snapshot;
    use racing_wheel_hid_g29_protocol::{Field, diff};

    #[test]
    fn test_hex() {
        assert_eq!(hex(&[0xF8, 0x81, 0x84, 0x03]), "F8 81 84 03");
        assert_eq!(hex(&[]), "");
    }

    #[test]
    fn test_field_event_lines() {
        let event = Event::Field {
            field: Field::WheelTurn,
            value: FieldValue::Axis(-0.5),
        };
        assert_snapshot!(format_event(&event, false), @"wheel-turn                   -0.5000");
        assert_snapshot!(format_event(&event, true), @r#"{"topic":"wheel-turn","value":-0.5}"#);
    }

    #[test]
    fn test_changes_event_lines() {
        let previous = WheelInputState::default();
        let mut next = previous;
        next.wheel.button_x = true;
        next.shifter.gear = 2;
        let changes = diff(&previous, &next);
        let event = Event::Changes(&changes);
        assert_snapshot!(
            format_event(&event, false),
            @"changes                      wheel-button_x=1 shifter-gear=2"
        );
        assert_snapshot!(
            format_event(&event, true),
            @r#"{"topic":"changes","value":{"wheel":{"button_x":true},"shifter":{"gear":2}}}"#
        );
    }

    #[test]
    fn test_data_event_line() {
        let event = Event::Data(&[0x08, 0x00, 0xFF]);
        assert_snapshot!(format_event(&event, false), @"data                         08 00 FF");
    }
}
