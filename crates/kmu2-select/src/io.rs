use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use kmu2_core::errors::{ErrorInfo, Kmu2Error};
use kmu2_core::Event;

/// Reads a JSON-lines event file. Blank lines are skipped.
pub fn read_events(path: &Path) -> Result<Vec<Event>, Kmu2Error> {
    let file = File::open(path).map_err(|err| {
        Kmu2Error::Serde(
            ErrorInfo::new("kmu2_select.events_open", err.to_string())
                .with_context("path", path.display().to_string()),
        )
    })?;
    parse_events(BufReader::new(file))
}

/// Parses JSON-lines events from any buffered reader.
pub fn parse_events<R: BufRead>(reader: R) -> Result<Vec<Event>, Kmu2Error> {
    let mut events = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line_no = (idx + 1).to_string();
        let line = line.map_err(|err| {
            Kmu2Error::Serde(
                ErrorInfo::new("kmu2_select.events_read", err.to_string())
                    .with_context("line", line_no.clone()),
            )
        })?;
        if line.trim().is_empty() {
            continue;
        }
        let event = serde_json::from_str(&line).map_err(|err| {
            Kmu2Error::Event(
                ErrorInfo::new("kmu2_select.event_decode", err.to_string())
                    .with_context("line", line_no.clone())
                    .with_hint("each line must hold one JSON event object"),
            )
        })?;
        events.push(event);
    }
    Ok(events)
}
