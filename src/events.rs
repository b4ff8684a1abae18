//! # Event Materializer
//!
//! Turns the resolver's snapshots (in walk order) into a globally time-ordered
//! stream of on/off [`TimelineEvent`]s.
//!
//! Only notes, pauses and label references produce events; directives and
//! markers carry no audible or visible duration. Every kept state yields an
//! "on" event at its start and an "off" event at its end.
//!
//! The sort is stable: events at the same instant keep the order in which they
//! were produced, so a note's "off" is emitted before the "on" of the note that
//! follows it.

use serde::Serialize;

use crate::timeline::TuneState;

/// Start or end of a state's active interval, at an absolute time
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineEvent {
    pub state: TuneState,
    pub on: bool,
    pub time_ms: f64,
}

impl TimelineEvent {
    pub fn on(state: &TuneState) -> Self {
        Self {
            state: state.clone(),
            on: true,
            time_ms: state.time_elapsed_ms,
        }
    }

    pub fn off(state: &TuneState) -> Self {
        Self {
            state: state.clone(),
            on: false,
            time_ms: state.end_ms(),
        }
    }

    /// MIDI note number, for note events
    pub fn midi_note(&self) -> Option<u8> {
        self.state.midi_note()
    }
}

/// Materialize the time-ordered event stream for `states`.
pub fn materialize(states: &[TuneState]) -> Vec<TimelineEvent> {
    let mut events: Vec<TimelineEvent> = states
        .iter()
        .filter(|state| state.instruction.is_timed())
        .flat_map(|state| [TimelineEvent::on(state), TimelineEvent::off(state)])
        .collect();

    // `sort_by` is stable
    events.sort_by(|a, b| a.time_ms.total_cmp(&b.time_ms));
    events
}
