//! # Player
//!
//! Plays a materialized event stream in real time against a host-provided
//! [`PlaybackSink`].
//!
//! The player converts absolute event times into delays between consecutive
//! events, waits each delay on a [`Clock`], and dispatches:
//! - note events as `note_on` / `note_off` plus a highlight of the note's span
//! - pause and label-reference events as highlights only
//!
//! Playback can be stopped from another thread through a [`StopHandle`]. A
//! stopped player does not wait any further: every note still sounding gets its
//! `note_off` and every highlight is cleared immediately.
//!
//! The sink is an owned handle passed in by the caller; the player keeps no
//! global output state.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tracing::{debug, warn};

use crate::ast::InstructionKind;
use crate::error::TuneError;
use crate::events::TimelineEvent;
use crate::token::SourceSpan;

/// Receiver of note and highlight messages (a MIDI output port, an editor, ...)
pub trait PlaybackSink {
    fn note_on(&mut self, note: u8) -> Result<(), TuneError>;
    fn note_off(&mut self, note: u8) -> Result<(), TuneError>;
    fn highlight(&mut self, span: SourceSpan, on: bool) -> Result<(), TuneError>;
}

/// Source of waiting between events
pub trait Clock {
    fn wait(&mut self, duration: Duration);
}

/// Clock that sleeps the current thread
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadClock;

impl Clock for ThreadClock {
    fn wait(&mut self, duration: Duration) {
        thread::sleep(duration);
    }
}

/// Shared flag requesting playback to stop
#[derive(Debug, Default, Clone)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// An event with the delay since the previous event
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledEvent<'a> {
    pub delay_ms: f64,
    pub event: &'a TimelineEvent,
}

/// Convert absolute event times into delays between consecutive events.
pub fn schedule(events: &[TimelineEvent]) -> Vec<ScheduledEvent<'_>> {
    let mut previous = 0.0;
    events
        .iter()
        .map(|event| {
            let delay_ms = (event.time_ms - previous).max(0.0);
            previous = event.time_ms;
            ScheduledEvent { delay_ms, event }
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PlaybackReport {
    /// Events dispatched before playback ended
    pub dispatched: usize,
    pub stopped: bool,
}

#[derive(Debug, Default)]
pub struct Player {
    stop: StopHandle,
}

impl Player {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle that stops this player when triggered
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn play<S, C>(
        &self,
        events: &[TimelineEvent],
        sink: &mut S,
        clock: &mut C,
    ) -> Result<PlaybackReport, TuneError>
    where
        S: PlaybackSink + ?Sized,
        C: Clock + ?Sized,
    {
        let mut active = ActiveOutput::default();
        let mut report = PlaybackReport::default();

        for scheduled in schedule(events) {
            if self.stop.is_stopped() {
                break;
            }
            if scheduled.delay_ms > 0.0 {
                clock.wait(Duration::from_secs_f64(scheduled.delay_ms / 1000.0));
                if self.stop.is_stopped() {
                    break;
                }
            }
            active.dispatch(scheduled.event, sink)?;
            report.dispatched += 1;
        }

        if self.stop.is_stopped() {
            debug!(dispatched = report.dispatched, "playback stopped, releasing output");
            report.stopped = true;
            active.release(sink)?;
        }

        Ok(report)
    }
}

/// Notes sounding and spans highlighted at the current point of playback
#[derive(Debug, Default)]
struct ActiveOutput {
    notes: Vec<u8>,
    highlights: Vec<SourceSpan>,
}

impl ActiveOutput {
    fn dispatch<S: PlaybackSink + ?Sized>(
        &mut self,
        event: &TimelineEvent,
        sink: &mut S,
    ) -> Result<(), TuneError> {
        let span = event.state.instruction.span;

        if let InstructionKind::Note { .. } = event.state.instruction.kind {
            match event.midi_note() {
                Some(note) if event.on => {
                    sink.note_on(note)?;
                    self.notes.push(note);
                }
                Some(note) => {
                    sink.note_off(note)?;
                    remove_one(&mut self.notes, &note);
                }
                None if event.on => {
                    warn!(span = %span, octave = event.state.current_octave, "note is outside the MIDI range, highlighting only");
                }
                None => {}
            }
        }

        sink.highlight(span, event.on)?;
        if event.on {
            self.highlights.push(span);
        } else {
            remove_one(&mut self.highlights, &span);
        }
        Ok(())
    }

    fn release<S: PlaybackSink + ?Sized>(&mut self, sink: &mut S) -> Result<(), TuneError> {
        for note in self.notes.drain(..) {
            sink.note_off(note)?;
        }
        for span in self.highlights.drain(..) {
            sink.highlight(span, false)?;
        }
        Ok(())
    }
}

fn remove_one<T: PartialEq>(items: &mut Vec<T>, item: &T) {
    if let Some(index) = items.iter().position(|i| i == item) {
        items.remove(index);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile;
    use pretty_assertions::assert_eq;

    #[derive(Debug, Clone, PartialEq)]
    enum Message {
        NoteOn(u8),
        NoteOff(u8),
        Highlight(SourceSpan, bool),
    }

    #[derive(Default)]
    struct RecordingSink {
        messages: Vec<Message>,
    }

    impl RecordingSink {
        fn notes(&self) -> Vec<Message> {
            self.messages
                .iter()
                .filter(|m| !matches!(m, Message::Highlight(..)))
                .cloned()
                .collect()
        }
    }

    impl PlaybackSink for RecordingSink {
        fn note_on(&mut self, note: u8) -> Result<(), TuneError> {
            self.messages.push(Message::NoteOn(note));
            Ok(())
        }

        fn note_off(&mut self, note: u8) -> Result<(), TuneError> {
            self.messages.push(Message::NoteOff(note));
            Ok(())
        }

        fn highlight(&mut self, span: SourceSpan, on: bool) -> Result<(), TuneError> {
            self.messages.push(Message::Highlight(span, on));
            Ok(())
        }
    }

    /// Records waits; triggers `stop` once `stop_after` waits have happened
    #[derive(Default)]
    struct FakeClock {
        waits: Vec<Duration>,
        stop_after: Option<(usize, StopHandle)>,
    }

    impl Clock for FakeClock {
        fn wait(&mut self, duration: Duration) {
            self.waits.push(duration);
            if let Some((limit, handle)) = &self.stop_after {
                if self.waits.len() >= *limit {
                    handle.stop();
                }
            }
        }
    }

    #[test]
    fn test_schedule_uses_deltas() {
        let events = compile("/ l4 c l8 e / g").unwrap();
        let delays: Vec<f64> = schedule(&events).iter().map(|s| s.delay_ms).collect();
        assert_eq!(delays, vec![0.0, 0.0, 250.0, 250.0, 0.0, 250.0]);
    }

    #[test]
    fn test_play_sends_notes_in_order() {
        let events = compile("c d").unwrap();
        let mut sink = RecordingSink::default();
        let mut clock = FakeClock::default();

        let report = Player::new().play(&events, &mut sink, &mut clock).unwrap();

        assert_eq!(
            report,
            PlaybackReport {
                dispatched: 4,
                stopped: false
            }
        );
        assert_eq!(
            sink.notes(),
            vec![
                Message::NoteOn(48),
                Message::NoteOff(48),
                Message::NoteOn(50),
                Message::NoteOff(50),
            ]
        );
        assert_eq!(
            clock.waits,
            vec![Duration::from_millis(250), Duration::from_millis(250)]
        );
    }

    #[test]
    fn test_pause_only_highlights() {
        let events = compile("p8").unwrap();
        let mut sink = RecordingSink::default();
        Player::new()
            .play(&events, &mut sink, &mut FakeClock::default())
            .unwrap();
        assert_eq!(
            sink.messages,
            vec![
                Message::Highlight(SourceSpan::new(0, 2), true),
                Message::Highlight(SourceSpan::new(0, 2), false),
            ]
        );
    }

    #[test]
    fn test_stop_flushes_sounding_notes() {
        // The chord's c (500ms) is still sounding when e ends at 250ms
        let events = compile("/ l4 c l8 e / g").unwrap();
        let player = Player::new();
        let mut sink = RecordingSink::default();
        let mut clock = FakeClock {
            waits: Vec::new(),
            stop_after: Some((1, player.stop_handle())),
        };

        let report = player.play(&events, &mut sink, &mut clock).unwrap();

        assert!(report.stopped);
        assert_eq!(report.dispatched, 2);
        assert_eq!(clock.waits.len(), 1);
        assert_eq!(
            sink.notes(),
            vec![
                Message::NoteOn(48),
                Message::NoteOn(52),
                Message::NoteOff(48),
                Message::NoteOff(52),
            ]
        );
        // Every highlight that was turned on is turned off again
        let on = sink
            .messages
            .iter()
            .filter(|m| matches!(m, Message::Highlight(_, true)))
            .count();
        let off = sink
            .messages
            .iter()
            .filter(|m| matches!(m, Message::Highlight(_, false)))
            .count();
        assert_eq!(on, off);
    }

    #[test]
    fn test_stopped_before_start_sends_nothing() {
        let events = compile("c d e").unwrap();
        let player = Player::new();
        player.stop_handle().stop();
        let mut sink = RecordingSink::default();

        let report = player
            .play(&events, &mut sink, &mut FakeClock::default())
            .unwrap();

        assert!(report.stopped);
        assert_eq!(report.dispatched, 0);
        assert!(sink.messages.is_empty());
    }

    #[test]
    fn test_out_of_range_note_is_highlighted_only() {
        let events = compile("o11 g").unwrap();
        let mut sink = RecordingSink::default();
        Player::new()
            .play(&events, &mut sink, &mut FakeClock::default())
            .unwrap();
        assert!(sink.notes().is_empty());
        assert_eq!(sink.messages.len(), 2);
    }

    #[test]
    fn test_sink_error_aborts_playback() {
        struct FailingSink;
        impl PlaybackSink for FailingSink {
            fn note_on(&mut self, _note: u8) -> Result<(), TuneError> {
                Err(TuneError::Output("port closed".to_string()))
            }
            fn note_off(&mut self, _note: u8) -> Result<(), TuneError> {
                Ok(())
            }
            fn highlight(&mut self, _span: SourceSpan, _on: bool) -> Result<(), TuneError> {
                Ok(())
            }
        }

        let events = compile("c").unwrap();
        let err = Player::new()
            .play(&events, &mut FailingSink, &mut FakeClock::default())
            .unwrap_err();
        assert_eq!(err, TuneError::Output("port closed".to_string()));
    }
}
