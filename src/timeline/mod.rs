//! # Timeline Resolver
//!
//! Walks the instruction list and computes, for every instruction, the absolute
//! time at which it becomes active and how long it stays active. The result is
//! one [`TuneState`] snapshot per instruction, plus the snapshots contributed by
//! expanded label references.
//!
//! ## Ambient State
//! Tempo, octave, length and the chord flag are threaded forward from one
//! snapshot to the next. Directives change them; notes and pauses consume them.
//!
//! ## Timing Rules
//! - An instruction starts where the previous one ended, except that a note
//!   following a note inside a chord (`/ c e g /`) starts together with it.
//! - Closing a chord resumes the timeline at the end of its longest member.
//! - Pauses take time on the timeline, also inside a chord, where they delay
//!   the chord members that follow them.
//!
//! ## Labels
//! `:name ... ;` defines a block. The block is played where it is written, and
//! again every time `&name` references it. A reference is resolved against a
//! label table built before the walk, so it may come before or after the
//! definition. The referenced block runs with the ambient state of the call
//! site, and its changes to that state persist after the call. The reference's
//! own snapshot spans the whole expansion and precedes the expanded snapshots.
//!
//! A reference to a label that is currently being defined or expanded would
//! never terminate; such references are skipped with a warning.
//!
//! ## Duration
//! `duration_ms(tempo, length) = (60 / tempo) / length * 4 * 1000`: `length` is a
//! note-length denominator (4 = quarter note) and `tempo` counts quarter notes per
//! minute.
//!
//! ## Example
//! ```rust
//! use piano_tune::lexer::tokenize;
//! use piano_tune::parser::parse_all;
//! use piano_tune::timeline::resolve;
//! use piano_tune::TuneDefaults;
//!
//! let instructions = parse_all(tokenize("t120 l8 c d e")).unwrap();
//! let states = resolve(&instructions, TuneDefaults::default()).unwrap();
//! let starts: Vec<f64> = states
//!     .iter()
//!     .filter(|s| s.instruction.is_note())
//!     .map(|s| s.time_elapsed_ms)
//!     .collect();
//! assert_eq!(starts, vec![0.0, 250.0, 500.0]);
//! ```

use std::collections::HashMap;

use serde::Serialize;
use tracing::{debug, warn};

use crate::ast::{Instruction, InstructionKind};
use crate::error::TuneError;
use crate::metadata::TuneDefaults;
use crate::notation;
use crate::token::SourceSpan;


/// Snapshot of the musical state after one instruction
///
/// `time_elapsed_ms` is the absolute start of the instruction and `duration_ms`
/// how long it stays active. Directives have a duration of zero.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TuneState {
    pub tempo: u32,
    pub current_octave: i32,
    pub current_length: u32,
    pub time_elapsed_ms: f64,
    pub simultaneous_notes: bool,
    pub instruction: Instruction,
    pub duration_ms: f64,
}

impl TuneState {
    pub fn end_ms(&self) -> f64 {
        self.time_elapsed_ms + self.duration_ms
    }

    /// MIDI note number for note states (`octave * 12 + pitch_class`)
    pub fn midi_note(&self) -> Option<u8> {
        let pitch_class = self.instruction.pitch_class()?;
        let octave = self
            .current_octave
            .checked_add(self.instruction.octave_carry())?;
        notation::midi_note(octave, pitch_class)
    }
}

/// Milliseconds a note of `length` lasts at `tempo` quarter notes per minute.
pub fn duration_ms(tempo: u32, length: u32) -> f64 {
    (60.0 / tempo as f64) / length as f64 * 4.0 * 1000.0
}

fn checked_duration(tempo: u32, length: u32, span: SourceSpan) -> Result<f64, TuneError> {
    if tempo == 0 {
        return Err(TuneError::InvalidNumericState {
            span,
            message: "tempo is zero".to_string(),
        });
    }
    if length == 0 {
        return Err(TuneError::InvalidNumericState {
            span,
            message: "length is zero".to_string(),
        });
    }
    Ok(duration_ms(tempo, length))
}

fn ensure_positive(value: u32, what: &str, span: SourceSpan) -> Result<u32, TuneError> {
    if value == 0 {
        Err(TuneError::InvalidNumericState {
            span,
            message: format!("{} must be greater than zero", what),
        })
    } else {
        Ok(value)
    }
}

/// Instructions captured by one label definition
#[derive(Debug, Clone, PartialEq)]
pub struct LabelBlock {
    start_span: SourceSpan,
    end_span: SourceSpan,
    pub instructions: Vec<Instruction>,
}

/// Label definitions of one tune
#[derive(Debug, Clone, Default)]
pub struct LabelTable {
    labels: HashMap<String, LabelBlock>,
}

impl LabelTable {
    /// Collect every label definition in `instructions`.
    ///
    /// Each instruction is captured by every label open at that point, so a
    /// nested block is also part of its parent. Labels still open at the end are
    /// closed there.
    pub fn build(instructions: &[Instruction]) -> Result<Self, TuneError> {
        let mut labels: HashMap<String, LabelBlock> = HashMap::new();
        let mut open: Vec<(String, SourceSpan, Vec<Instruction>)> = Vec::new();

        for instruction in instructions {
            match &instruction.kind {
                InstructionKind::LabelStart(name) => {
                    if labels.contains_key(name) || open.iter().any(|(n, _, _)| n == name) {
                        return Err(TuneError::DuplicateLabel {
                            span: instruction.span,
                            name: name.clone(),
                        });
                    }
                    capture(&mut open, instruction);
                    open.push((name.clone(), instruction.span, Vec::new()));
                }
                InstructionKind::LabelEnd => {
                    let (name, start_span, captured) = open.pop().ok_or_else(|| {
                        TuneError::malformed(instruction.span, "block end without an open label")
                    })?;
                    capture(&mut open, instruction);
                    labels.insert(
                        name,
                        LabelBlock {
                            start_span,
                            end_span: instruction.span,
                            instructions: captured,
                        },
                    );
                }
                _ => capture(&mut open, instruction),
            }
        }

        while let Some((name, start_span, captured)) = open.pop() {
            warn!(label = %name, span = %start_span, "label is never closed, ending it at end of input");
            let end_span = captured.last().map(|i| i.span).unwrap_or(start_span);
            labels.insert(
                name,
                LabelBlock {
                    start_span,
                    end_span,
                    instructions: captured,
                },
            );
        }

        debug!(count = labels.len(), "built label table");
        Ok(Self { labels })
    }

    pub fn get(&self, name: &str) -> Option<&LabelBlock> {
        self.labels.get(name)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

fn capture(open: &mut [(String, SourceSpan, Vec<Instruction>)], instruction: &Instruction) {
    for (_, _, captured) in open.iter_mut() {
        captured.push(instruction.clone());
    }
}

/// Position of the walk between two instructions
#[derive(Debug, Clone, Copy)]
struct Cursor {
    tempo: u32,
    octave: i32,
    length: u32,
    simultaneous: bool,
    prev_start: f64,
    prev_duration: f64,
    prev_was_note: bool,
    /// Latest end time of any member of the open chord
    chord_end: f64,
    /// Latest end time of anything resolved in this walk
    end: f64,
}

impl Cursor {
    fn new(defaults: TuneDefaults) -> Self {
        Self {
            tempo: defaults.tempo,
            octave: defaults.octave,
            length: defaults.length,
            simultaneous: false,
            prev_start: 0.0,
            prev_duration: 0.0,
            prev_was_note: false,
            chord_end: 0.0,
            end: 0.0,
        }
    }

    fn next_start(&self) -> f64 {
        if self.prev_was_note && self.simultaneous {
            self.prev_start
        } else {
            self.prev_start + self.prev_duration
        }
    }

    /// Cursor for expanding a block that starts at `start`
    fn enter_block(&self, start: f64) -> Self {
        Self {
            prev_start: start,
            prev_duration: 0.0,
            prev_was_note: false,
            end: start,
            ..*self
        }
    }
}

struct Resolver<'t> {
    labels: &'t LabelTable,
    /// Labels being defined or expanded at this point of the walk
    active: Vec<String>,
}

impl Resolver<'_> {
    fn walk(
        &mut self,
        instructions: &[Instruction],
        mut cursor: Cursor,
        out: &mut Vec<TuneState>,
    ) -> Result<Cursor, TuneError> {
        for instruction in instructions {
            cursor = self.step(cursor, instruction, out)?;
        }
        Ok(cursor)
    }

    fn step(
        &mut self,
        cursor: Cursor,
        instruction: &Instruction,
        out: &mut Vec<TuneState>,
    ) -> Result<Cursor, TuneError> {
        let span = instruction.span;
        let mut start = cursor.next_start();
        let mut next = cursor;
        let mut duration = 0.0;
        let mut expanded = Vec::new();

        match &instruction.kind {
            InstructionKind::RelativeOctave(shift) => {
                next.octave = next.octave.checked_add(*shift).ok_or_else(|| {
                    TuneError::InvalidNumericState {
                        span,
                        message: format!("octave {} cannot be shifted by {}", next.octave, shift),
                    }
                })?
            }
            InstructionKind::AbsoluteOctave(octave) => next.octave = *octave,
            InstructionKind::Tempo(bpm) => next.tempo = ensure_positive(*bpm, "tempo", span)?,
            InstructionKind::Length(length) => {
                next.length = ensure_positive(*length, "length", span)?
            }
            InstructionKind::Pause(length) => {
                let length = if *length == 0 { next.length } else { *length };
                duration = checked_duration(next.tempo, length, span)?;
            }
            InstructionKind::Note { .. } => {
                duration = checked_duration(next.tempo, next.length, span)?;
            }
            InstructionKind::SimultaneousDelimiter => {
                if next.simultaneous {
                    start = start.max(next.chord_end);
                    next.simultaneous = false;
                } else {
                    next.simultaneous = true;
                    next.chord_end = start;
                }
            }
            InstructionKind::LabelStart(name) => self.active.push(name.clone()),
            InstructionKind::LabelEnd => {
                self.active.pop();
            }
            InstructionKind::LabelReference(name) => {
                let labels = self.labels;
                let block = labels
                    .get(name)
                    .ok_or_else(|| TuneError::UnresolvedLabel {
                        span,
                        name: name.clone(),
                    })?;
                if self.active.iter().any(|active| active == name) {
                    warn!(
                        label = %name,
                        span = %span,
                        defined_at = %block.start_span,
                        "skipping recursive label reference"
                    );
                    return Ok(cursor);
                }

                debug!(
                    label = %name,
                    block = %block.start_span.cover(block.end_span),
                    start_ms = start,
                    "expanding label"
                );
                // Unclosed labels inside the block leave their names behind
                let depth = self.active.len();
                self.active.push(name.clone());
                let inner = self.walk(&block.instructions, cursor.enter_block(start), &mut expanded);
                self.active.truncate(depth);
                let inner = inner?;

                duration = inner.end - start;
                next = Cursor {
                    tempo: inner.tempo,
                    octave: inner.octave,
                    length: inner.length,
                    simultaneous: inner.simultaneous,
                    chord_end: inner.chord_end,
                    ..next
                };
            }
        }

        let state = TuneState {
            tempo: next.tempo,
            current_octave: next.octave,
            current_length: next.length,
            time_elapsed_ms: start,
            simultaneous_notes: next.simultaneous,
            instruction: instruction.clone(),
            duration_ms: duration,
        };

        next.prev_start = start;
        next.prev_duration = duration;
        next.prev_was_note = instruction.is_note();
        next.end = next.end.max(state.end_ms());
        if next.simultaneous {
            next.chord_end = next.chord_end.max(state.end_ms());
        }

        out.push(state);
        out.append(&mut expanded);
        Ok(next)
    }
}

/// Resolve `instructions` into time-annotated states, starting from `defaults`.
///
/// The states come out in walk order: chord members and expanded blocks are
/// not globally sorted by time.
pub fn resolve(
    instructions: &[Instruction],
    defaults: TuneDefaults,
) -> Result<Vec<TuneState>, TuneError> {
    let labels = LabelTable::build(instructions)?;
    let mut resolver = Resolver {
        labels: &labels,
        active: Vec::new(),
    };
    let mut states = Vec::with_capacity(instructions.len());
    resolver.walk(instructions, Cursor::new(defaults), &mut states)?;
    Ok(states)
}
