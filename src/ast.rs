//! # Instruction Types
//!
//! The parser turns the flat token stream into a flat list of typed
//! [`Instruction`]s. There is no tree: chords and labels are delimited by
//! marker instructions and interpreted by the timeline resolver.
//!
//! ```text
//! Instruction { span, kind }
//!   kind: InstructionKind
//!     ├── Note { pitch_class, octave_carry }   ambient octave + carry (b# = next C)
//!     ├── SimultaneousDelimiter       toggles chord mode
//!     ├── Length(denominator)         4 = quarter, 8 = eighth
//!     ├── AbsoluteOctave(n)
//!     ├── RelativeOctave(±1)
//!     ├── Tempo(bpm)                  quarter notes per minute
//!     ├── Pause(length)               0 = ambient length
//!     ├── LabelStart(name)
//!     ├── LabelEnd
//!     └── LabelReference(name)
//! ```

use serde::Serialize;

use crate::token::SourceSpan;

/// A typed instruction with the source span it was parsed from
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Instruction {
    pub span: SourceSpan,
    pub kind: InstructionKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "kebab-case")]
pub enum InstructionKind {
    /// `octave_carry` is added to the ambient octave (1 for `b#`/`si#`)
    Note { pitch_class: u8, octave_carry: i32 },
    SimultaneousDelimiter,
    Length(u32),
    AbsoluteOctave(i32),
    RelativeOctave(i32),
    Tempo(u32),
    Pause(u32),
    LabelStart(String),
    LabelEnd,
    LabelReference(String),
}

impl Instruction {
    pub fn new(span: SourceSpan, kind: InstructionKind) -> Self {
        Self { span, kind }
    }

    pub fn is_note(&self) -> bool {
        matches!(self.kind, InstructionKind::Note { .. })
    }

    /// Notes, pauses and label references occupy time and produce timeline events.
    pub fn is_timed(&self) -> bool {
        matches!(
            self.kind,
            InstructionKind::Note { .. }
                | InstructionKind::Pause(_)
                | InstructionKind::LabelReference(_)
        )
    }

    pub fn pitch_class(&self) -> Option<u8> {
        match self.kind {
            InstructionKind::Note { pitch_class, .. } => Some(pitch_class),
            _ => None,
        }
    }

    pub fn octave_carry(&self) -> i32 {
        match self.kind {
            InstructionKind::Note { octave_carry, .. } => octave_carry,
            _ => 0,
        }
    }
}
