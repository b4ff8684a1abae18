//! # Note Notation
//!
//! Piano-tune notes can be written in two notation systems that share one
//! 12-entry pitch table:
//!
//! | index | 0 | 1  | 2 | 3  | 4 | 5 | 6  | 7  | 8   | 9 | 10 | 11 |
//! |-------|---|----|---|----|---|---|----|----|-----|---|----|----|
//! | letter | c | c# | d | d# | e | f | f# | g | g# | a | a# | b |
//! | solfège | do | do# | re | re# | mi | fa | fa# | sol | sol# | la | la# | si |
//!
//! A note's pitch class is its index in the table of its own system. Converting
//! between systems is a lookup in one table and a render from the other at the
//! same index.
//!
//! The octave is not part of a note; it is ambient state. The MIDI note number
//! is `octave * 12 + pitch_class`.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::TuneError;
use crate::token::SourceSpan;

pub const NOTES_LETTERS: [&str; 12] = [
    "c", "c#", "d", "d#", "e", "f", "f#", "g", "g#", "a", "a#", "b",
];

pub const NOTES_SOLFEGE: [&str; 12] = [
    "do", "do#", "re", "re#", "mi", "fa", "fa#", "sol", "sol#", "la", "la#", "si",
];

pub const NOTES_PER_OCTAVE: i32 = 12;

/// Notation system a note name is written in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotationSystem {
    Letter,
    Solfege,
}

impl NotationSystem {
    /// Single-character names are letters, longer names are solfège.
    /// A trailing `#` does not count towards the length.
    pub fn for_note_text(text: &str) -> Self {
        if text.trim_end_matches('#').chars().count() == 1 {
            NotationSystem::Letter
        } else {
            NotationSystem::Solfege
        }
    }

    pub fn table(self) -> &'static [&'static str; 12] {
        match self {
            NotationSystem::Letter => &NOTES_LETTERS,
            NotationSystem::Solfege => &NOTES_SOLFEGE,
        }
    }

    pub fn other(self) -> Self {
        match self {
            NotationSystem::Letter => NotationSystem::Solfege,
            NotationSystem::Solfege => NotationSystem::Letter,
        }
    }

    /// Index of `text` in this system's table (case-insensitive).
    pub fn pitch_class(self, text: &str) -> Option<u8> {
        let lowered = text.to_ascii_lowercase();
        self.table()
            .iter()
            .position(|name| *name == lowered)
            .map(|index| index as u8)
    }

    /// Name of `pitch_class` in this system. Values above 11 wrap.
    pub fn note_name(self, pitch_class: u8) -> &'static str {
        self.table()[(pitch_class % 12) as usize]
    }
}

impl fmt::Display for NotationSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotationSystem::Letter => write!(f, "letter"),
            NotationSystem::Solfege => write!(f, "solfege"),
        }
    }
}

/// Resolve a note token's text to its pitch class, picking the table from the
/// text's length.
pub fn pitch_class(text: &str, span: SourceSpan) -> Result<u8, TuneError> {
    NotationSystem::for_note_text(text)
        .pitch_class(text)
        .ok_or_else(|| TuneError::InvalidNotation {
            span,
            text: text.to_string(),
        })
}

/// Re-render a note name in `target` notation.
///
/// ```
/// use piano_tune::notation::{convert_note, NotationSystem};
///
/// assert_eq!(convert_note("sol", NotationSystem::Letter), Some("g"));
/// assert_eq!(convert_note("f#", NotationSystem::Solfege), Some("fa#"));
/// assert_eq!(convert_note("x", NotationSystem::Solfege), None);
/// ```
pub fn convert_note(text: &str, target: NotationSystem) -> Option<&'static str> {
    let source = NotationSystem::for_note_text(text);
    let index = source.pitch_class(text)?;
    Some(target.note_name(index))
}

/// MIDI note number for a pitch in an octave, if it lies within 0..=127.
pub fn midi_note(octave: i32, pitch_class: u8) -> Option<u8> {
    let note = octave
        .checked_mul(NOTES_PER_OCTAVE)?
        .checked_add(pitch_class as i32)?;
    u8::try_from(note).ok().filter(|n| *n <= 127)
}

/// Split a MIDI note number into `(octave, pitch_class)`.
pub fn note_from_midi(note: u8) -> (i32, u8) {
    let note = note as i32;
    (note / NOTES_PER_OCTAVE, (note % NOTES_PER_OCTAVE) as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_from_length() {
        assert_eq!(NotationSystem::for_note_text("c"), NotationSystem::Letter);
        assert_eq!(NotationSystem::for_note_text("c#"), NotationSystem::Letter);
        assert_eq!(NotationSystem::for_note_text("do"), NotationSystem::Solfege);
        assert_eq!(NotationSystem::for_note_text("sol"), NotationSystem::Solfege);
    }

    #[test]
    fn test_pitch_classes() {
        let span = SourceSpan::new(0, 1);
        assert_eq!(pitch_class("c", span).unwrap(), 0);
        assert_eq!(pitch_class("e", span).unwrap(), 4);
        assert_eq!(pitch_class("b", span).unwrap(), 11);
        assert_eq!(pitch_class("mi", span).unwrap(), 4);
        assert_eq!(pitch_class("si", span).unwrap(), 11);
        assert_eq!(pitch_class("SOL", span).unwrap(), 7);
    }

    #[test]
    fn test_unknown_note_is_invalid_notation() {
        let span = SourceSpan::new(3, 5);
        let err = pitch_class("zz", span).unwrap_err();
        assert_eq!(
            err,
            TuneError::InvalidNotation {
                span,
                text: "zz".to_string()
            }
        );
    }

    #[test]
    fn test_round_trip_every_pitch_class() {
        for (index, letter) in NOTES_LETTERS.iter().enumerate() {
            let solfege = convert_note(letter, NotationSystem::Solfege).unwrap();
            let back = convert_note(solfege, NotationSystem::Letter).unwrap();
            assert_eq!(back, *letter);
            assert_eq!(
                NotationSystem::Letter.pitch_class(back),
                Some(index as u8)
            );
        }
    }

    #[test]
    fn test_convert_to_same_system_is_identity() {
        assert_eq!(convert_note("re", NotationSystem::Solfege), Some("re"));
        assert_eq!(convert_note("A", NotationSystem::Letter), Some("a"));
    }

    #[test]
    fn test_midi_note() {
        assert_eq!(midi_note(4, 0), Some(48));
        assert_eq!(midi_note(5, 0), Some(60));
        assert_eq!(midi_note(10, 7), Some(127));
        assert_eq!(midi_note(10, 8), None);
        assert_eq!(midi_note(-1, 0), None);
    }

    #[test]
    fn test_note_from_midi() {
        assert_eq!(note_from_midi(60), (5, 0));
        assert_eq!(note_from_midi(69), (5, 9));
        for note in 0..=127u8 {
            let (octave, pc) = note_from_midi(note);
            assert_eq!(midi_note(octave, pc), Some(note));
        }
    }
}
