//! # piano-tune
//!
//! Compiler for the piano-tune music notation language: letter or solfège note
//! names, octave shifts, tempo/length/pause directives, simultaneous-note groups
//! and labelled blocks, compiled into a time-ordered stream of note on/off events
//! for a MIDI-like output and for highlighting the source while playing.
//!
//! ## Pipeline
//! 1. [`lexer`] - text into pre-classified tokens (or bring your own tokens)
//! 2. [`parser`] - tokens into typed instructions
//! 3. [`timeline`] - instructions into time-annotated states (chords, labels)
//! 4. [`events`] - states into sorted on/off events
//! 5. [`player`] - events into real-time sink messages
//!
//! ## Notation
//! ```text
//! c d e f g a b        letter note names      do re mi fa sol la si   solfège
//! c#                   sharp                  < >                     octave down / up
//! o5                   absolute octave        t120                    tempo (quarter notes/min)
//! l8                   note length (1/8)      p4 / p0                 pause (own / ambient length)
//! / c e g /            chord                  :name ... ;             label definition
//! &name                play a label           % ...                   comment
//! ```
//!
//! ## Example
//! ```rust
//! use piano_tune::compile;
//!
//! let events = compile("t120 l8 c d e").unwrap();
//! assert_eq!(events.len(), 6);
//! assert_eq!(events[0].midi_note(), Some(48));
//! assert_eq!(events[5].time_ms, 750.0);
//! ```

pub mod ast;
pub mod convert;
pub mod error;
pub mod events;
pub mod lexer;
pub mod metadata;
pub mod notation;
pub mod parser;
pub mod player;
pub mod timeline;
pub mod token;

pub use ast::{Instruction, InstructionKind};
pub use error::TuneError;
pub use events::{materialize, TimelineEvent};
pub use metadata::{TuneDefaults, TuneMetadata};
pub use notation::NotationSystem;
pub use timeline::{duration_ms, resolve, TuneState};
pub use token::{SourceSpan, Token, TokenCategory};

use serde::Serialize;

/// A compiled tune
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tune {
    pub metadata: TuneMetadata,
    pub events: Vec<TimelineEvent>,
}

/// Compile piano-tune source into its time-ordered event stream.
///
/// This is the main entry point for the library. Any error aborts the whole
/// compilation; no partial event list is returned.
pub fn compile(source: &str) -> Result<Vec<TimelineEvent>, TuneError> {
    Ok(load_tune(source)?.events)
}

/// Compile source into metadata and events.
pub fn load_tune(source: &str) -> Result<Tune, TuneError> {
    let (metadata, states) = resolve_with_metadata(source)?;
    Ok(Tune {
        metadata,
        events: materialize(&states),
    })
}

/// Resolve source into its time-annotated states, in resolution order.
pub fn resolve_source(source: &str) -> Result<Vec<TuneState>, TuneError> {
    Ok(resolve_with_metadata(source)?.1)
}

/// Compile tokens from an external tokenizer.
pub fn compile_tokens<T>(tokens: T, defaults: TuneDefaults) -> Result<Vec<TimelineEvent>, TuneError>
where
    T: IntoIterator<Item = Token>,
{
    let instructions = parser::parse_all(tokens)?;
    let states = resolve(&instructions, defaults)?;
    Ok(materialize(&states))
}

fn resolve_with_metadata(source: &str) -> Result<(TuneMetadata, Vec<TuneState>), TuneError> {
    let (metadata, offset) = metadata::read_metadata(source)?;
    let tokens = lexer::Lexer::with_offset(&source[offset..], offset).tokenize();
    let instructions = parser::parse_all(tokens)?;
    let states = resolve(&instructions, metadata.defaults)?;
    tracing::debug!(
        instructions = instructions.len(),
        states = states.len(),
        "resolved tune"
    );
    Ok((metadata, states))
}
