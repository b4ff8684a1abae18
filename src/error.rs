//! # Error Types
//!
//! This module defines the single error type of the piano-tune compiler.
//!
//! Every error that can be pinned to the source carries the [`SourceSpan`] of the
//! offending token(s), so a host editor can highlight it.
//!
//! ## Error Types
//! - `MalformedInput` - a directive is missing its argument, or blocks are unbalanced
//! - `InvalidNotation` - a note name is not in its notation table
//! - `InvalidNumericState` - a zero tempo or length would make durations meaningless
//! - `UnresolvedLabel` / `DuplicateLabel` - label references and definitions
//! - `MetadataError` - invalid YAML front matter
//! - `Output` - a playback sink could not deliver a message
//!
//! ## Usage
//! ```rust
//! use piano_tune::{compile, TuneError};
//!
//! match compile("t120 c d &chorus") {
//!     Ok(events) => println!("{} events", events.len()),
//!     Err(TuneError::UnresolvedLabel { name, span }) => {
//!         eprintln!("no label '{}' (referenced at {})", name, span);
//!     }
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

use thiserror::Error;

use crate::token::SourceSpan;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TuneError {
    /// A directive token was not followed by its argument, or the instruction
    /// stream is structurally broken (e.g. a block end with no open label).
    ///
    /// # Example
    /// ```
    /// # use piano_tune::{TuneError, SourceSpan};
    /// let err = TuneError::MalformedInput {
    ///     span: SourceSpan::new(4, 5),
    ///     message: "expected a number after 't'".to_string(),
    /// };
    /// assert_eq!(err.to_string(), "Malformed input at 4..5: expected a number after 't'");
    /// ```
    #[error("Malformed input at {span}: {message}")]
    MalformedInput { span: SourceSpan, message: String },

    /// A note token whose text is not found in the table of its notation system.
    #[error("Invalid note '{text}' at {span}")]
    InvalidNotation { span: SourceSpan, text: String },

    /// Tempo or length of zero, which would divide by zero when computing durations.
    #[error("Invalid value at {span}: {message}")]
    InvalidNumericState { span: SourceSpan, message: String },

    /// A label reference names a label that is never defined.
    #[error("Unresolved label '{name}' referenced at {span}")]
    UnresolvedLabel { span: SourceSpan, name: String },

    /// The same label name is defined more than once.
    #[error("Label '{name}' defined again at {span}")]
    DuplicateLabel { span: SourceSpan, name: String },

    /// Invalid front matter.
    ///
    /// # Example
    /// ```
    /// # use piano_tune::TuneError;
    /// let err = TuneError::MetadataError("tempo must be greater than zero".to_string());
    /// assert_eq!(err.to_string(), "Invalid metadata: tempo must be greater than zero");
    /// ```
    #[error("Invalid metadata: {0}")]
    MetadataError(String),

    /// A playback sink failed to deliver a message.
    #[error("Output error: {0}")]
    Output(String),
}

impl TuneError {
    /// The source span the error points at, if it has one.
    pub fn span(&self) -> Option<SourceSpan> {
        match self {
            TuneError::MalformedInput { span, .. }
            | TuneError::InvalidNotation { span, .. }
            | TuneError::InvalidNumericState { span, .. }
            | TuneError::UnresolvedLabel { span, .. }
            | TuneError::DuplicateLabel { span, .. } => Some(*span),
            TuneError::MetadataError(_) | TuneError::Output(_) => None,
        }
    }

    pub(crate) fn malformed(span: SourceSpan, message: impl Into<String>) -> Self {
        TuneError::MalformedInput {
            span,
            message: message.into(),
        }
    }
}
