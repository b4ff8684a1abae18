//! Pre-classified lexical units.
//!
//! The compiler does not interpret raw characters: it consumes [`Token`]s that an
//! external tokenizer (a syntax-aware editor buffer, or the reference [`crate::lexer`])
//! has already classified into a [`TokenCategory`].

use serde::Serialize;
use std::fmt;

/// Half-open byte range `[start, end)` into the tune source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct SourceSpan {
    pub start: usize,
    pub end: usize,
}

impl SourceSpan {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Smallest span containing both `self` and `other`.
    pub fn cover(self, other: SourceSpan) -> Self {
        Self {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Display for SourceSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// Category tag assigned to a token by the tokenizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TokenCategory {
    /// `<` or `>`
    RelativeOctave,
    /// `o`, followed by a number
    AbsoluteOctave,
    /// `t`, followed by a number
    Tempo,
    /// `l`, followed by a number
    Length,
    /// `p`, followed by a number
    Pause,
    /// Numeric argument of a directive
    Number,
    /// Note name in letter or solfège notation
    NoteConstant,
    /// `#`
    Sharp,
    /// `/`
    SimultaneousDelimiter,
    /// `:` opening a label definition, followed by a label name
    LabelDefinition,
    LabelName,
    /// `;` closing the innermost label definition
    BlockEnd,
    /// `&` invoking a label, followed by a label name
    LabelReference,
    /// Comments and anything else the parser skips
    Other,
}

/// A token with its position in the source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Token {
    pub span: SourceSpan,
    pub category: TokenCategory,
    pub text: String,
}

impl Token {
    pub fn new(span: SourceSpan, category: TokenCategory, text: impl Into<String>) -> Self {
        Self {
            span,
            category,
            text: text.into(),
        }
    }
}
