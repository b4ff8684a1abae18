//! # Instruction Parser
//!
//! Converts a flat sequence of pre-classified [`Token`]s into [`Instruction`]s.
//!
//! The parser is a single forward cursor with one token of lookahead:
//! - `<` / `>` become a relative octave shift on their own
//! - octave, tempo, length and pause keywords take the following number token;
//!   the pair becomes one instruction spanning both
//! - a note name takes a following sharp token if there is one; otherwise the
//!   lookahead stays in the stream for the next instruction
//! - label definitions and references take the following label name
//! - anything else is skipped
//!
//! Parsing is lazy: [`Instructions`] is an iterator that yields one instruction
//! per call and stops for good after the first error.
//!
//! ## Example
//! ```rust
//! use piano_tune::lexer::tokenize;
//! use piano_tune::parser::parse_all;
//! use piano_tune::InstructionKind;
//!
//! let instructions = parse_all(tokenize("t90 c# >")).unwrap();
//! let kinds: Vec<_> = instructions.into_iter().map(|i| i.kind).collect();
//! assert_eq!(
//!     kinds,
//!     vec![
//!         InstructionKind::Tempo(90),
//!         InstructionKind::Note { pitch_class: 1, octave_carry: 0 },
//!         InstructionKind::RelativeOctave(1),
//!     ]
//! );
//! ```

use std::iter::Peekable;
use std::str::FromStr;

use tracing::trace;

use crate::ast::{Instruction, InstructionKind};
use crate::error::TuneError;
use crate::notation::pitch_class;
use crate::token::{SourceSpan, Token, TokenCategory};

/// Lazy instruction stream over a token stream
pub struct Instructions<I: Iterator<Item = Token>> {
    tokens: Peekable<I>,
    failed: bool,
}

/// Start parsing `tokens`. Nothing is consumed until the iterator is polled.
pub fn parse_instructions<T>(tokens: T) -> Instructions<T::IntoIter>
where
    T: IntoIterator<Item = Token>,
{
    Instructions {
        tokens: tokens.into_iter().peekable(),
        failed: false,
    }
}

/// Parse every instruction, aborting at the first error.
pub fn parse_all<T>(tokens: T) -> Result<Vec<Instruction>, TuneError>
where
    T: IntoIterator<Item = Token>,
{
    parse_instructions(tokens).collect()
}

impl<I: Iterator<Item = Token>> Iterator for Instructions<I> {
    type Item = Result<Instruction, TuneError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let result = self.next_instruction().transpose();
        if matches!(result, Some(Err(_))) {
            self.failed = true;
        }
        result
    }
}

impl<I: Iterator<Item = Token>> Instructions<I> {
    fn next_instruction(&mut self) -> Result<Option<Instruction>, TuneError> {
        while let Some(token) = self.tokens.next() {
            let instruction = match token.category {
                TokenCategory::RelativeOctave => {
                    let shift = match token.text.as_str() {
                        "<" => -1,
                        ">" => 1,
                        other => {
                            return Err(TuneError::malformed(
                                token.span,
                                format!("unknown octave operator '{}'", other),
                            ))
                        }
                    };
                    Instruction::new(token.span, InstructionKind::RelativeOctave(shift))
                }
                TokenCategory::AbsoluteOctave => {
                    let (span, octave) = self.number_argument(&token)?;
                    Instruction::new(span, InstructionKind::AbsoluteOctave(octave))
                }
                TokenCategory::Tempo => {
                    let (span, bpm) = self.number_argument(&token)?;
                    Instruction::new(span, InstructionKind::Tempo(bpm))
                }
                TokenCategory::Length => {
                    let (span, length) = self.number_argument(&token)?;
                    Instruction::new(span, InstructionKind::Length(length))
                }
                TokenCategory::Pause => {
                    let (span, length) = self.number_argument(&token)?;
                    Instruction::new(span, InstructionKind::Pause(length))
                }
                TokenCategory::NoteConstant => self.note(&token)?,
                TokenCategory::SimultaneousDelimiter => {
                    Instruction::new(token.span, InstructionKind::SimultaneousDelimiter)
                }
                TokenCategory::LabelDefinition => {
                    let (span, name) = self.label_argument(&token)?;
                    Instruction::new(span, InstructionKind::LabelStart(name))
                }
                TokenCategory::BlockEnd => Instruction::new(token.span, InstructionKind::LabelEnd),
                TokenCategory::LabelReference => {
                    let (span, name) = self.label_argument(&token)?;
                    Instruction::new(span, InstructionKind::LabelReference(name))
                }
                TokenCategory::Number
                | TokenCategory::Sharp
                | TokenCategory::LabelName
                | TokenCategory::Other => {
                    trace!(span = %token.span, text = %token.text, "skipping token");
                    continue;
                }
            };
            return Ok(Some(instruction));
        }
        Ok(None)
    }

    /// A note name, with an optional sharp folded in.
    fn note(&mut self, token: &Token) -> Result<Instruction, TuneError> {
        let mut pitch = pitch_class(&token.text, token.span)?;
        let mut octave_carry = 0;
        let mut span = token.span;

        // Only a sharp is consumed; any other lookahead is left for the next instruction
        if let Some(sharp) = self
            .tokens
            .next_if(|next| next.category == TokenCategory::Sharp)
        {
            pitch += 1;
            if pitch == 12 {
                pitch = 0;
                octave_carry = 1;
            }
            span = span.cover(sharp.span);
        }

        Ok(Instruction::new(
            span,
            InstructionKind::Note {
                pitch_class: pitch,
                octave_carry,
            },
        ))
    }

    fn number_argument<T: FromStr>(&mut self, keyword: &Token) -> Result<(SourceSpan, T), TuneError> {
        let argument = self.argument(keyword, TokenCategory::Number, "a number")?;
        let value = argument.text.parse::<T>().map_err(|_| {
            TuneError::malformed(
                argument.span,
                format!("'{}' is not a valid number for '{}'", argument.text, keyword.text),
            )
        })?;
        Ok((keyword.span.cover(argument.span), value))
    }

    fn label_argument(&mut self, keyword: &Token) -> Result<(SourceSpan, String), TuneError> {
        let argument = self.argument(keyword, TokenCategory::LabelName, "a label name")?;
        Ok((keyword.span.cover(argument.span), argument.text))
    }

    fn argument(
        &mut self,
        keyword: &Token,
        category: TokenCategory,
        expected: &str,
    ) -> Result<Token, TuneError> {
        match self.tokens.next() {
            Some(token) if token.category == category => Ok(token),
            Some(token) => Err(TuneError::malformed(
                token.span,
                format!("expected {} after '{}', found '{}'", expected, keyword.text, token.text),
            )),
            None => Err(TuneError::malformed(
                keyword.span,
                format!("expected {} after '{}', found end of input", expected, keyword.text),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;
    use pretty_assertions::assert_eq;

    fn kinds(source: &str) -> Vec<InstructionKind> {
        parse_all(tokenize(source))
            .unwrap()
            .into_iter()
            .map(|i| i.kind)
            .collect()
    }

    fn token(start: usize, end: usize, category: TokenCategory, text: &str) -> Token {
        Token::new(SourceSpan::new(start, end), category, text)
    }

    #[test]
    fn test_relative_octave() {
        assert_eq!(
            kinds("< >"),
            vec![
                InstructionKind::RelativeOctave(-1),
                InstructionKind::RelativeOctave(1)
            ]
        );
    }

    #[test]
    fn test_directives_merge_with_number() {
        let instructions = parse_all(tokenize("o5 t140 l16 p0")).unwrap();
        assert_eq!(
            instructions,
            vec![
                Instruction::new(SourceSpan::new(0, 2), InstructionKind::AbsoluteOctave(5)),
                Instruction::new(SourceSpan::new(3, 7), InstructionKind::Tempo(140)),
                Instruction::new(SourceSpan::new(8, 11), InstructionKind::Length(16)),
                Instruction::new(SourceSpan::new(12, 14), InstructionKind::Pause(0)),
            ]
        );
    }

    #[test]
    fn test_sharp_extends_note_span() {
        let instructions = parse_all(tokenize("f#")).unwrap();
        assert_eq!(
            instructions,
            vec![Instruction::new(
                SourceSpan::new(0, 2),
                InstructionKind::Note { pitch_class: 6, octave_carry: 0 }
            )]
        );
    }

    #[test]
    fn test_non_sharp_lookahead_is_not_dropped() {
        // The token after 'c' is another note and must still be parsed
        assert_eq!(
            kinds("c d / e"),
            vec![
                InstructionKind::Note { pitch_class: 0, octave_carry: 0 },
                InstructionKind::Note { pitch_class: 2, octave_carry: 0 },
                InstructionKind::SimultaneousDelimiter,
                InstructionKind::Note { pitch_class: 4, octave_carry: 0 },
            ]
        );
    }

    #[test]
    fn test_note_before_directive_keeps_directive() {
        assert_eq!(
            kinds("c t60"),
            vec![
                InstructionKind::Note { pitch_class: 0, octave_carry: 0 },
                InstructionKind::Tempo(60)
            ]
        );
    }

    #[test]
    fn test_solfege_and_letters_agree() {
        assert_eq!(kinds("do re mi fa# sol la si"), kinds("c d e f# g a b"));
    }

    #[test]
    fn test_b_sharp_carries_into_next_octave() {
        let expected = InstructionKind::Note {
            pitch_class: 0,
            octave_carry: 1,
        };
        assert_eq!(kinds("b#"), vec![expected.clone()]);
        assert_eq!(kinds("si#"), vec![expected]);
    }

    #[test]
    fn test_labels() {
        let instructions = parse_all(tokenize(":verse c ; &verse")).unwrap();
        assert_eq!(
            instructions,
            vec![
                Instruction::new(
                    SourceSpan::new(0, 6),
                    InstructionKind::LabelStart("verse".to_string())
                ),
                Instruction::new(
                    SourceSpan::new(7, 8),
                    InstructionKind::Note {
                        pitch_class: 0,
                        octave_carry: 0
                    }
                ),
                Instruction::new(SourceSpan::new(9, 10), InstructionKind::LabelEnd),
                Instruction::new(
                    SourceSpan::new(11, 17),
                    InstructionKind::LabelReference("verse".to_string())
                ),
            ]
        );
    }

    #[test]
    fn test_other_tokens_skipped() {
        assert_eq!(
            kinds("c % comment\nhello d"),
            vec![
                InstructionKind::Note { pitch_class: 0, octave_carry: 0 },
                InstructionKind::Note { pitch_class: 2, octave_carry: 0 }
            ]
        );
    }

    #[test]
    fn test_dangling_keyword_is_error() {
        let result = parse_all(tokenize("c d t"));
        match result {
            Err(TuneError::MalformedInput { span, message }) => {
                assert_eq!(span, SourceSpan::new(4, 5));
                assert!(message.contains("end of input"));
            }
            other => panic!("Expected MalformedInput, got {:?}", other),
        }
    }

    #[test]
    fn test_dangling_label_reference_is_error() {
        assert!(matches!(
            parse_all(tokenize("c &")),
            Err(TuneError::MalformedInput { .. })
        ));
    }

    #[test]
    fn test_keyword_followed_by_note_is_error() {
        assert!(matches!(
            parse_all(tokenize("l c")),
            Err(TuneError::MalformedInput { .. })
        ));
    }

    #[test]
    fn test_number_out_of_range_is_error() {
        let tokens = vec![
            token(0, 1, TokenCategory::Tempo, "t"),
            token(1, 20, TokenCategory::Number, "9999999999999999999"),
        ];
        assert!(matches!(
            parse_all(tokens),
            Err(TuneError::MalformedInput { .. })
        ));
    }

    #[test]
    fn test_unknown_note_text_is_error() {
        let tokens = vec![token(0, 2, TokenCategory::NoteConstant, "zz")];
        assert!(matches!(
            parse_all(tokens),
            Err(TuneError::InvalidNotation { .. })
        ));
    }

    #[test]
    fn test_parsing_is_lazy_and_stops_after_error() {
        let tokens = vec![
            token(0, 1, TokenCategory::NoteConstant, "c"),
            token(2, 3, TokenCategory::Tempo, "t"),
        ];
        let mut instructions = parse_instructions(tokens);
        assert!(matches!(instructions.next(), Some(Ok(_))));
        assert!(matches!(instructions.next(), Some(Err(_))));
        assert!(instructions.next().is_none());
    }

    #[test]
    fn test_unknown_relative_octave_text() {
        let tokens = vec![token(0, 1, TokenCategory::RelativeOctave, "^")];
        assert!(matches!(
            parse_all(tokens),
            Err(TuneError::MalformedInput { .. })
        ));
    }
}
