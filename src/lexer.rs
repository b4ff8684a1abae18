//! Reference tokenizer for piano-tune text.
//!
//! Editors usually classify tokens themselves (syntax scopes); this lexer produces the
//! same [`Token`] stream from plain text so the compiler can run stand-alone.

use crate::notation::NotationSystem;
use crate::token::{SourceSpan, Token, TokenCategory};

/// Lexer for tokenizing piano-tune source code
pub struct Lexer<'a> {
    input: &'a str,
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
    offset: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self::with_offset(input, 0)
    }

    /// Lex `input` as a slice that starts `offset` bytes into the full source,
    /// so spans still point into the full source.
    pub fn with_offset(input: &'a str, offset: usize) -> Self {
        Self {
            input,
            chars: input.char_indices().peekable(),
            offset,
        }
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().map(|&(_, c)| c)
    }

    fn position(&mut self) -> usize {
        self.chars
            .peek()
            .map(|&(i, _)| i)
            .unwrap_or(self.input.len())
    }

    /// Consume characters while `pred` holds; returns the byte range consumed.
    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> (usize, usize) {
        let start = self.position();
        while let Some(c) = self.peek() {
            if !pred(c) {
                break;
            }
            self.chars.next();
        }
        (start, self.position())
    }

    fn token(&self, start: usize, end: usize, category: TokenCategory) -> Token {
        Token::new(
            SourceSpan::new(start + self.offset, end + self.offset),
            category,
            &self.input[start..end],
        )
    }

    pub fn tokenize(&mut self) -> Vec<Token> {
        let mut tokens = Vec::new();

        while let Some(c) = self.peek() {
            let start = self.position();

            let category = match c {
                c if c.is_whitespace() => {
                    self.chars.next();
                    continue;
                }
                '%' => {
                    let (start, end) = self.take_while(|c| c != '\n');
                    tokens.push(self.token(start, end, TokenCategory::Other));
                    continue;
                }
                '<' | '>' => TokenCategory::RelativeOctave,
                '#' => TokenCategory::Sharp,
                '/' => TokenCategory::SimultaneousDelimiter,
                ';' => TokenCategory::BlockEnd,
                ':' | '&' => {
                    self.chars.next();
                    let category = if c == ':' {
                        TokenCategory::LabelDefinition
                    } else {
                        TokenCategory::LabelReference
                    };
                    tokens.push(self.token(start, start + 1, category));
                    let (name_start, name_end) = self.take_while(is_label_char);
                    if name_end > name_start {
                        tokens.push(self.token(name_start, name_end, TokenCategory::LabelName));
                    }
                    continue;
                }
                c if c.is_ascii_digit() => {
                    let (start, end) = self.take_while(|c| c.is_ascii_digit());
                    tokens.push(self.token(start, end, TokenCategory::Number));
                    continue;
                }
                c if c.is_alphabetic() => {
                    let (start, end) = self.take_while(char::is_alphabetic);
                    let word = &self.input[start..end];
                    let category = classify_word(word);
                    tokens.push(self.token(start, end, category));
                    continue;
                }
                _ => TokenCategory::Other,
            };

            self.chars.next();
            let end = self.position();
            tokens.push(self.token(start, end, category));
        }

        tokens
    }
}

fn is_label_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '-'
}

fn classify_word(word: &str) -> TokenCategory {
    match word {
        "o" | "O" => TokenCategory::AbsoluteOctave,
        "t" | "T" => TokenCategory::Tempo,
        "l" | "L" => TokenCategory::Length,
        "p" | "P" => TokenCategory::Pause,
        _ if NotationSystem::for_note_text(word).pitch_class(word).is_some() => {
            TokenCategory::NoteConstant
        }
        _ => TokenCategory::Other,
    }
}

/// Tokenize a whole source string.
pub fn tokenize(source: &str) -> Vec<Token> {
    Lexer::new(source).tokenize()
}
