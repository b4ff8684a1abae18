//! Rewrite the note names of a tune in another notation system.

use crate::lexer::Lexer;
use crate::metadata::extract_front_matter;
use crate::notation::{convert_note, NotationSystem};
use crate::token::TokenCategory;

/// Target of a notation conversion
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ConvertTarget {
    Letter,
    Solfege,
    /// Letter becomes solfège and vice versa, decided by the last note
    Toggle,
}

/// Convert every note name in `source` to the target notation, leaving all other
/// text (front matter, directives, comments, spacing) untouched.
///
/// ```
/// use piano_tune::convert::{convert_notation, ConvertTarget};
///
/// assert_eq!(convert_notation("t90 c d# / e g /", ConvertTarget::Solfege), "t90 do re# / mi sol /");
/// assert_eq!(convert_notation("do si", ConvertTarget::Toggle), "c b");
/// ```
pub fn convert_notation(source: &str, target: ConvertTarget) -> String {
    let (_, offset) = extract_front_matter(source);
    let tokens = Lexer::with_offset(&source[offset..], offset).tokenize();
    let notes = tokens
        .iter()
        .filter(|t| t.category == TokenCategory::NoteConstant);

    let target = match target {
        ConvertTarget::Letter => NotationSystem::Letter,
        ConvertTarget::Solfege => NotationSystem::Solfege,
        ConvertTarget::Toggle => match notes.clone().last() {
            Some(last) => NotationSystem::for_note_text(&last.text).other(),
            None => return source.to_string(),
        },
    };

    let mut converted = String::with_capacity(source.len());
    let mut copied = 0;
    for token in notes {
        if NotationSystem::for_note_text(&token.text) == target {
            continue;
        }
        if let Some(name) = convert_note(&token.text, target) {
            converted.push_str(&source[copied..token.span.start]);
            converted.push_str(name);
            copied = token.span.end;
        }
    }
    converted.push_str(&source[copied..]);
    converted
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_letter_to_solfege() {
        assert_eq!(
            convert_notation("c d e f g a b", ConvertTarget::Solfege),
            "do re mi fa sol la si"
        );
    }

    #[test]
    fn test_solfege_to_letter_keeps_sharps() {
        assert_eq!(convert_notation("fa# sol#", ConvertTarget::Letter), "f# g#");
    }

    #[test]
    fn test_round_trip() {
        let source = "t120 l8 c d# > / e g / &chorus\n:chorus a b ;\n";
        let solfege = convert_notation(source, ConvertTarget::Solfege);
        assert_eq!(solfege, "t120 l8 do re# > / mi sol / &chorus\n:chorus la si ;\n");
        assert_eq!(convert_notation(&solfege, ConvertTarget::Letter), source);
    }

    #[test]
    fn test_mixed_source_converted_to_one_system() {
        assert_eq!(convert_notation("c re e", ConvertTarget::Letter), "c d e");
        assert_eq!(convert_notation("c re e", ConvertTarget::Solfege), "do re mi");
    }

    #[test]
    fn test_toggle_follows_last_note() {
        assert_eq!(convert_notation("re c", ConvertTarget::Toggle), "re do");
        assert_eq!(convert_notation("c re", ConvertTarget::Toggle), "c d");
        assert_eq!(convert_notation("c d mi", ConvertTarget::Toggle), "c d e");
    }

    #[test]
    fn test_front_matter_and_comments_untouched() {
        let source = "---\ntitle: a b c\n---\nc % do not touch c\nd";
        assert_eq!(
            convert_notation(source, ConvertTarget::Solfege),
            "---\ntitle: a b c\n---\ndo % do not touch c\nre"
        );
    }

    #[test]
    fn test_no_notes() {
        assert_eq!(convert_notation("t90 l4", ConvertTarget::Toggle), "t90 l4");
    }

    #[test]
    fn test_uppercase_normalized() {
        assert_eq!(convert_notation("C Do", ConvertTarget::Solfege), "do Do");
    }
}
