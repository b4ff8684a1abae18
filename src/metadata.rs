//! # Front Matter Metadata
//!
//! A tune may start with a YAML block between `---` lines that sets the initial
//! ambient state:
//!
//! ```text
//! ---
//! title: Ode to Joy
//! tempo: 160
//! octave: 5
//! length: 4
//! ---
//! e e f g g f e d
//! ```
//!
//! Missing keys fall back to [`TuneDefaults::default()`] (tempo 120, octave 4,
//! length 8).

use serde::{Deserialize, Serialize};

use crate::error::TuneError;

/// Initial ambient state of a tune
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TuneDefaults {
    /// Quarter notes per minute
    pub tempo: u32,
    pub octave: i32,
    /// Note-length denominator (4 = quarter, 8 = eighth)
    pub length: u32,
}

impl Default for TuneDefaults {
    fn default() -> Self {
        Self {
            tempo: 120,
            octave: 4,
            length: 8,
        }
    }
}

/// Parsed front matter
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct TuneMetadata {
    pub title: Option<String>,
    pub defaults: TuneDefaults,
}

/// Raw front matter as written in YAML
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawMetadata {
    pub title: Option<String>,
    pub tempo: Option<u32>,
    pub octave: Option<i32>,
    pub length: Option<u32>,
}

/// Find a leading front-matter block.
///
/// Returns the YAML between the `---` markers, and the byte offset where the
/// music starts. Without front matter the whole source is music (offset 0).
///
/// ```
/// use piano_tune::metadata::extract_front_matter;
///
/// let source = "---\ntempo: 90\n---\nc d e";
/// let (yaml, offset) = extract_front_matter(source);
/// assert_eq!(yaml, Some("tempo: 90\n"));
/// assert_eq!(&source[offset..], "c d e");
/// ```
pub fn extract_front_matter(source: &str) -> (Option<&str>, usize) {
    let mut lines = line_offsets(source);

    // The opening marker must be the first non-blank line
    let open = loop {
        match lines.next() {
            Some((_, _, line)) if line.trim().is_empty() => continue,
            Some((_, end, line)) if line.trim() == "---" => break end,
            _ => return (None, 0),
        }
    };

    for (start, end, line) in lines {
        if line.trim() == "---" {
            return (Some(&source[open..start]), end);
        }
    }

    (None, 0)
}

/// Iterate `(line_start, next_line_start, line)` over the source.
fn line_offsets(source: &str) -> impl Iterator<Item = (usize, usize, &str)> {
    let mut start = 0;
    source.split_inclusive('\n').map(move |line| {
        let line_start = start;
        start += line.len();
        (line_start, start, line)
    })
}

/// Parse YAML front matter into metadata.
pub fn parse_metadata(content: &str) -> Result<TuneMetadata, TuneError> {
    let raw: RawMetadata = if content.trim().is_empty() {
        RawMetadata::default()
    } else {
        serde_yaml::from_str(content).map_err(|e| TuneError::MetadataError(e.to_string()))?
    };

    let fallback = TuneDefaults::default();

    let tempo = raw.tempo.unwrap_or(fallback.tempo);
    if tempo == 0 {
        return Err(TuneError::MetadataError(
            "tempo must be greater than zero".to_string(),
        ));
    }

    let length = raw.length.unwrap_or(fallback.length);
    if length == 0 {
        return Err(TuneError::MetadataError(
            "length must be greater than zero".to_string(),
        ));
    }

    Ok(TuneMetadata {
        title: raw.title,
        defaults: TuneDefaults {
            tempo,
            octave: raw.octave.unwrap_or(fallback.octave),
            length,
        },
    })
}

/// Split a source into its metadata and the offset where the music starts.
pub fn read_metadata(source: &str) -> Result<(TuneMetadata, usize), TuneError> {
    match extract_front_matter(source) {
        (Some(yaml), offset) => Ok((parse_metadata(yaml)?, offset)),
        (None, _) => Ok((TuneMetadata::default(), 0)),
    }
}
