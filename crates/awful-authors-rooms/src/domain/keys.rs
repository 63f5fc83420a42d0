//! Keystrokes accepted from the active player, and word counting over the
//! text they produce.

use awful_authors_core::error::DomainError;

/// Separates words in the story.
pub const WORD_BOUNDARY: char = ' ';

/// Ends the writer's turn early, inserting a word boundary.
pub const FORCED_LINE: char = '|';

/// Removes the last character the writer typed this turn.
pub const ERASE: char = '¬';

const STORY_PUNCTUATION: &str = "!\"£$%^&*()-_=+[]{}~#:;@?/,.|¬";

/// A single validated key event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keystroke {
    /// A printable character appended to the round buffer.
    Char(char),
    /// A word boundary.
    WordBoundary,
    /// Forced line break; satisfies the word quota immediately.
    ForcedLine,
    /// Removes the last character of the round buffer.
    Erase,
}

impl Keystroke {
    /// Parses a raw key from the wire.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidInput` unless `key` is exactly one
    /// character from the story alphabet.
    pub fn parse(key: &str) -> Result<Self, DomainError> {
        let mut chars = key.chars();
        let (Some(c), None) = (chars.next(), chars.next()) else {
            return Err(DomainError::InvalidInput(format!(
                "a key must be a single character, got {key:?}"
            )));
        };
        if !is_story_char(c) {
            return Err(DomainError::InvalidInput(format!(
                "character {c:?} is not allowed in a story"
            )));
        }
        Ok(match c {
            WORD_BOUNDARY => Self::WordBoundary,
            FORCED_LINE => Self::ForcedLine,
            ERASE => Self::Erase,
            other => Self::Char(other),
        })
    }
}

/// Whether `c` belongs to the story alphabet.
#[must_use]
pub fn is_story_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == WORD_BOUNDARY || STORY_PUNCTUATION.contains(c)
}

/// Whether `c` separates words.
#[must_use]
pub fn is_word_boundary(c: char) -> bool {
    c.is_whitespace() || c == FORCED_LINE
}

/// Number of words a turn's text completes on its own.
///
/// A trailing word without a boundary after it is still open and is not
/// counted; whitespace-only text completes nothing.
#[must_use]
pub fn completed_words(text: &str) -> usize {
    let tokens = text.split(is_word_boundary).filter(|t| !t.is_empty()).count();
    if text.ends_with(is_word_boundary) {
        tokens
    } else {
        tokens.saturating_sub(1)
    }
}
