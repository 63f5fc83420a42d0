//! Word-by-word authorship of a story.

use std::fmt;

use awful_authors_core::error::DomainError;

/// Position of a player in join order, restricted to the tag alphabet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PlayerIndex(u8);

impl PlayerIndex {
    /// Returns `None` for indices that have no single-digit tag.
    #[must_use]
    pub fn new(index: usize) -> Option<Self> {
        u8::try_from(index).ok().filter(|i| *i < 10).map(Self)
    }

    /// The tag written for each word this player completes.
    #[must_use]
    pub fn tag(self) -> char {
        char::from(b'0' + self.0)
    }
}

impl fmt::Display for PlayerIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// One author tag per completed word, in story order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContributionStream {
    authors: Vec<PlayerIndex>,
}

impl ContributionStream {
    /// Decodes a stored tag string.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidInput` if a tag is not a decimal digit.
    pub fn parse(tags: &str) -> Result<Self, DomainError> {
        let authors = tags
            .chars()
            .map(|c| {
                c.to_digit(10)
                    .and_then(|d| usize::try_from(d).ok())
                    .and_then(PlayerIndex::new)
                    .ok_or_else(|| {
                        DomainError::InvalidInput(format!("invalid contribution tag {c:?}"))
                    })
            })
            .collect::<Result<_, _>>()?;
        Ok(Self { authors })
    }

    /// Credits `words` completed words to `author`.
    pub fn record(&mut self, author: PlayerIndex, words: usize) {
        self.authors.extend(std::iter::repeat_n(author, words));
    }

    /// Appends another stream after this one.
    pub fn extend(&mut self, other: &Self) {
        self.authors.extend_from_slice(&other.authors);
    }

    /// Number of tagged words.
    #[must_use]
    pub fn len(&self) -> usize {
        self.authors.len()
    }

    /// Whether no word has been tagged yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.authors.is_empty()
    }

    /// The wire form: one digit per word.
    #[must_use]
    pub fn encode(&self) -> String {
        self.authors.iter().map(|a| a.tag()).collect()
    }
}
