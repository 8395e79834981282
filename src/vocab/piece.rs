use std::fmt::{self, Display};

use derive_new::new;
use serde::{Deserialize, Serialize};

/// The prefix used when rendering continuation pieces, following the WordPiece convention
pub static CONTINUATION_PREFIX: &str = "##";

/// A single subword vocabulary entry
///
/// A continuation piece is a different entry from a word-initial piece with the same text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, new)]
pub struct Piece {
    /// The characters covered by this piece
    pub text: String,

    /// True when the piece does not start a word
    pub continuation: bool,
}

impl Piece {
    /// A word-initial piece
    pub fn initial(text: impl Into<String>) -> Self {
        Self::new(text.into(), false)
    }

    /// A continuation piece
    pub fn continuation(text: impl Into<String>) -> Self {
        Self::new(text.into(), true)
    }

    /// Split a word into single-character pieces
    pub fn chars(word: &str) -> Vec<Piece> {
        word.chars()
            .enumerate()
            .map(|(i, c)| Piece::new(c.to_string(), i > 0))
            .collect()
    }

    /// True if the piece covers exactly one character
    pub fn is_char(&self) -> bool {
        self.text.chars().count() == 1
    }

    /// Parse the rendered form, treating a `##` prefix as a continuation marker
    pub fn parse(rendered: &str) -> Self {
        match rendered.strip_prefix(CONTINUATION_PREFIX) {
            Some(text) if !text.is_empty() => Self::continuation(text),
            _ => Self::initial(rendered),
        }
    }
}

impl Display for Piece {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.continuation {
            write!(f, "{}{}", CONTINUATION_PREFIX, self.text)
        } else {
            write!(f, "{}", self.text)
        }
    }
}

/// A learned merge of two adjacent pieces
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, new)]
pub struct Merge {
    /// The left-hand piece
    pub left: Piece,

    /// The right-hand piece
    pub right: Piece,
}

impl Merge {
    /// The piece produced by this merge, which keeps the marking of the left-hand piece
    pub fn merged(&self) -> Piece {
        Piece::new(
            format!("{}{}", self.left.text, self.right.text),
            self.left.continuation,
        )
    }
}

impl Display for Merge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.left, self.right)
    }
}
