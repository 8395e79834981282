use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::Piece;

/// An ordered set of subword pieces
///
/// Pieces keep their insertion order, which is also the order of their ids. The vocabulary only
/// grows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<Piece>", into = "Vec<Piece>")]
pub struct Vocabulary {
    pieces: Vec<Piece>,
    index: HashMap<Piece, usize>,
}

impl Vocabulary {
    /// Create an empty vocabulary
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a piece, returning false if it was already present
    pub fn insert(&mut self, piece: Piece) -> bool {
        if self.index.contains_key(&piece) {
            return false;
        }

        self.index.insert(piece.clone(), self.pieces.len());
        self.pieces.push(piece);

        true
    }

    /// Check for a piece
    pub fn contains(&self, piece: &Piece) -> bool {
        self.index.contains_key(piece)
    }

    /// The position of a piece in insertion order
    pub fn position(&self, piece: &Piece) -> Option<usize> {
        self.index.get(piece).copied()
    }

    /// The piece at a position
    pub fn get(&self, position: usize) -> Option<&Piece> {
        self.pieces.get(position)
    }

    /// Number of pieces
    pub fn len(&self) -> usize {
        self.pieces.len()
    }

    /// True if no piece has been added
    pub fn is_empty(&self) -> bool {
        self.pieces.is_empty()
    }

    /// Iterate over the pieces in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &Piece> {
        self.pieces.iter()
    }
}

impl From<Vec<Piece>> for Vocabulary {
    fn from(pieces: Vec<Piece>) -> Self {
        pieces.into_iter().collect()
    }
}

impl From<Vocabulary> for Vec<Piece> {
    fn from(vocab: Vocabulary) -> Self {
        vocab.pieces
    }
}

impl FromIterator<Piece> for Vocabulary {
    fn from_iter<I: IntoIterator<Item = Piece>>(iter: I) -> Self {
        let mut vocab = Vocabulary::new();
        for piece in iter {
            vocab.insert(piece);
        }

        vocab
    }
}
