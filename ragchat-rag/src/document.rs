//! Data types for stored documents and scored retrieval candidates.

use serde::{Deserialize, Serialize};

/// A knowledge-base entry: a piece of text and its vector embedding.
///
/// Documents are created once while seeding and never change afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    /// The text content of the document. Never empty.
    pub content: String,
    /// The vector embedding for `content`.
    pub embedding: Vec<f32>,
}

/// A stored document paired with its similarity to a query.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoredCandidate {
    /// The document text.
    pub content: String,
    /// Cosine similarity to the query, in `[-1, 1]` (higher is more relevant).
    pub score: f32,
    /// Index of the document in the store; breaks ties between equal scores.
    pub position: usize,
}
