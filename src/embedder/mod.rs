/// Safe text embedder API over the native boundary, plus shared error types.
pub mod handle;
pub mod mock;
pub mod result;
pub mod similarity;
pub mod text_embedder;

pub use handle::HandleState;
pub use result::{Embedding, EmbeddingResult, EmbeddingValues};
pub use similarity::cosine_similarity;
pub use text_embedder::TextEmbedder;

use thiserror::Error;

use crate::ffi::status::NativeStatus;

/// Errors that can occur while creating, using or closing an embedder.
#[derive(Error, Debug)]
pub enum EmbedderError {
    #[error("embedder creation failed: {message}")]
    Creation { message: String },

    #[error("embedding failed: {message}")]
    Runtime { code: i32, message: String },

    #[error("invalid embedder state: {0}")]
    State(String),

    #[error("embedder close failed: {message}")]
    Close { code: i32, message: String },

    #[error(transparent)]
    Validation(#[from] SimilarityError),

    #[error("malformed native result: {0}")]
    Decode(String),

    #[error("invalid options: {0}")]
    InvalidOptions(String),

    #[error("invalid input text: {0}")]
    InvalidText(String),
}

impl EmbedderError {
    /// Native status behind a failed embed or close call, if it is a known
    /// status code.
    #[must_use]
    pub fn status(&self) -> Option<NativeStatus> {
        match self {
            Self::Runtime { code, .. } | Self::Close { code, .. } => NativeStatus::from_code(*code),
            _ => None,
        }
    }
}

/// Precondition failures of [`cosine_similarity`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SimilarityError {
    #[error("type mismatch: cannot compare float and quantized embeddings")]
    TypeMismatch,

    #[error("size mismatch: {left} vs {right} dimensions")]
    SizeMismatch { left: usize, right: usize },

    #[error("zero-norm vector: cosine similarity is undefined")]
    ZeroNorm,
}
