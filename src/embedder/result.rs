/// Owned embedding values decoded from native result records.
use crate::ffi::types::EmbeddingKind;

/// Payload of a single embedding head.
///
/// The variant is fixed by the `quantize` flag the embedder was created with.
#[derive(Debug, Clone, PartialEq)]
pub enum EmbeddingValues {
    Float(Vec<f32>),
    Quantized(Vec<i8>),
}

impl EmbeddingValues {
    /// Number of components in the vector.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Float(v) => v.len(),
            Self::Quantized(v) => v.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn kind(&self) -> EmbeddingKind {
        match self {
            Self::Float(_) => EmbeddingKind::Float,
            Self::Quantized(_) => EmbeddingKind::Quantized,
        }
    }
}

/// One embedding vector, produced by one output head.
#[derive(Debug, Clone, PartialEq)]
pub struct Embedding {
    pub values: EmbeddingValues,
    /// Index of the head in the model's outputs.
    pub head_index: i32,
    /// Head name from the model metadata, if the model declares one.
    pub head_name: Option<String>,
}

impl Embedding {
    /// Float embedding for head 0 with no name.
    #[must_use]
    pub fn from_floats(values: Vec<f32>) -> Self {
        Self {
            values: EmbeddingValues::Float(values),
            head_index: 0,
            head_name: None,
        }
    }

    /// Quantized embedding for head 0 with no name.
    #[must_use]
    pub fn from_quantized(values: Vec<i8>) -> Self {
        Self {
            values: EmbeddingValues::Quantized(values),
            head_index: 0,
            head_name: None,
        }
    }

    #[must_use]
    pub fn dimension(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn kind(&self) -> EmbeddingKind {
        self.values.kind()
    }

    #[must_use]
    pub fn as_floats(&self) -> Option<&[f32]> {
        match &self.values {
            EmbeddingValues::Float(v) => Some(v),
            EmbeddingValues::Quantized(_) => None,
        }
    }

    #[must_use]
    pub fn as_quantized(&self) -> Option<&[i8]> {
        match &self.values {
            EmbeddingValues::Quantized(v) => Some(v),
            EmbeddingValues::Float(_) => None,
        }
    }
}

/// Everything one `embed` call returned, heads in native order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EmbeddingResult {
    pub embeddings: Vec<Embedding>,
    /// Timestamp of the input, only set by streaming-capable engines.
    pub timestamp_ms: Option<i64>,
}

impl EmbeddingResult {
    /// The first head, which is the only one for most text models.
    #[must_use]
    pub fn first(&self) -> Option<&Embedding> {
        self.embeddings.first()
    }

    /// Look up a head by the name the model declares for it.
    #[must_use]
    pub fn head(&self, name: &str) -> Option<&Embedding> {
        self.embeddings
            .iter()
            .find(|e| e.head_name.as_deref() == Some(name))
    }
}
