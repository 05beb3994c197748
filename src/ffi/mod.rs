//! Native boundary of the text embedder.
//!
//! # Module Structure
//!
//! - `types`: `#[repr(C)]` records, layout assertions and the function table
//! - `codec`: options encoding and result decoding
//! - `status`: return code / error message translation
//! - `release`: RAII release of native result records
//! - `bindings`: linked `extern "C"` symbols (feature `linked`)
//!
//! # Safety
//!
//! Everything that dereferences native memory is an `unsafe fn` with its
//! contract spelled out. [`crate::embedder::TextEmbedder`] is the safe
//! interface built on top.

pub mod codec;
pub mod release;
pub mod status;
pub mod types;

#[cfg(feature = "linked")]
pub mod bindings;

pub use codec::{EncodedOptions, decode_result, encode_options};
pub use release::ResultGuard;
pub use status::NativeStatus;
pub use types::{
    BaseOptionsC, EmbedderOptionsC, EmbeddingC, EmbeddingKind, EmbeddingResultC, NativeApi,
    TextEmbedderOptionsC,
};
