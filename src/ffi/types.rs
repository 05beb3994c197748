//! `#[repr(C)]` records and the function table shared with the native
//! text embedder.
//!
//! Field order, size and alignment of every record are asserted at compile
//! time below, so a layout drift fails the build instead of corrupting
//! memory at run time.

use std::mem::{align_of, offset_of, size_of};
use std::os::raw::{c_char, c_int, c_uint, c_void};

use bytemuck::{NoUninit, Zeroable};

// ========== Options records ==========

/// Model source passed through to the native side.
///
/// Exactly one of `model_asset_buffer` / `model_asset_path` is expected to be
/// set; validation is left to the native engine.
#[repr(C)]
#[derive(Debug, Clone, Copy, Zeroable)]
pub struct BaseOptionsC {
    /// In-memory model bytes (not NUL-terminated), or null.
    pub model_asset_buffer: *const c_char,
    /// Length of `model_asset_buffer` in bytes.
    pub model_asset_buffer_count: c_uint,
    /// NUL-terminated UTF-8 path to the model file, or null.
    pub model_asset_path: *const c_char,
}

/// Embedder-specific flags.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Zeroable, NoUninit)]
pub struct EmbedderOptionsC {
    pub l2_normalize: bool,
    pub quantize: bool,
}

/// Complete options record handed to `create`.
#[repr(C)]
#[derive(Debug, Clone, Copy, Zeroable)]
pub struct TextEmbedderOptionsC {
    pub base_options: BaseOptionsC,
    pub embedder_options: EmbedderOptionsC,
}

// ========== Result records ==========

/// Raw value of [`EmbeddingC::kind`] for `f32` payloads.
pub const EMBEDDING_KIND_FLOAT: c_int = 0;
/// Raw value of [`EmbeddingC::kind`] for `i8` payloads.
pub const EMBEDDING_KIND_QUANTIZED: c_int = 1;

/// Encoding of one head's payload.
///
/// The native side writes a plain `c_int`; it is only turned into this enum
/// through [`TryFrom`], never transmuted, so an unexpected tag is a decode
/// error rather than undefined behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EmbeddingKind {
    Float,
    Quantized,
}

impl TryFrom<c_int> for EmbeddingKind {
    type Error = c_int;

    fn try_from(raw: c_int) -> Result<Self, Self::Error> {
        match raw {
            EMBEDDING_KIND_FLOAT => Ok(Self::Float),
            EMBEDDING_KIND_QUANTIZED => Ok(Self::Quantized),
            other => Err(other),
        }
    }
}

impl From<EmbeddingKind> for c_int {
    fn from(kind: EmbeddingKind) -> Self {
        match kind {
            EmbeddingKind::Float => EMBEDDING_KIND_FLOAT,
            EmbeddingKind::Quantized => EMBEDDING_KIND_QUANTIZED,
        }
    }
}

/// One output head as written by the native side.
#[repr(C)]
#[derive(Debug, Clone, Copy, Zeroable)]
pub struct EmbeddingC {
    /// [`EMBEDDING_KIND_FLOAT`] or [`EMBEDDING_KIND_QUANTIZED`].
    pub kind: c_int,
    /// Number of elements behind `data`.
    pub values_count: u32,
    /// `*const f32` or `*const i8` depending on `kind`.
    pub data: *const c_void,
    pub head_index: c_int,
    /// Optional NUL-terminated head name.
    pub head_name: *const c_char,
}

/// Result record filled by `embed` and released by `close_result`.
#[repr(C)]
#[derive(Debug, Clone, Copy, Zeroable)]
pub struct EmbeddingResultC {
    pub embeddings: *mut EmbeddingC,
    pub embeddings_count: u32,
    pub timestamp_ms: i64,
    pub has_timestamp_ms: bool,
}

// ========== Layout assertions ==========

const _: () = assert!(size_of::<EmbedderOptionsC>() == 2);
const _: () = assert!(align_of::<EmbedderOptionsC>() == 1);
const _: () = assert!(offset_of!(EmbedderOptionsC, l2_normalize) == 0);
const _: () = assert!(offset_of!(EmbedderOptionsC, quantize) == 1);

const _: () = assert!(offset_of!(BaseOptionsC, model_asset_buffer) == 0);
const _: () = assert!(offset_of!(TextEmbedderOptionsC, base_options) == 0);
const _: () =
    assert!(offset_of!(TextEmbedderOptionsC, embedder_options) == size_of::<BaseOptionsC>());

const _: () = assert!(offset_of!(EmbeddingC, kind) == 0);
const _: () = assert!(offset_of!(EmbeddingC, values_count) == 4);
const _: () = assert!(offset_of!(EmbeddingResultC, embeddings) == 0);

#[cfg(target_pointer_width = "64")]
mod layout_64 {
    use super::*;

    const _: () = assert!(offset_of!(BaseOptionsC, model_asset_buffer_count) == 8);
    const _: () = assert!(offset_of!(BaseOptionsC, model_asset_path) == 16);
    const _: () = assert!(size_of::<BaseOptionsC>() == 24);
    const _: () = assert!(size_of::<TextEmbedderOptionsC>() == 32);

    const _: () = assert!(offset_of!(EmbeddingC, data) == 8);
    const _: () = assert!(offset_of!(EmbeddingC, head_index) == 16);
    const _: () = assert!(offset_of!(EmbeddingC, head_name) == 24);
    const _: () = assert!(size_of::<EmbeddingC>() == 32);

    const _: () = assert!(offset_of!(EmbeddingResultC, embeddings_count) == 8);
    const _: () = assert!(offset_of!(EmbeddingResultC, timestamp_ms) == 16);
    const _: () = assert!(offset_of!(EmbeddingResultC, has_timestamp_ms) == 24);
    const _: () = assert!(size_of::<EmbeddingResultC>() == 32);
}

// ========== Function table ==========

pub type CreateFn =
    unsafe extern "C" fn(options: *const TextEmbedderOptionsC, error_msg: *mut *mut c_char) -> *mut c_void;

pub type EmbedFn = unsafe extern "C" fn(
    embedder: *mut c_void,
    utf8_text: *const c_char,
    result: *mut EmbeddingResultC,
    error_msg: *mut *mut c_char,
) -> c_int;

pub type CloseResultFn = unsafe extern "C" fn(result: *mut EmbeddingResultC);

pub type CloseFn = unsafe extern "C" fn(embedder: *mut c_void, error_msg: *mut *mut c_char) -> c_int;

/// The four bound entry points of the native text embedder.
///
/// Produced by whoever resolves the shared library (see
/// [`NativeApi::linked`] behind the `linked` feature, or
/// [`crate::embedder::mock::api`] in tests). This layer never resolves
/// symbols itself.
#[derive(Debug, Clone, Copy)]
pub struct NativeApi {
    pub(crate) create: CreateFn,
    pub(crate) embed: EmbedFn,
    pub(crate) close_result: CloseResultFn,
    pub(crate) close: CloseFn,
}

impl NativeApi {
    /// Assemble a function table from already-bound entry points.
    ///
    /// # Safety
    ///
    /// Each function must implement the text embedder C ABI:
    /// - `create` returns a non-null handle on success, or null and
    ///   optionally writes a NUL-terminated message to `error_msg`.
    /// - `embed` returns 0 and fills `result` on success, or a nonzero code
    ///   and optionally writes `error_msg`. On success the record and all
    ///   memory it points to stay valid until `close_result` is called on it.
    /// - `close_result` frees everything reachable from a record populated
    ///   by `embed`.
    /// - `close` releases the handle; it is never called twice for the same
    ///   handle.
    ///
    /// Any message written to `error_msg` must stay readable until the next
    /// call into the table.
    #[must_use]
    pub unsafe fn new(
        create: CreateFn,
        embed: EmbedFn,
        close_result: CloseResultFn,
        close: CloseFn,
    ) -> Self {
        Self {
            create,
            embed,
            close_result,
            close,
        }
    }
}
