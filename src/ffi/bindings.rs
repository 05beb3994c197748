//! Raw `extern "C"` declarations of the native text embedder.
//!
//! Only compiled with the `linked` feature, which links the crate against
//! the prebuilt `mediapipe` shared library at build time. Resolving the
//! library is left to the system linker.

use std::os::raw::{c_char, c_int, c_void};

use super::types::{EmbeddingResultC, NativeApi, TextEmbedderOptionsC};

#[link(name = "mediapipe")]
unsafe extern "C" {
    /// Create a text embedder. Returns null on failure and writes a message
    /// to `error_msg` when it is non-null.
    pub fn text_embedder_create(
        options: *const TextEmbedderOptionsC,
        error_msg: *mut *mut c_char,
    ) -> *mut c_void;

    /// Embed NUL-terminated UTF-8 text. Returns 0 on success.
    pub fn text_embedder_embed(
        embedder: *mut c_void,
        utf8_str: *const c_char,
        result: *mut EmbeddingResultC,
        error_msg: *mut *mut c_char,
    ) -> c_int;

    /// Free the memory behind a result populated by `text_embedder_embed`.
    pub fn text_embedder_close_result(result: *mut EmbeddingResultC);

    /// Shut down the embedder. Returns 0 on success.
    pub fn text_embedder_close(embedder: *mut c_void, error_msg: *mut *mut c_char) -> c_int;
}

impl NativeApi {
    /// Function table backed by the linked native library.
    #[must_use]
    pub fn linked() -> Self {
        // SAFETY: these symbols are the library's own implementation of the
        // text embedder ABI described on `NativeApi::new`
        unsafe {
            NativeApi::new(
                text_embedder_create,
                text_embedder_embed,
                text_embedder_close_result,
                text_embedder_close,
            )
        }
    }
}
