/// Text embedder task backed by the native engine.
///
/// Owns exactly one native handle for its whole life: created by
/// [`TextEmbedder::create`], used by [`TextEmbedder::embed`], released by
/// [`TextEmbedder::close`] or on drop.
use std::ffi::CString;
use std::os::raw::c_char;
use std::path::PathBuf;
use std::ptr;

use bytemuck::Zeroable;
use tracing::{debug, info, warn};

use super::handle::{HandleState, NativeHandle};
use super::result::{Embedding, EmbeddingResult};
use super::{EmbedderError, similarity};
use crate::config::EmbedderOptions;
use crate::ffi::codec::{decode_result, encode_options};
use crate::ffi::release::ResultGuard;
use crate::ffi::status::{Operation, check_handle, check_return_code};
use crate::ffi::types::{EmbeddingResultC, NativeApi};

/// A text embedder instance.
///
/// `embed` and `close` take `&mut self`, so calls on one instance are always
/// serialized. Share an instance across threads behind a mutex.
#[derive(Debug)]
pub struct TextEmbedder {
    api: NativeApi,
    handle: NativeHandle,
}

// SAFETY: the native handle is only reachable through this value and every
// call that uses it requires `&mut self`, so moving the owner to another
// thread never leads to concurrent native calls on the same handle.
unsafe impl Send for TextEmbedder {}

impl TextEmbedder {
    /// Create an embedder from a model file with default options.
    pub fn create_from_model_path(
        api: NativeApi,
        model_path: impl Into<PathBuf>,
    ) -> Result<Self, EmbedderError> {
        Self::create(api, &EmbedderOptions::from_model_path(model_path))
    }

    /// Create an embedder from options.
    ///
    /// Fails with [`EmbedderError::Creation`] when the native side returns a
    /// null handle; no handle is retained in that case.
    pub fn create(api: NativeApi, options: &EmbedderOptions) -> Result<Self, EmbedderError> {
        let encoded = encode_options(options)?;
        let mut handle = NativeHandle::default();

        let mut error_msg: *mut c_char = ptr::null_mut();
        // SAFETY: `encoded` keeps the record and its pointers alive for the
        // call; `error_msg` is a valid out-parameter
        let raw = unsafe { (api.create)(encoded.as_ptr(), &mut error_msg) };
        // SAFETY: message, if any, was just written by the native side
        let live = unsafe { check_handle(raw, error_msg) }?;
        handle.acquire(live)?;

        info!(
            l2_normalize = options.l2_normalize(),
            quantize = options.quantize(),
            "text embedder created"
        );
        Ok(Self { api, handle })
    }

    #[must_use]
    pub fn state(&self) -> HandleState {
        self.handle.state()
    }

    /// Embed `text`, returning one vector per output head.
    pub fn embed(&mut self, text: &str) -> Result<EmbeddingResult, EmbedderError> {
        let handle = self.handle.get("embed")?;
        let text = CString::new(text).map_err(|e| {
            EmbedderError::InvalidText(format!("NUL byte at position {}", e.nul_position()))
        })?;

        let mut record = EmbeddingResultC::zeroed();
        let mut error_msg: *mut c_char = ptr::null_mut();
        // SAFETY: live handle owned by `self`; `text`, `record` and
        // `error_msg` outlive the call
        let code = unsafe {
            (self.api.embed)(handle.as_ptr(), text.as_ptr(), &mut record, &mut error_msg)
        };
        // SAFETY: message, if any, was just written by the native side
        unsafe { check_return_code(code, error_msg, Operation::Embed) }?;

        // SAFETY: return code 0 means the record is populated and unreleased
        let guard = unsafe { ResultGuard::new(record, self.api.close_result) };
        // SAFETY: the guard keeps the record alive until after decoding
        let decoded = unsafe { decode_result(guard.record()) };
        guard.release();

        let result = decoded?;
        debug!(heads = result.embeddings.len(), "embedded text");
        Ok(result)
    }

    /// Shut down the native instance.
    ///
    /// Closing an already closed embedder is a no-op. If the native close
    /// fails the error is returned, but the handle is closed locally either
    /// way and never reused.
    pub fn close(&mut self) -> Result<(), EmbedderError> {
        let Some(handle) = self.handle.take() else {
            return Ok(());
        };

        let mut error_msg: *mut c_char = ptr::null_mut();
        // SAFETY: `take` handed us the only copy of a live handle
        let code = unsafe { (self.api.close)(handle.as_ptr(), &mut error_msg) };
        // SAFETY: message, if any, was just written by the native side
        unsafe { check_return_code(code, error_msg, Operation::Close) }?;

        info!("text embedder closed");
        Ok(())
    }

    /// Cosine similarity between two embeddings.
    ///
    /// Needs no live instance; see [`similarity::cosine_similarity`].
    pub fn cosine_similarity(u: &Embedding, v: &Embedding) -> Result<f64, EmbedderError> {
        Ok(similarity::cosine_similarity(u, v)?)
    }
}

impl Drop for TextEmbedder {
    fn drop(&mut self) {
        if self.handle.state() != HandleState::Created {
            return;
        }
        if let Err(e) = self.close() {
            warn!("failed to close text embedder on drop: {e}");
        }
    }
}
