//! # native-text-embedder — safe bindings to a prebuilt text embedder
//!
//! Wraps the C ABI of a native text-embedding engine: options are encoded
//! into fixed `#[repr(C)]` records, the native instance is owned by a
//! move-only [`embedder::TextEmbedder`], native result buffers are copied
//! out and released exactly once, and native error reporting becomes
//! [`embedder::EmbedderError`].
//!
//! ## Architecture
//!
//! - **[`config`]** — Embedder options: builders, JSON loading, validation
//! - **[`ffi`]** — Native records, layout checks, codec, error channel, result release
//! - **[`embedder`]** — `TextEmbedder` lifecycle, result types, cosine similarity, mock native layer

pub mod config;
pub mod embedder;
pub mod ffi;
