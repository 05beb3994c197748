/// Mock native text embedder for testing.
///
/// Implements the C ABI with plain Rust functions so the binding layer can be
/// exercised without the native library. Behavior and call counters are
/// per thread: call [`install`] at the start of a test, build the embedder
/// with [`api`], and inspect [`counters`] afterwards.
///
/// Result records and handles are backed by allocations the mock keeps
/// track of, so leaked results, double releases and stray handles show up
/// in the counters instead of corrupting memory.
use std::cell::RefCell;
use std::collections::HashMap;
use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_int, c_void};
use std::ptr;

use crate::ffi::types::{
    EMBEDDING_KIND_FLOAT, EMBEDDING_KIND_QUANTIZED, EmbeddingC, EmbeddingResultC, NativeApi,
    TextEmbedderOptionsC,
};

/// Message the native engine reports when no model source is given.
pub const MISSING_MODEL_MESSAGE: &str = "ExternalFile must specify at least one of \
     'file_content', 'file_name', 'file_pointer_meta' or 'file_descriptor_meta'.";

/// One head the mock returns from every successful `embed` call.
#[derive(Debug, Clone, PartialEq)]
pub enum MockHead {
    /// Raw model output. Normalized and/or quantized according to the
    /// options the embedder was created with.
    Float(Vec<f32>),
    /// Returned as-is.
    Quantized(Vec<i8>),
    /// A head with an unrecognized type tag and no data.
    UnknownKind(i32),
}

/// An injected failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockFailure {
    /// Return code for embed/close. Ignored for create, which returns null.
    pub code: i32,
    /// Message written to the error out-parameter, if any.
    pub message: Option<String>,
}

impl MockFailure {
    #[must_use]
    pub fn new(code: i32, message: &str) -> Self {
        Self {
            code,
            message: Some(message.to_string()),
        }
    }

    /// Failure that leaves the error out-parameter untouched.
    #[must_use]
    pub fn silent(code: i32) -> Self {
        Self {
            code,
            message: None,
        }
    }
}

/// How the mock behaves for the current thread.
#[derive(Debug, Clone, Default)]
pub struct MockBehavior {
    pub heads: Vec<MockHead>,
    pub create_failure: Option<MockFailure>,
    pub embed_failure: Option<MockFailure>,
    pub close_failure: Option<MockFailure>,
}

impl MockBehavior {
    #[must_use]
    pub fn with_heads(heads: Vec<MockHead>) -> Self {
        Self {
            heads,
            ..Self::default()
        }
    }
}

/// Options record as the mock decoded it in the last `create` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeenOptions {
    pub l2_normalize: bool,
    pub quantize: bool,
    pub model_asset_path: Option<String>,
    pub model_asset_buffer_len: usize,
}

/// Snapshot of everything the mock observed on the current thread.
#[derive(Debug, Clone, Default)]
pub struct MockCounters {
    pub create_calls: usize,
    pub embed_calls: usize,
    pub close_calls: usize,
    pub release_calls: usize,
    /// Releases of a record the mock never handed out or already freed.
    pub invalid_releases: usize,
    /// Handles created and not yet closed.
    pub live_handles: usize,
    /// Result records handed out and not yet released.
    pub live_results: usize,
    pub last_options: Option<SeenOptions>,
    pub last_text: Option<String>,
}

// ── Mock state ───────────────────────────────────────────────────────

struct MockEngine {
    l2_normalize: bool,
    quantize: bool,
}

/// Native-side memory behind one populated result record.
struct MockAllocation {
    heads: Vec<EmbeddingC>,
    _floats: Vec<Vec<f32>>,
    _quantized: Vec<Vec<i8>>,
}

#[derive(Default)]
struct MockState {
    behavior: MockBehavior,
    counters: MockCounters,
    handles: HashMap<usize, Box<MockEngine>>,
    results: HashMap<usize, MockAllocation>,
    error_message: Option<CString>,
}

thread_local! {
    static MOCK: RefCell<MockState> = RefCell::new(MockState::default());
}

// ── Public API ───────────────────────────────────────────────────────

/// Reset the mock for the current thread and set its behavior.
pub fn install(behavior: MockBehavior) {
    MOCK.with(|m| {
        *m.borrow_mut() = MockState {
            behavior,
            ..MockState::default()
        };
    });
}

/// Counters observed on the current thread since the last [`install`].
#[must_use]
pub fn counters() -> MockCounters {
    MOCK.with(|m| {
        let state = m.borrow();
        MockCounters {
            live_handles: state.handles.len(),
            live_results: state.results.len(),
            ..state.counters.clone()
        }
    })
}

/// Function table pointing at the mock.
#[must_use]
pub fn api() -> NativeApi {
    // SAFETY: the mock functions below implement the text embedder ABI
    unsafe { NativeApi::new(mock_create, mock_embed, mock_close_result, mock_close) }
}

// ── extern "C" implementation ────────────────────────────────────────

/// Store `message` and point the out-parameter at it. The buffer stays
/// valid until the next failing call on this thread.
///
/// # Safety
///
/// `error_msg` must be null or valid for writes.
unsafe fn report(state: &mut MockState, error_msg: *mut *mut c_char, message: Option<&str>) {
    let Some(message) = message else {
        return;
    };
    let stored = state
        .error_message
        .insert(CString::new(message).unwrap_or_default());
    if !error_msg.is_null() {
        // SAFETY: valid for writes per the caller's contract
        unsafe { *error_msg = stored.as_ptr().cast_mut() };
    }
}

/// # Safety
///
/// `ptr` must be null or NUL-terminated.
unsafe fn read_c_str(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    // SAFETY: upheld by the caller
    Some(unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned())
}

unsafe extern "C" fn mock_create(
    options: *const TextEmbedderOptionsC,
    error_msg: *mut *mut c_char,
) -> *mut c_void {
    MOCK.with(|m| {
        let mut state = m.borrow_mut();
        state.counters.create_calls += 1;

        if options.is_null() {
            // SAFETY: out-parameter provided by the binding
            unsafe { report(&mut state, error_msg, Some("options must not be null")) };
            return ptr::null_mut();
        }
        // SAFETY: non-null options record owned by the caller for this call
        let options = unsafe { &*options };
        let base = options.base_options;
        let seen = SeenOptions {
            l2_normalize: options.embedder_options.l2_normalize,
            quantize: options.embedder_options.quantize,
            // SAFETY: the codec writes a NUL-terminated path or null
            model_asset_path: unsafe { read_c_str(base.model_asset_path) },
            model_asset_buffer_len: if base.model_asset_buffer.is_null() {
                0
            } else {
                base.model_asset_buffer_count as usize
            },
        };
        let has_model = seen.model_asset_path.is_some() || seen.model_asset_buffer_len > 0;
        state.counters.last_options = Some(seen);

        if let Some(failure) = state.behavior.create_failure.clone() {
            // SAFETY: out-parameter provided by the binding
            unsafe { report(&mut state, error_msg, failure.message.as_deref()) };
            return ptr::null_mut();
        }
        if !has_model {
            // SAFETY: out-parameter provided by the binding
            unsafe { report(&mut state, error_msg, Some(MISSING_MODEL_MESSAGE)) };
            return ptr::null_mut();
        }

        let engine = Box::new(MockEngine {
            l2_normalize: options.embedder_options.l2_normalize,
            quantize: options.embedder_options.quantize,
        });
        let handle = (&*engine as *const MockEngine).cast_mut().cast::<c_void>();
        state.handles.insert(handle as usize, engine);
        handle
    })
}

unsafe extern "C" fn mock_embed(
    embedder: *mut c_void,
    utf8_text: *const c_char,
    result: *mut EmbeddingResultC,
    error_msg: *mut *mut c_char,
) -> c_int {
    MOCK.with(|m| {
        let mut state = m.borrow_mut();
        state.counters.embed_calls += 1;

        let engine = state
            .handles
            .get(&(embedder as usize))
            .map(|e| (e.l2_normalize, e.quantize));
        let Some((l2_normalize, quantize)) = engine else {
            // SAFETY: out-parameter provided by the binding
            unsafe { report(&mut state, error_msg, Some("unknown embedder handle")) };
            return 3;
        };
        if utf8_text.is_null() || result.is_null() {
            // SAFETY: out-parameter provided by the binding
            unsafe { report(&mut state, error_msg, Some("text and result must not be null")) };
            return 3;
        }
        // SAFETY: the binding passes a NUL-terminated CString
        state.counters.last_text = unsafe { read_c_str(utf8_text) };

        if let Some(failure) = state.behavior.embed_failure.clone() {
            // SAFETY: out-parameter provided by the binding
            unsafe { report(&mut state, error_msg, failure.message.as_deref()) };
            return failure.code;
        }

        let mut allocation = build_allocation(&state.behavior.heads, l2_normalize, quantize);
        let record = EmbeddingResultC {
            embeddings: allocation.heads.as_mut_ptr(),
            embeddings_count: allocation.heads.len() as u32,
            timestamp_ms: 0,
            has_timestamp_ms: false,
        };
        state
            .results
            .insert(record.embeddings as usize, allocation);
        // SAFETY: non-null result record provided by the binding
        unsafe { *result = record };
        0
    })
}

unsafe extern "C" fn mock_close_result(result: *mut EmbeddingResultC) {
    MOCK.with(|m| {
        let mut state = m.borrow_mut();
        state.counters.release_calls += 1;

        if result.is_null() {
            state.counters.invalid_releases += 1;
            return;
        }
        // SAFETY: non-null record provided by the binding
        let record = unsafe { &mut *result };
        if state.results.remove(&(record.embeddings as usize)).is_none() {
            state.counters.invalid_releases += 1;
        }
        record.embeddings = ptr::null_mut();
        record.embeddings_count = 0;
    })
}

unsafe extern "C" fn mock_close(embedder: *mut c_void, error_msg: *mut *mut c_char) -> c_int {
    MOCK.with(|m| {
        let mut state = m.borrow_mut();
        state.counters.close_calls += 1;

        if state.handles.remove(&(embedder as usize)).is_none() {
            // SAFETY: out-parameter provided by the binding
            unsafe { report(&mut state, error_msg, Some("unknown embedder handle")) };
            return 3;
        }
        if let Some(failure) = state.behavior.close_failure.clone() {
            // SAFETY: out-parameter provided by the binding
            unsafe { report(&mut state, error_msg, failure.message.as_deref()) };
            return failure.code;
        }
        0
    })
}

// ── Output synthesis ─────────────────────────────────────────────────

fn build_allocation(heads: &[MockHead], l2_normalize: bool, quantize: bool) -> MockAllocation {
    // At least one slot so every record gets a distinct heap address
    let mut records = Vec::with_capacity(heads.len().max(1));
    let mut floats = Vec::new();
    let mut quantized = Vec::new();

    for (index, head) in heads.iter().enumerate() {
        let (kind, values_count, data): (c_int, u32, *const c_void) = match head {
            MockHead::Float(raw) => {
                let mut values = raw.clone();
                if l2_normalize {
                    l2_normalize_in_place(&mut values);
                }
                if quantize {
                    let q: Vec<i8> = values.iter().map(|&x| quantize_component(x)).collect();
                    let entry = (EMBEDDING_KIND_QUANTIZED, q.len() as u32, q.as_ptr().cast());
                    quantized.push(q);
                    entry
                } else {
                    let entry = (EMBEDDING_KIND_FLOAT, values.len() as u32, values.as_ptr().cast());
                    floats.push(values);
                    entry
                }
            }
            MockHead::Quantized(raw) => {
                let q = raw.clone();
                let entry = (EMBEDDING_KIND_QUANTIZED, q.len() as u32, q.as_ptr().cast());
                quantized.push(q);
                entry
            }
            MockHead::UnknownKind(tag) => (*tag, 0, ptr::null()),
        };

        records.push(EmbeddingC {
            kind,
            values_count,
            data,
            head_index: index as c_int,
            head_name: ptr::null(),
        });
    }

    MockAllocation {
        heads: records,
        _floats: floats,
        _quantized: quantized,
    }
}

fn l2_normalize_in_place(values: &mut [f32]) {
    let norm = values.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for v in values.iter_mut() {
            *v /= norm;
        }
    }
}

/// Scalar quantization of a unit-norm component into `i8`.
fn quantize_component(x: f32) -> i8 {
    (x * 128.0).round().clamp(-128.0, 127.0) as i8
}
