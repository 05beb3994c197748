//! Error channel adapter.
//!
//! Every native call reports failure twice: through its return value (null
//! handle or nonzero code) and through an optional message written to an
//! out-parameter. These helpers turn that pair into an [`EmbedderError`].
//!
//! The message buffer is owned by the native side. It is copied out
//! immediately and never freed here.

use std::ffi::CStr;
use std::fmt;
use std::os::raw::{c_char, c_int, c_void};
use std::ptr::NonNull;

use crate::embedder::EmbedderError;

/// Status codes returned by the native library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NativeStatus {
    Ok,
    Cancelled,
    Unknown,
    InvalidArgument,
    DeadlineExceeded,
    NotFound,
    AlreadyExists,
    PermissionDenied,
    ResourceExhausted,
    FailedPrecondition,
    Aborted,
    OutOfRange,
    Unimplemented,
    Internal,
    Unavailable,
    DataLoss,
    Unauthenticated,
}

impl NativeStatus {
    /// Map a raw return code, `None` for codes outside the known table.
    #[must_use]
    pub fn from_code(code: i32) -> Option<Self> {
        let status = match code {
            0 => Self::Ok,
            1 => Self::Cancelled,
            2 => Self::Unknown,
            3 => Self::InvalidArgument,
            4 => Self::DeadlineExceeded,
            5 => Self::NotFound,
            6 => Self::AlreadyExists,
            7 => Self::PermissionDenied,
            8 => Self::ResourceExhausted,
            9 => Self::FailedPrecondition,
            10 => Self::Aborted,
            11 => Self::OutOfRange,
            12 => Self::Unimplemented,
            13 => Self::Internal,
            14 => Self::Unavailable,
            15 => Self::DataLoss,
            16 => Self::Unauthenticated,
            _ => return None,
        };
        Some(status)
    }

    #[must_use]
    pub fn code(self) -> i32 {
        self as i32
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Cancelled => "cancelled",
            Self::Unknown => "unknown error",
            Self::InvalidArgument => "invalid argument",
            Self::DeadlineExceeded => "deadline exceeded",
            Self::NotFound => "not found",
            Self::AlreadyExists => "already exists",
            Self::PermissionDenied => "permission denied",
            Self::ResourceExhausted => "resource exhausted",
            Self::FailedPrecondition => "failed precondition",
            Self::Aborted => "aborted",
            Self::OutOfRange => "out of range",
            Self::Unimplemented => "unimplemented",
            Self::Internal => "internal error",
            Self::Unavailable => "unavailable",
            Self::DataLoss => "data loss",
            Self::Unauthenticated => "unauthenticated",
        }
    }
}

impl fmt::Display for NativeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Native operation that reported the failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Embed,
    Close,
}

/// Copy a native error message into an owned string.
///
/// Returns `None` for a null pointer. Invalid UTF-8 is replaced lossily.
///
/// # Safety
///
/// `msg` must be null or point to a NUL-terminated string that stays valid
/// for the duration of this call.
pub unsafe fn read_error_message(msg: *const c_char) -> Option<String> {
    if msg.is_null() {
        return None;
    }
    // SAFETY: non-null and NUL-terminated per the caller's contract
    let text = unsafe { CStr::from_ptr(msg) };
    Some(text.to_string_lossy().into_owned())
}

/// Check the handle returned by `create`.
///
/// # Safety
///
/// `msg` must satisfy the contract of [`read_error_message`].
pub unsafe fn check_handle(
    handle: *mut c_void,
    msg: *const c_char,
) -> Result<NonNull<c_void>, EmbedderError> {
    match NonNull::new(handle) {
        Some(handle) => Ok(handle),
        None => {
            // SAFETY: forwarded caller contract
            let message = unsafe { read_error_message(msg) }
                .unwrap_or_else(|| "native create returned a null handle".to_string());
            Err(EmbedderError::Creation { message })
        }
    }
}

/// Check the return code of `embed` or `close`.
///
/// # Safety
///
/// `msg` must satisfy the contract of [`read_error_message`].
pub unsafe fn check_return_code(
    code: c_int,
    msg: *const c_char,
    operation: Operation,
) -> Result<(), EmbedderError> {
    if code == 0 {
        return Ok(());
    }

    // SAFETY: forwarded caller contract
    let message = unsafe { read_error_message(msg) }.unwrap_or_else(|| fallback_message(code));

    Err(match operation {
        Operation::Embed => EmbedderError::Runtime { code, message },
        Operation::Close => EmbedderError::Close { code, message },
    })
}

fn fallback_message(code: c_int) -> String {
    match NativeStatus::from_code(code) {
        Some(status) => format!("unexpected return code {code} ({status})"),
        None => format!("unexpected return code {code}"),
    }
}
