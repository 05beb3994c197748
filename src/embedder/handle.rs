/// Ownership and state of the opaque native embedder handle.
use std::fmt;
use std::os::raw::c_void;
use std::ptr::NonNull;

use super::EmbedderError;

/// Lifecycle state of a native handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleState {
    /// No native resource has been acquired yet.
    Uninitialized,
    /// A live native resource is owned.
    Created,
    /// Terminal. The native resource has been handed to `close`.
    Closed,
}

impl fmt::Display for HandleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Uninitialized => "uninitialized",
            Self::Created => "created",
            Self::Closed => "closed",
        };
        f.write_str(s)
    }
}

/// Single-owner slot for the native handle.
///
/// Not `Clone`: the address is only ever reachable through one slot, and
/// [`NativeHandle::take`] clears it before the native close call is issued.
#[derive(Default)]
pub(crate) struct NativeHandle {
    ptr: Option<NonNull<c_void>>,
    closed: bool,
}

impl NativeHandle {
    pub(crate) fn state(&self) -> HandleState {
        match (self.ptr, self.closed) {
            (Some(_), _) => HandleState::Created,
            (None, true) => HandleState::Closed,
            (None, false) => HandleState::Uninitialized,
        }
    }

    /// `Uninitialized -> Created`.
    pub(crate) fn acquire(&mut self, ptr: NonNull<c_void>) -> Result<(), EmbedderError> {
        match self.state() {
            HandleState::Uninitialized => {
                self.ptr = Some(ptr);
                Ok(())
            }
            state => Err(EmbedderError::State(format!(
                "cannot acquire a native handle in state {state}"
            ))),
        }
    }

    /// The live handle, or a state error naming `operation`.
    pub(crate) fn get(&self, operation: &str) -> Result<NonNull<c_void>, EmbedderError> {
        self.ptr.ok_or_else(|| {
            EmbedderError::State(format!(
                "cannot {operation}: embedder is {}",
                self.state()
            ))
        })
    }

    /// Clear the slot and move to `Closed`, returning the handle if one was
    /// live. Calling it again returns `None`.
    pub(crate) fn take(&mut self) -> Option<NonNull<c_void>> {
        self.closed = true;
        self.ptr.take()
    }
}

impl fmt::Debug for NativeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeHandle")
            .field("state", &self.state())
            .field("ptr", &self.ptr)
            .finish()
    }
}
