//! Result memory releaser.
//!
//! A populated result record is owned by the native side until it is handed
//! back through `close_result`. [`ResultGuard`] holds such a record and makes
//! sure that happens exactly once per successful `embed` call.

use tracing::debug;

use super::types::{CloseResultFn, EmbeddingResultC};

/// Owns one populated native result record until it is released.
pub struct ResultGuard {
    record: EmbeddingResultC,
    close_result: CloseResultFn,
    released: bool,
}

impl ResultGuard {
    /// Take ownership of a record filled by a successful `embed` call.
    ///
    /// # Safety
    ///
    /// `record` must have been populated by the native side (return code 0)
    /// and not released yet; `close_result` must be the release function of
    /// the same library.
    #[must_use]
    pub unsafe fn new(record: EmbeddingResultC, close_result: CloseResultFn) -> Self {
        Self {
            record,
            close_result,
            released: false,
        }
    }

    /// The record, readable until the guard is released.
    #[must_use]
    pub fn record(&self) -> &EmbeddingResultC {
        &self.record
    }

    /// Hand the record back to the native side.
    pub fn release(mut self) {
        self.release_once();
    }

    fn release_once(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        debug!(
            heads = self.record.embeddings_count,
            "releasing native embedding result"
        );
        // SAFETY: the record was populated by the native side (see `new`) and
        // `released` guarantees it is handed back only once
        unsafe { (self.close_result)(&mut self.record) };
    }
}

impl Drop for ResultGuard {
    fn drop(&mut self) {
        self.release_once();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytemuck::Zeroable;
    use std::cell::Cell;

    thread_local! {
        static RELEASES: Cell<usize> = const { Cell::new(0) };
    }

    unsafe extern "C" fn counting_release(result: *mut EmbeddingResultC) {
        RELEASES.with(|c| c.set(c.get() + 1));
        // Mark the record so the test can see the guard passed its own copy
        unsafe { (*result).embeddings_count = 0 };
    }

    fn releases() -> usize {
        RELEASES.with(Cell::get)
    }

    fn populated() -> EmbeddingResultC {
        let mut record = EmbeddingResultC::zeroed();
        record.embeddings_count = 1;
        record
    }

    #[test]
    fn test_explicit_release_calls_once() {
        let before = releases();
        let guard = unsafe { ResultGuard::new(populated(), counting_release) };
        assert_eq!(guard.record().embeddings_count, 1);
        guard.release();
        assert_eq!(releases() - before, 1);
    }

    #[test]
    fn test_drop_releases_once() {
        let before = releases();
        {
            let _guard = unsafe { ResultGuard::new(populated(), counting_release) };
        }
        assert_eq!(releases() - before, 1);
    }

    #[test]
    fn test_release_on_early_return() {
        fn decode_and_fail(guard: &ResultGuard) -> Result<(), String> {
            if guard.record().embeddings_count > 0 {
                return Err("decode failed".to_string());
            }
            Ok(())
        }

        let before = releases();
        let result = {
            let guard = unsafe { ResultGuard::new(populated(), counting_release) };
            decode_and_fail(&guard)
        };
        assert!(result.is_err());
        assert_eq!(releases() - before, 1);
    }
}
