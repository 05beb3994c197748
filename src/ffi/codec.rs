//! Binary layout codec.
//!
//! `encode_options` lowers [`EmbedderOptions`] into the `#[repr(C)]` options
//! record; `decode_result` copies a native result record into owned
//! [`EmbeddingResult`] values. Decoding only reads native memory.

use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_uint};
use std::ptr;

use super::types::{
    BaseOptionsC, EmbedderOptionsC, EmbeddingC, EmbeddingKind, EmbeddingResultC,
    TextEmbedderOptionsC,
};
use crate::config::EmbedderOptions;
use crate::embedder::result::{Embedding, EmbeddingResult, EmbeddingValues};
use crate::embedder::EmbedderError;

/// An options record together with the storage its pointers refer to.
///
/// The path and buffer live on the heap, so moving this value does not
/// invalidate the pointers inside `record`.
#[derive(Debug)]
pub struct EncodedOptions {
    record: TextEmbedderOptionsC,
    _model_path: Option<CString>,
    _model_buffer: Option<Vec<u8>>,
}

impl EncodedOptions {
    #[must_use]
    pub fn record(&self) -> &TextEmbedderOptionsC {
        &self.record
    }

    /// Pointer handed to native `create`; valid while `self` is alive.
    #[must_use]
    pub fn as_ptr(&self) -> *const TextEmbedderOptionsC {
        &self.record
    }
}

/// Encode options into the native layout. Unset flags become `false`.
pub fn encode_options(options: &EmbedderOptions) -> Result<EncodedOptions, EmbedderError> {
    let model_path = options
        .base_options
        .model_asset_path
        .as_deref()
        .map(|path| {
            let utf8 = path.to_str().ok_or_else(|| {
                EmbedderError::InvalidOptions(format!(
                    "model path is not valid UTF-8: {}",
                    path.display()
                ))
            })?;
            CString::new(utf8).map_err(|_| {
                EmbedderError::InvalidOptions(format!(
                    "model path contains a NUL byte: {}",
                    path.display()
                ))
            })
        })
        .transpose()?;

    let model_buffer = options.base_options.model_asset_buffer.clone();
    let buffer_count = match &model_buffer {
        Some(buffer) => c_uint::try_from(buffer.len()).map_err(|_| {
            EmbedderError::InvalidOptions(format!(
                "model buffer of {} bytes exceeds the native size limit",
                buffer.len()
            ))
        })?,
        None => 0,
    };

    let record = TextEmbedderOptionsC {
        base_options: BaseOptionsC {
            model_asset_buffer: model_buffer
                .as_ref()
                .map_or(ptr::null(), |b| b.as_ptr().cast::<c_char>()),
            model_asset_buffer_count: buffer_count,
            model_asset_path: model_path.as_ref().map_or(ptr::null(), |p| p.as_ptr()),
        },
        embedder_options: EmbedderOptionsC {
            l2_normalize: options.l2_normalize(),
            quantize: options.quantize(),
        },
    };

    Ok(EncodedOptions {
        record,
        _model_path: model_path,
        _model_buffer: model_buffer,
    })
}

/// Copy a populated result record into owned values, heads in order.
///
/// # Safety
///
/// `record` must have been filled by a successful native `embed` call and
/// not yet released: `embeddings` points to `embeddings_count` heads, each
/// head's `data` points to `values_count` elements of the type named by its
/// tag, and `head_name` is null or NUL-terminated.
pub unsafe fn decode_result(record: &EmbeddingResultC) -> Result<EmbeddingResult, EmbedderError> {
    let count = record.embeddings_count as usize;
    if count > 0 && record.embeddings.is_null() {
        return Err(EmbedderError::Decode(format!(
            "{count} heads reported but the head array is null"
        )));
    }

    let heads: &[EmbeddingC] = if count == 0 {
        &[]
    } else {
        // SAFETY: non-null, `count` heads per the caller's contract
        unsafe { std::slice::from_raw_parts(record.embeddings, count) }
    };

    let embeddings = heads
        .iter()
        .enumerate()
        // SAFETY: each head satisfies the caller's contract
        .map(|(position, head)| unsafe { decode_head(position, head) })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(EmbeddingResult {
        embeddings,
        timestamp_ms: record.has_timestamp_ms.then_some(record.timestamp_ms),
    })
}

/// # Safety
///
/// See [`decode_result`].
unsafe fn decode_head(position: usize, head: &EmbeddingC) -> Result<Embedding, EmbedderError> {
    let kind = EmbeddingKind::try_from(head.kind).map_err(|raw| {
        EmbedderError::Decode(format!("head {position} has unknown type tag {raw}"))
    })?;

    let len = head.values_count as usize;
    if len > 0 && head.data.is_null() {
        return Err(EmbedderError::Decode(format!(
            "head {position} reports {len} values but its data pointer is null"
        )));
    }

    // SAFETY: data is non-null whenever len > 0, typed per `kind`
    let values = match kind {
        EmbeddingKind::Float => EmbeddingValues::Float(unsafe { copy_values(head.data.cast(), len) }),
        EmbeddingKind::Quantized => {
            EmbeddingValues::Quantized(unsafe { copy_values(head.data.cast(), len) })
        }
    };

    let head_name = if head.head_name.is_null() {
        None
    } else {
        // SAFETY: non-null and NUL-terminated per the caller's contract
        Some(unsafe { CStr::from_ptr(head.head_name) }.to_string_lossy().into_owned())
    };

    Ok(Embedding {
        values,
        head_index: head.head_index,
        head_name,
    })
}

/// # Safety
///
/// When `len > 0`, `data` must point to `len` initialized, aligned `T`.
unsafe fn copy_values<T: Copy>(data: *const T, len: usize) -> Vec<T> {
    if len == 0 {
        return Vec::new();
    }
    // SAFETY: upheld by the caller
    unsafe { std::slice::from_raw_parts(data, len) }.to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytemuck::Zeroable;
    use std::os::raw::{c_int, c_void};
    use std::path::PathBuf;

    fn float_head(values: &[f32], index: c_int) -> EmbeddingC {
        EmbeddingC {
            kind: EmbeddingKind::Float.into(),
            values_count: values.len() as u32,
            data: values.as_ptr().cast::<c_void>(),
            head_index: index,
            head_name: ptr::null(),
        }
    }

    fn quantized_head(values: &[i8], index: c_int) -> EmbeddingC {
        EmbeddingC {
            kind: EmbeddingKind::Quantized.into(),
            values_count: values.len() as u32,
            data: values.as_ptr().cast::<c_void>(),
            head_index: index,
            head_name: ptr::null(),
        }
    }

    fn record_for(heads: &mut [EmbeddingC]) -> EmbeddingResultC {
        EmbeddingResultC {
            embeddings: heads.as_mut_ptr(),
            embeddings_count: heads.len() as u32,
            timestamp_ms: 0,
            has_timestamp_ms: false,
        }
    }

    #[test]
    fn test_encode_defaults_to_false() {
        let encoded = encode_options(&EmbedderOptions::from_model_path("model.tflite")).unwrap();
        let flags = encoded.record().embedder_options;
        assert!(!flags.l2_normalize);
        assert!(!flags.quantize);
    }

    #[test]
    fn test_encode_flags() {
        let options = EmbedderOptions::from_model_path("model.tflite")
            .with_l2_normalize(true)
            .with_quantize(true);
        let encoded = encode_options(&options).unwrap();
        assert_eq!(
            bytemuck::bytes_of(&encoded.record().embedder_options),
            &[1u8, 1u8]
        );
    }

    #[test]
    fn test_encode_model_path() {
        let encoded = encode_options(&EmbedderOptions::from_model_path("/m/bert.tflite")).unwrap();
        let base = encoded.record().base_options;
        assert!(base.model_asset_buffer.is_null());
        assert_eq!(base.model_asset_buffer_count, 0);
        let path = unsafe { CStr::from_ptr(base.model_asset_path) };
        assert_eq!(path.to_str().unwrap(), "/m/bert.tflite");
    }

    #[test]
    fn test_encode_model_buffer_survives_move() {
        let encoded = encode_options(&EmbedderOptions::from_model_buffer(vec![7, 8, 9])).unwrap();
        let moved = Box::new(encoded);
        let base = moved.record().base_options;
        assert!(base.model_asset_path.is_null());
        assert_eq!(base.model_asset_buffer_count, 3);
        let bytes = unsafe { std::slice::from_raw_parts(base.model_asset_buffer.cast::<u8>(), 3) };
        assert_eq!(bytes, &[7, 8, 9]);
        assert_eq!(moved.as_ptr(), moved.record() as *const _);
    }

    #[test]
    fn test_encode_without_model_source() {
        let encoded = encode_options(&EmbedderOptions::default()).unwrap();
        let base = encoded.record().base_options;
        assert!(base.model_asset_path.is_null());
        assert!(base.model_asset_buffer.is_null());
    }

    #[test]
    fn test_encode_rejects_nul_in_path() {
        let options = EmbedderOptions::from_model_path(PathBuf::from("bad\0path"));
        let err = encode_options(&options).unwrap_err();
        assert!(matches!(err, EmbedderError::InvalidOptions(_)));
    }

    #[test]
    fn test_decode_float_head() {
        let values = [0.6f32, 0.8];
        let mut heads = [float_head(&values, 0)];
        let record = record_for(&mut heads);

        let result = unsafe { decode_result(&record) }.unwrap();
        assert_eq!(result.embeddings.len(), 1);
        assert_eq!(result.embeddings[0].as_floats(), Some(&values[..]));
        assert_eq!(result.embeddings[0].dimension(), 2);
        assert!(result.timestamp_ms.is_none());
    }

    #[test]
    fn test_decode_mixed_heads_in_order() {
        let floats = [1.0f32, 0.0, -1.0];
        let quantized = [127i8, -128, 0, 5];
        let name = CString::new("pooled").unwrap();
        let mut heads = [quantized_head(&quantized, 0), float_head(&floats, 1)];
        heads[1].head_name = name.as_ptr();
        let mut record = record_for(&mut heads);
        record.timestamp_ms = 42;
        record.has_timestamp_ms = true;

        let result = unsafe { decode_result(&record) }.unwrap();
        assert_eq!(result.embeddings.len(), 2);
        assert_eq!(result.embeddings[0].as_quantized(), Some(&quantized[..]));
        assert_eq!(result.embeddings[0].head_name, None);
        assert_eq!(result.embeddings[1].as_floats(), Some(&floats[..]));
        assert_eq!(result.embeddings[1].head_index, 1);
        assert_eq!(result.embeddings[1].head_name.as_deref(), Some("pooled"));
        assert_eq!(result.timestamp_ms, Some(42));
    }

    #[test]
    fn test_decode_does_not_mutate_native_memory() {
        let values = [0.25f32, 0.5];
        let mut heads = [float_head(&values, 3)];
        let record = record_for(&mut heads);

        let _ = unsafe { decode_result(&record) }.unwrap();
        assert_eq!(values, [0.25, 0.5]);
        assert_eq!(heads[0].values_count, 2);
        assert_eq!(heads[0].head_index, 3);
    }

    #[test]
    fn test_decode_empty_record() {
        let record = EmbeddingResultC::zeroed();
        let result = unsafe { decode_result(&record) }.unwrap();
        assert!(result.embeddings.is_empty());
    }

    #[test]
    fn test_decode_zero_length_head_with_null_data() {
        let mut heads = [float_head(&[], 0)];
        heads[0].data = ptr::null();
        let record = record_for(&mut heads);
        let result = unsafe { decode_result(&record) }.unwrap();
        assert_eq!(result.embeddings[0].dimension(), 0);
    }

    #[test]
    fn test_decode_unknown_tag() {
        let values = [1.0f32];
        let mut heads = [float_head(&values, 0)];
        heads[0].kind = 9;
        let record = record_for(&mut heads);
        let err = unsafe { decode_result(&record) }.unwrap_err();
        assert!(matches!(err, EmbedderError::Decode(ref m) if m.contains("type tag 9")));
    }

    #[test]
    fn test_decode_null_data_with_values() {
        let mut heads = [float_head(&[], 0)];
        heads[0].values_count = 4;
        heads[0].data = ptr::null();
        let record = record_for(&mut heads);
        assert!(matches!(
            unsafe { decode_result(&record) },
            Err(EmbedderError::Decode(_))
        ));
    }

    #[test]
    fn test_decode_null_head_array() {
        let mut record = EmbeddingResultC::zeroed();
        record.embeddings_count = 2;
        assert!(matches!(
            unsafe { decode_result(&record) },
            Err(EmbedderError::Decode(_))
        ));
    }
}
