//! The batched buffer/texture creation façade: the single chokepoint where
//! GPU-visible resources are created in bulk, plus upload-wait telemetry
//! draining.
//!
//! Each request either fully succeeds (handle, no error) or contributes
//! nothing (no handle, an error) — callers never see a handle paired with
//! a failure. Buffers prefer the backend's bulk creation entry point when
//! it exists; otherwise a per-request scalar path rolls back (destroys)
//! any buffer it created for a request whose upload subsequently fails.

use log::warn;

use vkr_backend::{
    Backend, BackendError, BufferCreateRequest, BufferHandle, TextureCreateRequest, TextureHandle,
    UploadWaitStats,
};

/// Per-request outcome: `handle.is_some() <=> error == BackendError::None`
/// holds for every element on return.
pub type BatchOutcome<H> = (Option<H>, BackendError);

fn validate_buffer_request(request: &BufferCreateRequest) -> Option<BackendError> {
    if let Some(upload) = &request.upload {
        if upload.offset + upload.size > request.description.size {
            return Some(BackendError::InvalidParameter);
        }
    }
    None
}

/// Creates `n` buffers, uploading initial data where requested. Prefers the
/// backend's bulk entry point when available; otherwise falls back to a
/// per-request scalar path that rolls back (destroys) any buffer it
/// created for a request that subsequently fails its upload.
pub fn create_buffer_batch(
    backend: &dyn Backend,
    requests: &[BufferCreateRequest],
) -> Vec<BatchOutcome<BufferHandle>> {
    // Requests that fail local validation are pulled out before the backend
    // ever sees them; only the remainder is submitted, and results are
    // spliced back into the original order below.
    let mut pre_validated: Vec<Option<BackendError>> =
        requests.iter().map(validate_buffer_request).collect();

    let to_submit: Vec<BufferCreateRequest> = requests
        .iter()
        .zip(pre_validated.iter())
        .filter(|(_, err)| err.is_none())
        .map(|(r, _)| r.clone())
        .collect();

    let submitted_outcomes: Vec<BatchOutcome<BufferHandle>> = if to_submit.is_empty() {
        Vec::new()
    } else if let Some(results) = backend.buffer_create_batch(&to_submit) {
        results.into_iter().map(|r| (r.handle, r.error)).collect()
    } else {
        to_submit
            .iter()
            .map(|request| create_buffer_scalar(backend, request))
            .collect()
    };

    let mut submitted_outcomes = submitted_outcomes.into_iter();
    let mut out = Vec::with_capacity(requests.len());
    for err in pre_validated.drain(..) {
        match err {
            Some(e) => out.push((None, e)),
            None => out.push(submitted_outcomes.next().expect("one outcome per submitted request")),
        }
    }
    out
}

fn create_buffer_scalar(backend: &dyn Backend, request: &BufferCreateRequest) -> BatchOutcome<BufferHandle> {
    let handle = match backend.buffer_create(request) {
        Ok(handle) => handle,
        Err(e) => return (None, e),
    };
    if let Some(upload) = &request.upload {
        let err = backend.buffer_upload(handle, upload.offset, upload.size, &upload.data);
        if !err.is_success() {
            warn!("batch: per-request buffer upload failed ({:?}), rolling back the create", err);
            backend.buffer_destroy(handle);
            return (None, err);
        }
    }
    (Some(handle), BackendError::None)
}

/// Always delegates to the backend's bulk entry point; the façade never
/// synthesizes a scalar fallback for textures.
pub fn create_texture_batch(
    backend: &dyn Backend,
    requests: &[TextureCreateRequest],
) -> Vec<BatchOutcome<TextureHandle>> {
    backend.texture_create_with_payload_batch(requests).into_iter().collect()
}

/// Drains the backend's upload-wait counters. `false` (with zeroed stats)
/// when the backend does not implement the hook.
pub fn get_and_reset_upload_wait_stats(backend: &dyn Backend) -> (bool, UploadWaitStats) {
    match backend.get_and_reset_upload_wait_stats() {
        Some(stats) => (true, stats),
        None => (false, UploadWaitStats::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vkr_backend::{BufferDescription, BufferUpload, BufferUsageFlags, MockBackend};

    fn request(size: u64) -> BufferCreateRequest {
        BufferCreateRequest {
            description: BufferDescription { size, usage: BufferUsageFlags::VERTEX },
            upload: None,
        }
    }

    #[test]
    fn every_index_has_a_handle_xor_a_nonsuccess_error() {
        let backend = MockBackend::new();
        backend.fail_buffer_batch_at(1, BackendError::DeviceError);
        let requests = vec![request(64), request(64), request(64)];
        let results = create_buffer_batch(&backend, &requests);
        for (handle, error) in &results {
            assert_eq!(handle.is_some(), error.is_success());
        }
        assert!(results[1].0.is_none());
        assert_eq!(results[1].1, BackendError::DeviceError);
    }

    #[test]
    fn invalid_upload_range_is_rejected_without_touching_the_backend() {
        let backend = MockBackend::new();
        let bad = BufferCreateRequest {
            description: BufferDescription { size: 16, usage: BufferUsageFlags::VERTEX },
            upload: Some(BufferUpload { data: vec![0; 32], size: 32, offset: 0 }),
        };
        let results = create_buffer_batch(&backend, std::slice::from_ref(&bad));
        assert_eq!(results[0].0, None);
        assert_eq!(results[0].1, BackendError::InvalidParameter);
        assert_eq!(backend.destroy_call_count(), 0);
    }

    #[test]
    fn scalar_fallback_validates_before_touching_the_backend() {
        let backend = MockBackend::new();
        backend.disable_buffer_batch_support();
        let bad = BufferCreateRequest {
            description: BufferDescription { size: 4, usage: BufferUsageFlags::VERTEX },
            upload: Some(BufferUpload { data: vec![0; 8], size: 8, offset: 0 }),
        };
        let ok = request(64);
        let results = create_buffer_batch(&backend, &[bad, ok]);
        assert_eq!(results[0].0, None);
        assert_eq!(results[0].1, BackendError::InvalidParameter);
        assert!(results[1].0.is_some());
        assert_eq!(backend.destroy_call_count(), 0);
    }

    #[test]
    fn texture_batch_always_uses_the_backend_bulk_path() {
        let backend = MockBackend::new();
        backend.fail_texture_batch_at(0, BackendError::ResourceCreationFailed);
        let requests = vec![
            TextureCreateRequest {
                description: vkr_backend::TextureDescription {
                    width: 4,
                    height: 4,
                    depth: 1,
                    mip_levels: 1,
                    format: vkr_backend::TextureFormat::Rgba8Unorm,
                    usage: vkr_backend::TextureUsageFlags::SAMPLED,
                },
                payload: vec![0u8; 64],
            };
            2
        ];
        let results = create_texture_batch(&backend, &requests);
        assert_eq!(results[0].0, None);
        assert!(results[1].0.is_some());
    }

    #[test]
    fn upload_wait_telemetry_drains_then_zeroes() {
        let backend = MockBackend::new();
        backend.set_upload_wait_stats(UploadWaitStats {
            fence_wait_count: 3,
            queue_wait_idle_count: 2,
            device_wait_idle_count: 1,
        });
        let (ok, stats) = get_and_reset_upload_wait_stats(&backend);
        assert!(ok);
        assert_eq!(
            stats,
            UploadWaitStats { fence_wait_count: 3, queue_wait_idle_count: 2, device_wait_idle_count: 1 }
        );

        let (ok, stats) = get_and_reset_upload_wait_stats(&backend);
        assert!(ok);
        assert!(stats.is_zero());
    }
}
