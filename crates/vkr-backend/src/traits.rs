//! The `Backend` trait: the device-facing contract every façade crate here
//! talks to, kept as a trait object (`&dyn Backend`) rather than a literal
//! function-pointer struct — it gives the same "swap the backend for a
//! mock in tests" property with less ceremony.

use crate::error::BackendError;
use crate::handles::{BufferHandle, InstanceStateHandle, PipelineHandle, TextureHandle};
use crate::pipeline::{GraphicsPipelineDescription, ShaderRuntimeLayout};
use crate::resource::{BufferCreateRequest, TextureCreateRequest};
use crate::stats::UploadWaitStats;

/// Per-index outcome of a batch create.
#[derive(Copy, Clone, Debug)]
pub struct BatchResult {
    pub handle: Option<BufferHandle>,
    pub error: BackendError,
}

pub trait Backend {
    fn buffer_create(&self, description: &BufferCreateRequest) -> Result<BufferHandle, BackendError>;

    /// `None` means the backend does not expose a bulk entry point; callers
    /// fall back to the scalar path.
    fn buffer_create_batch(&self, _requests: &[BufferCreateRequest]) -> Option<Vec<BatchResult>> {
        None
    }

    fn buffer_upload(
        &self,
        handle: BufferHandle,
        offset: u64,
        size: u64,
        data: &[u8],
    ) -> BackendError;

    fn buffer_destroy(&self, handle: BufferHandle);

    /// Required: the façade never synthesizes a non-batch fallback for
    /// textures.
    fn texture_create_with_payload_batch(
        &self,
        requests: &[TextureCreateRequest],
    ) -> Vec<(Option<TextureHandle>, BackendError)>;

    fn texture_destroy(&self, handle: TextureHandle);

    fn pipeline_create_graphics(
        &self,
        description: &GraphicsPipelineDescription,
    ) -> Result<PipelineHandle, BackendError>;

    /// `None` means the backend does not expose reflection-derived ABI
    /// sizes; the registry then leaves the description's layout at its
    /// default.
    fn pipeline_get_shader_runtime_layout(
        &self,
        _handle: PipelineHandle,
    ) -> Option<ShaderRuntimeLayout> {
        None
    }

    fn pipeline_destroy(&self, handle: PipelineHandle);

    fn bind_vertex_buffer(&self, buffer: BufferHandle, binding: u32, offset: u64);
    fn bind_index_buffer(&self, buffer: BufferHandle, offset: u64);
    fn draw_indexed(&self, index_count: u32, instance_count: u32, first_index: u32, first_instance: u32);
    fn draw_indexed_indirect(&self, indirect_buffer: BufferHandle, offset: u64, draw_count: u32);

    fn update_global_state(&self, pipeline: PipelineHandle, ubo: &[u8]) -> BackendError;

    fn acquire_instance_state(&self, pipeline: PipelineHandle) -> InstanceStateHandle;
    fn release_instance_state(&self, pipeline: PipelineHandle, instance: InstanceStateHandle);
    fn update_instance_state(
        &self,
        pipeline: PipelineHandle,
        instance: InstanceStateHandle,
        data: &[u8],
    ) -> BackendError;

    /// `None` means the backend does not track elided descriptor writes.
    fn get_and_reset_descriptor_writes_avoided(&self) -> Option<u64> {
        None
    }

    /// `false` means the backend does not implement upload-wait telemetry;
    /// the caller then treats the stats as zero.
    fn get_and_reset_upload_wait_stats(&self) -> Option<UploadWaitStats> {
        None
    }
}
