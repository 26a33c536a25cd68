//! An in-process backend double: a single struct owning counters and a
//! handle cursor, no real device. Used by every crate's own tests and by
//! end-to-end scenario tests that need a `Backend` without a GPU.

use std::cell::RefCell;

use crate::error::BackendError;
use crate::handles::{BufferHandle, InstanceStateHandle, PipelineHandle, TextureHandle};
use crate::pipeline::{GraphicsPipelineDescription, ShaderRuntimeLayout};
use crate::resource::{BufferCreateRequest, TextureCreateRequest};
use crate::stats::UploadWaitStats;
use crate::traits::{BatchResult, Backend};

#[derive(Default)]
struct MockState {
    next_handle: u64,
    destroy_call_count: u64,
    buffer_upload_call_count: u64,
    buffer_batch_failure: Option<(usize, BackendError)>,
    supports_buffer_batch: bool,
    texture_batch_failure: Option<(usize, BackendError)>,
    upload_wait_stats: UploadWaitStats,
    descriptor_writes_avoided: u64,
    shader_runtime_layout: Option<ShaderRuntimeLayout>,
    last_bound_vertex_buffer: Option<(BufferHandle, u64)>,
    last_bound_index_buffer: Option<(BufferHandle, u64)>,
}

pub struct MockBackend {
    state: RefCell<MockState>,
}

impl Default for MockBackend {
    fn default() -> Self {
        MockBackend {
            state: RefCell::new(MockState {
                supports_buffer_batch: true,
                ..MockState::default()
            }),
        }
    }
}

impl MockBackend {
    pub fn new() -> MockBackend {
        MockBackend::default()
    }

    fn next_handle(&self) -> u64 {
        let mut state = self.state.borrow_mut();
        state.next_handle += 1;
        state.next_handle
    }

    pub fn destroy_call_count(&self) -> u64 {
        self.state.borrow().destroy_call_count
    }

    pub fn buffer_upload_call_count(&self) -> u64 {
        self.state.borrow().buffer_upload_call_count
    }

    /// Makes the next `buffer_create_batch` call fail at `index` with
    /// `error`, succeeding everywhere else (S5).
    pub fn fail_buffer_batch_at(&self, index: usize, error: BackendError) {
        self.state.borrow_mut().buffer_batch_failure = Some((index, error));
    }

    pub fn fail_texture_batch_at(&self, index: usize, error: BackendError) {
        self.state.borrow_mut().texture_batch_failure = Some((index, error));
    }

    /// Simulates a backend with no bulk buffer-create entry point, forcing
    /// the batch façade's scalar fallback path.
    pub fn disable_buffer_batch_support(&self) {
        self.state.borrow_mut().supports_buffer_batch = false;
    }

    pub fn set_upload_wait_stats(&self, stats: UploadWaitStats) {
        self.state.borrow_mut().upload_wait_stats = stats;
    }

    pub fn set_descriptor_writes_avoided(&self, count: u64) {
        self.state.borrow_mut().descriptor_writes_avoided = count;
    }

    pub fn set_shader_runtime_layout(&self, layout: ShaderRuntimeLayout) {
        self.state.borrow_mut().shader_runtime_layout = Some(layout);
    }

    pub fn last_bound_vertex_buffer(&self) -> Option<(BufferHandle, u64)> {
        self.state.borrow().last_bound_vertex_buffer
    }

    pub fn last_bound_index_buffer(&self) -> Option<(BufferHandle, u64)> {
        self.state.borrow().last_bound_index_buffer
    }
}

impl Backend for MockBackend {
    fn buffer_create(
        &self,
        _description: &BufferCreateRequest,
    ) -> Result<BufferHandle, BackendError> {
        Ok(BufferHandle(self.next_handle()))
    }

    fn buffer_create_batch(&self, requests: &[BufferCreateRequest]) -> Option<Vec<BatchResult>> {
        if !self.state.borrow().supports_buffer_batch {
            return None;
        }
        let failure = self.state.borrow().buffer_batch_failure;
        let results = requests
            .iter()
            .enumerate()
            .map(|(i, _)| match failure {
                Some((fail_index, error)) if fail_index == i => BatchResult {
                    handle: None,
                    error,
                },
                _ => BatchResult {
                    handle: Some(BufferHandle(self.next_handle())),
                    error: BackendError::None,
                },
            })
            .collect();
        Some(results)
    }

    fn buffer_upload(
        &self,
        _handle: BufferHandle,
        _offset: u64,
        _size: u64,
        _data: &[u8],
    ) -> BackendError {
        self.state.borrow_mut().buffer_upload_call_count += 1;
        BackendError::None
    }

    fn buffer_destroy(&self, _handle: BufferHandle) {
        self.state.borrow_mut().destroy_call_count += 1;
    }

    fn texture_create_with_payload_batch(
        &self,
        requests: &[TextureCreateRequest],
    ) -> Vec<(Option<TextureHandle>, BackendError)> {
        let failure = self.state.borrow().texture_batch_failure;
        requests
            .iter()
            .enumerate()
            .map(|(i, _)| match failure {
                Some((fail_index, error)) if fail_index == i => (None, error),
                _ => (Some(TextureHandle(self.next_handle())), BackendError::None),
            })
            .collect()
    }

    fn texture_destroy(&self, _handle: TextureHandle) {
        self.state.borrow_mut().destroy_call_count += 1;
    }

    fn pipeline_create_graphics(
        &self,
        _description: &GraphicsPipelineDescription,
    ) -> Result<PipelineHandle, BackendError> {
        Ok(PipelineHandle(self.next_handle()))
    }

    fn pipeline_get_shader_runtime_layout(
        &self,
        _handle: PipelineHandle,
    ) -> Option<ShaderRuntimeLayout> {
        self.state.borrow().shader_runtime_layout
    }

    fn pipeline_destroy(&self, _handle: PipelineHandle) {
        self.state.borrow_mut().destroy_call_count += 1;
    }

    fn bind_vertex_buffer(&self, buffer: BufferHandle, _binding: u32, offset: u64) {
        self.state.borrow_mut().last_bound_vertex_buffer = Some((buffer, offset));
    }
    fn bind_index_buffer(&self, buffer: BufferHandle, offset: u64) {
        self.state.borrow_mut().last_bound_index_buffer = Some((buffer, offset));
    }
    fn draw_indexed(&self, _index_count: u32, _instance_count: u32, _first_index: u32, _first_instance: u32) {}
    fn draw_indexed_indirect(&self, _indirect_buffer: BufferHandle, _offset: u64, _draw_count: u32) {}

    fn update_global_state(&self, _pipeline: PipelineHandle, _ubo: &[u8]) -> BackendError {
        BackendError::None
    }

    fn acquire_instance_state(&self, _pipeline: PipelineHandle) -> InstanceStateHandle {
        InstanceStateHandle(self.next_handle())
    }

    fn release_instance_state(&self, _pipeline: PipelineHandle, _instance: InstanceStateHandle) {}

    fn update_instance_state(
        &self,
        _pipeline: PipelineHandle,
        _instance: InstanceStateHandle,
        _data: &[u8],
    ) -> BackendError {
        BackendError::None
    }

    fn get_and_reset_descriptor_writes_avoided(&self) -> Option<u64> {
        let mut state = self.state.borrow_mut();
        let count = state.descriptor_writes_avoided;
        state.descriptor_writes_avoided = 0;
        Some(count)
    }

    fn get_and_reset_upload_wait_stats(&self) -> Option<UploadWaitStats> {
        let mut state = self.state.borrow_mut();
        let stats = state.upload_wait_stats;
        state.upload_wait_stats = UploadWaitStats::default();
        Some(stats)
    }
}
