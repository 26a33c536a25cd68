//! The GPU backend contract: the single external collaborator the other
//! crates here (`vkr-geometry`, `vkr-pipeline`, `vkr-batch`) consume.
//! Command recording, shader compilation and the actual device are out of
//! scope — this crate states the contract as a trait object (`&dyn
//! Backend`) and ships a [`MockBackend`] test double standing in for a real
//! device.

mod error;
mod handles;
pub mod mock;
mod pipeline;
mod resource;
mod stats;
mod traits;

pub use error::BackendError;
pub use handles::{BufferHandle, InstanceStateHandle, PipelineHandle, TextureHandle};
pub use mock::MockBackend;
pub use pipeline::{
    Domain, GraphicsPipelineDescription, ShaderModuleConfig, ShaderRuntimeLayout,
    ShaderStageConfig, DOMAIN_COUNT,
};
pub use resource::{
    BufferCreateRequest, BufferDescription, BufferUpload, BufferUsageFlags, TextureCreateRequest,
    TextureDescription, TextureFormat, TextureUsageFlags,
};
pub use stats::UploadWaitStats;
pub use traits::{BatchResult, Backend};
