//! The pipeline registry (component H): owns graphics pipelines, binds
//! state with redundant-bind elision, resolves shader configs into backend
//! descriptions, and tracks frame/lifetime telemetry.

pub mod error;
pub mod handle;
pub mod name_map;
pub mod registry;

pub use error::Error;
pub use handle::PipelineHandle;
pub use registry::{PipelineRegistry, PipelineRegistryStats};
