//! The pooled geometry system (component G): maps logical meshes to
//! byte-range-allocated slices of shared vertex/index buffers, plus batch
//! submission, reference-counted naming, fixed-topology built-ins,
//! procedural primitives, tangent generation, and vertex deduplication.

pub mod builtins;
pub mod dedup;
pub mod entry;
pub mod error;
pub mod handle;
pub mod name_map;
pub mod pool;
pub mod system;
pub mod vertex;

pub use entry::{Aabb, GeometryEntry};
pub use error::Error;
pub use handle::GeometryHandle;
pub use system::{BatchCreateResult, BatchGeometryInput, GeometrySystem, GeometrySystemStats};
pub use vertex::{Vertex2D, Vertex3D, VertexLayoutKind, GEOMETRY_VERTEX_LAYOUT_COUNT};
