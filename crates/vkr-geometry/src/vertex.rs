//! Vertex layouts and the interleaved vertex types the built-ins and batch
//! path produce. One pool is materialized per [`VertexLayoutKind`].
//!
//! A small closed enum rather than a type-level description, since callers
//! here only need strides and alignment, not full shader reflection.

use nalgebra_glm as glm;

pub const GEOMETRY_VERTEX_LAYOUT_COUNT: usize = 3;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum VertexLayoutKind {
    /// Position + normal + UV + tangent: the layout built-ins and most
    /// authored meshes use.
    PositionNormalUvTangent,
    /// Position + UV only, used by 2-D / UI geometry.
    Position2DUv,
    /// Position + vertex color, used by debug/gizmo geometry.
    PositionColor,
}

impl VertexLayoutKind {
    pub fn index(self) -> usize {
        match self {
            VertexLayoutKind::PositionNormalUvTangent => 0,
            VertexLayoutKind::Position2DUv => 1,
            VertexLayoutKind::PositionColor => 2,
        }
    }

    pub fn stride(self) -> u32 {
        match self {
            VertexLayoutKind::PositionNormalUvTangent => std::mem::size_of::<Vertex3D>() as u32,
            VertexLayoutKind::Position2DUv => std::mem::size_of::<Vertex2D>() as u32,
            VertexLayoutKind::PositionColor => std::mem::size_of::<VertexColor>() as u32,
        }
    }

    /// Whether this layout carries authored tangents, i.e. whether
    /// [`crate::builtins::generate_tangents`] applies to it.
    pub fn is_3d(self) -> bool {
        matches!(self, VertexLayoutKind::PositionNormalUvTangent)
    }
}

pub const INDEX_ELEMENT_SIZE: u32 = std::mem::size_of::<u32>() as u32;

/// The primary authored-mesh vertex layout.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Vertex3D {
    pub position: glm::Vec3,
    pub normal: glm::Vec3,
    pub uv: glm::Vec2,
    /// xyz tangent, w handedness sign; zeroed until tangent generation runs.
    pub tangent: glm::Vec4,
}

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Vertex2D {
    pub position: glm::Vec2,
    pub uv: glm::Vec2,
}

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct VertexColor {
    pub position: glm::Vec3,
    pub color: glm::Vec4,
}

/// Reinterprets a `#[repr(C)]` vertex slice as raw bytes for upload. Sound
/// because every vertex type here is `repr(C)`, `Copy`, and made only of
/// plain floating-point fields with no padding-sensitive invariants.
pub fn as_bytes<T: Copy>(data: &[T]) -> &[u8] {
    let byte_len = std::mem::size_of_val(data);
    unsafe { std::slice::from_raw_parts(data.as_ptr() as *const u8, byte_len) }
}

pub fn indices_as_bytes(data: &[u32]) -> &[u8] {
    as_bytes(data)
}
