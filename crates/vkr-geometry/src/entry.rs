//! A single logical mesh slot inside a pool.

use nalgebra_glm as glm;
use vkr_backend::BufferHandle;

use crate::vertex::VertexLayoutKind;

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Aabb {
    pub min: glm::Vec3,
    pub max: glm::Vec3,
}

impl Aabb {
    pub fn empty() -> Aabb {
        Aabb {
            min: glm::vec3(f32::INFINITY, f32::INFINITY, f32::INFINITY),
            max: glm::vec3(f32::NEG_INFINITY, f32::NEG_INFINITY, f32::NEG_INFINITY),
        }
    }

    pub fn encompass(&mut self, p: glm::Vec3) {
        self.min = glm::vec3(self.min.x.min(p.x), self.min.y.min(p.y), self.min.z.min(p.z));
        self.max = glm::vec3(self.max.x.max(p.x), self.max.y.max(p.y), self.max.z.max(p.z));
    }

    pub fn from_points<'a>(points: impl Iterator<Item = &'a glm::Vec3>) -> Aabb {
        let mut aabb = Aabb::empty();
        for p in points {
            aabb.encompass(*p);
        }
        aabb
    }
}

/// One logical mesh slot. Most geometries are suballocated out of their
/// layout's shared vertex/index buffer pool, in which case `first_vertex`
/// and `first_index` are byte-range offsets into that pool and
/// `standalone_vertex_buffer`/`standalone_index_buffer` are `None`. A
/// geometry created through the batch path instead owns a dedicated pair of
/// GPU buffers, recorded in those two fields so `render` binds the right
/// buffer and `release` destroys it instead of returning a pool range.
/// Zeroed (but generation kept) when the slot is released, so stale handles
/// stay detectable.
#[derive(Clone, Debug)]
pub struct GeometryEntry {
    pub slot_id: u32,
    pub generation: u32,
    pub layout: VertexLayoutKind,
    pub first_vertex: u64,
    pub vertex_count: u32,
    pub first_index: u64,
    pub index_count: u32,
    pub debug_name: String,
    pub aabb: Aabb,
    pub material_name: Option<String>,
    pub pipeline_id: u32,
    pub live: bool,
    pub standalone_vertex_buffer: Option<BufferHandle>,
    pub standalone_index_buffer: Option<BufferHandle>,
}

impl GeometryEntry {
    pub fn empty(slot_id: u32, generation: u32) -> GeometryEntry {
        GeometryEntry {
            slot_id,
            generation,
            layout: VertexLayoutKind::PositionNormalUvTangent,
            first_vertex: 0,
            vertex_count: 0,
            first_index: 0,
            index_count: 0,
            debug_name: String::new(),
            aabb: Aabb::empty(),
            material_name: None,
            pipeline_id: 0,
            live: false,
            standalone_vertex_buffer: None,
            standalone_index_buffer: None,
        }
    }
}
