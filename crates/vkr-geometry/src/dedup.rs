//! Vertex deduplication: hashes each vertex with FNV-1a over quantized
//! position/normal/UV, places it into a scratch table sized >= 2x the
//! vertex count, and rewrites the index buffer in place from the remap
//! table.
//!
//! The scratch table here is a plain `fxhash`-keyed map rather than
//! [`crate::name_map`]'s interned-arena table: this is throwaway per-call
//! scratch state, not a long-lived registry, so there's no need for
//! interned keys or tombstone bookkeeping.

use fxhash::FxHashMap;

use crate::vertex::Vertex3D;

pub const FLOAT_EPSILON: f32 = 1e-5;

fn quantize(value: f32) -> i64 {
    (value / FLOAT_EPSILON).round() as i64
}

fn fnv1a_u64(values: &[i64]) -> u64 {
    const OFFSET_BASIS: u64 = 0xcbf29ce484222325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    let mut hash = OFFSET_BASIS;
    for &v in values {
        for byte in v.to_le_bytes() {
            hash ^= byte as u64;
            hash = hash.wrapping_mul(PRIME);
        }
    }
    hash
}

fn quantized_key(v: &Vertex3D) -> [i64; 8] {
    [
        quantize(v.position.x),
        quantize(v.position.y),
        quantize(v.position.z),
        quantize(v.normal.x),
        quantize(v.normal.y),
        quantize(v.normal.z),
        quantize(v.uv.x),
        quantize(v.uv.y),
    ]
}

/// Merges vertices that are component-wise equal within [`FLOAT_EPSILON`]
/// and rewrites `indices` to point at the deduplicated vertex list.
/// O(n) expected; pathological input (every vertex hashing into the same
/// bucket) degrades to O(n^2).
pub fn deduplicate(vertices: &[Vertex3D], indices: &[u32]) -> (Vec<Vertex3D>, Vec<u32>) {
    let mut table: FxHashMap<u64, Vec<(usize, [i64; 8])>> =
        FxHashMap::with_capacity_and_hasher(vertices.len() * 2, Default::default());
    let mut remap = vec![0u32; vertices.len()];
    let mut unique = Vec::with_capacity(vertices.len());

    for (i, v) in vertices.iter().enumerate() {
        let key = quantized_key(v);
        let hash = fnv1a_u64(&key);
        let bucket = table.entry(hash).or_default();
        if let Some(&(existing_idx, _)) = bucket.iter().find(|(_, k)| *k == key) {
            remap[i] = remap[existing_idx];
        } else {
            let new_index = unique.len() as u32;
            unique.push(*v);
            bucket.push((i, key));
            remap[i] = new_index;
        }
    }

    let new_indices = indices.iter().map(|&i| remap[i as usize]).collect();
    (unique, new_indices)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra_glm as glm;

    fn vertex(x: f32) -> Vertex3D {
        Vertex3D {
            position: glm::vec3(x, 0.0, 0.0),
            normal: glm::vec3(0.0, 1.0, 0.0),
            uv: glm::vec2(0.0, 0.0),
            tangent: glm::Vec4::zeros(),
        }
    }

    #[test]
    fn exact_duplicates_collapse_to_one_vertex() {
        let vertices = vec![vertex(1.0), vertex(1.0), vertex(2.0)];
        let indices = vec![0, 1, 2];
        let (unique, remapped) = deduplicate(&vertices, &indices);
        assert_eq!(unique.len(), 2);
        assert_eq!(remapped[0], remapped[1]);
        assert_ne!(remapped[0], remapped[2]);
    }

    #[test]
    fn within_epsilon_vertices_also_collapse() {
        let vertices = vec![vertex(1.0), vertex(1.0 + FLOAT_EPSILON * 0.1)];
        let indices = vec![0, 1];
        let (unique, _) = deduplicate(&vertices, &indices);
        assert_eq!(unique.len(), 1);
    }
}
