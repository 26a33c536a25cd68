//! Fixed-topology built-ins, procedural primitives and tangent generation.
//! Plain free functions returning typed vertex/index vectors, no external
//! mesh-generation crate.

use nalgebra_glm as glm;

use crate::entry::Aabb;
use crate::vertex::{Vertex2D, Vertex3D};

const MIN_SEGMENTS: u32 = 3;
const MIN_RINGS: u32 = 2;

fn clamp_segments(n: u32) -> u32 {
    n.max(MIN_SEGMENTS)
}

fn clamp_rings(n: u32) -> u32 {
    n.max(MIN_RINGS)
}

pub fn aabb_of(vertices: &[Vertex3D]) -> Aabb {
    Aabb::from_points(vertices.iter().map(|v| &v.position))
}

/// Lengyel's per-triangle tangent accumulation, Gram-Schmidt orthogonalized
/// against each vertex's normal. Applies only to 3-D vertex layouts; a
/// layout without authored tangents is expected to start with `tangent`
/// zeroed.
pub fn generate_tangents(vertices: &mut [Vertex3D], indices: &[u32]) {
    let mut accum = vec![glm::Vec3::zeros(); vertices.len()];

    for tri in indices.chunks_exact(3) {
        let (i0, i1, i2) = (tri[0] as usize, tri[1] as usize, tri[2] as usize);
        let (v0, v1, v2) = (vertices[i0], vertices[i1], vertices[i2]);

        let edge1 = v1.position - v0.position;
        let edge2 = v2.position - v0.position;
        let duv1 = v1.uv - v0.uv;
        let duv2 = v2.uv - v0.uv;

        let denom = duv1.x * duv2.y - duv2.x * duv1.y;
        if denom.abs() < f32::EPSILON {
            continue;
        }
        let r = 1.0 / denom;
        let tangent = (edge1 * duv2.y - edge2 * duv1.y) * r;

        accum[i0] += tangent;
        accum[i1] += tangent;
        accum[i2] += tangent;
    }

    for (vertex, raw_tangent) in vertices.iter_mut().zip(accum.into_iter()) {
        let n = vertex.normal;
        let t = raw_tangent - n * n.dot(&raw_tangent);
        let t = if t.norm() > f32::EPSILON { t.normalize() } else { glm::vec3(1.0, 0.0, 0.0) };
        vertex.tangent = glm::vec4(t.x, t.y, t.z, 1.0);
    }
}

/// Axis-aligned box with `extents` as the half-size along each axis,
/// counter-clockwise winding when viewed from outside.
pub fn procedural_box(extents: glm::Vec3) -> (Vec<Vertex3D>, Vec<u32>) {
    let (x, y, z) = (extents.x, extents.y, extents.z);
    // 6 faces, each with its own 4 vertices so UVs/normals are unshared.
    let faces: [([f32; 3], [f32; 3], [f32; 3], [f32; 3], [f32; 3]); 6] = [
        // +X
        ([x, -y, -z], [x, y, -z], [x, y, z], [x, -y, z], [1.0, 0.0, 0.0]),
        // -X
        ([-x, -y, z], [-x, y, z], [-x, y, -z], [-x, -y, -z], [-1.0, 0.0, 0.0]),
        // +Y
        ([-x, y, -z], [-x, y, z], [x, y, z], [x, y, -z], [0.0, 1.0, 0.0]),
        // -Y
        ([-x, -y, z], [-x, -y, -z], [x, -y, -z], [x, -y, z], [0.0, -1.0, 0.0]),
        // +Z
        ([x, -y, z], [x, y, z], [-x, y, z], [-x, -y, z], [0.0, 0.0, 1.0]),
        // -Z
        ([-x, -y, -z], [-x, y, -z], [x, y, -z], [x, -y, -z], [0.0, 0.0, -1.0]),
    ];

    let mut vertices = Vec::with_capacity(24);
    let mut indices = Vec::with_capacity(36);
    let uvs = [[0.0, 1.0], [0.0, 0.0], [1.0, 0.0], [1.0, 1.0]];

    for (p0, p1, p2, p3, n) in faces {
        let base = vertices.len() as u32;
        let normal = glm::vec3(n[0], n[1], n[2]);
        for (p, uv) in [p0, p1, p2, p3].into_iter().zip(uvs) {
            vertices.push(Vertex3D {
                position: glm::vec3(p[0], p[1], p[2]),
                normal,
                uv: glm::vec2(uv[0], uv[1]),
                tangent: glm::Vec4::zeros(),
            });
        }
        indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }

    generate_tangents(&mut vertices, &indices);
    (vertices, indices)
}

pub fn default_cube(half_extent: f32) -> (Vec<Vertex3D>, Vec<u32>) {
    procedural_box(glm::vec3(half_extent, half_extent, half_extent))
}

/// A single-quad, +Y-facing plane in the XZ plane.
pub fn procedural_plane(half_width: f32, half_depth: f32, segments_x: u32, segments_z: u32) -> (Vec<Vertex3D>, Vec<u32>) {
    let segments_x = clamp_segments(segments_x);
    let segments_z = clamp_segments(segments_z);
    let mut vertices = Vec::new();
    let mut indices = Vec::new();

    for row in 0..=segments_z {
        for col in 0..=segments_x {
            let u = col as f32 / segments_x as f32;
            let v = row as f32 / segments_z as f32;
            vertices.push(Vertex3D {
                position: glm::vec3(-half_width + 2.0 * half_width * u, 0.0, -half_depth + 2.0 * half_depth * v),
                normal: glm::vec3(0.0, 1.0, 0.0),
                uv: glm::vec2(u, v),
                tangent: glm::Vec4::zeros(),
            });
        }
    }

    let stride = segments_x + 1;
    for row in 0..segments_z {
        for col in 0..segments_x {
            let i0 = row * stride + col;
            let i1 = i0 + 1;
            let i2 = i0 + stride;
            let i3 = i2 + 1;
            // CCW from above: (i0, i2, i3) and (i0, i3, i1)
            indices.extend_from_slice(&[i0, i2, i3, i0, i3, i1]);
        }
    }

    generate_tangents(&mut vertices, &indices);
    (vertices, indices)
}

pub fn default_plane(half_extent: f32) -> (Vec<Vertex3D>, Vec<u32>) {
    procedural_plane(half_extent, half_extent, 1, 1)
}

/// A single unit quad in clip-space-ish [-1, 1] XY, for UI/2-D geometry.
pub fn default_plane2d(half_extent: f32) -> (Vec<Vertex2D>, Vec<u32>) {
    let vertices = vec![
        Vertex2D { position: glm::vec2(-half_extent, -half_extent), uv: glm::vec2(0.0, 1.0) },
        Vertex2D { position: glm::vec2(half_extent, -half_extent), uv: glm::vec2(1.0, 1.0) },
        Vertex2D { position: glm::vec2(half_extent, half_extent), uv: glm::vec2(1.0, 0.0) },
        Vertex2D { position: glm::vec2(-half_extent, half_extent), uv: glm::vec2(0.0, 0.0) },
    ];
    let indices = vec![0, 2, 1, 0, 3, 2];
    (vertices, indices)
}

/// UV sphere: `segments` longitude slices, `rings` latitude bands.
pub fn procedural_sphere(radius: f32, segments: u32, rings: u32) -> (Vec<Vertex3D>, Vec<u32>) {
    let segments = clamp_segments(segments);
    let rings = clamp_rings(rings);
    let mut vertices = Vec::new();
    let mut indices = Vec::new();

    for ring in 0..=rings {
        let v = ring as f32 / rings as f32;
        let phi = v * std::f32::consts::PI;
        for seg in 0..=segments {
            let u = seg as f32 / segments as f32;
            let theta = u * std::f32::consts::TAU;
            let normal = glm::vec3(phi.sin() * theta.cos(), phi.cos(), phi.sin() * theta.sin());
            vertices.push(Vertex3D {
                position: normal * radius,
                normal,
                uv: glm::vec2(u, v),
                tangent: glm::Vec4::zeros(),
            });
        }
    }

    let stride = segments + 1;
    for ring in 0..rings {
        for seg in 0..segments {
            let i0 = ring * stride + seg;
            let i1 = i0 + 1;
            let i2 = i0 + stride;
            let i3 = i2 + 1;
            indices.extend_from_slice(&[i0, i2, i1, i1, i2, i3]);
        }
    }

    generate_tangents(&mut vertices, &indices);
    (vertices, indices)
}

/// Capped cylinder along +Y, `segments` around the circumference.
pub fn procedural_cylinder(radius: f32, height: f32, segments: u32) -> (Vec<Vertex3D>, Vec<u32>) {
    let segments = clamp_segments(segments);
    let half_height = height * 0.5;
    let mut vertices = Vec::new();
    let mut indices = Vec::new();

    // Side.
    for seg in 0..=segments {
        let theta = seg as f32 / segments as f32 * std::f32::consts::TAU;
        let (sin, cos) = theta.sin_cos();
        let normal = glm::vec3(cos, 0.0, sin);
        for &y in &[-half_height, half_height] {
            vertices.push(Vertex3D {
                position: glm::vec3(cos * radius, y, sin * radius),
                normal,
                uv: glm::vec2(seg as f32 / segments as f32, if y < 0.0 { 0.0 } else { 1.0 }),
                tangent: glm::Vec4::zeros(),
            });
        }
    }
    for seg in 0..segments {
        let i0 = seg * 2;
        let i1 = i0 + 1;
        let i2 = i0 + 2;
        let i3 = i0 + 3;
        indices.extend_from_slice(&[i0, i2, i1, i1, i2, i3]);
    }

    // Caps (fan), one per end, with their own flat-normal vertices.
    for &(y, normal_y, flip) in &[(-half_height, -1.0f32, true), (half_height, 1.0f32, false)] {
        let center = vertices.len() as u32;
        vertices.push(Vertex3D {
            position: glm::vec3(0.0, y, 0.0),
            normal: glm::vec3(0.0, normal_y, 0.0),
            uv: glm::vec2(0.5, 0.5),
            tangent: glm::Vec4::zeros(),
        });
        let rim_base = vertices.len() as u32;
        for seg in 0..=segments {
            let theta = seg as f32 / segments as f32 * std::f32::consts::TAU;
            let (sin, cos) = theta.sin_cos();
            vertices.push(Vertex3D {
                position: glm::vec3(cos * radius, y, sin * radius),
                normal: glm::vec3(0.0, normal_y, 0.0),
                uv: glm::vec2(0.5 + cos * 0.5, 0.5 + sin * 0.5),
                tangent: glm::Vec4::zeros(),
            });
        }
        for seg in 0..segments {
            let a = rim_base + seg;
            let b = rim_base + seg + 1;
            if flip {
                indices.extend_from_slice(&[center, b, a]);
            } else {
                indices.extend_from_slice(&[center, a, b]);
            }
        }
    }

    generate_tangents(&mut vertices, &indices);
    (vertices, indices)
}

/// A single-capped cone along +Y with its apex at `height`.
pub fn procedural_cone(radius: f32, height: f32, segments: u32) -> (Vec<Vertex3D>, Vec<u32>) {
    let segments = clamp_segments(segments);
    let mut vertices = Vec::new();
    let mut indices = Vec::new();

    let apex_index = 0u32;
    let slope = radius / height;
    let normal_y = slope;
    vertices.push(Vertex3D {
        position: glm::vec3(0.0, height, 0.0),
        normal: glm::vec3(0.0, 1.0, 0.0),
        uv: glm::vec2(0.5, 1.0),
        tangent: glm::Vec4::zeros(),
    });
    let rim_base = vertices.len() as u32;
    for seg in 0..=segments {
        let theta = seg as f32 / segments as f32 * std::f32::consts::TAU;
        let (sin, cos) = theta.sin_cos();
        let normal = glm::normalize(&glm::vec3(cos, normal_y, sin));
        vertices.push(Vertex3D {
            position: glm::vec3(cos * radius, 0.0, sin * radius),
            normal,
            uv: glm::vec2(seg as f32 / segments as f32, 0.0),
            tangent: glm::Vec4::zeros(),
        });
    }
    for seg in 0..segments {
        indices.extend_from_slice(&[apex_index, rim_base + seg, rim_base + seg + 1]);
    }

    // Base cap.
    let center = vertices.len() as u32;
    vertices.push(Vertex3D {
        position: glm::vec3(0.0, 0.0, 0.0),
        normal: glm::vec3(0.0, -1.0, 0.0),
        uv: glm::vec2(0.5, 0.5),
        tangent: glm::Vec4::zeros(),
    });
    let cap_rim_base = vertices.len() as u32;
    for seg in 0..=segments {
        let theta = seg as f32 / segments as f32 * std::f32::consts::TAU;
        let (sin, cos) = theta.sin_cos();
        vertices.push(Vertex3D {
            position: glm::vec3(cos * radius, 0.0, sin * radius),
            normal: glm::vec3(0.0, -1.0, 0.0),
            uv: glm::vec2(0.5 + cos * 0.5, 0.5 + sin * 0.5),
            tangent: glm::Vec4::zeros(),
        });
    }
    for seg in 0..segments {
        indices.extend_from_slice(&[center, cap_rim_base + seg + 1, cap_rim_base + seg]);
    }

    generate_tangents(&mut vertices, &indices);
    (vertices, indices)
}

/// Torus centered at the origin, tube circling the XZ plane.
pub fn procedural_torus(major_radius: f32, minor_radius: f32, major_segments: u32, minor_segments: u32) -> (Vec<Vertex3D>, Vec<u32>) {
    let major_segments = clamp_segments(major_segments);
    let minor_segments = clamp_segments(minor_segments);
    let mut vertices = Vec::new();
    let mut indices = Vec::new();

    for i in 0..=major_segments {
        let u = i as f32 / major_segments as f32;
        let theta = u * std::f32::consts::TAU;
        let (sin_t, cos_t) = theta.sin_cos();
        let center = glm::vec3(cos_t * major_radius, 0.0, sin_t * major_radius);
        for j in 0..=minor_segments {
            let v = j as f32 / minor_segments as f32;
            let phi = v * std::f32::consts::TAU;
            let (sin_p, cos_p) = phi.sin_cos();
            let normal = glm::vec3(cos_t * cos_p, sin_p, sin_t * cos_p);
            vertices.push(Vertex3D {
                position: center + normal * minor_radius,
                normal,
                uv: glm::vec2(u, v),
                tangent: glm::Vec4::zeros(),
            });
        }
    }

    let stride = minor_segments + 1;
    for i in 0..major_segments {
        for j in 0..minor_segments {
            let i0 = i * stride + j;
            let i1 = i0 + 1;
            let i2 = i0 + stride;
            let i3 = i2 + 1;
            indices.extend_from_slice(&[i0, i2, i1, i1, i2, i3]);
        }
    }

    generate_tangents(&mut vertices, &indices);
    (vertices, indices)
}

/// A debug arrow: a cylindrical shaft capped by a conical head, both reused
/// from the respective primitive generators and merged into one mesh.
pub fn procedural_arrow(shaft_radius: f32, shaft_length: f32, head_radius: f32, head_length: f32, segments: u32) -> (Vec<Vertex3D>, Vec<u32>) {
    let (mut shaft_vertices, mut shaft_indices) = procedural_cylinder(shaft_radius, shaft_length, segments);
    let (head_vertices, head_indices) = procedural_cone(head_radius, head_length, segments);

    // Shaft is centered on its own axis; raise it so its base sits at 0 and
    // its top meets the head's base, then stack the head on top.
    let shaft_lift = shaft_length * 0.5;
    for v in &mut shaft_vertices {
        v.position.y += shaft_lift;
    }

    let base_index = shaft_vertices.len() as u32;
    shaft_vertices.extend(head_vertices.into_iter().map(|mut v| {
        v.position.y += shaft_length;
        v
    }));
    shaft_indices.extend(head_indices.into_iter().map(|i| i + base_index));

    (shaft_vertices, shaft_indices)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle_is_ccw_from_outside(v: &[Vertex3D], tri: &[u32]) -> bool {
        let (a, b, c) = (v[tri[0] as usize], v[tri[1] as usize], v[tri[2] as usize]);
        let normal = (b.position - a.position).cross(&(c.position - a.position));
        normal.dot(&a.normal) > 0.0
    }

    #[test]
    fn default_cube_has_24_vertices_and_36_indices() {
        let (vertices, indices) = default_cube(0.5);
        assert_eq!(vertices.len(), 24);
        assert_eq!(indices.len(), 36);
        for tri in indices.chunks_exact(3) {
            assert!(triangle_is_ccw_from_outside(&vertices, tri));
        }
    }

    #[test]
    fn default_cube_aabb_matches_half_extent() {
        let (vertices, _) = default_cube(0.5);
        let aabb = aabb_of(&vertices);
        assert_eq!(aabb.min, glm::vec3(-0.5, -0.5, -0.5));
        assert_eq!(aabb.max, glm::vec3(0.5, 0.5, 0.5));
    }

    #[test]
    fn procedural_sphere_clamps_degenerate_segments_and_rings() {
        let (vertices, indices) = procedural_sphere(1.0, 0, 0);
        assert_eq!(vertices.len(), (MIN_SEGMENTS as usize + 1) * (MIN_RINGS as usize + 1));
        assert!(!indices.is_empty());
        assert_eq!(indices.len() % 3, 0);
    }

    #[test]
    fn procedural_plane_is_flat_and_faces_up() {
        let (vertices, _) = procedural_plane(1.0, 1.0, 2, 2);
        assert!(vertices.iter().all(|v| v.position.y == 0.0));
        assert!(vertices.iter().all(|v| v.normal == glm::vec3(0.0, 1.0, 0.0)));
    }

    #[test]
    fn procedural_arrow_concatenates_shaft_and_head() {
        let (shaft_vertices, shaft_indices) = procedural_cylinder(0.1, 1.0, 8);
        let (head_vertices, head_indices) = procedural_cone(0.2, 0.3, 8);
        let (vertices, indices) = procedural_arrow(0.1, 1.0, 0.2, 0.3, 8);
        assert_eq!(vertices.len(), shaft_vertices.len() + head_vertices.len());
        assert_eq!(indices.len(), shaft_indices.len() + head_indices.len());
    }
}
