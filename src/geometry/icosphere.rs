//! Icosphere generation by icosahedron subdivision.

use glam::Vec3;
use rustc_hash::FxHashMap;

use crate::gpu::RenderContext;

use super::{Drawable, MeshBuffers, MeshData};

/// Subdivision levels beyond this explode vertex counts (level 8 is already
/// 1.3M triangles); requests above it are clamped.
pub const MAX_LEVEL: u32 = 8;

/// A unit sphere mesh built by recursively subdividing an icosahedron.
///
/// Level `L` produces `20 * 4^L` triangles over `10 * 4^L + 2` vertices.
/// Normals equal the unit positions, so displacement shaders get a smooth
/// radial field for free.
pub struct Icosphere {
    center: Vec3,
    mesh: MeshData,
    buffers: Option<MeshBuffers>,
}

impl Icosphere {
    /// A sphere centered at `center`, with no mesh yet; call
    /// [`Icosphere::create`] to generate one.
    pub fn new(center: Vec3) -> Self {
        Self {
            center,
            mesh: MeshData::default(),
            buffers: None,
        }
    }

    /// (Re)generate the mesh at the given subdivision level (clamped to
    /// [`MAX_LEVEL`]). Invalidates previously uploaded buffers.
    pub fn create(&mut self, level: u32) {
        let level = level.min(MAX_LEVEL);
        let mut builder = SphereBuilder::icosahedron();
        for _ in 0..level {
            builder.subdivide();
        }
        self.mesh = builder.into_mesh(self.center);
        self.buffers = None;
    }

    /// The current CPU mesh.
    pub fn mesh(&self) -> &MeshData {
        &self.mesh
    }
}

impl Drawable for Icosphere {
    fn create_buffers(&mut self, ctx: &RenderContext) {
        self.buffers = Some(MeshBuffers::upload(ctx, "Icosphere", &self.mesh));
    }

    fn buffers(&self) -> Option<&MeshBuffers> {
        self.buffers.as_ref()
    }
}

/// Unit-sphere triangle soup under construction: positions stay normalized
/// at every step so midpoints land back on the sphere.
struct SphereBuilder {
    positions: Vec<Vec3>,
    indices: Vec<u32>,
}

impl SphereBuilder {
    fn icosahedron() -> Self {
        let t = (1.0 + 5.0_f32.sqrt()) / 2.0;
        let positions = [
            (-1.0, t, 0.0),
            (1.0, t, 0.0),
            (-1.0, -t, 0.0),
            (1.0, -t, 0.0),
            (0.0, -1.0, t),
            (0.0, 1.0, t),
            (0.0, -1.0, -t),
            (0.0, 1.0, -t),
            (t, 0.0, -1.0),
            (t, 0.0, 1.0),
            (-t, 0.0, -1.0),
            (-t, 0.0, 1.0),
        ]
        .into_iter()
        .map(|(x, y, z)| Vec3::new(x, y, z).normalize())
        .collect();

        let indices = vec![
            0, 11, 5, 0, 5, 1, 0, 1, 7, 0, 7, 10, 0, 10, 11, //
            1, 5, 9, 5, 11, 4, 11, 10, 2, 10, 7, 6, 7, 1, 8, //
            3, 9, 4, 3, 4, 2, 3, 2, 6, 3, 6, 8, 3, 8, 9, //
            4, 9, 5, 2, 4, 11, 6, 2, 10, 8, 6, 7, 9, 8, 1,
        ];

        Self { positions, indices }
    }

    /// Split every triangle into four, sharing midpoint vertices between
    /// neighboring triangles through a cache keyed on the (ordered) edge.
    fn subdivide(&mut self) {
        let mut midpoints: FxHashMap<(u32, u32), u32> = FxHashMap::default();
        let mut midpoint = |a: u32, b: u32, positions: &mut Vec<Vec3>| {
            let key = (a.min(b), a.max(b));
            *midpoints.entry(key).or_insert_with(|| {
                let mid = ((positions[a as usize] + positions[b as usize])
                    / 2.0)
                    .normalize();
                positions.push(mid);
                positions.len() as u32 - 1
            })
        };

        let mut next = Vec::with_capacity(self.indices.len() * 4);
        for tri in self.indices.chunks_exact(3) {
            let (a, b, c) = (tri[0], tri[1], tri[2]);
            let ab = midpoint(a, b, &mut self.positions);
            let bc = midpoint(b, c, &mut self.positions);
            let ca = midpoint(c, a, &mut self.positions);
            next.extend_from_slice(&[
                a, ab, ca, //
                b, bc, ab, //
                c, ca, bc, //
                ab, bc, ca,
            ]);
        }
        self.indices = next;
    }

    fn into_mesh(self, center: Vec3) -> MeshData {
        MeshData {
            positions: self
                .positions
                .iter()
                .map(|p| {
                    let q = *p + center;
                    [q.x, q.y, q.z, 1.0]
                })
                .collect(),
            normals: self
                .positions
                .iter()
                .map(|p| [p.x, p.y, p.z, 0.0])
                .collect(),
            indices: self.indices,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counts(level: u32) -> (usize, usize) {
        let four_l = 4_usize.pow(level);
        (10 * four_l + 2, 20 * four_l * 3)
    }

    #[test]
    fn vertex_and_index_counts_follow_the_subdivision_formula() {
        for level in 0..=6 {
            let mut sphere = Icosphere::new(Vec3::ZERO);
            sphere.create(level);
            let (verts, indices) = counts(level);
            assert_eq!(sphere.mesh().positions.len(), verts, "level {level}");
            assert_eq!(sphere.mesh().normals.len(), verts, "level {level}");
            assert_eq!(sphere.mesh().indices.len(), indices, "level {level}");
        }
    }

    #[test]
    fn level_is_clamped() {
        let mut sphere = Icosphere::new(Vec3::ZERO);
        sphere.create(MAX_LEVEL + 5);
        let (verts, _) = counts(MAX_LEVEL);
        assert_eq!(sphere.mesh().positions.len(), verts);
    }

    #[test]
    fn positions_sit_on_the_unit_sphere() {
        let mut sphere = Icosphere::new(Vec3::ZERO);
        sphere.create(3);
        for p in &sphere.mesh().positions {
            let len = Vec3::new(p[0], p[1], p[2]).length();
            assert!((len - 1.0).abs() < 1e-5);
            assert!((p[3] - 1.0).abs() < f32::EPSILON);
        }
    }

    #[test]
    fn normals_are_radial_and_homogeneous_zero() {
        let mut sphere = Icosphere::new(Vec3::new(2.0, 0.0, 0.0));
        sphere.create(2);
        for (p, n) in sphere
            .mesh()
            .positions
            .iter()
            .zip(sphere.mesh().normals.iter())
        {
            // Position minus center is the normal direction.
            assert!((p[0] - 2.0 - n[0]).abs() < 1e-6);
            assert!((p[1] - n[1]).abs() < 1e-6);
            assert!((p[2] - n[2]).abs() < 1e-6);
            assert!(n[3].abs() < f32::EPSILON);
        }
    }

    #[test]
    fn instances_regenerate_independently() {
        let mut a = Icosphere::new(Vec3::ZERO);
        let mut b = Icosphere::new(Vec3::ZERO);
        a.create(1);
        b.create(3);
        assert_eq!(a.mesh().indices.len(), counts(1).1);
        assert_eq!(b.mesh().indices.len(), counts(3).1);
        a.create(2);
        assert_eq!(a.mesh().indices.len(), counts(2).1);
        assert_eq!(b.mesh().indices.len(), counts(3).1);
    }

    #[test]
    fn stepping_tessellation_five_to_six_builds_a_fresh_generation() {
        let mut old = Icosphere::new(Vec3::ZERO);
        old.create(5);
        let old_indices = old.mesh().indices.clone();

        // Regeneration is a replacement instance, not an in-place rebuild.
        let mut next = Icosphere::new(Vec3::ZERO);
        next.create(6);

        assert_eq!(next.mesh().indices.len(), counts(6).1);
        assert_eq!(next.mesh().positions.len(), counts(6).0);
        assert_eq!(old.mesh().indices, old_indices);
        assert_eq!(old.mesh().indices.len(), counts(5).1);
    }

    #[test]
    fn every_triangle_winds_outward() {
        let mut sphere = Icosphere::new(Vec3::ZERO);
        sphere.create(1);
        let mesh = sphere.mesh();
        for tri in mesh.indices.chunks_exact(3) {
            let p = |i: u32| {
                let v = mesh.positions[i as usize];
                Vec3::new(v[0], v[1], v[2])
            };
            let (a, b, c) = (p(tri[0]), p(tri[1]), p(tri[2]));
            let face_normal = (b - a).cross(c - a);
            let centroid = (a + b + c) / 3.0;
            assert!(face_normal.dot(centroid) > 0.0);
        }
    }
}
