//! Procedural geometry: the cube-sphere planet, the star's UV sphere and the
//! subdivided halo plane.
//!
//! Meshes keep an explicit face list (three vertex indices, three per-vertex
//! normals and UVs, a material index) so the cube-sphere can carry six
//! material groups. They are only mutated while being built.

use std::f32::consts::PI;

use bytemuck::{Pod, Zeroable};
use glam::{Vec2, Vec3, Vec4};
use serde::{Deserialize, Serialize};

/// One face of the source cube, in box-geometry build order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CubeFace {
    PosX,
    NegX,
    PosY,
    NegY,
    PosZ,
    NegZ,
}

impl CubeFace {
    pub const ALL: [CubeFace; 6] = [
        CubeFace::PosX,
        CubeFace::NegX,
        CubeFace::PosY,
        CubeFace::NegY,
        CubeFace::PosZ,
        CubeFace::NegZ,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn label(self) -> &'static str {
        match self {
            CubeFace::PosX => "+X",
            CubeFace::NegX => "-X",
            CubeFace::PosY => "+Y",
            CubeFace::NegY => "-Y",
            CubeFace::PosZ => "+Z",
            CubeFace::NegZ => "-Z",
        }
    }

    /// Axis layout as `(u axis, v axis, w axis, u dir, v dir, w sign)`.
    fn layout(self) -> (usize, usize, usize, f32, f32, f32) {
        match self {
            CubeFace::PosX => (2, 1, 0, -1.0, -1.0, 1.0),
            CubeFace::NegX => (2, 1, 0, 1.0, -1.0, -1.0),
            CubeFace::PosY => (0, 2, 1, 1.0, 1.0, 1.0),
            CubeFace::NegY => (0, 2, 1, 1.0, -1.0, -1.0),
            CubeFace::PosZ => (0, 1, 2, 1.0, -1.0, 1.0),
            CubeFace::NegZ => (0, 1, 2, -1.0, -1.0, -1.0),
        }
    }

    /// Point on the unit cube (edge length 1) for face texture coordinates
    /// `(s, t)` in `[0, 1]`, with `t` growing upward like mesh UVs.
    pub fn point(self, s: f32, t: f32) -> Vec3 {
        let (u_axis, v_axis, w_axis, u_dir, v_dir, w_sign) = self.layout();
        let mut point = [0.0f32; 3];
        point[u_axis] = (s - 0.5) * u_dir;
        point[v_axis] = (0.5 - t) * v_dir;
        point[w_axis] = 0.5 * w_sign;
        Vec3::from_array(point)
    }

    /// Direction of increasing `s` across the face.
    pub fn tangent(self) -> Vec3 {
        self.point(1.0, 0.5) - self.point(0.0, 0.5)
    }

    /// Direction of increasing `t` across the face.
    pub fn bitangent(self) -> Vec3 {
        self.point(0.5, 1.0) - self.point(0.5, 0.0)
    }
}

/// A triangle with per-vertex shading attributes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Face {
    pub indices: [u32; 3],
    pub vertex_normals: [Vec3; 3],
    /// Per-vertex texture tangents; `w` is the bitangent sign.
    pub vertex_tangents: [Vec4; 3],
    pub uvs: [Vec2; 3],
    pub normal: Vec3,
    pub material_index: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingSphere {
    pub center: Vec3,
    pub radius: f32,
}

/// Contiguous run of flattened vertices sharing one material.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaceGroup {
    pub material_index: usize,
    pub start: u32,
    pub count: u32,
}

/// Interleaved vertex consumed by the render pipelines.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct MeshVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
    pub tangent: [f32; 4],
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    pub vertices: Vec<Vec3>,
    pub faces: Vec<Face>,
    pub bounding_box: Option<Aabb>,
    pub bounding_sphere: Option<BoundingSphere>,
}

impl Mesh {
    /// Subdivided axis-aligned box centred on the origin. Every face gets its
    /// own `(segments + 1)²` grid of vertices; nothing is welded.
    pub fn subdivided_box(size: f32, segments: u32) -> Self {
        let segments = segments.max(1);
        let mut mesh = Mesh::default();
        for face in CubeFace::ALL {
            mesh.push_cube_face(face, size, segments);
        }
        mesh.compute_face_normals();
        mesh
    }

    /// Box projected onto a sphere of `radius`, with smooth vertex normals.
    pub fn cube_sphere(segments: u32, radius: f32) -> Self {
        let mut mesh = Self::subdivided_box(1.0, segments);
        for vertex in &mut mesh.vertices {
            *vertex = vertex.normalize() * radius;
        }
        mesh.compute_bounds();
        mesh.compute_face_normals();
        mesh.compute_radial_normals();
        mesh.compute_tangents();
        log::debug!(
            "cube sphere built: {} vertices, {} faces",
            mesh.vertices.len(),
            mesh.faces.len()
        );
        mesh
    }

    /// Latitude/longitude sphere. Pole rows emit a single triangle per quad.
    pub fn uv_sphere(radius: f32, width_segments: u32, height_segments: u32) -> Self {
        let width_segments = width_segments.max(3);
        let height_segments = height_segments.max(2);
        let mut mesh = Mesh::default();
        let mut grid = Vec::with_capacity(height_segments as usize + 1);
        let mut grid_uvs = Vec::with_capacity(height_segments as usize + 1);

        for y in 0..=height_segments {
            let v = y as f32 / height_segments as f32;
            let mut row = Vec::with_capacity(width_segments as usize + 1);
            let mut row_uvs = Vec::with_capacity(width_segments as usize + 1);
            for x in 0..=width_segments {
                let u = x as f32 / width_segments as f32;
                let phi = u * PI * 2.0;
                let theta = v * PI;
                let position = Vec3::new(
                    -radius * phi.cos() * theta.sin(),
                    radius * theta.cos(),
                    radius * phi.sin() * theta.sin(),
                );
                row.push(mesh.vertices.len() as u32);
                row_uvs.push(Vec2::new(u, 1.0 - v));
                mesh.vertices.push(position);
            }
            grid.push(row);
            grid_uvs.push(row_uvs);
        }

        for y in 0..height_segments as usize {
            for x in 0..width_segments as usize {
                let (v1, uv1) = (grid[y][x + 1], grid_uvs[y][x + 1]);
                let (v2, uv2) = (grid[y][x], grid_uvs[y][x]);
                let (v3, uv3) = (grid[y + 1][x], grid_uvs[y + 1][x]);
                let (v4, uv4) = (grid[y + 1][x + 1], grid_uvs[y + 1][x + 1]);

                if y == 0 {
                    mesh.push_face([v1, v3, v4], [uv1, uv3, uv4], 0);
                } else if y + 1 == height_segments as usize {
                    mesh.push_face([v1, v2, v3], [uv1, uv2, uv3], 0);
                } else {
                    mesh.push_face([v1, v2, v4], [uv1, uv2, uv4], 0);
                    mesh.push_face([v2, v3, v4], [uv2, uv3, uv4], 0);
                }
            }
        }

        mesh.compute_bounds();
        mesh.compute_face_normals();
        mesh.compute_radial_normals();
        mesh.compute_tangents();
        mesh
    }

    /// Flat grid in the XY plane facing +Z.
    pub fn plane(width: f32, height: f32, width_segments: u32, height_segments: u32) -> Self {
        let grid_x = width_segments.max(1);
        let grid_y = height_segments.max(1);
        let mut mesh = Mesh::default();
        mesh.push_grid(grid_x, grid_y, 0, |ix, iy| {
            Vec3::new(
                ix as f32 * width / grid_x as f32 - width / 2.0,
                -(iy as f32 * height / grid_y as f32 - height / 2.0),
                0.0,
            )
        });
        for face in &mut mesh.faces {
            face.normal = Vec3::Z;
            face.vertex_normals = [Vec3::Z; 3];
        }
        mesh.compute_tangents();
        mesh.compute_bounds();
        mesh
    }

    fn push_cube_face(&mut self, face: CubeFace, size: f32, segments: u32) {
        let material_index = face.index();
        self.push_grid(segments, segments, material_index, |ix, iy| {
            let s = ix as f32 / segments as f32;
            let t = 1.0 - iy as f32 / segments as f32;
            face.point(s, t) * size
        });
    }

    /// Shared grid builder: `(grid_x + 1) * (grid_y + 1)` vertices and two
    /// triangles per cell, UVs running `(ix / gx, 1 - iy / gy)`.
    fn push_grid(
        &mut self,
        grid_x: u32,
        grid_y: u32,
        material_index: usize,
        position: impl Fn(u32, u32) -> Vec3,
    ) {
        let offset = self.vertices.len() as u32;
        let row = grid_x + 1;
        for iy in 0..=grid_y {
            for ix in 0..=grid_x {
                self.vertices.push(position(ix, iy));
            }
        }

        let uv = |ix: u32, iy: u32| {
            Vec2::new(ix as f32 / grid_x as f32, 1.0 - iy as f32 / grid_y as f32)
        };
        for iy in 0..grid_y {
            for ix in 0..grid_x {
                let a = offset + ix + row * iy;
                let b = offset + ix + row * (iy + 1);
                let c = offset + (ix + 1) + row * (iy + 1);
                let d = offset + (ix + 1) + row * iy;
                let (uva, uvb, uvc, uvd) =
                    (uv(ix, iy), uv(ix, iy + 1), uv(ix + 1, iy + 1), uv(ix + 1, iy));
                self.push_face([a, b, d], [uva, uvb, uvd], material_index);
                self.push_face([b, c, d], [uvb, uvc, uvd], material_index);
            }
        }
    }

    fn push_face(&mut self, indices: [u32; 3], uvs: [Vec2; 3], material_index: usize) {
        self.faces.push(Face {
            indices,
            vertex_normals: [Vec3::ZERO; 3],
            vertex_tangents: [Vec4::ZERO; 3],
            uvs,
            normal: Vec3::ZERO,
            material_index,
        });
    }

    pub fn compute_bounds(&mut self) {
        let Some(first) = self.vertices.first().copied() else {
            self.bounding_box = None;
            self.bounding_sphere = None;
            return;
        };
        let (min, max) = self
            .vertices
            .iter()
            .fold((first, first), |(min, max), v| (min.min(*v), max.max(*v)));
        let center = (min + max) * 0.5;
        let radius = self
            .vertices
            .iter()
            .map(|v| v.distance_squared(center))
            .fold(0.0f32, f32::max)
            .sqrt();
        self.bounding_box = Some(Aabb { min, max });
        self.bounding_sphere = Some(BoundingSphere { center, radius });
    }

    pub fn compute_face_normals(&mut self) {
        for face in &mut self.faces {
            let [a, b, c] = face.indices.map(|i| self.vertices[i as usize]);
            face.normal = (c - b).cross(a - b).normalize_or_zero();
        }
    }

    /// Sets every vertex normal to the direction of its vertex from the
    /// origin instead of the flat face normal.
    fn compute_radial_normals(&mut self) {
        for face in &mut self.faces {
            face.vertex_normals = face
                .indices
                .map(|i| self.vertices[i as usize].normalize_or_zero());
        }
    }

    /// Accumulates the UV-space tangent of every triangle onto its vertices,
    /// then orthogonalises against the vertex normal. Run after the vertex
    /// normals are final.
    pub fn compute_tangents(&mut self) {
        let mut tangents = vec![Vec3::ZERO; self.vertices.len()];
        let mut bitangents = vec![Vec3::ZERO; self.vertices.len()];
        for face in &self.faces {
            let [p0, p1, p2] = face.indices.map(|i| self.vertices[i as usize]);
            let [uv0, uv1, uv2] = face.uvs;
            let (e1, e2) = (p1 - p0, p2 - p0);
            let (d1, d2) = (uv1 - uv0, uv2 - uv0);
            let det = d1.x * d2.y - d2.x * d1.y;
            if det.abs() <= f32::EPSILON {
                continue;
            }
            let tangent = (e1 * d2.y - e2 * d1.y) / det;
            let bitangent = (e2 * d1.x - e1 * d2.x) / det;
            for i in face.indices {
                tangents[i as usize] += tangent;
                bitangents[i as usize] += bitangent;
            }
        }

        for face in &mut self.faces {
            for corner in 0..3 {
                let i = face.indices[corner] as usize;
                let normal = match face.vertex_normals[corner].try_normalize() {
                    Some(normal) => normal,
                    None => face.normal.try_normalize().unwrap_or(Vec3::Z),
                };
                let tangent = (tangents[i] - normal * normal.dot(tangents[i]))
                    .try_normalize()
                    .unwrap_or_else(|| normal.any_orthonormal_vector());
                let sign = if normal.cross(tangent).dot(bitangents[i]) < 0.0 {
                    -1.0
                } else {
                    1.0
                };
                face.vertex_tangents[corner] = tangent.extend(sign);
            }
        }
    }

    /// Expands faces into a non-indexed vertex stream ordered by face.
    pub fn vertex_data(&self) -> Vec<MeshVertex> {
        let mut out = Vec::with_capacity(self.faces.len() * 3);
        for face in &self.faces {
            for corner in 0..3 {
                out.push(MeshVertex {
                    position: self.vertices[face.indices[corner] as usize].to_array(),
                    normal: face.vertex_normals[corner].to_array(),
                    uv: face.uvs[corner].to_array(),
                    tangent: face.vertex_tangents[corner].to_array(),
                });
            }
        }
        out
    }

    /// Runs of consecutive faces sharing a material, in flattened vertex units.
    pub fn groups(&self) -> Vec<FaceGroup> {
        let mut groups: Vec<FaceGroup> = Vec::new();
        for (index, face) in self.faces.iter().enumerate() {
            match groups.last_mut() {
                Some(group) if group.material_index == face.material_index => group.count += 3,
                _ => groups.push(FaceGroup {
                    material_index: face.material_index,
                    start: index as u32 * 3,
                    count: 3,
                }),
            }
        }
        groups
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cube_sphere_vertices_sit_on_radius() {
        let mesh = Mesh::cube_sphere(16, 2.0);
        for vertex in &mesh.vertices {
            assert!((vertex.length() - 2.0).abs() < 1e-5, "{vertex:?}");
        }
        let sphere = mesh.bounding_sphere.unwrap();
        assert!(sphere.center.length() < 1e-5);
        assert!((sphere.radius - 2.0).abs() < 1e-4);
    }

    #[test]
    fn full_resolution_planet_matches_box_grid_counts() {
        let mesh = Mesh::cube_sphere(64, 2.0);
        assert_eq!(mesh.vertices.len(), 6 * 65 * 65);
        assert_eq!(mesh.faces.len(), 6 * 64 * 64 * 2);
    }

    #[test]
    fn vertex_normals_follow_positions() {
        let mesh = Mesh::cube_sphere(8, 2.0);
        for face in &mesh.faces {
            for corner in 0..3 {
                let expected = mesh.vertices[face.indices[corner] as usize].normalize();
                assert!(face.vertex_normals[corner].distance(expected) < 1e-6);
            }
        }
    }

    #[test]
    fn face_normals_point_outward() {
        let mesh = Mesh::cube_sphere(8, 2.0);
        for face in &mesh.faces {
            let centroid = face
                .indices
                .iter()
                .map(|&i| mesh.vertices[i as usize])
                .sum::<Vec3>()
                / 3.0;
            assert!(face.normal.dot(centroid) > 0.0);
        }
    }

    #[test]
    fn groups_cover_each_cube_face_once() {
        let mesh = Mesh::cube_sphere(4, 2.0);
        let groups = mesh.groups();
        assert_eq!(groups.len(), 6);
        for (index, group) in groups.iter().enumerate() {
            assert_eq!(group.material_index, index);
            assert_eq!(group.count, 4 * 4 * 2 * 3);
            assert_eq!(group.start, index as u32 * group.count);
        }
        assert_eq!(mesh.vertex_data().len(), mesh.faces.len() * 3);
    }

    #[test]
    fn face_points_land_on_expected_sides() {
        assert_eq!(CubeFace::PosX.point(0.5, 0.5), Vec3::new(0.5, 0.0, 0.0));
        assert_eq!(CubeFace::NegY.point(0.5, 0.5), Vec3::new(0.0, -0.5, 0.0));
        assert_eq!(CubeFace::PosZ.point(1.0, 1.0), Vec3::new(0.5, 0.5, 0.5));
        assert_eq!(CubeFace::from_index(5), Some(CubeFace::NegZ));
        assert_eq!(CubeFace::from_index(6), None);
    }

    #[test]
    fn tangents_follow_each_face_texture_axes() {
        let mesh = Mesh::cube_sphere(8, 2.0);
        for face in &mesh.faces {
            let cube_face = CubeFace::from_index(face.material_index).unwrap();
            for corner in 0..3 {
                let normal = face.vertex_normals[corner];
                let tangent = face.vertex_tangents[corner];
                let bitangent = normal.cross(tangent.truncate()) * tangent.w;
                assert!((tangent.truncate().length() - 1.0).abs() < 1e-4);
                assert!(tangent.truncate().dot(normal).abs() < 1e-4);
                // Sphering tilts the axes, most at the cube corners.
                assert!(
                    tangent.truncate().dot(cube_face.tangent()) > 0.6,
                    "{} tangent {tangent:?}",
                    cube_face.label()
                );
                assert!(
                    bitangent.dot(cube_face.bitangent()) > 0.6,
                    "{} bitangent {bitangent:?}",
                    cube_face.label()
                );
            }
        }
    }

    #[test]
    fn top_face_tangent_keeps_its_sign_across_the_pole() {
        let mesh = Mesh::cube_sphere(10, 2.0);
        let axis = CubeFace::PosY.tangent();
        for t in [0.3, 0.7] {
            let target = CubeFace::PosY.point(0.5, t).normalize() * 2.0;
            let (face, corner) = mesh
                .faces
                .iter()
                .filter(|face| face.material_index == CubeFace::PosY.index())
                .flat_map(|face| (0..3).map(move |corner| (face, corner)))
                .find(|(face, corner)| {
                    mesh.vertices[face.indices[*corner] as usize].distance(target) < 1e-4
                })
                .unwrap();
            assert!(face.vertex_tangents[corner].truncate().dot(axis) > 0.9);
        }
    }

    #[test]
    fn plane_tangent_runs_along_x() {
        let plane = Mesh::plane(4.0, 4.0, 2, 2);
        for face in &plane.faces {
            for tangent in face.vertex_tangents {
                assert!(tangent.truncate().distance(Vec3::X) < 1e-5);
                assert_eq!(tangent.w, 1.0);
            }
        }
    }

    #[test]
    fn uv_sphere_and_plane_counts() {
        let sphere = Mesh::uv_sphere(1.0, 100, 100);
        assert_eq!(sphere.vertices.len(), 101 * 101);
        assert_eq!(sphere.faces.len(), 100 * 2 + 100 * 98 * 2);
        for vertex in &sphere.vertices {
            assert!((vertex.length() - 1.0).abs() < 1e-5);
        }

        let plane = Mesh::plane(4.0, 4.0, 40, 40);
        assert_eq!(plane.vertices.len(), 41 * 41);
        assert_eq!(plane.faces.len(), 40 * 40 * 2);
        let bounds = plane.bounding_box.unwrap();
        assert_eq!(bounds.min, Vec3::new(-2.0, -2.0, 0.0));
        assert_eq!(bounds.max, Vec3::new(2.0, 2.0, 0.0));
    }
}
