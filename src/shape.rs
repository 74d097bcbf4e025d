//! Faces and shapes built on top of world vertices.

use std::collections::HashMap;

use log::warn;
use nalgebra::{Matrix4, Vector3, Vector4};

use crate::math::then;
use crate::world::{Vertex, VertexId, WorldBuilder};

/// A planar polygon of 3 or 4 vertices, wound clockwise when viewed from outside.
///
/// A face owns no vertices. Its color lives on the last vertex of its list, which is the
/// corner every emitted triangle ends on.
#[derive(Clone, Debug)]
pub(crate) struct Face {
    vertices: Vec<VertexId>,
    color: Option<Vector4<f32>>,
}

impl Face {
    #[cfg(test)]
    pub(crate) fn triangle(a: VertexId, b: VertexId, c: VertexId) -> Self {
        Self {
            vertices: vec![a, b, c],
            color: None,
        }
    }

    pub(crate) fn quad(a: VertexId, b: VertexId, c: VertexId, d: VertexId) -> Self {
        Self {
            vertices: vec![a, b, c, d],
            color: None,
        }
    }

    pub(crate) fn vertices(&self) -> &[VertexId] {
        &self.vertices
    }

    #[cfg(test)]
    pub(crate) fn color(&self) -> Option<Vector4<f32>> {
        self.color
    }

    /// Paints the face by coloring its last vertex.
    ///
    /// The first time a face is colored, a last vertex that already carries another face's
    /// color is moved to the front of the list until an uncolored vertex ends up last. When
    /// every vertex is taken the list comes back to its original order and the last vertex
    /// is overwritten. Repainting a face always targets the vertex chosen the first time.
    pub(crate) fn set_color(&mut self, vertices: &mut [Vertex], color: Vector4<f32>) {
        let last = self.vertices.len() - 1;
        if self.color.is_none() {
            let mut rotations = 0;
            while vertices[self.vertices[last].index()].color.is_some() {
                if rotations == self.vertices.len() {
                    warn!(
                        "every vertex of face {:?} is already colored, overwriting the last one",
                        self.vertices
                    );
                    break;
                }
                self.vertices.rotate_right(1);
                rotations += 1;
            }
        }
        vertices[self.vertices[last].index()].color = Some(color);
        self.color = Some(color);
    }

    pub(crate) fn index_count(&self) -> usize {
        (self.vertices.len() - 2) * 3
    }

    /// Writes the face's triangles into `out`, which must hold exactly
    /// [`index_count`](Self::index_count) entries.
    ///
    /// Every triangle ends on the last vertex: `(v[i-1], v[i], v[n-1])` for `i` in `1..n-1`.
    pub(crate) fn put_indices(&self, out: &mut [u16]) {
        let last = self.vertices[self.vertices.len() - 1];
        let rest = &self.vertices[..self.vertices.len() - 1];
        for (triangle, pair) in out.chunks_exact_mut(3).zip(rest.windows(2)) {
            triangle[0] = pair[0].raw();
            triangle[1] = pair[1].raw();
            triangle[2] = last.raw();
        }
    }
}

/// A rigid group of faces that moves as one.
///
/// The shape's placement is split in two: `transform` holds every committed rotation and
/// `pending` the one currently animating. Vertices are drawn at "`transform`, then `pending`".
#[derive(Clone, Debug)]
pub(crate) struct Shape {
    vertices: Vec<VertexId>,
    lookup: HashMap<[u32; 3], VertexId>,
    faces: Vec<Face>,
    transform: Matrix4<f32>,
    pending: Matrix4<f32>,
}

impl Default for Shape {
    fn default() -> Self {
        Self {
            vertices: Vec::new(),
            lookup: HashMap::new(),
            faces: Vec::new(),
            transform: Matrix4::identity(),
            pending: Matrix4::identity(),
        }
    }
}

impl Shape {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Returns this shape's vertex at `(x, y, z)`, registering a new one with the world
    /// if the shape has none there yet.
    pub(crate) fn add_vertex(
        &mut self,
        world: &mut WorldBuilder,
        x: f32,
        y: f32,
        z: f32,
    ) -> VertexId {
        let key = coordinate_key(x, y, z);
        if let Some(&existing) = self.lookup.get(&key) {
            return existing;
        }
        let id = world.add_vertex(Vector3::new(x, y, z));
        self.vertices.push(id);
        self.lookup.insert(key, id);
        id
    }

    pub(crate) fn add_face(&mut self, face: Face) {
        self.faces.push(face);
    }

    #[cfg(test)]
    pub(crate) fn faces(&self) -> &[Face] {
        &self.faces
    }

    pub(crate) fn vertices(&self) -> &[VertexId] {
        &self.vertices
    }

    pub(crate) fn set_face_color(
        &mut self,
        world: &mut WorldBuilder,
        face: usize,
        color: Vector4<f32>,
    ) {
        self.faces[face].set_color(world.vertices_mut(), color);
    }

    pub(crate) fn index_count(&self) -> usize {
        self.faces.iter().map(Face::index_count).sum()
    }

    pub(crate) fn put_indices(&self, out: &mut [u16]) {
        let mut offset = 0;
        for face in &self.faces {
            let count = face.index_count();
            face.put_indices(&mut out[offset..offset + count]);
            offset += count;
        }
    }

    /// Committed rotations.
    #[cfg(test)]
    pub(crate) fn transform(&self) -> &Matrix4<f32> {
        &self.transform
    }

    /// The rotation currently being animated.
    #[cfg(test)]
    pub(crate) fn pending_transform(&self) -> &Matrix4<f32> {
        &self.pending
    }

    /// Committed rotations followed by the pending one.
    pub(crate) fn visible_transform(&self) -> Matrix4<f32> {
        then(&self.transform, &self.pending)
    }

    /// Replaces the pending transform and returns the transform the vertices should be drawn with.
    pub(crate) fn animate_transform(&mut self, transform: &Matrix4<f32>) -> Matrix4<f32> {
        self.pending = *transform;
        self.visible_transform()
    }

    pub(crate) fn start_animation(&mut self) {}

    /// Folds the pending transform into the committed one and resets it.
    pub(crate) fn end_animation(&mut self) {
        self.transform = then(&self.transform, &self.pending);
        self.pending = Matrix4::identity();
    }
}

/// Hash key for exact coordinate equality. Both zeros map to the same key.
fn coordinate_key(x: f32, y: f32, z: f32) -> [u32; 3] {
    let bits = |v: f32| if v == 0.0 { 0 } else { v.to_bits() };
    [bits(x), bits(y), bits(z)]
}
