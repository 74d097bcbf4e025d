//! Vertex storage and the flat draw buffers built from it.
//!
//! A scene is assembled in two phases. [`WorldBuilder`] collects vertices and shapes and
//! counts how many buffer slots they need; [`WorldBuilder::generate`] then allocates the
//! position, color and index buffers at exactly that size and fills them. After that only
//! the position entries of individual vertices are ever rewritten.

use log::info;
use nalgebra::{Matrix4, Vector3, Vector4};

use crate::math::{to_fixed, transform_point};
use crate::shape::Shape;

/// Stable index of a vertex in its world, also its slot in the draw buffers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) struct VertexId(u16);

impl VertexId {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }

    /// The value written into the index buffer for this vertex.
    pub(crate) fn raw(self) -> u16 {
        self.0
    }
}

/// Handle to a shape owned by a world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) struct ShapeId(usize);

impl ShapeId {
    pub(crate) fn index(self) -> usize {
        self.0
    }
}

/// A point in model space with the color the draw buffers give it.
#[derive(Clone, Debug)]
pub(crate) struct Vertex {
    pub(crate) position: Vector3<f32>,
    pub(crate) id: VertexId,
    /// RGBA, each component in `[0, 1]`. Uncolored vertices are drawn as transparent black.
    pub(crate) color: Option<Vector4<f32>>,
}

/// Collects the vertices and shapes of a scene before its buffers exist.
#[derive(Debug, Default)]
pub(crate) struct WorldBuilder {
    vertices: Vec<Vertex>,
    shapes: Vec<Shape>,
    index_count: usize,
}

impl WorldBuilder {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Registers a new vertex and hands out the next sequential index.
    ///
    /// Deduplication is the calling shape's job; the world always appends.
    ///
    /// # Panics
    /// If the world already holds `u16::MAX + 1` vertices, the limit of a 16-bit index buffer.
    pub(crate) fn add_vertex(&mut self, position: Vector3<f32>) -> VertexId {
        assert!(
            self.vertices.len() <= u16::MAX as usize,
            "vertex count exceeds the 16-bit index range"
        );
        let id = VertexId(self.vertices.len() as u16);
        self.vertices.push(Vertex {
            position,
            id,
            color: None,
        });
        id
    }

    pub(crate) fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub(crate) fn vertices_mut(&mut self) -> &mut [Vertex] {
        &mut self.vertices
    }

    /// Takes ownership of a finished shape and reserves room for its indices.
    pub(crate) fn add_shape(&mut self, shape: Shape) -> ShapeId {
        self.index_count += shape.index_count();
        self.shapes.push(shape);
        ShapeId(self.shapes.len() - 1)
    }

    pub(crate) fn index_count(&self) -> usize {
        self.index_count
    }

    /// Allocates the draw buffers at their final size and serializes every vertex and face.
    ///
    /// Positions and colors are 16.16 fixed point, one vertex after another in index order.
    pub(crate) fn generate(self) -> World {
        let Self {
            vertices,
            shapes,
            index_count,
        } = self;

        let mut positions = vec![0i32; vertices.len() * 3].into_boxed_slice();
        let mut colors = vec![0i32; vertices.len() * 4].into_boxed_slice();
        let mut indices = vec![0u16; index_count].into_boxed_slice();

        for (vertex, (position, color)) in vertices
            .iter()
            .zip(positions.chunks_exact_mut(3).zip(colors.chunks_exact_mut(4)))
        {
            write_position(position, &vertex.position);
            if let Some(rgba) = vertex.color {
                for (slot, component) in color.iter_mut().zip(rgba.iter()) {
                    *slot = to_fixed(*component);
                }
            }
        }

        let mut offset = 0;
        for shape in &shapes {
            let count = shape.index_count();
            shape.put_indices(&mut indices[offset..offset + count]);
            offset += count;
        }
        debug_assert_eq!(offset, index_count);

        let world = World {
            vertices,
            shapes,
            positions,
            colors,
            indices,
        };
        info!(
            "generated world: {} shapes, {} vertices, {} indices",
            world.shapes.len(),
            world.vertex_count(),
            world.index_count()
        );
        world
    }
}

/// The owning aggregate of every vertex and shape, with fixed-size draw buffers.
#[derive(Debug, Clone)]
pub(crate) struct World {
    vertices: Vec<Vertex>,
    shapes: Vec<Shape>,
    positions: Box<[i32]>,
    colors: Box<[i32]>,
    indices: Box<[u16]>,
}

impl World {
    pub(crate) fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub(crate) fn index_count(&self) -> usize {
        self.indices.len()
    }

    pub(crate) fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub(crate) fn shape(&self, id: ShapeId) -> &Shape {
        &self.shapes[id.0]
    }

    #[cfg(test)]
    pub(crate) fn shapes(&self) -> &[Shape] {
        &self.shapes
    }

    /// Vertex positions, three fixed-point values per vertex.
    pub(crate) fn positions(&self) -> &[i32] {
        &self.positions
    }

    /// Vertex colors, four fixed-point values per vertex.
    pub(crate) fn colors(&self) -> &[i32] {
        &self.colors
    }

    /// Triangle list indices.
    pub(crate) fn indices(&self) -> &[u16] {
        &self.indices
    }

    /// Rewrites the three position entries of one vertex, leaving every other vertex alone.
    #[allow(dead_code)]
    pub(crate) fn transform_vertex(&mut self, vertex: VertexId, transform: &Matrix4<f32>) {
        update_position(&mut self.positions, &self.vertices[vertex.index()], transform);
    }

    /// Sets a shape's pending transform and moves its vertices to where it puts them.
    pub(crate) fn animate_shape(&mut self, id: ShapeId, transform: &Matrix4<f32>) {
        let shape = &mut self.shapes[id.0];
        let composed = shape.animate_transform(transform);
        for &vertex in shape.vertices() {
            update_position(&mut self.positions, &self.vertices[vertex.index()], &composed);
        }
    }

    pub(crate) fn start_shape_animation(&mut self, id: ShapeId) {
        self.shapes[id.0].start_animation();
    }

    /// Commits a shape's pending transform.
    pub(crate) fn end_shape_animation(&mut self, id: ShapeId) {
        self.shapes[id.0].end_animation();
    }

    /// Decodes the position buffer entry of a vertex.
    #[cfg(test)]
    pub(crate) fn buffer_position(&self, vertex: VertexId) -> Vector3<f32> {
        let start = vertex.index() * 3;
        let p = &self.positions[start..start + 3];
        use crate::math::from_fixed;
        Vector3::new(from_fixed(p[0]), from_fixed(p[1]), from_fixed(p[2]))
    }

    /// Where a shape currently sits: the mean of its transformed vertices.
    #[cfg(test)]
    pub(crate) fn shape_center(&self, id: ShapeId) -> Vector3<f32> {
        let shape = &self.shapes[id.0];
        let transform = shape.visible_transform();
        let sum = shape
            .vertices()
            .iter()
            .map(|&v| transform_point(&transform, &self.vertices[v.index()].position))
            .fold(Vector3::zeros(), |acc, p| acc + p);
        sum / shape.vertices().len() as f32
    }
}

fn update_position(positions: &mut [i32], vertex: &Vertex, transform: &Matrix4<f32>) {
    let start = vertex.id.index() * 3;
    let moved = transform_point(transform, &vertex.position);
    write_position(&mut positions[start..start + 3], &moved);
}

fn write_position(slot: &mut [i32], position: &Vector3<f32>) {
    slot[0] = to_fixed(position.x);
    slot[1] = to_fixed(position.y);
    slot[2] = to_fixed(position.z);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::rotation_z;
    use crate::shape::Face;
    use std::f32::consts::FRAC_PI_2;

    fn triangle_world() -> (World, ShapeId, ShapeId) {
        let mut builder = WorldBuilder::new();

        let mut first = Shape::new();
        let a = first.add_vertex(&mut builder, 0.0, 0.0, 0.0);
        let b = first.add_vertex(&mut builder, 1.0, 0.0, 0.0);
        let c = first.add_vertex(&mut builder, 0.0, 1.0, 0.0);
        first.add_face(Face::triangle(a, b, c));

        let mut second = Shape::new();
        let d = second.add_vertex(&mut builder, 2.0, 2.0, 2.0);
        let e = second.add_vertex(&mut builder, 3.0, 2.0, 2.0);
        let f = second.add_vertex(&mut builder, 3.0, 3.0, 2.0);
        let g = second.add_vertex(&mut builder, 2.0, 3.0, 2.0);
        second.add_face(Face::quad(d, e, f, g));
        second.set_face_color(&mut builder, 0, Vector4::new(1.0, 0.5, 0.0, 1.0));

        let first = builder.add_shape(first);
        let second = builder.add_shape(second);
        assert_eq!(builder.index_count(), 9);
        (builder.generate(), first, second)
    }

    #[test]
    fn vertices_get_sequential_indices() {
        let mut builder = WorldBuilder::new();
        let a = builder.add_vertex(Vector3::new(0.0, 0.0, 0.0));
        let b = builder.add_vertex(Vector3::new(0.0, 0.0, 0.0));
        assert_eq!(a.index(), 0);
        assert_eq!(b.index(), 1);
        assert_eq!(builder.vertices().len(), 2);
    }

    #[test]
    fn buffers_are_sized_exactly() {
        let (world, _, _) = triangle_world();
        assert_eq!(world.vertex_count(), 7);
        assert_eq!(world.positions().len(), 7 * 3);
        assert_eq!(world.colors().len(), 7 * 4);
        assert_eq!(world.indices().len(), 3 + 6);
        assert_eq!(world.index_count(), 9);
    }

    #[test]
    fn buffers_serialize_in_vertex_order() {
        let (world, _, _) = triangle_world();
        assert_eq!(&world.positions()[3..6], &[65536, 0, 0]);
        assert_eq!(&world.positions()[12..15], &[3 * 65536, 2 * 65536, 2 * 65536]);
        assert_eq!(world.indices(), &[0, 1, 2, 3, 4, 6, 4, 5, 6]);

        // Only the quad's last vertex carries its color.
        assert_eq!(&world.colors()[6 * 4..], &[65536, 32768, 0, 65536]);
        assert!(world.colors()[..6 * 4].iter().all(|&c| c == 0));
    }

    #[test]
    fn transform_vertex_touches_only_that_vertex() {
        let (mut world, _, _) = triangle_world();
        let before = world.positions().to_vec();
        let target = world.vertices()[1].id;

        world.transform_vertex(target, &rotation_z(FRAC_PI_2));

        let after = world.positions();
        assert_eq!(&after[..3], &before[..3]);
        assert_eq!(&after[6..], &before[6..]);
        let moved = world.buffer_position(target);
        assert!(moved.x.abs() < 1e-4);
        assert!((moved.y - 1.0).abs() < 1e-4);
    }

    #[test]
    fn animating_a_shape_leaves_other_shapes_in_place() {
        let (mut world, first, second) = triangle_world();
        let before = world.positions().to_vec();

        world.animate_shape(second, &rotation_z(FRAC_PI_2));

        let after = world.positions();
        for &v in world.shape(first).vertices() {
            let i = v.index() * 3;
            assert_eq!(&after[i..i + 3], &before[i..i + 3]);
        }
        assert_ne!(after, &before[..]);
    }
}
