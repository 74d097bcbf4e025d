//! The 3x3x3 puzzle: its colors, the unit cube shape, and the layout of the 27 slots.
//!
//! Slots are numbered `level * 9 + depth * 3 + column`, where level 0 is the top layer,
//! depth 0 the back and column 0 the left. Slot 13 is the hidden core and holds no cube.

use nalgebra::{Vector3, Vector4};

use crate::shape::{Face, Shape};
use crate::world::{ShapeId, World, WorldBuilder};

/// Number of slots in the puzzle, core included.
pub(crate) const SLOT_COUNT: usize = 27;

/// The slot in the middle of the puzzle, which has no cube.
pub(crate) const CORE_SLOT: usize = 13;

/// Bounds along one axis: the outer edge, the inner edges with a small gap, the other outer edge.
const COORDINATES: [f32; 6] = [-1.0, -0.38, -0.32, 0.32, 0.38, 1.0];

/// Sticker colors of the puzzle. Faces hidden inside the puzzle are black.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Color {
    Red,
    Green,
    Blue,
    Yellow,
    Orange,
    White,
    Black,
}

impl From<Color> for Vector4<f32> {
    fn from(color: Color) -> Self {
        match color {
            Color::Red => Vector4::new(1.0, 0.0, 0.0, 1.0),
            Color::Green => Vector4::new(0.0, 1.0, 0.0, 1.0),
            Color::Blue => Vector4::new(0.0, 0.0, 1.0, 1.0),
            Color::Yellow => Vector4::new(1.0, 1.0, 0.0, 1.0),
            Color::Orange => Vector4::new(1.0, 0.5, 0.0, 1.0),
            Color::White => Vector4::new(1.0, 1.0, 1.0, 1.0),
            Color::Black => Vector4::new(0.0, 0.0, 0.0, 1.0),
        }
    }
}

/// Faces of a cube shape, in the order [`new_cube`] adds them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum CubeFace {
    Bottom = 0,
    Front = 1,
    Left = 2,
    Right = 3,
    Back = 4,
    Top = 5,
}

impl CubeFace {
    pub(crate) const ALL: [CubeFace; 6] = [
        CubeFace::Bottom,
        CubeFace::Front,
        CubeFace::Left,
        CubeFace::Right,
        CubeFace::Back,
        CubeFace::Top,
    ];
}

/// Builds an axis-aligned box spanning `min..max` with 8 vertices and 6 quads.
///
/// Each face lists its corners clockwise as seen from outside the box.
pub(crate) fn new_cube(world: &mut WorldBuilder, min: Vector3<f32>, max: Vector3<f32>) -> Shape {
    let (left, bottom, back) = (min.x, min.y, min.z);
    let (right, top, front) = (max.x, max.y, max.z);

    let mut shape = Shape::new();
    let left_bottom_back = shape.add_vertex(world, left, bottom, back);
    let right_bottom_back = shape.add_vertex(world, right, bottom, back);
    let left_top_back = shape.add_vertex(world, left, top, back);
    let right_top_back = shape.add_vertex(world, right, top, back);
    let left_bottom_front = shape.add_vertex(world, left, bottom, front);
    let right_bottom_front = shape.add_vertex(world, right, bottom, front);
    let left_top_front = shape.add_vertex(world, left, top, front);
    let right_top_front = shape.add_vertex(world, right, top, front);

    shape.add_face(Face::quad(
        left_bottom_back,
        left_bottom_front,
        right_bottom_front,
        right_bottom_back,
    ));
    shape.add_face(Face::quad(
        left_bottom_front,
        left_top_front,
        right_top_front,
        right_bottom_front,
    ));
    shape.add_face(Face::quad(
        left_bottom_back,
        left_top_back,
        left_top_front,
        left_bottom_front,
    ));
    shape.add_face(Face::quad(
        right_bottom_back,
        right_bottom_front,
        right_top_front,
        right_top_back,
    ));
    shape.add_face(Face::quad(
        left_bottom_back,
        right_bottom_back,
        right_top_back,
        left_top_back,
    ));
    shape.add_face(Face::quad(
        left_top_back,
        right_top_back,
        right_top_front,
        left_top_front,
    ));
    shape
}

/// Bounds of the cube sitting in `slot`, or `None` for the core.
pub(crate) fn slot_bounds(slot: usize) -> Option<(Vector3<f32>, Vector3<f32>)> {
    if slot == CORE_SLOT || slot >= SLOT_COUNT {
        return None;
    }
    let level = slot / 9;
    let depth = (slot % 9) / 3;
    let column = slot % 3;

    let span = |cell: usize| (COORDINATES[cell * 2], COORDINATES[cell * 2 + 1]);
    let (x0, x1) = span(column);
    let (y0, y1) = span(2 - level);
    let (z0, z1) = span(depth);
    Some((Vector3::new(x0, y0, z0), Vector3::new(x1, y1, z1)))
}

/// Center of the cube whose home is `slot`.
#[cfg(test)]
pub(crate) fn slot_center(slot: usize) -> Option<Vector3<f32>> {
    slot_bounds(slot).map(|(min, max)| (min + max) / 2.0)
}

/// A painted puzzle: the world holding all cubes and the cube that started in each slot.
#[derive(Debug, Clone)]
pub(crate) struct Puzzle {
    pub(crate) world: World,
    pub(crate) cubes: [Option<ShapeId>; SLOT_COUNT],
}

impl Puzzle {
    /// Builds the 26 cubes in their solved positions and generates the world buffers.
    pub(crate) fn new() -> Self {
        let mut builder = WorldBuilder::new();
        let mut shapes: Vec<Option<Shape>> = (0..SLOT_COUNT)
            .map(|slot| slot_bounds(slot).map(|(min, max)| new_cube(&mut builder, min, max)))
            .collect();

        for shape in shapes.iter_mut().flatten() {
            for face in CubeFace::ALL {
                shape.set_face_color(&mut builder, face as usize, Color::Black.into());
            }
        }

        paint(&mut shapes, &mut builder, 0..9, CubeFace::Top, Color::Orange);
        paint(&mut shapes, &mut builder, 18..27, CubeFace::Bottom, Color::Red);
        paint(&mut shapes, &mut builder, (0..27).step_by(3), CubeFace::Left, Color::Yellow);
        paint(&mut shapes, &mut builder, (2..27).step_by(3), CubeFace::Right, Color::White);
        let back = (0..27).step_by(9).flat_map(|i| i..i + 3);
        paint(&mut shapes, &mut builder, back, CubeFace::Back, Color::Blue);
        let front = (6..27).step_by(9).flat_map(|i| i..i + 3);
        paint(&mut shapes, &mut builder, front, CubeFace::Front, Color::Green);

        let mut cubes = [None; SLOT_COUNT];
        for (slot, shape) in shapes.into_iter().enumerate() {
            cubes[slot] = shape.map(|shape| builder.add_shape(shape));
        }

        Self {
            world: builder.generate(),
            cubes,
        }
    }
}

fn paint(
    shapes: &mut [Option<Shape>],
    builder: &mut WorldBuilder,
    slots: impl IntoIterator<Item = usize>,
    face: CubeFace,
    color: Color,
) {
    for slot in slots {
        if let Some(shape) = shapes[slot].as_mut() {
            shape.set_face_color(builder, face as usize, color.into());
        }
    }
}
