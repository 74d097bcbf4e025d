//! A turnable slice of the puzzle.

use log::trace;
use nalgebra::Matrix4;

use crate::math::{normalize_angle, rotation_x, rotation_y, rotation_z};
use crate::world::{ShapeId, World};

/// Number of slots in a layer.
pub(crate) const LAYER_SIZE: usize = 9;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    /// The rotation by `angle` radians about this axis.
    pub(crate) fn rotation(self, angle: f32) -> Matrix4<f32> {
        match self {
            Axis::X => rotation_x(angle),
            Axis::Y => rotation_y(angle),
            Axis::Z => rotation_z(angle),
        }
    }
}

/// Nine slots turning together about one axis.
///
/// A slot is empty when it holds the puzzle's core, which only the three middle slices contain.
#[derive(Clone, Debug)]
pub(crate) struct Layer {
    axis: Axis,
    shapes: [Option<ShapeId>; LAYER_SIZE],
    transform: Matrix4<f32>,
}

impl Layer {
    pub(crate) fn new(axis: Axis) -> Self {
        Self {
            axis,
            shapes: [None; LAYER_SIZE],
            transform: Matrix4::identity(),
        }
    }

    #[cfg(test)]
    pub(crate) fn shapes(&self) -> &[Option<ShapeId>; LAYER_SIZE] {
        &self.shapes
    }

    pub(crate) fn set_shapes(&mut self, shapes: [Option<ShapeId>; LAYER_SIZE]) {
        self.shapes = shapes;
    }

    /// The rotation last applied by [`set_angle`](Self::set_angle).
    #[cfg(test)]
    pub(crate) fn transform(&self) -> &Matrix4<f32> {
        &self.transform
    }

    fn members(&self) -> impl Iterator<Item = ShapeId> + '_ {
        self.shapes.iter().flatten().copied()
    }

    pub(crate) fn start_animation(&self, world: &mut World) {
        for shape in self.members() {
            world.start_shape_animation(shape);
        }
    }

    /// Turns the layer to `angle` radians from where its shapes were last committed.
    pub(crate) fn set_angle(&mut self, world: &mut World, angle: f32) {
        let angle = normalize_angle(angle);
        trace!("layer about {:?} at {angle:.4} rad", self.axis);
        self.transform = self.axis.rotation(angle);
        for shape in self.members() {
            world.animate_shape(shape, &self.transform);
        }
    }

    pub(crate) fn end_animation(&self, world: &mut World) {
        for shape in self.members() {
            world.end_shape_animation(shape);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cube::Puzzle;
    use std::f32::consts::{FRAC_PI_2, PI};

    fn up_layer(puzzle: &Puzzle) -> Layer {
        let mut layer = Layer::new(Axis::Y);
        let mut shapes = [None; LAYER_SIZE];
        shapes.copy_from_slice(&puzzle.cubes[0..9]);
        layer.set_shapes(shapes);
        layer
    }

    #[test]
    fn negative_angles_wrap_to_the_same_rotation() {
        let mut puzzle = Puzzle::new();
        let mut layer = up_layer(&puzzle);

        layer.set_angle(&mut puzzle.world, -FRAC_PI_2);
        let wrapped = *layer.transform();
        layer.set_angle(&mut puzzle.world, 3.0 * FRAC_PI_2);
        assert!((wrapped - layer.transform()).norm() < 1e-5);

        layer.set_angle(&mut puzzle.world, 2.0 * PI);
        assert!((layer.transform() - Matrix4::identity()).norm() < 1e-5);
    }

    #[test]
    fn turning_moves_only_member_vertices() {
        let mut puzzle = Puzzle::new();
        let mut layer = up_layer(&puzzle);
        let before = puzzle.world.positions().to_vec();

        layer.start_animation(&mut puzzle.world);
        layer.set_angle(&mut puzzle.world, 0.7);

        let after = puzzle.world.positions();
        for slot in 9..27 {
            let Some(id) = puzzle.cubes[slot] else { continue };
            for &v in puzzle.world.shape(id).vertices() {
                let i = v.index() * 3;
                assert_eq!(&after[i..i + 3], &before[i..i + 3]);
            }
        }
        let corner = puzzle.world.shape(puzzle.cubes[0].unwrap()).vertices()[0];
        let i = corner.index() * 3;
        assert_ne!(&after[i..i + 3], &before[i..i + 3]);
        // A Y turn keeps heights.
        assert_eq!(after[i + 1], before[i + 1]);
    }

    #[test]
    fn end_animation_commits_each_member() {
        let mut puzzle = Puzzle::new();
        let mut layer = up_layer(&puzzle);

        layer.set_angle(&mut puzzle.world, -FRAC_PI_2);
        layer.end_animation(&mut puzzle.world);

        for slot in 0..9 {
            let shape = puzzle.world.shape(puzzle.cubes[slot].unwrap());
            assert_eq!(shape.pending_transform(), &Matrix4::identity());
            assert!((shape.transform() - layer.transform()).norm() < 1e-6);
        }
        let untouched = puzzle.world.shape(puzzle.cubes[20].unwrap());
        assert_eq!(untouched.transform(), &Matrix4::identity());
    }

    #[test]
    fn empty_slots_are_skipped() {
        let mut puzzle = Puzzle::new();
        let mut layer = Layer::new(Axis::Y);
        let mut shapes = [None; LAYER_SIZE];
        shapes.copy_from_slice(&puzzle.cubes[9..18]);
        assert!(shapes[4].is_none());
        layer.set_shapes(shapes);

        layer.set_angle(&mut puzzle.world, 0.3);
        layer.end_animation(&mut puzzle.world);
        assert_eq!(layer.shapes().iter().flatten().count(), 8);
    }
}
