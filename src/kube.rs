//! The self-scrambling puzzle: layer tables, the slot permutation and the twist animation.
//!
//! [`Kube`] is driven by one call to [`Kube::animate`] per displayed frame. When no layer
//! is turning it picks one at random and starts a twist; each tick then advances the twist
//! by a fixed angle until it reaches its target. On completion the layer's shapes commit
//! their rotation, the slot permutation is composed with the layer's table and every layer
//! is refilled from the new permutation.

use std::f32::consts::{FRAC_PI_2, PI};
use std::fmt;

use log::{debug, trace};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::cube::{Puzzle, SLOT_COUNT};
use crate::layer::{Axis, LAYER_SIZE, Layer};
use crate::world::{ShapeId, World};

/// Slot tables for a quarter turn of each layer, in [`LayerId`] order.
///
/// After a layer turns, slot `i` holds whatever was in slot `table[i]`. Each table describes
/// a turn by `-π/2` about the layer's axis.
#[rustfmt::skip]
pub(crate) const LAYER_PERMUTATIONS: [[usize; SLOT_COUNT]; 9] = [
    // up
    [2, 5, 8, 1, 4, 7, 0, 3, 6, 9, 10, 11, 12, 13, 14, 15, 16, 17, 18, 19, 20, 21, 22, 23, 24, 25, 26],
    // down
    [0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16, 17, 20, 23, 26, 19, 22, 25, 18, 21, 24],
    // left
    [6, 1, 2, 15, 4, 5, 24, 7, 8, 3, 10, 11, 12, 13, 14, 21, 16, 17, 0, 19, 20, 9, 22, 23, 18, 25, 26],
    // right
    [0, 1, 8, 3, 4, 17, 6, 7, 26, 9, 10, 5, 12, 13, 14, 15, 16, 23, 18, 19, 2, 21, 22, 11, 24, 25, 20],
    // front
    [0, 1, 2, 3, 4, 5, 24, 15, 6, 9, 10, 11, 12, 13, 14, 25, 16, 7, 18, 19, 20, 21, 22, 23, 26, 17, 8],
    // back
    [18, 9, 0, 3, 4, 5, 6, 7, 8, 19, 10, 1, 12, 13, 14, 15, 16, 17, 20, 11, 2, 21, 22, 23, 24, 25, 26],
    // middle
    [0, 7, 2, 3, 16, 5, 6, 25, 8, 9, 4, 11, 12, 13, 14, 15, 22, 17, 18, 1, 20, 21, 10, 23, 24, 19, 26],
    // equator
    [0, 1, 2, 3, 4, 5, 6, 7, 8, 11, 14, 17, 10, 13, 16, 9, 12, 15, 18, 19, 20, 21, 22, 23, 24, 25, 26],
    // side
    [0, 1, 2, 21, 12, 3, 6, 7, 8, 9, 10, 11, 22, 13, 4, 15, 16, 17, 18, 19, 20, 23, 14, 5, 24, 25, 26],
];

/// The nine turnable layers: six faces and three middle slices.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) enum LayerId {
    Up,
    Down,
    Left,
    Right,
    Front,
    Back,
    Middle,
    Equator,
    Side,
}

impl LayerId {
    pub(crate) const ALL: [LayerId; 9] = [
        LayerId::Up,
        LayerId::Down,
        LayerId::Left,
        LayerId::Right,
        LayerId::Front,
        LayerId::Back,
        LayerId::Middle,
        LayerId::Equator,
        LayerId::Side,
    ];

    pub(crate) fn index(self) -> usize {
        self as usize
    }

    pub(crate) fn axis(self) -> Axis {
        match self {
            LayerId::Up | LayerId::Down | LayerId::Equator => Axis::Y,
            LayerId::Left | LayerId::Right | LayerId::Middle => Axis::X,
            LayerId::Front | LayerId::Back | LayerId::Side => Axis::Z,
        }
    }

    /// The puzzle slots this layer covers, in the order its shapes are stored.
    pub(crate) fn slots(self) -> [usize; LAYER_SIZE] {
        // slot k = offset + (k / 3) * outer + (k % 3) * inner
        let (offset, outer, inner) = match self {
            LayerId::Up => (0, 3, 1),
            LayerId::Equator => (9, 3, 1),
            LayerId::Down => (18, 3, 1),
            LayerId::Left => (0, 9, 3),
            LayerId::Middle => (1, 9, 3),
            LayerId::Right => (2, 9, 3),
            LayerId::Back => (0, 9, 1),
            LayerId::Side => (3, 9, 1),
            LayerId::Front => (6, 9, 1),
        };
        std::array::from_fn(|k| offset + (k / 3) * outer + (k % 3) * inner)
    }
}

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LayerId::Up => "Up",
            LayerId::Down => "Down",
            LayerId::Left => "Left",
            LayerId::Right => "Right",
            LayerId::Front => "Front",
            LayerId::Back => "Back",
            LayerId::Middle => "Middle",
            LayerId::Equator => "Equator",
            LayerId::Side => "Side",
        };
        f.write_str(name)
    }
}

/// A mapping from puzzle slot to the index of the cube that started there.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Permutation([usize; SLOT_COUNT]);

impl Permutation {
    pub(crate) fn identity() -> Self {
        Self(std::array::from_fn(|i| i))
    }

    pub(crate) fn from_table(table: [usize; SLOT_COUNT]) -> Self {
        Self(table)
    }

    pub(crate) fn as_slice(&self) -> &[usize; SLOT_COUNT] {
        &self.0
    }

    pub(crate) fn get(&self, slot: usize) -> usize {
        self.0[slot]
    }

    /// `result[i] = self[other[i]]`: the state reached from `self` by the move `other`.
    pub(crate) fn compose(&self, other: &Permutation) -> Self {
        Self(std::array::from_fn(|i| self.0[other.0[i]]))
    }

    /// Composes `other` onto `self` `times` times.
    pub(crate) fn apply_n(&self, other: &Permutation, times: usize) -> Self {
        (0..times).fold(*self, |acc, _| acc.compose(other))
    }

    pub(crate) fn is_bijection(&self) -> bool {
        let mut seen = [false; SLOT_COUNT];
        for &target in &self.0 {
            if target >= SLOT_COUNT || seen[target] {
                return false;
            }
            seen[target] = true;
        }
        true
    }

    pub(crate) fn is_identity(&self) -> bool {
        *self == Self::identity()
    }
}

/// The built-in layer tables as permutations.
pub(crate) fn layer_tables() -> [Permutation; 9] {
    LAYER_PERMUTATIONS.map(Permutation::from_table)
}

/// Sense of a twist's rotation angle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum TurnDirection {
    /// Toward negative angles; the sense the layer tables describe.
    Negative,
    Positive,
}

/// One planned layer move.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Twist {
    pub(crate) layer: LayerId,
    pub(crate) direction: TurnDirection,
    pub(crate) quarter_turns: u8,
}

impl Twist {
    /// A single quarter turn in the tables' sense.
    pub(crate) fn quarter(layer: LayerId) -> Self {
        Self {
            layer,
            direction: TurnDirection::Negative,
            quarter_turns: 1,
        }
    }

    fn end_angle(&self) -> f32 {
        let magnitude = FRAC_PI_2 * self.quarter_turns as f32;
        match self.direction {
            TurnDirection::Negative => -magnitude,
            TurnDirection::Positive => magnitude,
        }
    }

    /// How many times the layer table has to be composed to account for this twist.
    fn table_applications(&self) -> usize {
        let turns = self.quarter_turns as usize;
        match self.direction {
            TurnDirection::Negative => turns % 4,
            TurnDirection::Positive => (3 * turns) % 4,
        }
    }
}

/// Animation parameters, fixed for the lifetime of a twist.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct AnimationConfig {
    /// Radians a layer turns per tick.
    pub(crate) angle_step: f32,
    /// Degrees the whole puzzle spins per tick.
    pub(crate) view_spin_step: f32,
    /// Pick a random direction and 1 to 3 quarter turns for each twist instead of a single
    /// quarter turn in the tables' sense.
    pub(crate) randomize_twists: bool,
    /// Seed for layer selection. `None` seeds from the OS.
    pub(crate) seed: Option<u64>,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            angle_step: PI / 50.0,
            view_spin_step: 1.2,
            randomize_twists: false,
            seed: None,
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct ActiveTwist {
    twist: Twist,
    angle: f32,
    increment: f32,
    end_angle: f32,
}

impl ActiveTwist {
    fn is_finished(&self) -> bool {
        (self.increment > 0.0 && self.angle >= self.end_angle)
            || (self.increment < 0.0 && self.angle <= self.end_angle)
    }
}

#[derive(Clone, Copy, Debug)]
enum TwistState {
    Idle,
    Rotating(ActiveTwist),
}

/// The animated puzzle.
#[derive(Debug, Clone)]
pub(crate) struct Kube {
    config: AnimationConfig,
    tables: [Permutation; 9],
    world: World,
    cubes: [Option<ShapeId>; SLOT_COUNT],
    layers: [Layer; 9],
    permutation: Permutation,
    state: TwistState,
    view_angle: f32,
    completed_twists: u64,
    rng: StdRng,
}

impl Kube {
    /// A solved puzzle using the built-in layer tables.
    pub(crate) fn new(config: AnimationConfig) -> Self {
        Self::with_tables(config, layer_tables())
    }

    pub(crate) fn with_tables(config: AnimationConfig, tables: [Permutation; 9]) -> Self {
        debug_assert!(tables.iter().all(Permutation::is_bijection));
        let Puzzle { world, cubes } = Puzzle::new();
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let mut kube = Self {
            config,
            tables,
            world,
            cubes,
            layers: LayerId::ALL.map(|id| Layer::new(id.axis())),
            permutation: Permutation::identity(),
            state: TwistState::Idle,
            view_angle: 0.0,
            completed_twists: 0,
            rng,
        };
        kube.update_layers();
        kube
    }

    pub(crate) fn config(&self) -> &AnimationConfig {
        &self.config
    }

    /// Replaces the animation parameters. A twist already under way keeps its own.
    pub(crate) fn set_config(&mut self, config: AnimationConfig) {
        self.config = config;
    }

    pub(crate) fn world(&self) -> &World {
        &self.world
    }

    #[cfg(test)]
    pub(crate) fn cubes(&self) -> &[Option<ShapeId>; SLOT_COUNT] {
        &self.cubes
    }

    #[cfg(test)]
    pub(crate) fn layer(&self, id: LayerId) -> &Layer {
        &self.layers[id.index()]
    }

    pub(crate) fn permutation(&self) -> &Permutation {
        &self.permutation
    }

    /// Spin of the whole puzzle, in degrees.
    pub(crate) fn view_angle(&self) -> f32 {
        self.view_angle
    }

    pub(crate) fn completed_twists(&self) -> u64 {
        self.completed_twists
    }

    pub(crate) fn is_idle(&self) -> bool {
        matches!(self.state, TwistState::Idle)
    }

    pub(crate) fn active_layer(&self) -> Option<LayerId> {
        match self.state {
            TwistState::Idle => None,
            TwistState::Rotating(active) => Some(active.twist.layer),
        }
    }

    /// Advances the animation by one frame.
    pub(crate) fn animate(&mut self) {
        self.view_angle += self.config.view_spin_step;

        if self.is_idle() {
            let twist = self.next_twist();
            self.begin_twist(twist);
        }
        let TwistState::Rotating(mut active) = self.state else {
            return;
        };

        active.angle += active.increment;
        if active.is_finished() {
            self.finish(active);
        } else {
            trace!("{} layer at {:.4} rad", active.twist.layer, active.angle);
            self.layers[active.twist.layer.index()].set_angle(&mut self.world, active.angle);
            self.state = TwistState::Rotating(active);
        }
    }

    /// Starts `twist` now instead of a random one. Returns `false` if a twist is already running.
    pub(crate) fn begin_twist(&mut self, twist: Twist) -> bool {
        if !self.is_idle() {
            debug!("ignoring {twist:?}, a layer is already turning");
            return false;
        }
        let active = self.start(twist);
        self.state = TwistState::Rotating(active);
        true
    }

    fn next_twist(&mut self) -> Twist {
        let layer = LayerId::ALL[self.rng.gen_range(0..LayerId::ALL.len())];
        if !self.config.randomize_twists {
            return Twist::quarter(layer);
        }
        let direction = if self.rng.r#gen::<bool>() {
            TurnDirection::Positive
        } else {
            TurnDirection::Negative
        };
        Twist {
            layer,
            direction,
            quarter_turns: self.rng.gen_range(1..=3),
        }
    }

    fn start(&mut self, twist: Twist) -> ActiveTwist {
        debug!("starting twist {twist:?}");
        self.layers[twist.layer.index()].start_animation(&mut self.world);
        let increment = match twist.direction {
            TurnDirection::Negative => -self.config.angle_step,
            TurnDirection::Positive => self.config.angle_step,
        };
        ActiveTwist {
            twist,
            angle: 0.0,
            increment,
            end_angle: twist.end_angle(),
        }
    }

    fn finish(&mut self, active: ActiveTwist) {
        let id = active.twist.layer;
        let layer = &mut self.layers[id.index()];
        layer.set_angle(&mut self.world, active.end_angle);
        layer.end_animation(&mut self.world);

        let table = self.tables[id.index()];
        self.permutation = self
            .permutation
            .apply_n(&table, active.twist.table_applications());
        self.update_layers();

        self.completed_twists += 1;
        self.state = TwistState::Idle;
        debug!(
            "finished {id} twist #{}, permutation {:?}",
            self.completed_twists,
            self.permutation.as_slice()
        );
    }

    /// Refills every layer with the cubes the permutation currently places in its slots.
    fn update_layers(&mut self) {
        for id in LayerId::ALL {
            let shapes = id
                .slots()
                .map(|slot| self.cubes[self.permutation.get(slot)]);
            self.layers[id.index()].set_shapes(shapes);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cube::{CORE_SLOT, slot_center};
    use crate::math::tests::approx_eq;

    fn seeded(randomize_twists: bool, seed: u64) -> Kube {
        Kube::new(AnimationConfig {
            randomize_twists,
            seed: Some(seed),
            ..AnimationConfig::default()
        })
    }

    fn run_until_idle(kube: &mut Kube) -> usize {
        let mut ticks = 0;
        loop {
            kube.animate();
            ticks += 1;
            if kube.is_idle() {
                return ticks;
            }
            assert!(ticks < 1000, "twist never finished");
        }
    }

    fn twist(kube: &mut Kube, twist: Twist) {
        assert!(kube.begin_twist(twist));
        run_until_idle(kube);
    }

    /// Every cube sits at the home of the slot the permutation assigns it to.
    fn assert_geometry_matches_permutation(kube: &Kube) {
        for slot in 0..SLOT_COUNT {
            let cube = kube.cubes()[kube.permutation().get(slot)];
            if slot == CORE_SLOT {
                assert!(cube.is_none());
                continue;
            }
            let cube = cube.expect("non-core slot holds a cube");
            let center = kube.world().shape_center(cube);
            let home = slot_center(slot).unwrap();
            assert!(
                (center - home).norm() < 1e-3,
                "slot {slot}: cube at {center:?}, expected {home:?}"
            );
        }
    }

    #[test]
    fn tables_are_bijections_of_order_four() {
        for (id, table) in LayerId::ALL.iter().zip(layer_tables()) {
            assert!(table.is_bijection(), "{id}");
            assert!(!table.is_identity(), "{id}");
            assert!(!Permutation::identity().apply_n(&table, 2).is_identity(), "{id}");
            assert!(Permutation::identity().apply_n(&table, 4).is_identity(), "{id}");
        }
    }

    #[test]
    fn tables_only_move_their_own_layer() {
        for (id, table) in LayerId::ALL.iter().zip(layer_tables()) {
            let slots = id.slots();
            for slot in 0..SLOT_COUNT {
                if table.get(slot) != slot {
                    assert!(slots.contains(&slot), "{id} moves slot {slot}");
                }
            }
            assert_eq!(table.get(CORE_SLOT), CORE_SLOT);
        }
    }

    #[test]
    fn layer_slot_patterns() {
        assert_eq!(LayerId::Up.slots(), [0, 1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(LayerId::Down.slots(), [18, 19, 20, 21, 22, 23, 24, 25, 26]);
        assert_eq!(LayerId::Equator.slots(), [9, 10, 11, 12, 13, 14, 15, 16, 17]);
        assert_eq!(LayerId::Left.slots(), [0, 3, 6, 9, 12, 15, 18, 21, 24]);
        assert_eq!(LayerId::Middle.slots(), [1, 4, 7, 10, 13, 16, 19, 22, 25]);
        assert_eq!(LayerId::Right.slots(), [2, 5, 8, 11, 14, 17, 20, 23, 26]);
        assert_eq!(LayerId::Back.slots(), [0, 1, 2, 9, 10, 11, 18, 19, 20]);
        assert_eq!(LayerId::Side.slots(), [3, 4, 5, 12, 13, 14, 21, 22, 23]);
        assert_eq!(LayerId::Front.slots(), [6, 7, 8, 15, 16, 17, 24, 25, 26]);
    }

    #[test]
    fn only_slices_contain_the_core() {
        let kube = seeded(false, 1);
        for id in LayerId::ALL {
            let filled = kube.layer(id).shapes().iter().flatten().count();
            let expected = match id {
                LayerId::Middle | LayerId::Equator | LayerId::Side => 8,
                _ => 9,
            };
            assert_eq!(filled, expected, "{id}");
        }
    }

    #[test]
    fn up_layer_round_trip() {
        let mut kube = seeded(false, 7);
        assert!(kube.permutation().is_identity());

        twist(&mut kube, Twist::quarter(LayerId::Up));
        assert_eq!(
            kube.permutation().as_slice(),
            &[2, 5, 8, 1, 4, 7, 0, 3, 6, 9, 10, 11, 12, 13, 14, 15, 16, 17, 18, 19, 20, 21, 22, 23, 24, 25, 26]
        );
        assert_geometry_matches_permutation(&kube);

        for _ in 0..3 {
            twist(&mut kube, Twist::quarter(LayerId::Up));
        }
        assert!(kube.permutation().is_identity());
        assert_eq!(kube.completed_twists(), 4);
        assert_geometry_matches_permutation(&kube);
    }

    #[test]
    fn every_layer_turn_lands_cubes_in_their_new_slots() {
        for id in LayerId::ALL {
            let mut kube = seeded(false, 3);
            twist(&mut kube, Twist::quarter(id));
            assert_eq!(kube.permutation(), &layer_tables()[id.index()], "{id}");
            assert_geometry_matches_permutation(&kube);
        }
    }

    #[test]
    fn permutation_composes_on_the_right() {
        let mut kube = seeded(false, 5);
        twist(&mut kube, Twist::quarter(LayerId::Up));
        twist(&mut kube, Twist::quarter(LayerId::Left));

        let tables = layer_tables();
        let expected = Permutation::identity()
            .compose(&tables[LayerId::Up.index()])
            .compose(&tables[LayerId::Left.index()]);
        assert_eq!(kube.permutation(), &expected);

        let reversed = Permutation::identity()
            .compose(&tables[LayerId::Left.index()])
            .compose(&tables[LayerId::Up.index()]);
        assert_ne!(kube.permutation(), &reversed);
        assert_geometry_matches_permutation(&kube);
    }

    #[test]
    fn layers_follow_the_permutation() {
        let mut kube = seeded(false, 9);
        twist(&mut kube, Twist::quarter(LayerId::Front));
        twist(&mut kube, Twist::quarter(LayerId::Equator));

        for id in LayerId::ALL {
            let expected = id.slots().map(|slot| kube.cubes()[kube.permutation().get(slot)]);
            assert_eq!(kube.layer(id).shapes(), &expected, "{id}");
        }
    }

    #[test]
    fn random_scramble_stays_consistent() {
        let mut kube = seeded(false, 42);
        for _ in 0..30 {
            run_until_idle(&mut kube);
            assert!(kube.permutation().is_bijection());
        }
        assert_eq!(kube.completed_twists(), 30);
        assert_geometry_matches_permutation(&kube);
    }

    #[test]
    fn randomized_twists_stay_consistent() {
        let mut kube = seeded(true, 11);
        for _ in 0..20 {
            run_until_idle(&mut kube);
            assert!(kube.permutation().is_bijection());
        }
        assert_geometry_matches_permutation(&kube);
    }

    #[test]
    fn positive_quarter_turn_is_three_negative_ones() {
        let mut kube = seeded(false, 13);
        twist(
            &mut kube,
            Twist {
                layer: LayerId::Right,
                direction: TurnDirection::Positive,
                quarter_turns: 1,
            },
        );
        let table = layer_tables()[LayerId::Right.index()];
        assert_eq!(kube.permutation(), &Permutation::identity().apply_n(&table, 3));
        assert_geometry_matches_permutation(&kube);
    }

    #[test]
    fn quarter_turn_takes_about_25_ticks() {
        let mut kube = seeded(false, 17);
        assert!(kube.begin_twist(Twist::quarter(LayerId::Down)));
        assert_eq!(kube.active_layer(), Some(LayerId::Down));
        let ticks = run_until_idle(&mut kube);
        assert!((25..=26).contains(&ticks), "{ticks} ticks");
        assert_eq!(kube.active_layer(), None);
    }

    #[test]
    fn cannot_start_a_second_twist_mid_turn() {
        let mut kube = seeded(false, 19);
        assert!(kube.begin_twist(Twist::quarter(LayerId::Up)));
        kube.animate();
        assert!(!kube.begin_twist(Twist::quarter(LayerId::Left)));
        assert_eq!(kube.active_layer(), Some(LayerId::Up));
    }

    #[test]
    fn turning_leaves_other_cubes_untouched() {
        let mut kube = seeded(false, 23);
        let before = kube.world().positions().to_vec();
        let members: Vec<ShapeId> = kube.layer(LayerId::Left).shapes().iter().flatten().copied().collect();

        assert!(kube.begin_twist(Twist::quarter(LayerId::Left)));
        for _ in 0..10 {
            kube.animate();
        }
        assert!(!kube.is_idle());

        let after = kube.world().positions();
        for (index, cube) in kube.cubes().iter().enumerate() {
            let Some(cube) = cube else { continue };
            let moved = kube.world().shape(*cube).vertices().iter().any(|v| {
                let i = v.index() * 3;
                after[i..i + 3] != before[i..i + 3]
            });
            assert_eq!(moved, members.contains(cube), "cube {index}");
        }
    }

    #[test]
    fn mid_turn_cubes_are_partly_rotated() {
        let mut kube = seeded(false, 29);
        assert!(kube.begin_twist(Twist::quarter(LayerId::Up)));
        for _ in 0..12 {
            kube.animate();
        }
        // Slot 2 starts at the right-back corner and swings toward the left-back corner.
        let cube = kube.cubes()[2].unwrap();
        let center = kube.world().shape_center(cube);
        let start = slot_center(2).unwrap();
        let end = slot_center(0).unwrap();
        assert!(!approx_eq(&center, &start));
        assert!(!approx_eq(&center, &end));
        assert!((center.norm() - start.norm()).abs() < 1e-3);
    }

    #[test]
    fn view_spins_every_tick() {
        let mut kube = seeded(false, 31);
        for _ in 0..10 {
            kube.animate();
        }
        assert!((kube.view_angle() - 12.0).abs() < 1e-4);
    }

    #[test]
    fn seeded_runs_are_repeatable() {
        let mut a = seeded(true, 37);
        let mut b = seeded(true, 37);
        for _ in 0..5 {
            run_until_idle(&mut a);
            run_until_idle(&mut b);
        }
        assert_eq!(a.permutation(), b.permutation());
    }
}
