//! Optimistic move simulation
//!
//! Re-implements the contract's `move(dx, dy)` rules so the client can show
//! the result before the transaction lands. Every dispatch backend goes
//! through [`apply_move`]; none of them carries its own copy of the rules.

use glam::IVec2;
use serde::{Deserialize, Serialize};

use super::geometry::{chebyshev, in_bounds};
use super::spawn::spawn_position;
use super::state::{Slice, Topping};
use crate::Address;
use crate::consts::*;

/// `eaten_at` value written by the simulator; the poller replaces it with
/// the real block number
pub const PREDICTED_EATEN: u64 = 1;

/// A unit step (or no step) in one of 8 directions
///
/// Components are expected in {-1, 0, 1}; the simulator does not re-check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Direction {
    pub dx: i8,
    pub dy: i8,
}

impl Default for Direction {
    fn default() -> Self {
        // Facing right
        Self { dx: 1, dy: 0 }
    }
}

impl Direction {
    pub const fn new(dx: i8, dy: i8) -> Self {
        Self { dx, dy }
    }

    /// Clamp arbitrary deltas to a unit step
    pub fn from_deltas(dx: i32, dy: i32) -> Self {
        Self {
            dx: dx.signum() as i8,
            dy: dy.signum() as i8,
        }
    }

    pub fn is_still(&self) -> bool {
        self.dx == 0 && self.dy == 0
    }

    pub fn as_ivec2(&self) -> IVec2 {
        IVec2::new(self.dx as i32, self.dy as i32)
    }
}

/// Outcome of an accepted move
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveResult {
    pub slice: Slice,
    pub toppings: Vec<Topping>,
    /// Toppings consumed by this move
    pub eaten: u32,
}

/// Growth for eating a topping of the given kind
#[inline]
pub fn topping_growth(topping_id: u8) -> u32 {
    TOPPING_GROWTH_BASE + (topping_id % 4) as u32 * TOPPING_GROWTH_STEP
}

/// A fresh slice at the predicted spawn point
pub fn fresh_slice(actor: &Address) -> Slice {
    Slice {
        address: actor.clone(),
        size: START_SIZE,
        pos: spawn_position(actor),
        respawn_block: 0,
        eats: 0,
        topping_eats: 0,
    }
}

/// Simulate one move
///
/// A missing or zero-size slice is spawned first. Returns `None` if the
/// target is out of bounds; the caller's state must then stay as it was.
pub fn apply_move(
    current: Option<&Slice>,
    dir: Direction,
    toppings: &[Topping],
    actor: &Address,
) -> Option<MoveResult> {
    let slice = match current {
        Some(s) if s.is_alive() => s.clone(),
        _ => fresh_slice(actor),
    };

    let target = slice.pos + dir.as_ivec2();
    if !in_bounds(target) {
        return None;
    }

    let mut growth = 0u32;
    let mut eaten = 0u32;
    let toppings: Vec<Topping> = toppings
        .iter()
        .map(|t| {
            if t.is_available() && chebyshev(t.pos, target) <= EAT_RANGE {
                growth += topping_growth(t.topping_id);
                eaten += 1;
                Topping {
                    eaten_at: PREDICTED_EATEN,
                    ..*t
                }
            } else {
                *t
            }
        })
        .collect();

    let slice = Slice {
        pos: target,
        size: slice.size.saturating_add(growth).min(MAX_SIZE),
        topping_eats: slice.topping_eats + eaten,
        ..slice
    };

    Some(MoveResult {
        slice,
        toppings,
        eaten,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::geometry::inside_circle;
    use proptest::prelude::*;

    fn actor() -> Address {
        Address::new("0x00000000000000000000000000000000000000aa")
    }

    fn slice_at(x: i32, y: i32, size: u32) -> Slice {
        Slice {
            address: actor(),
            size,
            pos: IVec2::new(x, y),
            respawn_block: 0,
            eats: 0,
            topping_eats: 0,
        }
    }

    fn topping(x: i32, y: i32, id: u8) -> Topping {
        Topping {
            pos: IVec2::new(x, y),
            topping_id: id,
            eaten_at: 0,
        }
    }

    #[test]
    fn test_diagonal_move_eats_topping() {
        let slice = slice_at(0, 0, 1000);
        let toppings = [topping(1, 1, 0)];
        let result = apply_move(Some(&slice), Direction::new(1, 1), &toppings, &actor()).unwrap();

        assert_eq!(result.slice.pos, IVec2::new(1, 1));
        assert_eq!(result.slice.size, 1200);
        assert_eq!(result.slice.topping_eats, 1);
        assert_eq!(result.eaten, 1);
        assert_ne!(result.toppings[0].eaten_at, 0);
    }

    #[test]
    fn test_edge_move_rejected() {
        let slice = slice_at(31, 0, 1000);
        assert!(apply_move(Some(&slice), Direction::new(1, 0), &[], &actor()).is_none());
    }

    #[test]
    fn test_only_within_range_eaten() {
        let slice = slice_at(0, 0, 1000);
        // Target is (1, 0): first topping at distance 2, second at distance 3
        let toppings = [topping(3, 0, 1), topping(1, 3, 2)];
        let result = apply_move(Some(&slice), Direction::new(1, 0), &toppings, &actor()).unwrap();

        assert_eq!(result.eaten, 1);
        assert_eq!(result.toppings[0].eaten_at, PREDICTED_EATEN);
        assert_eq!(result.toppings[1].eaten_at, 0);
        assert_eq!(result.slice.size, 1000 + 300);
    }

    #[test]
    fn test_growth_per_kind_accumulates() {
        let slice = slice_at(0, 0, 1000);
        let toppings = [topping(0, 0, 0), topping(1, 0, 1), topping(0, 1, 2), topping(-1, -1, 3)];
        let result = apply_move(Some(&slice), Direction::new(0, 0), &toppings, &actor()).unwrap();
        assert_eq!(result.eaten, 4);
        assert_eq!(result.slice.size, 1000 + 200 + 300 + 400 + 500);
    }

    #[test]
    fn test_eaten_topping_not_eaten_again() {
        let slice = slice_at(0, 0, 1000);
        let toppings = [topping(1, 0, 3)];
        let first = apply_move(Some(&slice), Direction::new(1, 0), &toppings, &actor()).unwrap();
        let second = apply_move(Some(&first.slice), Direction::new(-1, 0), &first.toppings, &actor()).unwrap();

        assert_eq!(first.slice.size, 1500);
        assert_eq!(second.slice.size, 1500);
        assert_eq!(second.eaten, 0);
        assert_eq!(second.slice.topping_eats, 1);
    }

    #[test]
    fn test_size_capped() {
        let slice = slice_at(0, 0, MAX_SIZE - 100);
        let toppings = [topping(0, 0, 3)];
        let result = apply_move(Some(&slice), Direction::new(0, 0), &toppings, &actor()).unwrap();
        assert_eq!(result.slice.size, MAX_SIZE);
    }

    #[test]
    fn test_absent_slice_spawns() {
        let result = apply_move(None, Direction::new(1, 0), &[], &actor()).unwrap();
        // "0x" seeds spawn at (-28, 15)
        assert_eq!(result.slice.pos, IVec2::new(-27, 15));
        assert_eq!(result.slice.size, START_SIZE);
        assert_eq!(result.slice.respawn_block, 0);
        assert_eq!(result.slice.eats, 0);
        assert_eq!(result.slice.topping_eats, 0);
    }

    #[test]
    fn test_dead_slice_respawns_fresh() {
        let mut dead = slice_at(10, 10, 0);
        dead.eats = 3;
        dead.topping_eats = 9;
        let result = apply_move(Some(&dead), Direction::new(1, -1), &[], &actor()).unwrap();
        assert_eq!(result.slice.pos, IVec2::new(-27, 14));
        assert_eq!(result.slice.eats, 0);
        assert_eq!(result.slice.topping_eats, 0);
    }

    fn arb_dir() -> impl Strategy<Value = Direction> {
        (-1i8..=1, -1i8..=1).prop_map(|(dx, dy)| Direction::new(dx, dy))
    }

    fn arb_toppings() -> impl Strategy<Value = Vec<Topping>> {
        prop::collection::vec(
            (-32i32..32, -32i32..32, 0u8..4, prop::bool::ANY).prop_map(|(x, y, id, eaten)| Topping {
                pos: IVec2::new(x, y),
                topping_id: id,
                eaten_at: if eaten { 42 } else { 0 },
            }),
            0..20,
        )
    }

    proptest! {
        #[test]
        fn prop_out_of_bounds_is_identity(
            x in -32i32..32,
            y in -32i32..32,
            dir in arb_dir(),
            toppings in arb_toppings(),
        ) {
            let slice = slice_at(x, y, 1000);
            let target = slice.pos + dir.as_ivec2();
            let result = apply_move(Some(&slice), dir, &toppings, &actor());
            prop_assert_eq!(result.is_none(), !in_bounds(target));
        }

        #[test]
        fn prop_size_monotonic_and_capped(
            dirs in prop::collection::vec(arb_dir(), 1..60),
            toppings in arb_toppings(),
            start in 1u32..=MAX_SIZE,
        ) {
            let mut slice = slice_at(0, 0, start);
            let mut pool = toppings;
            for dir in dirs {
                if let Some(result) = apply_move(Some(&slice), dir, &pool, &actor()) {
                    prop_assert!(result.slice.size >= slice.size);
                    prop_assert!(result.slice.size <= MAX_SIZE);
                    prop_assert!(inside_circle(result.slice.pos));
                    slice = result.slice;
                    pool = result.toppings;
                }
            }
        }

        #[test]
        fn prop_eaten_toppings_stay_eaten(
            dirs in prop::collection::vec(arb_dir(), 1..40),
            toppings in arb_toppings(),
        ) {
            let mut slice = slice_at(0, 0, 1000);
            let mut pool = toppings;
            let mut total_eaten = 0;
            for dir in dirs {
                if let Some(result) = apply_move(Some(&slice), dir, &pool, &actor()) {
                    for (before, after) in pool.iter().zip(&result.toppings) {
                        if !before.is_available() {
                            prop_assert_eq!(before.eaten_at, after.eaten_at);
                        }
                    }
                    total_eaten += result.eaten;
                    slice = result.slice;
                    pool = result.toppings;
                }
            }
            let consumed_from_start = pool.iter().filter(|t| t.eaten_at == PREDICTED_EATEN).count() as u32;
            prop_assert_eq!(total_eaten, consumed_from_start);
            prop_assert_eq!(slice.topping_eats, total_eaten);
        }
    }
}
