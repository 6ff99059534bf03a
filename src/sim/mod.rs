//! Deterministic simulation module
//!
//! Mirrors the contract's move/eat rules for optimistic display. This module
//! must stay pure and deterministic:
//! - Integer positions (spawn rescaling rounds back to the grid)
//! - No RNG, no clock
//! - Stable iteration order (topping pool in contract id order, players in a BTreeMap)
//! - No network or platform dependencies

pub mod geometry;
pub mod moves;
pub mod spawn;
pub mod state;

pub use geometry::{chebyshev, in_bounds, inside_circle};
pub use moves::{Direction, MoveResult, PREDICTED_EATEN, apply_move, topping_growth};
pub use spawn::{demo_toppings, random_pos, random_pos_in_circle, seed_hash, spawn_position};
pub use state::{CoreSnapshot, GameState, PlayerView, Slice, SliceMoved, SpawnStatus, Topping};
