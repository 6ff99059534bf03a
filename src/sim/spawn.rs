//! Deterministic spawn placement
//!
//! Predicts where the contract will place new slices and toppings. The
//! contract uses its own pseudo-random source, so these positions are a
//! best-effort guess for optimistic display; polled state always wins.

use glam::IVec2;

use super::geometry::{inside_circle, round_vec};
use super::state::Topping;
use crate::Address;
use crate::consts::{HALF_ARENA, SPAWN_RADIUS, TOPPING_COUNT};

/// Rolling `h * 31 + c` hash over the decimal digits of `seed`
///
/// The accumulator wraps to 32-bit signed after every step. The absolute
/// value is taken in 64 bits so `i32::MIN` maps to 2^31 instead of
/// overflowing.
pub fn seed_hash(seed: i64) -> u64 {
    let h = seed.to_string().bytes().fold(0i32, |h, c| {
        h.wrapping_shl(5).wrapping_sub(h).wrapping_add(c as i32)
    });
    (h as i64).unsigned_abs()
}

/// Raw seeded position in [-32, 32) on both axes
pub fn random_pos(seed_x: i64, seed_y: i64) -> IVec2 {
    let span = (HALF_ARENA * 2) as u64;
    let x = (seed_hash(seed_x) % span) as i32 - HALF_ARENA;
    let y = (seed_hash(seed_y) % span) as i32 - HALF_ARENA;
    IVec2::new(x, y)
}

/// Seeded position pulled back inside the arena circle
///
/// Points outside the circle are rescaled onto radius 30. The origin is
/// always inside, so the rescale never divides by zero.
pub fn random_pos_in_circle(seed_x: i64, seed_y: i64) -> IVec2 {
    let pos = random_pos(seed_x, seed_y);
    if inside_circle(pos) {
        return pos;
    }
    let v = pos.as_dvec2();
    round_vec(v * (SPAWN_RADIUS / v.length()))
}

/// Predicted spawn point for a player
///
/// Seeds are the UTF-16 code units of the first two characters of the
/// address as given (for any `0x` address: 48 and 120). Missing characters
/// seed with 0.
pub fn spawn_position(address: &Address) -> IVec2 {
    let mut units = address.as_str().encode_utf16();
    let sx = units.next().unwrap_or(0) as i64;
    let sy = units.next().unwrap_or(0) as i64;
    random_pos_in_circle(sx, sy)
}

/// Topping pool used when running without a chain
pub fn demo_toppings() -> Vec<Topping> {
    (0..TOPPING_COUNT)
        .map(|i| {
            let n = (i + 1) as i64;
            Topping {
                pos: random_pos_in_circle(n * 7, n * 13),
                topping_id: (i % 4) as u8,
                eaten_at: 0,
            }
        })
        .collect()
}
