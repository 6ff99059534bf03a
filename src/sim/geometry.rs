//! Arena geometry
//!
//! The arena is a disc of radius 32 centered on the origin, further clipped to
//! the half-open square [-32, 32) on both axes (the contract stores positions
//! as `int8` and checks the square before the circle).

use glam::{DVec2, IVec2};

use crate::consts::{ARENA_RADIUS, HALF_ARENA};

/// True if the point lies on or inside the arena circle
#[inline]
pub fn inside_circle(p: IVec2) -> bool {
    p.length_squared() <= ARENA_RADIUS * ARENA_RADIUS
}

/// True if the point is a legal move target
#[inline]
pub fn in_bounds(p: IVec2) -> bool {
    let square = (-HALF_ARENA..HALF_ARENA).contains(&p.x) && (-HALF_ARENA..HALF_ARENA).contains(&p.y);
    square && inside_circle(p)
}

/// Chebyshev (king-move) distance
#[inline]
pub fn chebyshev(a: IVec2, b: IVec2) -> i32 {
    (a - b).abs().max_element()
}

/// Round half toward positive infinity (-2.5 -> -2, 2.5 -> 3)
#[inline]
pub fn round_half_up(v: f64) -> f64 {
    (v + 0.5).floor()
}

/// Round both components with [`round_half_up`]
pub fn round_vec(v: DVec2) -> IVec2 {
    IVec2::new(round_half_up(v.x) as i32, round_half_up(v.y) as i32)
}
