//! Slice Battle - client core for an on-chain multiplayer arena
//!
//! Core modules:
//! - `sim`: Deterministic move/eat simulation (optimistic updates)
//! - `chain`: Contract reads/writes over JSON-RPC
//! - `dispatch`: Transaction submission backends (direct, relayed, local)
//! - `poller` / `events`: Reconciliation with authoritative chain state
//! - `client`: Wires input, simulation, dispatch and reconciliation together
//! - `platform`: Browser/native platform abstraction

pub mod chain;
pub mod client;
pub mod dispatch;
pub mod events;
pub mod input;
pub mod leaderboard;
pub mod platform;
pub mod poller;
pub mod round;
pub mod settings;
pub mod sim;

pub use client::GameClient;
pub use leaderboard::Leaderboard;
pub use settings::{DispatchMode, Settings};

/// Game configuration constants (mirrors the contract)
pub mod consts {
    /// Half the arena width; coordinates live in [-HALF_ARENA, HALF_ARENA)
    pub const HALF_ARENA: i32 = 32;
    /// Playable circle radius
    pub const ARENA_RADIUS: i32 = 32;
    /// Radius out-of-circle spawn points are pulled back onto
    pub const SPAWN_RADIUS: f64 = 30.0;

    /// Size of a freshly spawned slice
    pub const START_SIZE: u32 = 1000;
    /// Hard size cap
    pub const MAX_SIZE: u32 = 10_000_000;

    /// Toppings in the pool (contract ids are 1..=TOPPING_COUNT)
    pub const TOPPING_COUNT: usize = 20;
    /// Chebyshev radius within which a topping is eaten
    pub const EAT_RANGE: i32 = 2;
    /// Growth for topping id 0; each id step adds TOPPING_GROWTH_STEP
    pub const TOPPING_GROWTH_BASE: u32 = 200;
    pub const TOPPING_GROWTH_STEP: u32 = 100;

    /// Leaderboard length
    pub const LEADERBOARD_SIZE: usize = 5;

    /// Round length in seconds
    pub const ROUND_DURATION_SECS: u32 = 30;

    /// Acting address in local-only mode
    pub const DEMO_ADDRESS: &str = "0xDemo0000000000000000000000000000000001";
    /// The zero address (empty leaderboard slots, undeployed contract)
    pub const ZERO_ADDRESS: &str = "0x0000000000000000000000000000000000000000";
}

/// Player identity (hex address as received; compared case-insensitively)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Lowercased form used to key the players map
    pub fn key(&self) -> String {
        self.0.to_lowercase()
    }

    pub fn is_zero(&self) -> bool {
        self.0.eq_ignore_ascii_case(consts::ZERO_ADDRESS)
    }

    /// Case-insensitive identity comparison
    pub fn same_as(&self, other: &Address) -> bool {
        self.0.eq_ignore_ascii_case(&other.0)
    }

    /// Shortened display form (`0x1234...abcd`)
    pub fn short(&self) -> String {
        let s = self.0.as_str();
        if s.len() <= 10 || !s.is_ascii() {
            return s.to_string();
        }
        format!("{}...{}", &s[..6], &s[s.len() - 4..])
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Address {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Format a size as thousands with one truncated decimal (1234 -> "1.2k", 1000 -> "1k")
pub fn format_size(size: u32) -> String {
    let tenths = size / 100;
    match tenths % 10 {
        0 => format!("{}k", tenths / 10),
        d => format!("{}.{}k", tenths / 10, d),
    }
}
