//! Game state and core simulation types
//!
//! `GameState` is the single container for everything the client knows about
//! the arena: the local player's slice, the topping pool, every visible
//! player, the leaderboard and a few counters. The simulator writes
//! predictions into it; the poller and event watcher overwrite them with
//! authoritative data.

use std::collections::BTreeMap;

use glam::IVec2;
use serde::{Deserialize, Serialize};

use super::moves::{Direction, MoveResult, apply_move};
use crate::Address;
use crate::leaderboard::{Leaderboard, LeaderboardEntry};

/// A player's slice
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slice {
    pub address: Address,
    /// 0 = not spawned yet / dead
    pub size: u32,
    pub pos: IVec2,
    /// 0 = alive; otherwise the block at which respawn becomes legal
    pub respawn_block: u64,
    /// Players eaten (only the contract knows this)
    pub eats: u32,
    /// Toppings eaten
    pub topping_eats: u32,
}

impl Slice {
    pub fn is_alive(&self) -> bool {
        self.size > 0
    }
}

/// A consumable topping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topping {
    pub pos: IVec2,
    /// Kind (0..3), selects growth and sprite
    pub topping_id: u8,
    /// 0 = available; nonzero = eaten (block number, or 1 when predicted)
    pub eaten_at: u64,
}

impl Topping {
    pub fn is_available(&self) -> bool {
        self.eaten_at == 0
    }
}

/// Position and size of any visible player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerView {
    pub pos: IVec2,
    pub size: u32,
}

/// Whether the local player may spawn, and how long until they can
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpawnStatus {
    pub can_spawn: bool,
    pub blocks_left: u64,
}

/// Everything polled from the chain in one core cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreSnapshot {
    pub slice: Slice,
    pub toppings: Vec<Topping>,
    pub block_number: u64,
}

/// A `SliceMoved` event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SliceMoved {
    pub player: Address,
    pub pos: IVec2,
    pub size: u32,
}

/// Client-side view of the arena
#[derive(Debug, Clone, Default)]
pub struct GameState {
    /// Local player's slice (None until first move or poll)
    pub player: Option<Slice>,
    /// Topping pool in contract id order
    pub toppings: Vec<Topping>,
    /// Every visible player keyed by lowercased address
    pub players: BTreeMap<String, PlayerView>,
    pub leaderboard: Leaderboard,
    /// Latest polled block number
    pub block_number: u64,
    /// Relayer identity (relayed mode only)
    pub relayer_address: Option<Address>,
    /// Transactions submitted from this client
    pub tx_count: u64,
    /// Size of the latest `SliceMoved` batch
    pub last_block_tx_count: usize,
    /// Facing of the local slice
    pub last_move_dir: Direction,
    /// Transient user-visible error
    pub error: Option<String>,
}

impl GameState {
    pub fn new() -> Self {
        Self::default()
    }

    /// State for local-only play: the demo topping pool, nothing else
    pub fn local_demo() -> Self {
        Self {
            toppings: super::spawn::demo_toppings(),
            ..Self::default()
        }
    }

    /// Simulate a move for `actor` and apply the prediction
    ///
    /// Returns false (and changes nothing) if the move was rejected.
    pub fn apply_local_move(&mut self, dir: Direction, actor: &Address) -> bool {
        let Some(result) = apply_move(self.player.as_ref(), dir, &self.toppings, actor) else {
            log::debug!("Move {:?} rejected", dir);
            return false;
        };
        self.commit_move(result, actor);
        true
    }

    fn commit_move(&mut self, result: MoveResult, actor: &Address) {
        let MoveResult { slice, toppings, eaten } = result;
        if eaten > 0 {
            log::debug!("Ate {} topping(s), size now {}", eaten, slice.size);
        }
        self.players.insert(
            actor.key(),
            PlayerView {
                pos: slice.pos,
                size: slice.size,
            },
        );
        self.leaderboard.upsert(LeaderboardEntry {
            address: actor.clone(),
            size: slice.size,
            eats: slice.eats,
        });
        self.toppings = toppings;
        self.player = Some(slice);
    }

    /// Overwrite local state with a polled snapshot (authoritative wins)
    pub fn apply_core_snapshot(&mut self, snapshot: CoreSnapshot) {
        let CoreSnapshot {
            slice,
            toppings,
            block_number,
        } = snapshot;
        self.players.insert(
            slice.address.key(),
            PlayerView {
                pos: slice.pos,
                size: slice.size,
            },
        );
        self.player = Some(slice);
        self.toppings = toppings;
        self.block_number = block_number;
    }

    /// Replace the leaderboard with a polled one
    pub fn apply_leaderboard(&mut self, entries: Vec<LeaderboardEntry>) {
        self.leaderboard.replace(entries);
    }

    /// Merge a batch of move events into the players map
    pub fn apply_move_events(&mut self, events: &[SliceMoved]) {
        if events.is_empty() {
            return;
        }
        self.last_block_tx_count = events.len();
        for ev in events {
            self.players.insert(
                ev.player.key(),
                PlayerView {
                    pos: ev.pos,
                    size: ev.size,
                },
            );
        }
    }

    /// Spawn availability for the local player
    pub fn spawn_status(&self) -> SpawnStatus {
        let respawn = self.player.as_ref().map_or(0, |s| s.respawn_block);
        SpawnStatus {
            can_spawn: respawn == 0 || self.block_number >= respawn,
            blocks_left: respawn.saturating_sub(self.block_number),
        }
    }

    /// True if the next spawn action should send `respawn()` instead of a move
    pub fn respawn_ready(&self) -> bool {
        self.player
            .as_ref()
            .is_some_and(|s| s.respawn_block > 0 && self.block_number >= s.respawn_block)
    }

    pub fn player_size(&self) -> u32 {
        self.player.as_ref().map_or(0, |s| s.size)
    }
}
