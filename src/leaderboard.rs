//! Leaderboard projection
//!
//! Top players by size. The poller replaces it wholesale from the contract;
//! optimistic moves upsert the local player's entry in between.

use serde::{Deserialize, Serialize};

use crate::Address;
use crate::consts::LEADERBOARD_SIZE;

/// A single leaderboard row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub address: Address,
    pub size: u32,
    /// Players eaten
    pub eats: u32,
}

/// Leaderboard sorted by size, descending
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Leaderboard {
    pub entries: Vec<LeaderboardEntry>,
}

impl Leaderboard {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Replace this address's row (case-insensitive), re-sort and trim
    ///
    /// Ties keep their previous relative order, with the new row after
    /// existing rows of equal size.
    pub fn upsert(&mut self, entry: LeaderboardEntry) {
        self.entries.retain(|e| !e.address.same_as(&entry.address));
        self.entries.push(entry);
        self.entries.sort_by(|a, b| b.size.cmp(&a.size));
        self.entries.truncate(LEADERBOARD_SIZE);
    }

    /// Replace every row with polled data
    pub fn replace(&mut self, mut entries: Vec<LeaderboardEntry>) {
        entries.sort_by(|a, b| b.size.cmp(&a.size));
        self.entries = entries;
    }

    /// 1-indexed rank of an address, if listed
    pub fn rank_of(&self, address: &Address) -> Option<usize> {
        self.entries
            .iter()
            .position(|e| e.address.same_as(address))
            .map(|i| i + 1)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
