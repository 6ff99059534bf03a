//! Reconciliation poller
//!
//! Periodically replaces predicted state with what the contract says. Each
//! cycle reads the player's slice, every topping and the block number; every
//! few cycles it also rebuilds the leaderboard. Reads are batched with a
//! pause between batches to stay under public RPC rate limits.

use std::cell::{Cell, RefCell};
use std::future::Future;

use anyhow::Result;
use futures::future::try_join_all;

use crate::Address;
use crate::chain::ChainReader;
use crate::client::GameClient;
use crate::consts::TOPPING_COUNT;
use crate::leaderboard::LeaderboardEntry;
use crate::platform::sleep_ms;
use crate::settings::Settings;
use crate::sim::CoreSnapshot;

/// Cycle counter value at startup; the first leaderboard read lands a few
/// cycles in rather than immediately
const LEADERBOARD_TICK_START: u32 = 2;

/// Concurrent reads per batch and the pause between batches
#[derive(Debug, Clone, Copy)]
pub struct Batching {
    pub size: usize,
    pub delay_ms: u32,
}

pub struct Poller {
    leaderboard_tick: Cell<u32>,
    leaderboard_every: u32,
    toppings: Batching,
    leaderboard: Batching,
}

impl Poller {
    pub fn new(settings: &Settings) -> Self {
        Self {
            leaderboard_tick: Cell::new(LEADERBOARD_TICK_START),
            leaderboard_every: settings.leaderboard_every(),
            toppings: Batching {
                size: settings.topping_batch_size,
                delay_ms: settings.topping_batch_delay_ms,
            },
            leaderboard: Batching {
                size: settings.leaderboard_batch_size,
                delay_ms: settings.leaderboard_batch_delay_ms,
            },
        }
    }

    /// Advance the cycle counter; true if this cycle also reads the leaderboard
    pub fn leaderboard_due(&self) -> bool {
        let tick = self.leaderboard_tick.get() + 1;
        if tick >= self.leaderboard_every {
            self.leaderboard_tick.set(0);
            true
        } else {
            self.leaderboard_tick.set(tick);
            false
        }
    }

    /// Read the player's slice, all toppings and the block number
    pub async fn fetch_core<R: ChainReader>(&self, reader: &R, player: &Address) -> Result<CoreSnapshot> {
        let slice = reader.slice(player).await?;
        let ids: Vec<u64> = (1..=TOPPING_COUNT as u64).collect();
        let toppings = in_batches(&ids, self.toppings, move |&id| reader.topping(id)).await?;
        let block_number = reader.block_number().await?;
        Ok(CoreSnapshot {
            slice,
            toppings,
            block_number,
        })
    }

    /// Rebuild the leaderboard from `getLeaderboard()` and each listed slice
    pub async fn fetch_leaderboard<R: ChainReader>(&self, reader: &R) -> Result<Vec<LeaderboardEntry>> {
        let addresses: Vec<Address> = reader
            .leaderboard()
            .await?
            .into_iter()
            .filter(|a| !a.is_zero())
            .collect();
        let mut entries = in_batches(&addresses, self.leaderboard, move |addr| {
            let address = addr.clone();
            async move {
                let slice = reader.slice(&address).await?;
                Ok(LeaderboardEntry {
                    address,
                    size: slice.size,
                    eats: slice.eats,
                })
            }
        })
        .await?;
        entries.sort_by(|a, b| b.size.cmp(&a.size));
        Ok(entries)
    }

    /// One poll cycle against the shared client
    ///
    /// Nothing is borrowed across a read; results are applied once complete.
    /// Failures are logged and retried next cycle.
    pub async fn run_cycle<R: ChainReader>(&self, reader: &R, client: &RefCell<GameClient>) {
        let Some(player) = client.borrow().poll_address() else {
            return;
        };

        match self.fetch_core(reader, &player).await {
            Ok(snapshot) => client.borrow_mut().apply_core_snapshot(snapshot),
            Err(e) => log::error!("Error polling state: {e:#}"),
        }

        if self.leaderboard_due() {
            match self.fetch_leaderboard(reader).await {
                Ok(entries) => client.borrow_mut().apply_leaderboard(entries),
                Err(e) => log::error!("Error polling leaderboard: {e:#}"),
            }
        }
    }
}

/// Run `fetch` over `items`, each batch concurrently, pausing between batches
async fn in_batches<T, O, F, Fut>(items: &[T], batching: Batching, fetch: F) -> Result<Vec<O>>
where
    F: Fn(&T) -> Fut,
    Fut: Future<Output = Result<O>>,
{
    let mut out = Vec::with_capacity(items.len());
    let mut batches = items.chunks(batching.size.max(1)).peekable();
    while let Some(batch) = batches.next() {
        out.extend(try_join_all(batch.iter().map(&fetch)).await?);
        if batches.peek().is_some() {
            sleep_ms(batching.delay_ms).await;
        }
    }
    Ok(out)
}
