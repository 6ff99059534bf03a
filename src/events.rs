//! `SliceMoved` watcher
//!
//! Polls logs from the block after the last one seen up to the current head.
//! The first poll only looks at the head block.

use std::cell::{Cell, RefCell};

use anyhow::Result;

use crate::chain::ChainReader;
use crate::client::GameClient;
use crate::sim::SliceMoved;

#[derive(Debug)]
pub struct MoveEventWatcher {
    next_block: Cell<Option<u64>>,
    active: Cell<bool>,
}

impl Default for MoveEventWatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl MoveEventWatcher {
    pub fn new() -> Self {
        Self {
            next_block: Cell::new(None),
            active: Cell::new(true),
        }
    }

    /// Fetch events since the last poll
    pub async fn poll<R: ChainReader>(&self, reader: &R) -> Result<Vec<SliceMoved>> {
        if !self.active.get() {
            return Ok(Vec::new());
        }
        let head = reader.block_number().await?;
        let from = self.next_block.get().unwrap_or(head);
        if from > head {
            return Ok(Vec::new());
        }
        let events = reader.move_events(from, head).await?;
        // Unsubscribed while the request was out
        if !self.active.get() {
            return Ok(Vec::new());
        }
        self.next_block.set(Some(head + 1));
        Ok(events)
    }

    /// Poll and merge the batch into the client; failures are logged
    pub async fn pump<R: ChainReader>(&self, reader: &R, client: &RefCell<GameClient>) {
        match self.poll(reader).await {
            Ok(events) if !events.is_empty() => {
                log::debug!("{} SliceMoved event(s)", events.len());
                client.borrow_mut().apply_move_events(&events);
            }
            Ok(_) => {}
            Err(e) => log::error!("Error watching events: {e:#}"),
        }
    }

    pub fn unsubscribe(&self) {
        if self.active.replace(false) {
            log::info!("Stopped watching SliceMoved events");
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.get()
    }
}
