//! Contract access
//!
//! The contract is the source of truth. Reads go through [`ChainReader`];
//! every read and write is ultimately a JSON-RPC request on a
//! [`JsonRpcProvider`] (an HTTP endpoint, or the browser wallet for
//! signing).

pub mod abi;
pub mod rpc;

pub use rpc::{HttpRpc, RpcChainReader};

use crate::Address;
use crate::sim::{Slice, SliceMoved, Topping};

/// Anything that answers JSON-RPC requests
#[allow(async_fn_in_trait)]
pub trait JsonRpcProvider {
    async fn request(&self, method: &str, params: serde_json::Value) -> anyhow::Result<serde_json::Value>;
}

/// Authoritative contract reads
#[allow(async_fn_in_trait)]
pub trait ChainReader {
    /// `getSlice(player)`
    async fn slice(&self, player: &Address) -> anyhow::Result<Slice>;
    /// `getTopping(id)`, ids are 1-based
    async fn topping(&self, id: u64) -> anyhow::Result<Topping>;
    /// `getLeaderboard()`; empty slots are the zero address
    async fn leaderboard(&self) -> anyhow::Result<Vec<Address>>;
    async fn block_number(&self) -> anyhow::Result<u64>;
    /// `SliceMoved` logs in the inclusive block range
    async fn move_events(&self, from_block: u64, to_block: u64) -> anyhow::Result<Vec<SliceMoved>>;
}
