//! JSON-RPC transport and contract reader

use std::cell::Cell;

use anyhow::{Context, Result, anyhow, bail};
use serde_json::{Value, json};

use super::abi;
use super::{ChainReader, JsonRpcProvider};
use crate::Address;
use crate::platform::http::HttpTransport;
use crate::sim::{Slice, SliceMoved, Topping};

/// JSON-RPC over HTTP POST
pub struct HttpRpc<T> {
    transport: T,
    url: String,
    next_id: Cell<u64>,
}

impl<T: HttpTransport> HttpRpc<T> {
    pub fn new(transport: T, url: impl Into<String>) -> Self {
        Self {
            transport,
            url: url.into(),
            next_id: Cell::new(1),
        }
    }
}

/// Extract `result` from a JSON-RPC response, turning `error` into an Err
pub fn unwrap_response(response: Value) -> Result<Value> {
    if let Some(err) = response.get("error").filter(|e| !e.is_null()) {
        let message = err
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| err.to_string());
        bail!("rpc error: {message}");
    }
    response
        .get("result")
        .cloned()
        .ok_or_else(|| anyhow!("rpc response without result"))
}

impl<T: HttpTransport> JsonRpcProvider for HttpRpc<T> {
    async fn request(&self, method: &str, params: Value) -> Result<Value> {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });
        let response = self
            .transport
            .post_json(&self.url, &body)
            .await
            .with_context(|| format!("{method} via {}", self.url))?;
        unwrap_response(response)
    }
}

fn as_hex_str(value: &Value) -> Result<&str> {
    value.as_str().ok_or_else(|| anyhow!("expected hex string, got {value}"))
}

/// Contract reads through any JSON-RPC provider
pub struct RpcChainReader<P> {
    provider: P,
    contract: Address,
}

impl<P: JsonRpcProvider> RpcChainReader<P> {
    pub fn new(provider: P, contract: Address) -> Self {
        Self { provider, contract }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    async fn eth_call(&self, data: String) -> Result<String> {
        let result = self
            .provider
            .request(
                "eth_call",
                json!([{ "to": self.contract.as_str(), "data": data }, "latest"]),
            )
            .await?;
        Ok(as_hex_str(&result)?.to_string())
    }
}

impl<P: JsonRpcProvider> ChainReader for RpcChainReader<P> {
    async fn slice(&self, player: &Address) -> Result<Slice> {
        let data = self.eth_call(abi::encode_get_slice(player)?).await?;
        abi::decode_slice(player, &data).with_context(|| format!("getSlice({player})"))
    }

    async fn topping(&self, id: u64) -> Result<Topping> {
        let data = self.eth_call(abi::encode_get_topping(id)).await?;
        abi::decode_topping(&data).with_context(|| format!("getTopping({id})"))
    }

    async fn leaderboard(&self) -> Result<Vec<Address>> {
        let data = self.eth_call(abi::encode_get_leaderboard()).await?;
        abi::decode_leaderboard(&data).context("getLeaderboard()")
    }

    async fn block_number(&self) -> Result<u64> {
        let result = self.provider.request("eth_blockNumber", json!([])).await?;
        abi::parse_quantity(as_hex_str(&result)?)
    }

    async fn move_events(&self, from_block: u64, to_block: u64) -> Result<Vec<SliceMoved>> {
        let filter = json!([{
            "address": self.contract.as_str(),
            "topics": [abi::SLICE_MOVED_TOPIC],
            "fromBlock": abi::quantity(from_block),
            "toBlock": abi::quantity(to_block),
        }]);
        let result = self.provider.request("eth_getLogs", filter).await?;
        let logs = result.as_array().ok_or_else(|| anyhow!("eth_getLogs: expected array"))?;

        let mut events = Vec::with_capacity(logs.len());
        for entry in logs {
            let topics: Vec<String> = entry
                .get("topics")
                .and_then(Value::as_array)
                .map(|t| t.iter().filter_map(Value::as_str).map(str::to_string).collect())
                .unwrap_or_default();
            let data = entry.get("data").and_then(Value::as_str).unwrap_or("0x");
            match abi::decode_slice_moved(&topics, data) {
                Ok(ev) => events.push(ev),
                Err(e) => log::warn!("Skipping undecodable SliceMoved log: {e:#}"),
            }
        }
        Ok(events)
    }
}
