//! Relayer backend client
//!
//! The relayer signs and submits on the player's behalf, so in relayed mode
//! the on-chain player is the relayer's own address.

use anyhow::{Result, anyhow};
use serde_json::{Value, json};

use super::{Submission, TxIntent};
use crate::Address;
use crate::platform::http::HttpTransport;

pub struct RelayerClient<H> {
    http: H,
    base_url: String,
}

impl<H: HttpTransport> RelayerClient<H> {
    pub fn new(http: H, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// `GET /api/relayer-address`
    pub async fn relayer_address(&self) -> Result<Address> {
        let url = format!("{}/api/relayer-address", self.base_url);
        let body = self.http.get_json(&url).await?;
        body.get("address")
            .and_then(Value::as_str)
            .filter(|a| !a.is_empty())
            .map(Address::new)
            .ok_or_else(|| anyhow!("relayer address missing from response"))
    }

    /// `POST /api/move {dx, dy}`
    pub async fn post_move(&self, dx: i8, dy: i8) -> Result<Submission> {
        self.post("/api/move", json!({ "dx": dx, "dy": dy })).await
    }

    /// `POST /api/respawn`
    pub async fn post_respawn(&self) -> Result<Submission> {
        self.post("/api/respawn", json!({})).await
    }

    pub async fn submit(&self, intent: TxIntent) -> Result<Submission> {
        match intent {
            TxIntent::Move { dx, dy } => self.post_move(dx, dy).await,
            TxIntent::Respawn => self.post_respawn().await,
        }
    }

    async fn post(&self, path: &str, body: Value) -> Result<Submission> {
        let url = format!("{}{}", self.base_url, path);
        let response = self.http.post_json(&url, &body).await?;
        Ok(parse_submission(&response))
    }
}

fn parse_submission(response: &Value) -> Submission {
    let text = |key: &str| {
        response
            .get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };
    Submission {
        hash: text("hash"),
        relayer_address: text("relayerAddress").map(Address::new),
        error: text("error"),
    }
}
