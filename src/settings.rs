//! Client configuration
//!
//! Persisted in LocalStorage on the web; read from `SLICE_BATTLE_*`
//! environment variables on native.

use serde::{Deserialize, Serialize};

use crate::Address;
use crate::consts::{ROUND_DURATION_SECS, ZERO_ADDRESS};

/// Deployed SliceBattle contract
pub const DEFAULT_CONTRACT_ADDRESS: &str = "0x3879441B57eF716578efD5E36130BEFe95740417";
/// Public RPC used when no backend is configured
pub const DEFAULT_RPC_URL: &str = "https://testnet-rpc.monad.xyz";

/// How moves reach the chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DispatchMode {
    /// Signed by the player's wallet and sent straight to the chain
    DirectChain,
    /// Posted to the relayer backend, which signs and submits
    Relayed,
    /// Simulated only; nothing leaves the client
    LocalOnly,
}

impl DispatchMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DispatchMode::DirectChain => "direct",
            DispatchMode::Relayed => "relayed",
            DispatchMode::LocalOnly => "local",
        }
    }
}

/// Client settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Run purely on the simulator (no polling, no dispatch)
    pub local_only: bool,
    /// Relayer backend base URL; selects relayed dispatch when set
    pub backend_url: Option<String>,
    /// JSON-RPC endpoint for reads (ignored when a backend is set)
    pub rpc_url: String,
    pub contract_address: Address,

    // === Polling ===
    pub poll_interval_ms: u32,
    pub leaderboard_interval_ms: u32,
    pub event_poll_interval_ms: u32,
    /// Toppings fetched concurrently per batch
    pub topping_batch_size: usize,
    pub topping_batch_delay_ms: u32,
    /// Leaderboard slices fetched concurrently per batch
    pub leaderboard_batch_size: usize,
    pub leaderboard_batch_delay_ms: u32,

    // === Round ===
    pub round_duration_secs: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            local_only: false,
            backend_url: None,
            rpc_url: DEFAULT_RPC_URL.to_string(),
            contract_address: Address::new(DEFAULT_CONTRACT_ADDRESS),

            poll_interval_ms: 10_000,
            leaderboard_interval_ms: 60_000,
            event_poll_interval_ms: 4_000,
            topping_batch_size: 5,
            topping_batch_delay_ms: 300,
            leaderboard_batch_size: 3,
            leaderboard_batch_delay_ms: 200,

            round_duration_secs: ROUND_DURATION_SECS,
        }
    }
}

impl Settings {
    /// Settings for a local-only demo
    pub fn local_demo() -> Self {
        Self {
            local_only: true,
            ..Self::default()
        }
    }

    /// Dispatch backend selected by this configuration
    pub fn dispatch_mode(&self) -> DispatchMode {
        if self.local_only {
            DispatchMode::LocalOnly
        } else if self.backend_url().is_some() {
            DispatchMode::Relayed
        } else {
            DispatchMode::DirectChain
        }
    }

    /// Backend URL without a trailing slash (None if unset or blank)
    pub fn backend_url(&self) -> Option<&str> {
        self.backend_url
            .as_deref()
            .map(|u| u.trim_end_matches('/'))
            .filter(|u| !u.is_empty())
    }

    /// RPC endpoint for reads; the relayer's passthrough when a backend is set
    pub fn effective_rpc_url(&self) -> String {
        match self.backend_url() {
            Some(base) => format!("{base}/rpc"),
            None => self.rpc_url.clone(),
        }
    }

    /// Polls per leaderboard refresh
    pub fn leaderboard_every(&self) -> u32 {
        let poll = self.poll_interval_ms.max(1);
        self.leaderboard_interval_ms.div_ceil(poll).max(1)
    }

    /// Whether polling and event watching should run at all
    pub fn network_enabled(&self) -> bool {
        !self.local_only && !self.contract_address.as_str().eq_ignore_ascii_case(ZERO_ADDRESS)
    }

    /// LocalStorage key
    #[allow(dead_code)]
    const STORAGE_KEY: &'static str = "slice_battle_settings";

    /// Load settings from LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn load() -> Self {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        if let Some(storage) = storage {
            if let Ok(Some(json)) = storage.get_item(Self::STORAGE_KEY) {
                match serde_json::from_str(&json) {
                    Ok(settings) => {
                        log::info!("Loaded settings from LocalStorage");
                        return settings;
                    }
                    Err(e) => log::warn!("Ignoring stored settings: {}", e),
                }
            }
        }

        log::info!("Using default settings");
        Self::default()
    }

    /// Save settings to LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn save(&self) {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        if let Some(storage) = storage {
            if let Ok(json) = serde_json::to_string(self) {
                let _ = storage.set_item(Self::STORAGE_KEY, &json);
                log::info!("Settings saved");
            }
        }
    }

    /// Load settings from the environment (native)
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load() -> Self {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn save(&self) {
        // No-op for native
    }

    /// Overlay `SLICE_BATTLE_*` variables on the defaults
    pub fn from_vars(get: impl Fn(&str) -> Option<String>) -> Self {
        let mut settings = Self::default();
        if let Some(v) = get("SLICE_BATTLE_LOCAL_ONLY") {
            settings.local_only = matches!(v.to_lowercase().as_str(), "1" | "true" | "yes");
        }
        if let Some(v) = get("SLICE_BATTLE_BACKEND_URL") {
            settings.backend_url = Some(v);
        }
        if let Some(v) = get("SLICE_BATTLE_RPC_URL") {
            settings.rpc_url = v;
        }
        if let Some(v) = get("SLICE_BATTLE_CONTRACT") {
            settings.contract_address = Address::new(v);
        }
        if let Some(v) = get("SLICE_BATTLE_POLL_MS").and_then(|v| v.parse().ok()) {
            settings.poll_interval_ms = v;
        }
        if let Some(v) = get("SLICE_BATTLE_ROUND_SECS").and_then(|v| v.parse().ok()) {
            settings.round_duration_secs = v;
        }
        settings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_dispatch_mode_selection() {
        let mut settings = Settings::default();
        assert_eq!(settings.dispatch_mode(), DispatchMode::DirectChain);

        settings.backend_url = Some("http://localhost:3001/".into());
        assert_eq!(settings.dispatch_mode(), DispatchMode::Relayed);
        assert_eq!(settings.effective_rpc_url(), "http://localhost:3001/rpc");

        settings.local_only = true;
        assert_eq!(settings.dispatch_mode(), DispatchMode::LocalOnly);
        assert!(!settings.network_enabled());
    }

    #[test]
    fn test_blank_backend_is_direct() {
        let settings = Settings {
            backend_url: Some(String::new()),
            ..Settings::default()
        };
        assert_eq!(settings.dispatch_mode(), DispatchMode::DirectChain);
        assert_eq!(settings.effective_rpc_url(), DEFAULT_RPC_URL);
    }

    #[test]
    fn test_leaderboard_every() {
        let settings = Settings::default();
        assert_eq!(settings.leaderboard_every(), 6);

        let settings = Settings {
            poll_interval_ms: 7_000,
            ..Settings::default()
        };
        assert_eq!(settings.leaderboard_every(), 9);
    }

    #[test]
    fn test_zero_contract_disables_network() {
        let settings = Settings {
            contract_address: Address::new(ZERO_ADDRESS),
            ..Settings::default()
        };
        assert!(!settings.network_enabled());
        assert!(Settings::default().network_enabled());
    }

    #[test]
    fn test_from_vars() {
        let vars: HashMap<&str, &str> = [
            ("SLICE_BATTLE_LOCAL_ONLY", "true"),
            ("SLICE_BATTLE_POLL_MS", "5000"),
            ("SLICE_BATTLE_ROUND_SECS", "not a number"),
        ]
        .into_iter()
        .collect();
        let settings = Settings::from_vars(|k| vars.get(k).map(|v| v.to_string()));
        assert!(settings.local_only);
        assert_eq!(settings.poll_interval_ms, 5000);
        assert_eq!(settings.round_duration_secs, ROUND_DURATION_SECS);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let settings: Settings = serde_json::from_str(r#"{"backend_url":"https://relay.example"}"#).unwrap();
        assert_eq!(settings.dispatch_mode(), DispatchMode::Relayed);
        assert_eq!(settings.poll_interval_ms, 10_000);
    }
}
