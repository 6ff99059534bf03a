//! Platform abstraction layer
//!
//! Handles browser/native differences for:
//! - HTTP (fetch on web)
//! - Wallet access (injected EIP-1193 provider on web)
//! - Timers and sleeping

pub mod http;
pub mod timer;
#[cfg(target_arch = "wasm32")]
pub mod wallet;

pub use http::HttpTransport;
#[cfg(target_arch = "wasm32")]
pub use http::FetchTransport;
pub use timer::sleep_ms;
