//! Transaction dispatch
//!
//! A [`Dispatcher`] is chosen once at startup from [`Settings`]:
//! - `DirectChain`: the browser wallet signs and sends. Submission ends once
//!   the hash is back; [`Dispatcher::confirm`] waits for the receipt
//! - `Relayed`: the relayer backend signs and sends for us
//! - `LocalOnly`: nothing leaves the client
//!
//! Every backend submits the same [`TxIntent`]; the optimistic state update
//! happens before dispatch and is the same for all of them.
//!
//! [`Settings`]: crate::settings::Settings

pub mod queue;
pub mod relayer;

pub use queue::TxQueue;
pub use relayer::RelayerClient;

use anyhow::{Result, anyhow, bail};
use serde_json::{Value, json};

use crate::Address;
use crate::chain::{JsonRpcProvider, abi};
use crate::platform::http::HttpTransport;
use crate::platform::sleep_ms;
use crate::settings::DispatchMode;

/// Delay between receipt polls in direct-chain mode
pub const RECEIPT_POLL_MS: u32 = 1000;

/// Substring wallets use for a declined signature request
const USER_REJECTED: &str = "User rejected";

/// A contract write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxIntent {
    Move { dx: i8, dy: i8 },
    Respawn,
}

impl TxIntent {
    pub fn calldata(&self) -> String {
        match *self {
            TxIntent::Move { dx, dy } => abi::encode_move(dx, dy),
            TxIntent::Respawn => abi::encode_respawn(),
        }
    }
}

/// Result of an accepted submission
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Submission {
    pub hash: Option<String>,
    /// Relayer identity, when the backend reports it
    pub relayer_address: Option<Address>,
    /// Error the backend reported in an otherwise successful response
    pub error: Option<String>,
}

/// Why a submission failed, as far as the player is concerned
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchFailure {
    /// The player declined to sign; not shown
    UserCancelled,
    Failed(String),
}

impl DispatchFailure {
    pub fn classify(err: &anyhow::Error) -> Self {
        let message = format!("{err:#}");
        if message.contains(USER_REJECTED) {
            DispatchFailure::UserCancelled
        } else {
            DispatchFailure::Failed(err.to_string())
        }
    }

    /// Message for the player, if any
    pub fn user_message(&self) -> Option<&str> {
        match self {
            DispatchFailure::UserCancelled => None,
            DispatchFailure::Failed(msg) => Some(msg),
        }
    }
}

impl std::fmt::Display for DispatchFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DispatchFailure::UserCancelled => f.write_str("cancelled by user"),
            DispatchFailure::Failed(msg) => f.write_str(msg),
        }
    }
}

pub type DispatchResult = std::result::Result<Submission, DispatchFailure>;

pub enum Dispatcher<H, W> {
    DirectChain {
        wallet: W,
        from: Address,
        contract: Address,
    },
    Relayed(RelayerClient<H>),
    LocalOnly,
}

impl<H: HttpTransport, W: JsonRpcProvider> Dispatcher<H, W> {
    pub fn mode(&self) -> DispatchMode {
        match self {
            Dispatcher::DirectChain { .. } => DispatchMode::DirectChain,
            Dispatcher::Relayed(_) => DispatchMode::Relayed,
            Dispatcher::LocalOnly => DispatchMode::LocalOnly,
        }
    }

    pub async fn submit(&self, intent: TxIntent) -> DispatchResult {
        let result = match self {
            Dispatcher::DirectChain {
                wallet,
                from,
                contract,
            } => send_transaction(wallet, from, contract, intent).await,
            Dispatcher::Relayed(relayer) => relayer.submit(intent).await,
            Dispatcher::LocalOnly => Ok(Submission::default()),
        };
        result.map_err(|e| {
            let failure = DispatchFailure::classify(&e);
            match failure {
                DispatchFailure::UserCancelled => log::info!("{intent:?} cancelled by user"),
                DispatchFailure::Failed(_) => log::error!("{intent:?} failed: {e:#}"),
            }
            failure
        })
    }

    /// Wait for a submitted transaction to land. Only direct-chain
    /// submissions have anything to wait for.
    pub async fn confirm(&self, hash: &str) -> std::result::Result<(), DispatchFailure> {
        let Dispatcher::DirectChain { wallet, .. } = self else {
            return Ok(());
        };
        wait_for_receipt(wallet, hash).await.map_err(|e| {
            log::error!("{hash} failed: {e:#}");
            DispatchFailure::classify(&e)
        })
    }

    pub async fn submit_move(&self, dx: i8, dy: i8) -> DispatchResult {
        self.submit(TxIntent::Move { dx, dy }).await
    }

    pub async fn submit_respawn(&self) -> DispatchResult {
        self.submit(TxIntent::Respawn).await
    }
}

/// `eth_sendTransaction` through the wallet
async fn send_transaction<W: JsonRpcProvider>(
    wallet: &W,
    from: &Address,
    contract: &Address,
    intent: TxIntent,
) -> Result<Submission> {
    let tx = json!([{
        "from": from.as_str(),
        "to": contract.as_str(),
        "data": intent.calldata(),
        "value": "0x0",
    }]);
    let hash = wallet
        .request("eth_sendTransaction", tx)
        .await?
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| anyhow!("eth_sendTransaction returned no hash"))?;
    log::debug!("Sent {intent:?} as {hash}");
    Ok(Submission {
        hash: Some(hash),
        ..Submission::default()
    })
}

/// Poll for the receipt until it shows up. There is no timeout.
async fn wait_for_receipt<W: JsonRpcProvider>(wallet: &W, hash: &str) -> Result<()> {
    loop {
        let receipt = wallet
            .request("eth_getTransactionReceipt", json!([hash]))
            .await?;
        if !receipt.is_null() {
            if receipt.get("status").and_then(Value::as_str) == Some("0x0") {
                bail!("transaction {hash} reverted");
            }
            return Ok(());
        }
        sleep_ms(RECEIPT_POLL_MS).await;
    }
}
