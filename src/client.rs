//! Client session state
//!
//! Ties the game state, the round timer and the transaction queue together.
//! Input handlers call [`GameClient::send_move`] / [`GameClient::request_spawn`]
//! synchronously (the optimistic update happens right there) and get back
//! the intent to submit, if one should go out now. Submission results come
//! back through [`GameClient::on_dispatch_result`], and direct-chain
//! receipts through [`GameClient::on_confirmed`].

use std::cell::RefCell;

use crate::chain::JsonRpcProvider;
use crate::consts::DEMO_ADDRESS;
use crate::dispatch::{DispatchFailure, DispatchResult, Dispatcher, Submission, TxIntent, TxQueue};
use crate::leaderboard::LeaderboardEntry;
use crate::platform::http::HttpTransport;
use crate::round::RoundTimer;
use crate::settings::{DispatchMode, Settings};
use crate::sim::{CoreSnapshot, Direction, GameState, SliceMoved, SpawnStatus};
use crate::{Address, format_size};

/// How a finished submission gets reconciled
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Settle {
    /// Poll now
    Poll,
    /// Wait for the receipt, report it through
    /// [`GameClient::on_confirmed`], then poll
    AwaitReceipt { intent: TxIntent, hash: String },
}

/// What to do after a submission finished
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FollowUp {
    pub settle: Option<Settle>,
    /// Next queued intent to submit
    pub next: Option<TxIntent>,
}

pub struct GameClient {
    pub state: GameState,
    pub round: RoundTimer,
    mode: DispatchMode,
    wallet_address: Option<Address>,
    queue: TxQueue,
    respawn_pending: bool,
    closed: bool,
}

impl GameClient {
    pub fn new(settings: &Settings) -> Self {
        let mode = settings.dispatch_mode();
        let state = match mode {
            DispatchMode::LocalOnly => GameState::local_demo(),
            _ => GameState::new(),
        };
        Self {
            state,
            round: RoundTimer::new(settings.round_duration_secs),
            mode,
            wallet_address: None,
            queue: TxQueue::new(),
            respawn_pending: false,
            closed: false,
        }
    }

    pub fn mode(&self) -> DispatchMode {
        self.mode
    }

    pub fn set_wallet_address(&mut self, address: Address) {
        log::info!("Wallet connected: {}", address.short());
        self.wallet_address = Some(address);
    }

    pub fn set_relayer_address(&mut self, address: Address) {
        let known = self
            .state
            .relayer_address
            .as_ref()
            .is_some_and(|a| a.same_as(&address));
        if !known {
            log::info!("Relayer address: {address}");
            self.state.relayer_address = Some(address);
        }
    }

    /// Address the local player acts as on chain
    pub fn acting_address(&self) -> Option<Address> {
        match self.mode {
            DispatchMode::LocalOnly => Some(Address::new(DEMO_ADDRESS)),
            DispatchMode::Relayed => self.state.relayer_address.clone(),
            DispatchMode::DirectChain => self.wallet_address.clone(),
        }
    }

    /// Address to reconcile against; none in local-only mode
    pub fn poll_address(&self) -> Option<Address> {
        match self.mode {
            DispatchMode::LocalOnly => None,
            _ => self.acting_address(),
        }
    }

    pub fn respawn_pending(&self) -> bool {
        self.respawn_pending
    }

    /// Stop for good: queued intents are dropped and no further input,
    /// submission or poll is produced
    pub fn shut_down(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        let dropped = self.queue.discard_moves();
        log::info!("Client shut down, {dropped} queued move(s) dropped");
    }

    /// Handle a move input. Returns the intent to submit now, if any.
    pub fn send_move(&mut self, dir: Direction) -> Option<TxIntent> {
        if self.closed || self.round.is_over() || dir.is_still() {
            return None;
        }
        if self.mode == DispatchMode::DirectChain {
            if self.respawn_pending {
                log::debug!("Move ignored while respawn is pending");
                return None;
            }
            if self.wallet_address.is_none() {
                return None;
            }
        }
        self.state.last_move_dir = dir;

        match self.acting_address() {
            Some(actor) => {
                if !self.state.apply_local_move(dir, &actor) {
                    return None;
                }
                self.sync_round();
            }
            // Relayer not known yet: submit without a prediction
            None => log::debug!("Dispatching {dir:?} without prediction"),
        }

        if self.mode == DispatchMode::LocalOnly {
            return None;
        }
        self.state.error = None;
        self.state.tx_count += 1;
        self.queue.enqueue(TxIntent::Move {
            dx: dir.dx,
            dy: dir.dy,
        })
    }

    /// The spawn button: `respawn()` once the cooldown has passed, otherwise
    /// a step to the right (which spawns a fresh slice)
    pub fn request_spawn(&mut self) -> Option<TxIntent> {
        if self.closed {
            return None;
        }
        if !self.state.respawn_ready() {
            return self.send_move(Direction::default());
        }
        if self.respawn_pending || self.mode == DispatchMode::LocalOnly {
            return None;
        }
        self.respawn_pending = true;
        self.state.error = None;
        self.state.tx_count += 1;
        log::info!("Requesting respawn");
        self.queue.enqueue(TxIntent::Respawn)
    }

    /// Record a finished submission. In direct-chain mode the queue moves on
    /// as soon as the hash is back; the receipt is waited for separately.
    pub fn on_dispatch_result(&mut self, intent: TxIntent, result: &DispatchResult) -> FollowUp {
        if self.closed {
            return FollowUp {
                settle: None,
                next: None,
            };
        }
        let receipt = match (self.mode, result) {
            (
                DispatchMode::DirectChain,
                Ok(Submission {
                    hash: Some(hash), ..
                }),
            ) => Some(hash.clone()),
            _ => None,
        };
        // A sent respawn stays pending until its receipt lands
        if intent == TxIntent::Respawn && receipt.is_none() {
            self.respawn_pending = false;
        }
        match result {
            Ok(submission) => {
                if let Some(relayer) = &submission.relayer_address {
                    self.set_relayer_address(relayer.clone());
                }
                if let Some(err) = &submission.error {
                    self.state.error = Some(err.clone());
                }
            }
            Err(failure) => {
                if let Some(msg) = failure.user_message() {
                    self.state.error = Some(msg.to_string());
                }
            }
        }
        let settle = match receipt {
            Some(hash) => Some(Settle::AwaitReceipt { intent, hash }),
            None => (self.mode != DispatchMode::LocalOnly).then_some(Settle::Poll),
        };
        FollowUp {
            settle,
            next: self.queue.complete(),
        }
    }

    /// Record the receipt outcome of a direct-chain submission
    pub fn on_confirmed(&mut self, intent: TxIntent, result: &Result<(), DispatchFailure>) {
        if self.closed {
            return;
        }
        if intent == TxIntent::Respawn {
            self.respawn_pending = false;
        }
        if let Some(msg) = result.as_ref().err().and_then(DispatchFailure::user_message) {
            self.state.error = Some(msg.to_string());
        }
    }

    /// One-second round tick; true if a final reconciliation poll is due.
    /// Moves still queued when the round ends are dropped.
    pub fn tick_second(&mut self) -> bool {
        if !self.round.tick() {
            return false;
        }
        let dropped = self.queue.discard_moves();
        if dropped > 0 {
            log::info!("Round over, {dropped} queued move(s) dropped");
            self.state.tx_count = self.state.tx_count.saturating_sub(dropped as u64);
        }
        self.mode != DispatchMode::LocalOnly
    }

    pub fn restart_round(&mut self) {
        self.round.restart();
    }

    pub fn apply_core_snapshot(&mut self, snapshot: CoreSnapshot) {
        self.state.apply_core_snapshot(snapshot);
        self.sync_round();
    }

    pub fn apply_leaderboard(&mut self, entries: Vec<LeaderboardEntry>) {
        self.state.apply_leaderboard(entries);
    }

    pub fn apply_move_events(&mut self, events: &[SliceMoved]) {
        self.state.apply_move_events(events);
    }

    pub fn spawn_status(&self) -> SpawnStatus {
        self.state.spawn_status()
    }

    /// One-line status for the HUD
    pub fn status_line(&self) -> String {
        let actor = self.acting_address();
        let who = actor.as_ref().map_or_else(|| "-".to_string(), Address::short);
        let mut line = format!(
            "{} | {} | size {} | {}s | tx {} | last block {} | block {}",
            self.mode.as_str(),
            who,
            format_size(self.state.player_size()),
            self.round.remaining,
            self.state.tx_count,
            self.state.last_block_tx_count,
            self.state.block_number,
        );
        if let Some(rank) = actor.and_then(|a| self.state.leaderboard.rank_of(&a)) {
            line.push_str(&format!(" | rank #{rank}"));
        }
        let spawn = self.spawn_status();
        if !spawn.can_spawn {
            line.push_str(&format!(" | respawn in {} blocks", spawn.blocks_left));
        }
        if let Some(err) = &self.state.error {
            line.push_str(&format!(" | {err}"));
        }
        line
    }

    fn sync_round(&mut self) {
        self.round.observe_size(self.state.player_size());
    }
}

/// Submit `first` and then everything queued behind it, one at a time.
/// `settle` gets each completed submission's reconciliation step.
pub async fn drive_submissions<H, W>(
    client: &RefCell<GameClient>,
    dispatcher: &Dispatcher<H, W>,
    first: TxIntent,
    mut settle: impl FnMut(Settle),
) where
    H: HttpTransport,
    W: JsonRpcProvider,
{
    let mut next = Some(first);
    while let Some(intent) = next {
        let result = dispatcher.submit(intent).await;
        let follow_up = client.borrow_mut().on_dispatch_result(intent, &result);
        if let Some(step) = follow_up.settle {
            settle(step);
        }
        next = follow_up.next;
    }
}

/// Wait for a direct-chain receipt and record the outcome
pub async fn confirm_submission<H, W>(
    client: &RefCell<GameClient>,
    dispatcher: &Dispatcher<H, W>,
    intent: TxIntent,
    hash: &str,
) where
    H: HttpTransport,
    W: JsonRpcProvider,
{
    let result = dispatcher.confirm(hash).await;
    client.borrow_mut().on_confirmed(intent, &result);
}

#[cfg(test)]
mod tests {
    use glam::IVec2;
    use serde_json::json;

    use super::*;
    use crate::chain::rpc::testing::ScriptedRpc;
    use crate::dispatch::RelayerClient;
    use crate::platform::http::testing::ScriptedHttp;
    use crate::round::RoundPhase;
    use crate::sim::Slice;

    const WALLET: &str = "0x00000000000000000000000000000000000000aa";
    const RELAYER: &str = "0x00000000000000000000000000000000000000bb";

    fn direct_client() -> GameClient {
        let mut client = GameClient::new(&Settings::default());
        client.set_wallet_address(Address::new(WALLET));
        client
    }

    fn relayed_settings() -> Settings {
        Settings {
            backend_url: Some("https://relay.example".to_string()),
            ..Settings::default()
        }
    }

    fn slice(pos: IVec2, size: u32, respawn_block: u64) -> Slice {
        Slice {
            address: Address::new(WALLET),
            size,
            pos,
            respawn_block,
            eats: 0,
            topping_eats: 0,
        }
    }

    #[test]
    fn test_local_move_never_dispatches() {
        let mut client = GameClient::new(&Settings::local_demo());
        assert_eq!(client.mode(), DispatchMode::LocalOnly);
        assert_eq!(client.state.toppings.len(), crate::consts::TOPPING_COUNT);

        assert_eq!(client.send_move(Direction::new(1, 0)), None);
        assert_eq!(client.state.tx_count, 0);
        assert!(client.state.player_size() >= 1000);
        assert!(client.round.is_running());
        assert!(client.state.players.contains_key(&DEMO_ADDRESS.to_lowercase()));
        assert_eq!(client.poll_address(), None);
    }

    #[test]
    fn test_direct_move_predicts_and_queues() {
        let mut client = direct_client();
        let first = client.send_move(Direction::new(0, -1));
        assert_eq!(first, Some(TxIntent::Move { dx: 0, dy: -1 }));
        assert_eq!(client.state.tx_count, 1);
        assert_eq!(client.state.last_move_dir, Direction::new(0, -1));
        assert!(client.state.player.is_some());

        // Second move waits behind the first
        assert_eq!(client.send_move(Direction::new(1, 0)), None);
        assert_eq!(client.state.tx_count, 2);

        let follow_up = client.on_dispatch_result(first.unwrap(), &Ok(Submission::default()));
        assert_eq!(follow_up.settle, Some(Settle::Poll));
        assert_eq!(follow_up.next, Some(TxIntent::Move { dx: 1, dy: 0 }));
    }

    #[test]
    fn test_rejected_move_not_dispatched() {
        let mut client = direct_client();
        client.state.player = Some(slice(IVec2::new(31, 0), 1000, 0));
        assert_eq!(client.send_move(Direction::new(1, 0)), None);
        assert_eq!(client.state.tx_count, 0);
        assert_eq!(client.state.player.as_ref().unwrap().pos, IVec2::new(31, 0));
    }

    #[test]
    fn test_direct_without_wallet_ignored() {
        let mut client = GameClient::new(&Settings::default());
        assert_eq!(client.send_move(Direction::new(1, 0)), None);
        assert!(client.state.player.is_none());
    }

    #[test]
    fn test_relayed_before_address_dispatches_without_prediction() {
        let mut client = GameClient::new(&relayed_settings());
        assert_eq!(client.mode(), DispatchMode::Relayed);
        let intent = client.send_move(Direction::new(-1, 0));
        assert_eq!(intent, Some(TxIntent::Move { dx: -1, dy: 0 }));
        assert!(client.state.player.is_none());
        assert_eq!(client.state.tx_count, 1);

        let result = Ok(Submission {
            hash: Some("0x1".to_string()),
            relayer_address: Some(Address::new(RELAYER)),
            error: None,
        });
        client.on_dispatch_result(intent.unwrap(), &result);
        assert_eq!(client.acting_address(), Some(Address::new(RELAYER)));
        assert_eq!(client.poll_address(), Some(Address::new(RELAYER)));
    }

    #[test]
    fn test_round_over_routes_moves_nowhere() {
        let mut client = direct_client();
        client.send_move(Direction::new(1, 0));
        client.on_dispatch_result(TxIntent::Move { dx: 1, dy: 0 }, &Ok(Submission::default()));
        assert!(client.round.is_running());

        let mut final_poll = false;
        for _ in 0..30 {
            final_poll |= client.tick_second();
        }
        assert!(final_poll);
        assert_eq!(client.round.phase, RoundPhase::Over);

        let before = client.state.player.clone();
        assert_eq!(client.send_move(Direction::new(0, 1)), None);
        assert_eq!(client.state.player, before);
        assert_eq!(client.state.last_move_dir, Direction::new(1, 0));

        client.restart_round();
        assert!(client.round.is_running());
        assert!(client.send_move(Direction::new(0, 1)).is_some());
    }

    #[test]
    fn test_spawn_button() {
        let mut client = direct_client();
        // Nothing to respawn: steps right
        assert_eq!(client.request_spawn(), Some(TxIntent::Move { dx: 1, dy: 0 }));
        client.on_dispatch_result(TxIntent::Move { dx: 1, dy: 0 }, &Ok(Submission::default()));

        // Eaten, cooldown not over
        client.state.player = Some(slice(IVec2::ZERO, 0, 50));
        client.state.block_number = 40;
        let status = client.spawn_status();
        assert!(!status.can_spawn);
        assert_eq!(status.blocks_left, 10);

        // Cooldown over
        client.state.block_number = 50;
        assert_eq!(client.request_spawn(), Some(TxIntent::Respawn));
        assert!(client.respawn_pending());
        // Only one respawn at a time, and moves wait for it
        assert_eq!(client.request_spawn(), None);
        assert_eq!(client.send_move(Direction::new(0, 1)), None);

        let failure: DispatchResult = Err(DispatchFailure::Failed("cooldown".to_string()));
        let follow_up = client.on_dispatch_result(TxIntent::Respawn, &failure);
        assert_eq!(follow_up.settle, Some(Settle::Poll));
        assert!(!client.respawn_pending());
        assert_eq!(client.state.error.as_deref(), Some("cooldown"));
    }

    #[test]
    fn test_user_cancel_is_silent() {
        let mut client = direct_client();
        let intent = client.send_move(Direction::new(1, 1)).unwrap();
        let follow_up = client.on_dispatch_result(intent, &Err(DispatchFailure::UserCancelled));
        assert_eq!(client.state.error, None);
        assert_eq!(follow_up.settle, Some(Settle::Poll));
        assert_eq!(follow_up.next, None);
    }

    #[test]
    fn test_failure_keeps_prediction_until_poll() {
        let mut client = direct_client();
        let intent = client.send_move(Direction::new(1, 0)).unwrap();
        let predicted = client.state.player.clone();
        client.on_dispatch_result(intent, &Err(DispatchFailure::Failed("nonce too low".to_string())));
        assert_eq!(client.state.player, predicted);
        assert_eq!(client.state.error.as_deref(), Some("nonce too low"));

        // Next move clears the message
        client.send_move(Direction::new(1, 0));
        assert_eq!(client.state.error, None);
    }

    #[test]
    fn test_snapshot_starts_round() {
        let mut client = direct_client();
        assert_eq!(client.round.phase, RoundPhase::NotStarted);
        client.apply_core_snapshot(CoreSnapshot {
            slice: slice(IVec2::new(3, 3), 4200, 0),
            toppings: Vec::new(),
            block_number: 9,
        });
        assert!(client.round.is_running());
        assert!(client.status_line().contains("size 4.2k"));
    }

    #[test]
    fn test_drive_submissions_drains_queue() {
        let http = ScriptedHttp::default();
        http.on_post("https://relay.example/api/move", json!({ "hash": "0x1", "relayerAddress": RELAYER }));
        let dispatcher: Dispatcher<ScriptedHttp, ScriptedRpc> =
            Dispatcher::Relayed(RelayerClient::new(http, "https://relay.example"));

        let client = RefCell::new(GameClient::new(&relayed_settings()));
        let first = client.borrow_mut().send_move(Direction::new(1, 0)).unwrap();
        assert_eq!(client.borrow_mut().send_move(Direction::new(0, 1)), None);

        let mut settled = Vec::new();
        pollster::block_on(drive_submissions(&client, &dispatcher, first, |s| settled.push(s)));

        assert_eq!(settled, vec![Settle::Poll, Settle::Poll]);
        assert_eq!(client.borrow().acting_address(), Some(Address::new(RELAYER)));
        assert_eq!(client.borrow().state.tx_count, 2);
    }

    fn direct_dispatcher(wallet: ScriptedRpc) -> Dispatcher<ScriptedHttp, ScriptedRpc> {
        Dispatcher::DirectChain {
            wallet,
            from: Address::new(WALLET),
            contract: Address::new(crate::consts::ZERO_ADDRESS),
        }
    }

    fn sent(hash: &str) -> DispatchResult {
        Ok(Submission {
            hash: Some(hash.to_string()),
            ..Submission::default()
        })
    }

    #[test]
    fn test_direct_hash_releases_queue_before_receipt() {
        let mut client = direct_client();
        let first = client.send_move(Direction::new(0, -1)).unwrap();
        assert_eq!(client.send_move(Direction::new(1, 0)), None);

        let follow_up = client.on_dispatch_result(first, &sent("0xa"));
        assert_eq!(
            follow_up.settle,
            Some(Settle::AwaitReceipt {
                intent: first,
                hash: "0xa".to_string()
            })
        );
        assert_eq!(follow_up.next, Some(TxIntent::Move { dx: 1, dy: 0 }));
    }

    #[test]
    fn test_respawn_pending_until_receipt() {
        let mut client = direct_client();
        client.state.player = Some(slice(IVec2::ZERO, 0, 50));
        client.state.block_number = 50;
        assert_eq!(client.request_spawn(), Some(TxIntent::Respawn));

        client.on_dispatch_result(TxIntent::Respawn, &sent("0xr"));
        assert!(client.respawn_pending());
        assert_eq!(client.send_move(Direction::new(1, 0)), None);

        let reverted = Err(DispatchFailure::Failed("transaction 0xr reverted".to_string()));
        client.on_confirmed(TxIntent::Respawn, &reverted);
        assert!(!client.respawn_pending());
        assert_eq!(client.state.error.as_deref(), Some("transaction 0xr reverted"));
    }

    #[test]
    fn test_round_end_drops_queued_moves() {
        let mut client = direct_client();
        let first = client.send_move(Direction::new(0, -1)).unwrap();
        assert_eq!(client.send_move(Direction::new(1, 0)), None);
        assert_eq!(client.send_move(Direction::new(1, 0)), None);
        assert_eq!(client.state.tx_count, 3);

        let mut final_poll = false;
        for _ in 0..30 {
            final_poll |= client.tick_second();
        }
        assert!(final_poll);
        assert!(client.round.is_over());
        assert_eq!(client.state.tx_count, 1);

        // The in-flight move finishes; nothing replays after it
        let follow_up = client.on_dispatch_result(first, &sent("0xa"));
        assert_eq!(follow_up.next, None);
    }

    #[test]
    fn test_shut_down_stops_dispatch() {
        let mut client = direct_client();
        let first = client.send_move(Direction::new(0, -1)).unwrap();
        assert_eq!(client.send_move(Direction::new(1, 0)), None);

        client.shut_down();
        let follow_up = client.on_dispatch_result(first, &sent("0xa"));
        assert_eq!(follow_up.settle, None);
        assert_eq!(follow_up.next, None);

        let before = client.state.player.clone();
        assert_eq!(client.send_move(Direction::new(0, -1)), None);
        assert_eq!(client.request_spawn(), None);
        assert_eq!(client.state.player, before);
    }

    #[test]
    fn test_drive_direct_submissions_without_waiting() {
        let wallet = ScriptedRpc::default();
        wallet.on("eth_sendTransaction", json!("0xfeed"));
        wallet.on("eth_getTransactionReceipt", json!({ "status": "0x1" }));
        let dispatcher = direct_dispatcher(wallet);

        let client = RefCell::new(direct_client());
        let first = client.borrow_mut().send_move(Direction::new(0, -1)).unwrap();
        assert_eq!(client.borrow_mut().send_move(Direction::new(1, 0)), None);

        let mut settled = Vec::new();
        pollster::block_on(drive_submissions(&client, &dispatcher, first, |s| settled.push(s)));

        let Dispatcher::DirectChain { wallet, .. } = &dispatcher else {
            unreachable!()
        };
        // Both sent back to back, no receipt lookups in between
        assert_eq!(wallet.methods(), vec!["eth_sendTransaction", "eth_sendTransaction"]);
        assert_eq!(settled.len(), 2);
        let Settle::AwaitReceipt { intent, hash } = &settled[1] else {
            panic!("expected a receipt wait, got {:?}", settled[1]);
        };
        assert_eq!(*intent, TxIntent::Move { dx: 1, dy: 0 });

        pollster::block_on(confirm_submission(&client, &dispatcher, *intent, hash));
        assert_eq!(wallet.methods().last().map(String::as_str), Some("eth_getTransactionReceipt"));
        assert_eq!(client.borrow().state.error, None);
    }
}
