//! Slice Battle entry point
//!
//! On the web this wires DOM input, timers and the network backends to a
//! shared [`GameClient`]. Natively there is no network transport, so the
//! binary plays a local-only round with a bot and logs the result.
//!
//! [`GameClient`]: slice_battle::GameClient

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
mod web {
    use std::cell::RefCell;
    use std::rc::Rc;

    use gloo_events::{EventListener, EventListenerOptions};
    use wasm_bindgen::JsCast;
    use wasm_bindgen_futures::spawn_local;
    use web_sys::{KeyboardEvent, MouseEvent};

    use slice_battle::chain::{HttpRpc, RpcChainReader};
    use slice_battle::client::{GameClient, Settle, confirm_submission, drive_submissions};
    use slice_battle::dispatch::{Dispatcher, RelayerClient, TxIntent};
    use slice_battle::events::MoveEventWatcher;
    use slice_battle::input::{DragTracker, key_direction};
    use slice_battle::platform::FetchTransport;
    use slice_battle::platform::timer::Interval;
    use slice_battle::platform::wallet::InjectedWallet;
    use slice_battle::poller::Poller;
    use slice_battle::settings::{DispatchMode, Settings};

    type Reader = RpcChainReader<HttpRpc<FetchTransport>>;
    type WebDispatcher = Dispatcher<FetchTransport, InjectedWallet>;

    /// State shared by every callback
    struct Shared {
        client: RefCell<GameClient>,
        reader: Reader,
        dispatcher: WebDispatcher,
        poller: Poller,
        watcher: MoveEventWatcher,
        network_enabled: bool,
    }

    /// A running game. Dropping it removes the input listeners, cancels
    /// every timer, stops the event watcher and shuts the client down so
    /// in-flight submissions start nothing new.
    struct Session {
        shared: Rc<Shared>,
        _listeners: Vec<EventListener>,
        _timers: Vec<Interval>,
    }

    impl Drop for Session {
        fn drop(&mut self) {
            self.shared.watcher.unsubscribe();
            if let Ok(mut client) = self.shared.client.try_borrow_mut() {
                client.shut_down();
            }
            log::info!("Session torn down");
        }
    }

    thread_local! {
        static SESSION: RefCell<Option<Session>> = const { RefCell::new(None) };
    }

    fn poll_now(shared: &Rc<Shared>) {
        if !shared.network_enabled {
            return;
        }
        let shared = shared.clone();
        spawn_local(async move {
            shared.poller.run_cycle(&shared.reader, &shared.client).await;
            update_hud(&shared);
        });
    }

    fn submit(shared: &Rc<Shared>, intent: TxIntent) {
        let shared = shared.clone();
        spawn_local(async move {
            let target = shared.clone();
            drive_submissions(&shared.client, &shared.dispatcher, intent, move |step| {
                settle(&target, step)
            })
            .await;
            update_hud(&shared);
        });
    }

    fn settle(shared: &Rc<Shared>, step: Settle) {
        match step {
            Settle::Poll => poll_now(shared),
            Settle::AwaitReceipt { intent, hash } => {
                let shared = shared.clone();
                spawn_local(async move {
                    confirm_submission(&shared.client, &shared.dispatcher, intent, &hash).await;
                    poll_now(&shared);
                    update_hud(&shared);
                });
            }
        }
    }

    fn update_hud(shared: &Shared) {
        let Some(document) = web_sys::window().and_then(|w| w.document()) else {
            return;
        };
        if let Some(hud) = document.get_element_by_id("hud") {
            hud.set_text_content(Some(&shared.client.borrow().status_line()));
        }
    }

    async fn build_dispatcher(settings: &Settings, client: &mut GameClient) -> WebDispatcher {
        match settings.dispatch_mode() {
            DispatchMode::LocalOnly => Dispatcher::LocalOnly,
            DispatchMode::Relayed => {
                let relayer = RelayerClient::new(FetchTransport, settings.backend_url().unwrap_or_default());
                match relayer.relayer_address().await {
                    Ok(address) => client.set_relayer_address(address),
                    Err(e) => log::warn!("Relayer address unavailable: {e:#}"),
                }
                Dispatcher::Relayed(relayer)
            }
            DispatchMode::DirectChain => {
                let Some(wallet) = InjectedWallet::detect() else {
                    log::warn!("No injected wallet found");
                    client.state.error = Some("No wallet found".to_string());
                    return Dispatcher::LocalOnly;
                };
                match wallet.connect().await {
                    Ok(from) => {
                        client.set_wallet_address(from.clone());
                        Dispatcher::DirectChain {
                            wallet,
                            from,
                            contract: settings.contract_address.clone(),
                        }
                    }
                    Err(e) => {
                        log::error!("Wallet connection failed: {e:#}");
                        client.state.error = Some(e.to_string());
                        Dispatcher::LocalOnly
                    }
                }
            }
        }
    }

    pub async fn run() {
        console_error_panic_hook::set_once();
        console_log::init_with_level(log::Level::Info).expect("Failed to init logger");

        let settings = Settings::load();
        settings.save();
        log::info!(
            "Slice Battle starting ({} mode)",
            settings.dispatch_mode().as_str()
        );

        let window = web_sys::window().expect("no window");
        let document = window.document().expect("no document");

        // Hide loading indicator
        if let Some(loading) = document.get_element_by_id("loading") {
            let _ = loading.set_attribute("class", "hidden");
        }

        let mut client = GameClient::new(&settings);
        let dispatcher = build_dispatcher(&settings, &mut client).await;
        let reader = RpcChainReader::new(
            HttpRpc::new(FetchTransport, settings.effective_rpc_url()),
            settings.contract_address.clone(),
        );

        let shared = Rc::new(Shared {
            client: RefCell::new(client),
            reader,
            dispatcher,
            poller: Poller::new(&settings),
            watcher: MoveEventWatcher::new(),
            network_enabled: settings.network_enabled(),
        });

        let listeners = setup_input_handlers(&window, &shared);
        let timers = start_timers(&shared, &settings);

        // Tear down on navigation away. Lives for the page, not the session.
        EventListener::new(&window, "pagehide", |_event| {
            SESSION.with(|s| s.borrow_mut().take());
        })
        .forget();

        poll_now(&shared);
        update_hud(&shared);
        SESSION.with(|s| {
            *s.borrow_mut() = Some(Session {
                shared,
                _listeners: listeners,
                _timers: timers,
            })
        });

        log::info!("Slice Battle running!");
    }

    fn start_timers(shared: &Rc<Shared>, settings: &Settings) -> Vec<Interval> {
        let mut timers = Vec::new();

        if shared.network_enabled {
            let s = shared.clone();
            timers.push(Interval::every(settings.poll_interval_ms, move || poll_now(&s)));

            let s = shared.clone();
            timers.push(Interval::every(settings.event_poll_interval_ms, move || {
                let s = s.clone();
                spawn_local(async move {
                    s.watcher.pump(&s.reader, &s.client).await;
                });
            }));
        }

        let s = shared.clone();
        timers.push(Interval::every(1000, move || {
            let round_ended = s.client.borrow_mut().tick_second();
            if round_ended {
                poll_now(&s);
            }
            update_hud(&s);
        }));

        timers
    }

    fn send_move(shared: &Rc<Shared>, dir: slice_battle::sim::Direction) {
        let intent = shared.client.borrow_mut().send_move(dir);
        if let Some(intent) = intent {
            submit(shared, intent);
        }
        update_hud(shared);
    }

    fn setup_input_handlers(window: &web_sys::Window, shared: &Rc<Shared>) -> Vec<EventListener> {
        let drag = Rc::new(RefCell::new(DragTracker::new()));
        let mut listeners = Vec::new();

        // Keyboard
        {
            let shared = shared.clone();
            let options = EventListenerOptions::enable_prevent_default();
            listeners.push(EventListener::new_with_options(window, "keydown", options, move |event| {
                let Some(event) = event.dyn_ref::<KeyboardEvent>() else {
                    return;
                };
                let key = event.key();
                if let Some(dir) = key_direction(&key) {
                    event.prevent_default();
                    send_move(&shared, dir);
                    return;
                }
                match key.as_str() {
                    " " | "Enter" => {
                        let intent = shared.client.borrow_mut().request_spawn();
                        if let Some(intent) = intent {
                            submit(&shared, intent);
                        }
                        update_hud(&shared);
                    }
                    "r" | "R" => {
                        shared.client.borrow_mut().restart_round();
                        update_hud(&shared);
                    }
                    _ => {}
                }
            }));
        }

        // Drag: one diagonal step per threshold crossed
        {
            let drag = drag.clone();
            listeners.push(EventListener::new(window, "mousedown", move |event| {
                if let Some(event) = event.dyn_ref::<MouseEvent>() {
                    drag.borrow_mut()
                        .start(event.client_x() as f32, event.client_y() as f32);
                }
            }));
        }
        {
            let drag = drag.clone();
            let shared = shared.clone();
            listeners.push(EventListener::new(window, "mousemove", move |event| {
                let Some(event) = event.dyn_ref::<MouseEvent>() else {
                    return;
                };
                let step = drag
                    .borrow_mut()
                    .update(event.client_x() as f32, event.client_y() as f32);
                if let Some(dir) = step {
                    send_move(&shared, dir);
                }
            }));
        }
        listeners.push(EventListener::new(window, "mouseup", move |_event| {
            drag.borrow_mut().end();
        }));

        listeners
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub async fn wasm_main() {
    web::run().await;
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}

/// Moves the demo bot makes per simulated second
#[cfg(not(target_arch = "wasm32"))]
const BOT_MOVES_PER_SECOND: usize = 4;

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    use rand::{Rng, SeedableRng};
    use rand_pcg::Pcg32;
    use slice_battle::settings::{DispatchMode, Settings};
    use slice_battle::{GameClient, format_size};

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let settings = Settings::load();
    if settings.dispatch_mode() != DispatchMode::LocalOnly {
        log::warn!(
            "No network transport on native; running the local demo instead of {} mode",
            settings.dispatch_mode().as_str()
        );
    }
    let settings = Settings {
        local_only: true,
        ..settings
    };

    let seed = std::env::var("SLICE_BATTLE_SEED")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or_else(rand::random::<u64>);
    log::info!("Slice Battle (native demo) starting, bot seed {seed}");

    let mut rng = Pcg32::seed_from_u64(seed);
    let mut client = GameClient::new(&settings);
    client.request_spawn();
    if !client.round.is_running() {
        log::error!("Demo slice failed to spawn");
        return;
    }

    while !client.round.is_over() {
        for _ in 0..BOT_MOVES_PER_SECOND {
            let steer = rng
                .random_bool(0.7)
                .then(|| bot::toward_nearest_topping(&client.state))
                .flatten();
            client.send_move(steer.unwrap_or_else(|| bot::random_step(&mut rng)));
        }
        client.tick_second();
        log::info!("{}", client.status_line());
    }

    let slice = client.state.player.as_ref();
    log::info!(
        "Round over: size {}, {} topping(s) eaten",
        format_size(client.state.player_size()),
        slice.map_or(0, |s| s.topping_eats)
    );
    for (rank, entry) in client.state.leaderboard.entries.iter().enumerate() {
        log::info!("#{} {} {}", rank + 1, entry.address.short(), format_size(entry.size));
    }
}

#[cfg(not(target_arch = "wasm32"))]
mod bot {
    use rand::Rng;
    use slice_battle::sim::{Direction, GameState, chebyshev};

    pub fn random_step(rng: &mut impl Rng) -> Direction {
        loop {
            let dir = Direction::new(rng.random_range(-1..=1), rng.random_range(-1..=1));
            if !dir.is_still() {
                return dir;
            }
        }
    }

    /// Step toward the closest uneaten topping
    pub fn toward_nearest_topping(state: &GameState) -> Option<Direction> {
        let pos = state.player.as_ref()?.pos;
        let target = state
            .toppings
            .iter()
            .filter(|t| t.is_available())
            .min_by_key(|t| chebyshev(pos, t.pos))?;
        let delta = target.pos - pos;
        let dir = Direction::from_deltas(delta.x, delta.y);
        (!dir.is_still()).then_some(dir)
    }
}
