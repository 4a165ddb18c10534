/// Core domain types shared by the engine, store, and wire layers.
pub mod draw;
/// Reel animation bookkeeping for the staged stop.
pub mod reel;
mod sse;
/// The draw engine state machine.
pub mod spin;

use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;

use crate::{
    config::AppConfig,
    dao::state_store::{
        KEY_AUTO_STOP_MS, KEY_KEYBOARD_ENABLED, KEY_PRIZE_TIERS, KEY_ROSTER, KEY_STOP_MODE,
        KEY_WINNERS, StateStore,
    },
    state::{
        draw::{AUTO_STOP_DEFAULT_MS, SpinSettings, StopMode},
        spin::DrawEngine,
    },
};

pub use self::sse::SseHub;

/// Shared handle to the application state.
pub type SharedState = Arc<AppState>;

/// Capacity of the SSE broadcast channel.
const SSE_CAPACITY: usize = 32;

/// Background tasks attached to the in-flight spin. Both are aborted when
/// the spin is cancelled from outside.
#[derive(Default)]
pub struct SpinTasks {
    /// Timer that fires the automatic stop, when the stop mode is auto.
    pub auto_stop: Option<JoinHandle<()>>,
    /// Task driving the staged reel settle.
    pub reel: Option<JoinHandle<()>>,
}

impl SpinTasks {
    /// Abort whatever is still running and clear both slots.
    pub fn cancel(&mut self) {
        if let Some(handle) = self.auto_stop.take() {
            handle.abort();
        }
        if let Some(handle) = self.reel.take() {
            handle.abort();
        }
    }
}

/// Central application state: the persisted document, the in-memory draw
/// engine, and the SSE fan-out.
pub struct AppState {
    store: Arc<StateStore>,
    engine: RwLock<DrawEngine>,
    sse: SseHub,
    spin_tasks: Mutex<SpinTasks>,
}

impl AppState {
    /// Construct the state from the persisted document, wrapped in an
    /// [`Arc`] so it can be cloned cheaply.
    ///
    /// Tier configuration falls back to the config defaults when the store
    /// holds none yet.
    pub fn new(config: &AppConfig, store: Arc<StateStore>) -> SharedState {
        let roster = store.read(KEY_ROSTER, Vec::new());
        let tiers = store.read(KEY_PRIZE_TIERS, config.default_tiers().to_vec());
        let winners = store.read(KEY_WINNERS, Vec::new());
        let settings = SpinSettings {
            stop_mode: store.read(KEY_STOP_MODE, StopMode::Manual),
            auto_stop_ms: store.read(KEY_AUTO_STOP_MS, AUTO_STOP_DEFAULT_MS),
        };
        let keyboard_enabled = store.read(KEY_KEYBOARD_ENABLED, true);

        let engine = DrawEngine::new(roster, tiers, winners, settings, keyboard_enabled);
        Arc::new(Self {
            store,
            engine: RwLock::new(engine),
            sse: SseHub::new(SSE_CAPACITY),
            spin_tasks: Mutex::new(SpinTasks::default()),
        })
    }

    /// Handle to the persisted state document.
    pub fn store(&self) -> &Arc<StateStore> {
        &self.store
    }

    /// The draw engine behind its lock.
    pub fn engine(&self) -> &RwLock<DrawEngine> {
        &self.engine
    }

    /// Broadcast hub feeding every SSE stream.
    pub fn sse(&self) -> &SseHub {
        &self.sse
    }

    /// Background task slots for the in-flight spin.
    pub fn spin_tasks(&self) -> &Mutex<SpinTasks> {
        &self.spin_tasks
    }

    /// Abort the auto-stop timer and the reel task, if they are running.
    pub async fn cancel_spin_tasks(&self) {
        self.spin_tasks.lock().await.cancel();
    }
}
