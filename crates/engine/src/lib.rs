use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock},
    time::Duration,
};

use shared::domain::{CurrentSettings, SlotId};
use thiserror::Error;
use tokio::{
    runtime::Handle,
    task::JoinHandle,
    time::{interval_at, Instant, MissedTickBehavior},
};
use tracing::{debug, trace};

mod picker;
mod session;

pub use picker::{ValuePicker, IDLE_VALUE, PLACEHOLDER};
pub use session::Session;

/// Source of the settings snapshot read on every tick.
pub trait SettingsProvider: Send + Sync {
    fn current(&self) -> CurrentSettings;
}

impl<F> SettingsProvider for F
where
    F: Fn() -> CurrentSettings + Send + Sync,
{
    fn current(&self) -> CurrentSettings {
        self()
    }
}

/// Current Settings shared between the editing flow and the engine.
#[derive(Clone, Default)]
pub struct SharedSettings {
    inner: Arc<RwLock<CurrentSettings>>,
}

impl SharedSettings {
    pub fn new(settings: CurrentSettings) -> Self {
        Self {
            inner: Arc::new(RwLock::new(settings)),
        }
    }

    pub fn snapshot(&self) -> CurrentSettings {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn replace(&self, settings: CurrentSettings) {
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = settings;
    }

    pub fn update<R>(&self, edit: impl FnOnce(&mut CurrentSettings) -> R) -> R {
        edit(&mut self.inner.write().unwrap_or_else(PoisonError::into_inner))
    }
}

impl SettingsProvider for SharedSettings {
    fn current(&self) -> CurrentSettings {
        self.snapshot()
    }
}

/// Where tick results are rendered.
pub trait DisplaySurface: Send + Sync {
    /// Slots the surface cannot show are skipped by the tick.
    fn has_slot(&self, _slot_id: SlotId) -> bool {
        true
    }

    fn show(&self, slot_id: SlotId, value: &str);

    /// Rebuilds the surface for `settings`, every slot showing [`IDLE_VALUE`].
    fn populate(&self, settings: &CurrentSettings);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Stopped,
    Running,
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("rotation engine has no settings provider")]
    NotInitialized,
    #[error("rotation engine needs a tokio runtime to schedule ticks")]
    NoRuntime,
}

/// One second divided by `speed`, never shorter than a microsecond.
pub fn tick_interval(speed: u32) -> Duration {
    Duration::from_micros((1_000_000 / u64::from(speed.max(1))).max(1))
}

/// Drives the repeating tick. At most one timer task exists at a time.
pub struct RotationEngine {
    core: Arc<TickCore>,
    timer: Mutex<Option<JoinHandle<()>>>,
}

struct TickCore {
    provider: RwLock<Option<Arc<dyn SettingsProvider>>>,
    surface: Arc<dyn DisplaySurface>,
    state: Mutex<TickState>,
}

/// Guarded together so a stop can never interleave with a tick in flight.
struct TickState {
    picker: ValuePicker,
    /// Bumped by every stop; a timer task only publishes for its own generation.
    generation: u64,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl TickCore {
    fn provider(&self) -> Option<Arc<dyn SettingsProvider>> {
        self.provider
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Publishes one value per visible slot. With `generation` set, does
    /// nothing once that timer has been stopped.
    fn tick(&self, generation: Option<u64>) {
        let mut state = lock(&self.state);
        if generation.is_some_and(|generation| generation != state.generation) {
            trace!("engine: tick from a stopped timer, skipping");
            return;
        }
        let Some(provider) = self.provider() else {
            return;
        };
        let settings = provider.current();
        for slot in &settings.config.rotators {
            if !self.surface.has_slot(slot.id) {
                trace!(slot_id = slot.id.0, "engine: slot not on display, skipping");
                continue;
            }
            let value = state.picker.next_value(&settings, slot.id);
            self.surface.show(slot.id, &value);
        }
    }
}

impl RotationEngine {
    pub fn new(surface: Arc<dyn DisplaySurface>) -> Self {
        Self::with_picker(surface, ValuePicker::new())
    }

    pub fn with_picker(surface: Arc<dyn DisplaySurface>, picker: ValuePicker) -> Self {
        Self {
            core: Arc::new(TickCore {
                provider: RwLock::new(None),
                surface,
                state: Mutex::new(TickState {
                    picker,
                    generation: 0,
                }),
            }),
            timer: Mutex::new(None),
        }
    }

    pub fn initialize(&self, provider: Arc<dyn SettingsProvider>) {
        *self
            .core
            .provider
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(provider);
    }

    /// Schedules the repeating tick at the snapshot's speed. No-op while running.
    pub fn start(&self) -> Result<(), EngineError> {
        let mut timer = lock(&self.timer);
        if timer.is_some() {
            return Ok(());
        }
        let provider = self.core.provider().ok_or(EngineError::NotInitialized)?;
        let runtime = Handle::try_current().map_err(|_| EngineError::NoRuntime)?;

        let speed = provider.current().speed();
        let period = tick_interval(speed);
        let generation = lock(&self.core.state).generation;
        let core = Arc::clone(&self.core);
        *timer = Some(runtime.spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                core.tick(Some(generation));
            }
        }));
        debug!(speed, period_us = period.as_micros() as u64, "engine: rotation started");
        Ok(())
    }

    /// Cancels the timer. Once this returns, no tick of that timer publishes,
    /// even one already running on another worker.
    pub fn stop(&self) {
        if let Some(task) = lock(&self.timer).take() {
            lock(&self.core.state).generation += 1;
            task.abort();
            debug!("engine: rotation stopped");
        }
    }

    pub fn toggle_pause(&self) -> Result<EngineState, EngineError> {
        if self.is_running() {
            self.stop();
        } else {
            self.start()?;
        }
        Ok(self.state())
    }

    /// Stops, forgets every slot's last value and runs `on_reset`. Does not restart.
    pub fn reset(&self, on_reset: impl FnOnce()) {
        self.stop();
        lock(&self.core.state).picker.clear();
        on_reset();
    }

    pub fn is_running(&self) -> bool {
        lock(&self.timer).is_some()
    }

    pub fn state(&self) -> EngineState {
        if self.is_running() {
            EngineState::Running
        } else {
            EngineState::Stopped
        }
    }

    /// Runs one tick immediately on the caller's thread.
    pub fn tick(&self) {
        self.core.tick(None);
    }

    pub fn last_shown(&self, slot_id: SlotId) -> Option<String> {
        lock(&self.core.state)
            .picker
            .last_shown(slot_id)
            .map(str::to_string)
    }
}

impl Drop for RotationEngine {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
