use std::collections::HashMap;

use rand_mt::Mt64;
use shared::domain::{CurrentSettings, Pool, SlotId};

/// Shown for a slot whose effective pool is empty.
pub const PLACEHOLDER: &str = "???";
/// Shown for every slot before the first tick and after a reset.
pub const IDLE_VALUE: &str = "---";

/// Per-slot random selection that never repeats a slot's previous value
/// while its pool offers an alternative.
pub struct ValuePicker {
    last_shown: HashMap<SlotId, String>,
    rng: Mt64,
}

impl Default for ValuePicker {
    fn default() -> Self {
        Self::new()
    }
}

impl ValuePicker {
    pub fn new() -> Self {
        Self::with_seed(uuid::Uuid::new_v4().as_u128() as u64)
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            last_shown: HashMap::new(),
            rng: Mt64::new(seed),
        }
    }

    pub fn next_value(&mut self, settings: &CurrentSettings, slot_id: SlotId) -> String {
        let Some(pool) = settings.pool_for(slot_id).filter(|pool| !pool.is_empty()) else {
            return PLACEHOLDER.to_string();
        };
        if pool.len() == 1 {
            return pool.0[0].clone();
        }

        let last = self.last_shown.get(&slot_id).cloned();
        let value = if pool.iter().all(|entry| Some(entry) == last.as_deref()) {
            // every entry equals the last value; redrawing could never succeed
            pool.0[0].clone()
        } else {
            loop {
                let candidate = self.draw(pool);
                if Some(candidate) != last.as_deref() {
                    break candidate.to_string();
                }
            }
        };
        self.last_shown.insert(slot_id, value.clone());
        value
    }

    pub fn last_shown(&self, slot_id: SlotId) -> Option<&str> {
        self.last_shown.get(&slot_id).map(String::as_str)
    }

    pub fn clear(&mut self) {
        self.last_shown.clear();
    }

    /// Uniform index by rejection: raw values past the last whole multiple of
    /// the pool length are redrawn.
    fn draw<'p>(&mut self, pool: &'p Pool) -> &'p str {
        let len = pool.len() as u64;
        let zone = u64::MAX - u64::MAX % len;
        let index = loop {
            let raw = self.rng.next_u64();
            if raw < zone {
                break (raw % len) as usize;
            }
        };
        &pool.0[index]
    }
}

#[cfg(test)]
#[path = "tests/picker_tests.rs"]
mod tests;
