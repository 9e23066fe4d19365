use anyhow::{Context, Result};
use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    sync::{Arc, Mutex, PoisonError},
};
use tracing::{debug, info, warn};

use shared::{
    defaults::default_templates,
    domain::{AppData, Template, CURRENT_VERSION},
    records::{StoredAppData, V1_STORAGE_KEY, V2_STORAGE_KEY},
};

pub mod migration;

use migration::LegacyMigration;

/// Location string that selects the in-process backend.
pub const MEMORY_LOCATION: &str = "memory:";

/// Synchronous string key-value backend, the shape of browser local storage.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
}

/// User-visible notification surface.
pub trait Notifier: Send + Sync {
    fn notify(&self, message: &str, is_error: bool);
}

/// Routes notifications into the log.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, message: &str, is_error: bool) {
        if is_error {
            warn!("notify: {message}");
        } else {
            info!("notify: {message}");
        }
    }
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(self, key: &str, value: &str) -> Self {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.to_string());
        self
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// One `<key>.json` file per key inside a directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).with_context(|| {
            format!("failed to create storage directory '{}'", dir.display())
        })?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let file_name: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{file_name}.json"))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(&path)
            .with_context(|| format!("failed to read '{}'", path.display()))?;
        Ok(Some(raw))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key);
        let staging = path.with_extension("json.tmp");
        fs::write(&staging, value)
            .with_context(|| format!("failed to write '{}'", staging.display()))?;
        fs::rename(&staging, &path)
            .with_context(|| format!("failed to replace '{}'", path.display()))?;
        Ok(())
    }
}

/// Opens `memory:` as an in-process store and anything else as a directory,
/// with an optional `file://` prefix.
pub fn open_key_value_store(location: &str) -> Result<Arc<dyn KeyValueStore>> {
    let location = location.trim();
    if location == MEMORY_LOCATION {
        return Ok(Arc::new(MemoryStore::new()));
    }
    let dir = location.strip_prefix("file://").unwrap_or(location);
    let dir = if dir.is_empty() { "." } else { dir };
    Ok(Arc::new(FileStore::new(dir)?))
}

/// Loads, migrates and reconciles the persisted application data.
#[derive(Clone)]
pub struct TemplateStore {
    kv: Arc<dyn KeyValueStore>,
    notifier: Arc<dyn Notifier>,
    defaults: Vec<Template>,
}

impl TemplateStore {
    pub fn new(kv: Arc<dyn KeyValueStore>, notifier: Arc<dyn Notifier>) -> Self {
        Self::with_defaults(kv, notifier, default_templates())
    }

    /// Uses `defaults` as the canonical built-in set instead of the shipped one.
    pub fn with_defaults(
        kv: Arc<dyn KeyValueStore>,
        notifier: Arc<dyn Notifier>,
        defaults: Vec<Template>,
    ) -> Self {
        Self {
            kv,
            notifier,
            defaults,
        }
    }

    pub fn defaults(&self) -> &[Template] {
        &self.defaults
    }

    pub fn notifier(&self) -> &Arc<dyn Notifier> {
        &self.notifier
    }

    pub fn load(&self) -> AppData {
        let loaded = match self.read_current() {
            Some(data) => data,
            None => self.migrate_or_fresh(),
        };
        let data = reconcile(loaded, &self.defaults);
        self.save(&data);
        data
    }

    /// Writes `data` under the current key. Failures are reported to the
    /// notifier and swallowed; returns whether the write landed.
    pub fn save(&self, data: &AppData) -> bool {
        let result = serde_json::to_string(data)
            .context("failed to serialize app data")
            .and_then(|raw| self.kv.set(V2_STORAGE_KEY, &raw));
        match result {
            Ok(()) => {
                debug!(templates = data.templates.len(), "storage: app data saved");
                true
            }
            Err(err) => {
                warn!("storage: failed to save app data: {err:#}");
                self.notifier
                    .notify("Failed to save settings! Storage may be full.", true);
                false
            }
        }
    }

    fn read_key(&self, key: &str) -> Option<String> {
        match self.kv.get(key) {
            Ok(raw) => raw,
            Err(err) => {
                warn!("storage: failed to read key={key}: {err:#}");
                None
            }
        }
    }

    fn read_current(&self) -> Option<AppData> {
        let raw = self.read_key(V2_STORAGE_KEY)?;
        let stored = match serde_json::from_str::<StoredAppData>(&raw) {
            Ok(stored) => stored,
            Err(err) => {
                warn!("storage: stored app data is unreadable, rebuilding: {err}");
                return None;
            }
        };
        if stored.version != CURRENT_VERSION {
            warn!(
                "storage: stored version {:?} does not match {CURRENT_VERSION}, rebuilding",
                stored.version
            );
            return None;
        }

        let templates = stored
            .templates
            .into_iter()
            .enumerate()
            .filter_map(|(index, entry)| match serde_json::from_value::<Template>(entry) {
                Ok(template) => Some(template),
                Err(err) => {
                    warn!("storage: dropping unreadable template at index {index}: {err}");
                    None
                }
            })
            .collect();
        Some(AppData {
            version: stored.version,
            active_template_id: stored.active_template_id,
            templates,
        })
    }

    fn fresh_root(&self) -> AppData {
        AppData {
            active_template_id: self.defaults.first().map(|template| template.id.clone()),
            ..AppData::default()
        }
    }

    fn migrate_or_fresh(&self) -> AppData {
        let mut data = self.fresh_root();
        let Some(raw) = self.read_key(V1_STORAGE_KEY) else {
            info!("storage: no saved data found, starting fresh");
            return data;
        };

        match migration::migrate_legacy(&raw, self.defaults.first()) {
            LegacyMigration::Migrated(template) => {
                info!(
                    "storage: migrated legacy settings into template id={}",
                    template.id
                );
                data.active_template_id = Some(template.id.clone());
                data.templates.push(template);
            }
            LegacyMigration::MatchesDefault => {
                info!("storage: legacy settings match the built-in default, nothing to migrate");
            }
            LegacyMigration::Unreadable(err) => {
                warn!("storage: legacy settings are unreadable, starting fresh: {err}");
            }
        }
        data
    }
}

/// Rebuilds the template list as fresh canonical defaults followed by the
/// custom templates of `loaded`, then repairs a dangling active id.
pub fn reconcile(loaded: AppData, defaults: &[Template]) -> AppData {
    let mut templates: Vec<Template> = defaults.to_vec();
    templates.extend(
        loaded
            .templates
            .into_iter()
            .filter(Template::is_custom),
    );

    let mut data = AppData {
        version: CURRENT_VERSION.to_string(),
        active_template_id: loaded.active_template_id,
        templates,
    };

    let active_is_valid = data
        .active_template_id
        .as_ref()
        .is_some_and(|id| data.contains(id));
    if !active_is_valid {
        let fallback = defaults.first().map(|template| template.id.clone());
        if data.active_template_id.is_some() {
            warn!(
                "storage: active template {:?} no longer exists, falling back to {:?}",
                data.active_template_id, fallback
            );
        }
        data.active_template_id = fallback;
    }
    data
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
