use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Version tag written into every current-format record.
pub const CURRENT_VERSION: &str = "v2";
/// Ticks per second used when a template carries no usable speed.
pub const DEFAULT_SPEED: u32 = 30;

macro_rules! id_newtype {
    ($name:ident, $inner:ty) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub $inner);
    };
}

id_newtype!(SlotId, i64);
id_newtype!(TemplateId, String);

impl Copy for SlotId {}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TemplateId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Fresh id for a user-authored template.
    pub fn generate_custom() -> Self {
        Self(format!("custom-{}", uuid::Uuid::new_v4()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TemplateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TemplateId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Ordered list of display strings. Duplicates are allowed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Pool(pub Vec<String>);

impl Pool {
    pub fn new<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(items.into_iter().map(Into::into).collect())
    }

    /// Parses one entry per line, trimming whitespace and dropping blank lines.
    pub fn from_lines(text: &str) -> Self {
        Self(
            text.lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_string)
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RotatorSlot {
    pub id: SlotId,
    pub label: String,
    #[serde(default)]
    pub individual_pool: Pool,
}

impl RotatorSlot {
    pub fn new(id: i64, label: impl Into<String>) -> Self {
        Self {
            id: SlotId(id),
            label: label.into(),
            individual_pool: Pool::default(),
        }
    }

    pub fn with_pool(mut self, pool: Pool) -> Self {
        self.individual_pool = pool;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateConfig {
    #[serde(default)]
    pub location_text: String,
    /// Raw ticks-per-second as stored; read through [`TemplateConfig::effective_speed`].
    #[serde(default = "default_speed", deserialize_with = "lenient_speed")]
    pub speed: i64,
    #[serde(default)]
    pub shared_pool: Pool,
    #[serde(default)]
    pub rotators: Vec<RotatorSlot>,
}

fn default_speed() -> i64 {
    i64::from(DEFAULT_SPEED)
}

/// Accepts a number, a numeric string or `null`; anything unusable reads as
/// the default speed.
fn lenient_speed<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Value::deserialize(deserializer)?;
    Ok(speed_from_value(&raw).unwrap_or_else(default_speed))
}

/// Integer speed from a loosely typed JSON value. Fractions are truncated.
pub fn speed_from_value(raw: &Value) -> Option<i64> {
    match raw {
        Value::Number(number) => number
            .as_i64()
            .or_else(|| number.as_f64().map(|value| value as i64)),
        Value::String(text) => {
            let text = text.trim();
            text.parse::<i64>()
                .ok()
                .or_else(|| text.parse::<f64>().ok().filter(|v| v.is_finite()).map(|v| v as i64))
        }
        _ => None,
    }
}

impl TemplateConfig {
    pub fn effective_speed(&self) -> u32 {
        u32::try_from(self.speed)
            .ok()
            .filter(|speed| *speed >= 1)
            .unwrap_or(DEFAULT_SPEED)
    }

    pub fn slot(&self, id: SlotId) -> Option<&RotatorSlot> {
        self.rotators.iter().find(|slot| slot.id == id)
    }

    /// One past the largest slot id, or 0 for an empty list. Falls back to the
    /// smallest unused non-negative id when the largest is `i64::MAX`.
    pub fn next_slot_id(&self) -> SlotId {
        let Some(max) = self.rotators.iter().map(|slot| slot.id.0).max() else {
            return SlotId(0);
        };
        match max.checked_add(1) {
            Some(next) => SlotId(next),
            None => SlotId(
                (0..)
                    .find(|id| self.slot(SlotId(*id)).is_none())
                    .unwrap_or(0),
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    pub id: TemplateId,
    pub name: String,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default = "default_shared_pool_mode")]
    pub is_shared_pool: bool,
    pub config: TemplateConfig,
}

fn default_shared_pool_mode() -> bool {
    true
}

impl Template {
    pub fn is_custom(&self) -> bool {
        !self.is_default
    }
}

/// Persisted root record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppData {
    pub version: String,
    #[serde(default)]
    pub active_template_id: Option<TemplateId>,
    #[serde(default)]
    pub templates: Vec<Template>,
}

impl Default for AppData {
    fn default() -> Self {
        Self {
            version: CURRENT_VERSION.to_string(),
            active_template_id: None,
            templates: Vec::new(),
        }
    }
}

impl AppData {
    pub fn template(&self, id: &TemplateId) -> Option<&Template> {
        self.templates.iter().find(|template| &template.id == id)
    }

    pub fn template_mut(&mut self, id: &TemplateId) -> Option<&mut Template> {
        self.templates.iter_mut().find(|template| &template.id == id)
    }

    pub fn active_template(&self) -> Option<&Template> {
        self.active_template_id
            .as_ref()
            .and_then(|id| self.template(id))
    }

    pub fn contains(&self, id: &TemplateId) -> bool {
        self.template(id).is_some()
    }
}

/// Working copy of the active template handed to the rotation engine.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CurrentSettings {
    pub is_shared_pool: bool,
    pub config: TemplateConfig,
}

impl Default for TemplateConfig {
    fn default() -> Self {
        Self {
            location_text: String::new(),
            speed: default_speed(),
            shared_pool: Pool::default(),
            rotators: Vec::new(),
        }
    }
}

impl CurrentSettings {
    pub fn from_template(template: &Template) -> Self {
        Self {
            is_shared_pool: template.is_shared_pool,
            config: template.config.clone(),
        }
    }

    pub fn speed(&self) -> u32 {
        self.config.effective_speed()
    }

    /// Pool a slot draws from: the shared pool, or the slot's own pool.
    /// An unknown slot resolves to `None`, which callers treat as empty.
    pub fn pool_for(&self, slot_id: SlotId) -> Option<&Pool> {
        if self.is_shared_pool {
            Some(&self.config.shared_pool)
        } else {
            self.config
                .slot(slot_id)
                .map(|slot| &slot.individual_pool)
        }
    }
}

/// Editable copy of a template used by the settings flow until it is committed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateDraft {
    pub name: String,
    pub is_shared_pool: bool,
    pub config: TemplateConfig,
}

impl TemplateDraft {
    pub fn from_template(template: &Template) -> Self {
        Self {
            name: template.name.clone(),
            is_shared_pool: template.is_shared_pool,
            config: template.config.clone(),
        }
    }

    pub fn add_slot(&mut self, label: impl Into<String>) -> SlotId {
        let id = self.config.next_slot_id();
        self.config.rotators.push(RotatorSlot::new(id.0, label));
        id
    }

    pub fn remove_slot(&mut self, id: SlotId) -> bool {
        let before = self.config.rotators.len();
        self.config.rotators.retain(|slot| slot.id != id);
        before != self.config.rotators.len()
    }
}
