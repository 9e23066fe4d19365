//! Storage keys and the on-disk shapes that predate [`crate::domain::AppData`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::{speed_from_value, Pool, TemplateId};

/// Key of the current-format record.
pub const V2_STORAGE_KEY: &str = "randomRotatorAssistant_v2";
/// Key of the unversioned record written by the single-template release.
pub const V1_STORAGE_KEY: &str = "overwatchRotatorSettings_v1";

/// The legacy release only ever rendered this many slots.
pub const LEGACY_MAX_SLOTS: usize = 4;

/// Current-format root read one template at a time, so a single malformed
/// entry can be dropped without losing the rest.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredAppData {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub active_template_id: Option<TemplateId>,
    #[serde(default)]
    pub templates: Vec<Value>,
}

/// Flat settings object of the legacy release. Every field is optional and
/// loosely typed; older builds wrote `pool`, later ones `poolItems`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacySettingsRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_text: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pool: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pool_items: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotators: Option<Vec<LegacyRotator>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LegacyRotator {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<Value>,
}

/// Text of a scalar; `null`, arrays and objects have none.
fn scalar_text(raw: &Value) -> Option<String> {
    match raw {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

/// An array of scalars, or one string holding an entry per line.
fn pool_from_value(raw: &Value) -> Option<Pool> {
    match raw {
        Value::Array(items) => Some(Pool::new(
            items
                .iter()
                .filter_map(scalar_text)
                .map(|entry| entry.trim().to_string())
                .filter(|entry| !entry.is_empty()),
        )),
        Value::String(text) => Some(Pool::from_lines(text)),
        _ => None,
    }
}

impl LegacySettingsRecord {
    pub fn location(&self) -> Option<String> {
        self.location_text.as_ref().and_then(scalar_text)
    }

    /// `pool` wins over `poolItems` when both are usable. Entries are trimmed
    /// and blank ones dropped.
    pub fn pool_entries(&self) -> Option<Pool> {
        self.pool
            .as_ref()
            .and_then(pool_from_value)
            .or_else(|| self.pool_items.as_ref().and_then(pool_from_value))
    }

    /// Accepts a JSON number or a numeric string; anything else is `None`.
    pub fn speed_value(&self) -> Option<i64> {
        speed_from_value(self.speed.as_ref()?)
    }

    /// Labels of the legacy slots, capped at [`LEGACY_MAX_SLOTS`].
    pub fn slot_labels(&self) -> Option<Vec<String>> {
        let rotators = self.rotators.as_ref()?;
        Some(
            rotators
                .iter()
                .take(LEGACY_MAX_SLOTS)
                .map(|rotator| {
                    rotator
                        .label
                        .as_ref()
                        .and_then(scalar_text)
                        .unwrap_or_default()
                })
                .collect(),
        )
    }
}
