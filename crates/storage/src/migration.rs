//! One-way upgrade of the unversioned single-template record.

use shared::{
    domain::{RotatorSlot, Template, TemplateConfig, TemplateId, DEFAULT_SPEED},
    records::{LegacySettingsRecord, LEGACY_MAX_SLOTS},
};

pub const MIGRATED_TEMPLATE_NAME: &str = "My saved settings";

#[derive(Debug)]
pub enum LegacyMigration {
    Migrated(Template),
    /// The legacy values are the built-in default's; no custom copy is needed.
    MatchesDefault,
    Unreadable(serde_json::Error),
}

pub fn migrate_legacy(raw: &str, canonical: Option<&Template>) -> LegacyMigration {
    match serde_json::from_str::<LegacySettingsRecord>(raw) {
        Ok(record) => {
            let template = template_from_legacy(&record, canonical);
            if canonical.is_some_and(|canonical| matches_canonical(&template, canonical)) {
                LegacyMigration::MatchesDefault
            } else {
                LegacyMigration::Migrated(template)
            }
        }
        Err(err) => LegacyMigration::Unreadable(err),
    }
}

/// Builds a custom shared-pool template from `record`, filling absent fields
/// from `canonical`.
pub fn template_from_legacy(
    record: &LegacySettingsRecord,
    canonical: Option<&Template>,
) -> Template {
    let location_text = record
        .location()
        .or_else(|| canonical.map(|t| t.config.location_text.clone()))
        .unwrap_or_default();

    let speed = record
        .speed_value()
        .filter(|speed| *speed >= 1)
        .unwrap_or(i64::from(DEFAULT_SPEED));

    let shared_pool = record
        .pool_entries()
        .or_else(|| canonical.map(|t| t.config.shared_pool.clone()))
        .unwrap_or_default();

    let labels: Vec<String> = match record.slot_labels() {
        Some(labels) => labels,
        None => match canonical {
            Some(t) => t
                .config
                .rotators
                .iter()
                .take(LEGACY_MAX_SLOTS)
                .map(|slot| slot.label.clone())
                .collect(),
            None => (1..=LEGACY_MAX_SLOTS).map(|n| format!("Slot {n}")).collect(),
        },
    };

    Template {
        id: TemplateId::generate_custom(),
        name: MIGRATED_TEMPLATE_NAME.to_string(),
        is_default: false,
        is_shared_pool: true,
        config: TemplateConfig {
            location_text,
            speed,
            shared_pool,
            rotators: labels
                .into_iter()
                .enumerate()
                .map(|(index, label)| RotatorSlot::new(index as i64, label))
                .collect(),
        },
    }
}

/// Best-effort duplicate check: same location text and same shared pool.
fn matches_canonical(migrated: &Template, canonical: &Template) -> bool {
    migrated.config.location_text == canonical.config.location_text
        && migrated.config.shared_pool == canonical.config.shared_pool
}
