use std::{collections::HashMap, fs, path::Path};

pub const CONFIG_FILE: &str = "rotator.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Directory for the JSON records, or `memory:` for a throwaway session.
    pub data_dir: String,
    pub log_filter: String,
    pub default_template: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: "./data".into(),
            log_filter: "info".into(),
            default_template: None,
        }
    }
}

/// Defaults, then `path` if it exists, then environment overrides.
pub fn load_settings(path: &Path) -> Settings {
    let mut settings = Settings::default();
    if let Ok(raw) = fs::read_to_string(path) {
        apply_file(&mut settings, &raw);
    }
    apply_env(&mut settings, |key| std::env::var(key).ok());
    settings
}

fn apply_file(settings: &mut Settings, raw: &str) {
    let Ok(file_cfg) = toml::from_str::<HashMap<String, String>>(raw) else {
        return;
    };
    if let Some(v) = file_cfg.get("data_dir") {
        settings.data_dir = v.clone();
    }
    if let Some(v) = file_cfg.get("log_filter") {
        settings.log_filter = v.clone();
    }
    if let Some(v) = file_cfg.get("default_template") {
        settings.default_template = Some(v.clone());
    }
}

fn apply_env(settings: &mut Settings, var: impl Fn(&str) -> Option<String>) {
    if let Some(v) = var("ROTATOR_DATA_DIR") {
        settings.data_dir = v;
    }
    if let Some(v) = var("APP__DATA_DIR") {
        settings.data_dir = v;
    }

    if let Some(v) = var("ROTATOR_LOG") {
        settings.log_filter = v;
    }
    if let Some(v) = var("APP__LOG_FILTER") {
        settings.log_filter = v;
    }

    if let Some(v) = var("APP__DEFAULT_TEMPLATE") {
        settings.default_template = Some(v);
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
