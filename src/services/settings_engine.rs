// xxxterm settings engine
// Loads and saves the rc file, updates single values by dotted key path
// and resets to defaults. The rc file is pretty-printed JSON.

use std::fs;
use std::path::Path;

use log::{info, warn};
use serde_json::{Map, Value};

use crate::platform;
use crate::types::errors::SettingsError;
use crate::types::settings::BrowserSettings;

/// Trait defining the settings engine interface.
pub trait SettingsEngineTrait {
    fn load(&mut self) -> Result<BrowserSettings, SettingsError>;
    fn save(&self) -> Result<(), SettingsError>;
    fn get_settings(&self) -> &BrowserSettings;
    fn set_value(&mut self, key: &str, value: Value) -> Result<(), SettingsError>;
    fn set_from_str(&mut self, key: &str, raw: &str) -> Result<(), SettingsError>;
    fn flatten(&self) -> Vec<(String, String)>;
    fn reset(&mut self) -> Result<(), SettingsError>;
    fn get_config_path(&self) -> &str;
}

/// Settings engine persisting `BrowserSettings` to the rc file.
pub struct SettingsEngine {
    config_path: String,
    settings: BrowserSettings,
}

impl SettingsEngine {
    /// `path_override` replaces the platform rc path (used by `-f` and tests).
    pub fn new(path_override: Option<String>) -> Self {
        let config_path = path_override
            .unwrap_or_else(|| platform::rc_path().to_string_lossy().to_string());
        Self {
            config_path,
            settings: BrowserSettings::default(),
        }
    }

    fn to_json(&self) -> Result<Value, SettingsError> {
        serde_json::to_value(&self.settings)
            .map_err(|e| SettingsError::SerializationError(format!("Failed to serialize settings: {}", e)))
    }

    /// Walks `parts` through nested objects and replaces the leaf. Only
    /// keys that already exist can be set.
    fn replace_at(root: &mut Value, key: &str, value: Value) -> Result<(), SettingsError> {
        let mut parts = key.split('.').peekable();
        let mut current = root;
        while let Some(part) = parts.next() {
            let map = current.as_object_mut().ok_or_else(|| {
                SettingsError::InvalidKey(format!("'{}' does not name a settings section", key))
            })?;
            if !map.contains_key(part) {
                return Err(SettingsError::InvalidKey(format!("Key '{}' not found in settings", key)));
            }
            if parts.peek().is_none() {
                map.insert(part.to_string(), value);
                return Ok(());
            }
            current = map
                .get_mut(part)
                .ok_or_else(|| SettingsError::InvalidKey(key.to_string()))?;
        }
        Err(SettingsError::InvalidKey("Key cannot be empty".to_string()))
    }

    fn flatten_into(prefix: &str, map: &Map<String, Value>, out: &mut Vec<(String, String)>) {
        for (k, v) in map {
            let path = if prefix.is_empty() {
                k.clone()
            } else {
                format!("{}.{}", prefix, k)
            };
            match v {
                Value::Object(inner) => Self::flatten_into(&path, inner, out),
                Value::String(s) => out.push((path, s.clone())),
                Value::Null => out.push((path, String::new())),
                other => out.push((path, other.to_string())),
            }
        }
    }
}

impl SettingsEngineTrait for SettingsEngine {
    /// Loads settings from the rc file; a missing file yields defaults, a
    /// malformed one is an error.
    fn load(&mut self) -> Result<BrowserSettings, SettingsError> {
        let path = Path::new(&self.config_path);

        if !path.exists() {
            info!("no rc file at {}, using defaults", self.config_path);
            self.settings = BrowserSettings::default();
            return Ok(self.settings.clone());
        }

        let content = fs::read_to_string(path)
            .map_err(|e| SettingsError::IoError(format!("Failed to read config file: {}", e)))?;

        self.settings = serde_json::from_str(&content).map_err(|e| {
            warn!("rc file {} is malformed: {}", self.config_path, e);
            SettingsError::SerializationError(format!("Failed to parse config file: {}", e))
        })?;
        Ok(self.settings.clone())
    }

    /// Writes the rc file, creating parent directories.
    fn save(&self) -> Result<(), SettingsError> {
        let path = Path::new(&self.config_path);

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                SettingsError::IoError(format!("Failed to create config directory: {}", e))
            })?;
        }

        let json = serde_json::to_string_pretty(&self.settings).map_err(|e| {
            SettingsError::SerializationError(format!("Failed to serialize settings: {}", e))
        })?;

        fs::write(path, json)
            .map_err(|e| SettingsError::IoError(format!("Failed to write config file: {}", e)))
    }

    fn get_settings(&self) -> &BrowserSettings {
        &self.settings
    }

    /// Updates one setting by dotted key, e.g. `privacy.enable_scripts`.
    ///
    /// The new tree is deserialized back into `BrowserSettings`, so a value
    /// of the wrong type is rejected and nothing changes. Saves on success.
    fn set_value(&mut self, key: &str, value: Value) -> Result<(), SettingsError> {
        if key.is_empty() {
            return Err(SettingsError::InvalidKey("Key cannot be empty".to_string()));
        }

        let mut json_value = self.to_json()?;
        Self::replace_at(&mut json_value, key, value)?;

        self.settings = serde_json::from_value(json_value).map_err(|e| {
            SettingsError::InvalidValue(format!("Invalid value for key '{}': {}", key, e))
        })?;
        info!("setting {} changed", key);
        self.save()
    }

    /// Like `set_value`, taking text as typed on the command line: valid
    /// JSON is used as is, anything else becomes a string.
    fn set_from_str(&mut self, key: &str, raw: &str) -> Result<(), SettingsError> {
        let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
        self.set_value(key, value)
    }

    /// Every leaf setting as `(dotted key, display value)`.
    fn flatten(&self) -> Vec<(String, String)> {
        let mut out = Vec::new();
        if let Ok(Value::Object(map)) = self.to_json() {
            Self::flatten_into("", &map, &mut out);
        }
        out
    }

    /// Resets all settings to factory defaults and saves to disk.
    fn reset(&mut self) -> Result<(), SettingsError> {
        self.settings = BrowserSettings::default();
        self.save()
    }

    fn get_config_path(&self) -> &str {
        &self.config_path
    }
}
