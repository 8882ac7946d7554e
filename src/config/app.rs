//! Application configuration file (window, ui and behavior sections)
//!
//! Loading never fails. A missing or unparseable file falls back to the
//! built-in defaults, and a wrongly typed value only falls back for its own
//! key. Present keys override defaults, missing keys keep them.

use anyhow::{bail, Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::window_spec::{WindowLevel, WindowSpec};

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AppConfig {
    pub window: WindowSpec,
    pub ui: UiConfig,
    pub behavior: BehaviorConfig,
    /// Monitor for the main window; `None` means the primary display
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_index: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UiConfig {
    pub theme: Theme,
    /// Window opacity, 0.0..=1.0
    pub transparency: f32,
    pub border_radius: u32,
    pub show_scrollbar: bool,
    pub show_title_bar: bool,
    pub rounded_corners: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BehaviorConfig {
    pub hide_to_tray: bool,
    pub start_minimized: bool,
    pub auto_start: bool,
    pub hide_from_taskbar: bool,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            theme: Theme::Dark,
            transparency: 0.95,
            border_radius: 12,
            show_scrollbar: false,
            show_title_bar: false,
            rounded_corners: true,
        }
    }
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            hide_to_tray: true,
            start_minimized: false,
            auto_start: false,
            hide_from_taskbar: true,
        }
    }
}

impl AppConfig {
    /// Default config file location
    pub fn path() -> PathBuf {
        let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push(crate::constants::config::APP_DIR);
        path.push(crate::constants::config::FILENAME);
        path
    }

    /// Parse config text, merging it over the defaults one key at a time.
    /// A wrongly typed value only loses that key.
    pub fn from_json(contents: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(contents)
            .context("Failed to parse config JSON")?;
        if !value.is_object() {
            bail!("Config root is not a JSON object");
        }
        let mut merged = serde_json::to_value(Self::default())
            .context("Failed to serialize default config")?;
        merge_lenient::<Self>(&mut merged, &value, &mut Vec::new());
        let mut config: AppConfig = serde_json::from_value(merged)
            .context("Config JSON does not match the expected shape")?;

        // Older files only carry a boolean `alwaysOnTop`
        let window = value.get("window");
        let has_level = window.and_then(|w| w.get("windowLevel")).is_some();
        let legacy_on_top = window
            .and_then(|w| w.get("alwaysOnTop"))
            .and_then(Value::as_bool);
        if !has_level && legacy_on_top == Some(true) {
            info!("Mapping legacy alwaysOnTop=true to windowLevel=alwaysOnTop");
            config.window.window_level = WindowLevel::AlwaysOnTop;
        }

        config.validate_and_clamp();
        Ok(config)
    }

    /// Load from `path`, falling back to defaults on any failure
    pub fn load_from(path: &Path) -> Self {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) => {
                info!(path = %path.display(), error = %e, "No readable config file, using defaults");
                return Self::default();
            }
        };

        match Self::from_json(&contents) {
            Ok(config) => {
                info!(path = %path.display(), "Loaded config");
                config
            }
            Err(e) => {
                warn!(path = %path.display(), error = %format!("{e:#}"), "Config loading failed, using defaults");
                Self::default()
            }
        }
    }

    /// Write pretty-printed JSON, creating the parent directory when needed
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory {:?}", parent))?;
        }
        let json = serde_json::to_string_pretty(self)
            .context("Failed to serialize config to JSON")?;
        fs::write(path, json)
            .with_context(|| format!("Failed to write config to {:?}", path))?;
        info!(path = %path.display(), "Saved config");
        Ok(())
    }

    fn validate_and_clamp(&mut self) {
        if !(0.0..=1.0).contains(&self.ui.transparency) {
            let clamped = if self.ui.transparency.is_nan() {
                UiConfig::default().transparency
            } else {
                self.ui.transparency.clamp(0.0, 1.0)
            };
            warn!(transparency = self.ui.transparency, using = clamped, "transparency out of range, clamping");
            self.ui.transparency = clamped;
        }
    }
}

/// Overlay `user` onto `merged` leaf by leaf, keeping a leaf only when the
/// result still deserializes as `T`
fn merge_lenient<T: DeserializeOwned>(merged: &mut Value, user: &Value, path: &mut Vec<String>) {
    let Some(object) = user.as_object() else {
        return;
    };
    for (key, value) in object {
        path.push(key.clone());
        let nested = value.is_object() && value_at(merged, path).is_some_and(Value::is_object);
        if nested {
            merge_lenient::<T>(merged, value, path);
        } else {
            let mut candidate = merged.clone();
            set_at(&mut candidate, path, value.clone());
            match T::deserialize(&candidate) {
                Ok(_) => *merged = candidate,
                Err(e) => warn!(key = %path.join("."), error = %e, "Ignoring invalid config value"),
            }
        }
        path.pop();
    }
}

fn value_at<'v>(value: &'v Value, path: &[String]) -> Option<&'v Value> {
    path.iter().try_fold(value, |value, key| value.get(key))
}

fn set_at(value: &mut Value, path: &[String], leaf: Value) {
    let Some((last, parents)) = path.split_last() else {
        return;
    };
    let mut target = value;
    for key in parents {
        match target.get_mut(key) {
            Some(next) => target = next,
            None => return,
        }
    }
    if let Some(object) = target.as_object_mut() {
        object.insert(last.clone(), leaf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::window_spec::{PlatformLevel, PositionX, SizeSpec};

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("desk-icons-test-{}-{}", std::process::id(), name))
            .join("window-config.json")
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = AppConfig::load_from(Path::new("/nonexistent/desk-icons/window-config.json"));
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_invalid_json_uses_defaults() {
        assert!(AppConfig::from_json("{ not json").is_err());

        let path = temp_path("invalid");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "{ not json").unwrap();
        assert_eq!(AppConfig::load_from(&path), AppConfig::default());
        let _ = fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_present_keys_override_defaults() {
        let config = AppConfig::from_json(
            r#"{
                "window": { "width": "80%", "position": { "x": "right" }, "windowLevel": "alwaysOnTop", "level": "floating" },
                "ui": { "theme": "light" }
            }"#,
        )
        .unwrap();

        assert_eq!(config.window.width, SizeSpec::Percent(80.0));
        assert_eq!(config.window.height, SizeSpec::Pixels(600));
        assert_eq!(config.window.position.x, PositionX::Right);
        assert_eq!(config.window.position.offset_y, 0);
        assert_eq!(config.window.window_level, WindowLevel::AlwaysOnTop);
        assert_eq!(config.window.level, Some(PlatformLevel::Floating));
        assert_eq!(config.ui.theme, Theme::Light);
        assert_eq!(config.ui.border_radius, 12);
        assert_eq!(config.behavior, BehaviorConfig::default());
    }

    #[test]
    fn test_bad_value_only_loses_its_own_key() {
        let config = AppConfig::from_json(r#"{"window":{"width":"80%"},"ui":{"theme":"blue"}}"#).unwrap();
        assert_eq!(config.window.width, SizeSpec::Percent(80.0));
        assert_eq!(config.ui.theme, Theme::Dark);

        let config = AppConfig::from_json(
            r#"{
                "window": { "width": true, "height": "50%", "level": 5, "windowLevel": "stayBehind",
                            "position": { "x": "left", "offsetY": "far" } },
                "ui": { "transparency": "clear", "borderRadius": 4 },
                "behavior": { "hideToTray": "yes", "startMinimized": true },
                "displayIndex": -1
            }"#,
        )
        .unwrap();
        assert_eq!(config.window.width, SizeSpec::Pixels(400));
        assert_eq!(config.window.height, SizeSpec::Percent(50.0));
        assert_eq!(config.window.level, None);
        assert_eq!(config.window.window_level, WindowLevel::StayBehind);
        assert_eq!(config.window.position.x, PositionX::Left);
        assert_eq!(config.window.position.offset_y, -50);
        assert_eq!(config.ui.transparency, UiConfig::default().transparency);
        assert_eq!(config.ui.border_radius, 4);
        assert!(config.behavior.hide_to_tray);
        assert!(config.behavior.start_minimized);
        assert_eq!(config.display_index, None);
    }

    #[test]
    fn test_wrong_section_type_keeps_section_defaults() {
        let config = AppConfig::from_json(r#"{ "window": 5, "ui": { "theme": "light" } }"#).unwrap();
        assert_eq!(config.window, WindowSpec::default());
        assert_eq!(config.ui.theme, Theme::Light);
        assert!(AppConfig::from_json("[1, 2]").is_err());
    }

    #[test]
    fn test_load_keeps_valid_keys_next_to_bad_ones() {
        let path = temp_path("partial");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, r#"{"window":{"width":"80%","windowLevel":"alwaysOnTop"},"ui":{"theme":"blue"}}"#).unwrap();

        let config = AppConfig::load_from(&path);
        assert_eq!(config.window.width, SizeSpec::Percent(80.0));
        assert_eq!(config.window.window_level, WindowLevel::AlwaysOnTop);
        let _ = fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_unknown_keys_ignored() {
        let config = AppConfig::from_json(r#"{ "shortcuts": { "toggle": "Ctrl+Space" } }"#).unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_legacy_always_on_top() {
        let config = AppConfig::from_json(r#"{ "window": { "alwaysOnTop": true } }"#).unwrap();
        assert_eq!(config.window.window_level, WindowLevel::AlwaysOnTop);

        // An explicit windowLevel wins over the legacy flag
        let config = AppConfig::from_json(
            r#"{ "window": { "alwaysOnTop": true, "windowLevel": "stayBehind" } }"#,
        )
        .unwrap();
        assert_eq!(config.window.window_level, WindowLevel::StayBehind);
    }

    #[test]
    fn test_transparency_clamped() {
        let config = AppConfig::from_json(r#"{ "ui": { "transparency": 3.5 } }"#).unwrap();
        assert_eq!(config.ui.transparency, 1.0);
    }

    #[test]
    fn test_save_then_load() {
        let path = temp_path("roundtrip");
        let mut config = AppConfig::default();
        config.window.width = SizeSpec::Percent(50.0);
        config.window.window_level = WindowLevel::StayBehind;
        config.display_index = Some(1);

        config.save_to(&path).unwrap();
        let written = fs::read_to_string(&path).unwrap();
        assert!(written.contains("\n  \"window\""), "expected pretty-printed JSON");
        assert!(written.contains("\"50%\""));

        assert_eq!(AppConfig::load_from(&path), config);
        let _ = fs::remove_dir_all(path.parent().unwrap());
    }
}
