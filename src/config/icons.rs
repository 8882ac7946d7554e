//! Icon grid definition (`icons.json`)

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IconKind {
    App,
    File,
    Directory,
    Url,
    SteamGame,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridPosition {
    pub row: u32,
    pub col: u32,
    #[serde(default = "one")]
    pub row_span: u32,
    #[serde(default = "one")]
    pub col_span: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct IconStyle {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub border_radius: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f32>,
}

/// One clickable entry in the grid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IconData {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Emoji or image reference
    #[serde(default)]
    pub icon: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    #[serde(rename = "type")]
    pub kind: IconKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub steam_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grid_position: Option<GridPosition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<IconStyle>,
    #[serde(default = "yes")]
    pub is_visible: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<i32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IconSize {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct IconLayout {
    pub grid_rows: u32,
    pub grid_cols: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gap: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon_size: Option<IconSize>,
    pub auto_arrange: bool,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IconConfig {
    pub layout: IconLayout,
    pub icons: Vec<IconData>,
}

fn one() -> u32 {
    1
}

fn yes() -> bool {
    true
}

impl Default for IconLayout {
    fn default() -> Self {
        Self {
            grid_rows: 4,
            grid_cols: 4,
            gap: None,
            icon_size: None,
            auto_arrange: true,
        }
    }
}

impl IconConfig {
    pub fn path() -> PathBuf {
        let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push(crate::constants::config::APP_DIR);
        path.push(crate::constants::config::ICONS_FILENAME);
        path
    }

    /// Load icons; an absent or broken file yields an empty grid
    pub fn load_from(path: &Path) -> Self {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) => {
                info!(path = %path.display(), error = %e, "No icon file, starting with an empty grid");
                return Self::default();
            }
        };
        match serde_json::from_str::<IconConfig>(&contents) {
            Ok(config) => {
                info!(path = %path.display(), icons = config.icons.len(), "Loaded icon config");
                config
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to parse icon config, starting with an empty grid");
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_icon_entries() {
        let config: IconConfig = serde_json::from_str(
            r#"{
                "layout": { "gridRows": 2, "gridCols": 3, "gap": 8 },
                "icons": [
                    { "id": "term", "title": "Terminal", "icon": "T", "type": "app", "path": "/usr/bin/alacritty" },
                    { "id": "cs", "title": "Counter-Strike", "icon": "C", "type": "steam-game", "steamId": "730",
                      "gridPosition": { "row": 1, "col": 2 }, "isVisible": false }
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(config.layout.grid_cols, 3);
        assert_eq!(config.layout.gap, Some(8));
        assert!(config.layout.auto_arrange);
        assert_eq!(config.icons[0].kind, IconKind::App);
        assert!(config.icons[0].is_visible);
        assert_eq!(config.icons[1].kind, IconKind::SteamGame);
        assert_eq!(config.icons[1].steam_id.as_deref(), Some("730"));
        assert_eq!(
            config.icons[1].grid_position,
            Some(GridPosition { row: 1, col: 2, row_span: 1, col_span: 1 })
        );
        assert!(!config.icons[1].is_visible);
    }

    #[test]
    fn test_missing_icon_file_is_empty() {
        let config = IconConfig::load_from(Path::new("/nonexistent/desk-icons/icons.json"));
        assert!(config.icons.is_empty());
        assert_eq!(config.layout, IconLayout::default());
    }

    #[test]
    fn test_icon_file_is_only_read() {
        let dir = std::env::temp_dir().join(format!("desk-icons-icons-test-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("icons.json");
        let contents = r#"{ "icons": [ { "id": "docs", "title": "Docs", "icon": "D", "type": "directory", "path": "/home" } ] }"#;
        fs::write(&path, contents).unwrap();

        let config = IconConfig::load_from(&path);
        assert_eq!(config.icons.len(), 1);
        assert_eq!(config.icons[0].kind, IconKind::Directory);
        assert_eq!(fs::read_to_string(&path).unwrap(), contents);

        fs::write(&path, "{ broken").unwrap();
        assert!(IconConfig::load_from(&path).icons.is_empty());
        let _ = fs::remove_dir_all(&dir);
    }
}
