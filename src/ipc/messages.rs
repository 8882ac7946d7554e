//! IPC message types for settings panel / CLI ↔ widget daemon communication

use serde::{Deserialize, Serialize};

use crate::config::{AppConfig, PlatformLevel, WindowLevel};
use crate::display::DisplayDescriptor;

/// Requests sent to the widget daemon
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum WidgetRequest {
    /// Health check
    Ping,

    /// Current in-memory configuration
    GetConfig,

    /// Replace the configuration and re-apply it to every open window
    UpdateConfig(AppConfig),

    /// Re-read the config and icon files from disk
    ReloadConfig,

    /// Change the stacking level of every open window
    SetWindowLevel {
        level: WindowLevel,
        fine_level: Option<PlatformLevel>,
    },

    BringToFront,

    /// Allow or forbid keyboard focus on every open window
    SetFocusable { focusable: bool },

    ListDisplays,

    /// Open another widget window; `None` uses the configured display
    CreateWindow { display_index: Option<usize> },

    CloseSecondaryWindows,

    /// Request graceful shutdown
    Shutdown,
}

/// Responses sent back by the widget daemon
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum WidgetResponse {
    /// Health check response
    Pong,

    Config(AppConfig),

    Displays(Vec<DisplayDescriptor>),

    /// Acknowledgment that request was processed
    Ready,

    /// Error occurred
    Error(String),
}
