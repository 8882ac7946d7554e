//! Application-wide constants
//!
//! This module contains all magic numbers and string literals used throughout
//! the application, providing a single source of truth for constant values.

/// Window placement constants
pub mod positioning {
    /// Gap kept between the window and the work-area edge for left/right/top/bottom
    pub const EDGE_MARGIN: i32 = 20;
}

/// Configuration file locations
pub mod config {
    /// Directory under the XDG config dir
    pub const APP_DIR: &str = "desk-icons";

    /// Window/UI/behavior settings
    pub const FILENAME: &str = "window-config.json";

    /// Icon grid layout and entries
    pub const ICONS_FILENAME: &str = "icons.json";
}

/// IPC socket constants
pub mod ipc {
    /// Socket path relative to XDG_RUNTIME_DIR (or the cache dir)
    pub const SOCKET_NAME: &str = "desk-icons/widget.sock";

    /// Maximum message size (10 MB) to prevent DoS via memory exhaustion
    pub const MAX_MESSAGE_SIZE: usize = 10 * 1024 * 1024;
}

/// X11 protocol constants
pub mod x11 {
    /// `_NET_WM_STATE` client message action: remove
    pub const NET_WM_STATE_REMOVE: u32 = 0;

    /// `_NET_WM_STATE` client message action: add
    pub const NET_WM_STATE_ADD: u32 = 1;

    /// Source indication for EWMH client messages (2 = pager/direct user action)
    pub const SOURCE_PAGER: u32 = 2;

    /// `_NET_WM_DESKTOP` value meaning "all desktops"
    pub const ALL_DESKTOPS: u32 = 0xFFFF_FFFF;

    /// `_MOTIF_WM_HINTS` flag: functions field is valid
    pub const MWM_HINTS_FUNCTIONS: u32 = 1 << 0;

    /// `_MOTIF_WM_HINTS` flag: decorations field is valid
    pub const MWM_HINTS_DECORATIONS: u32 = 1 << 1;

    /// `_MOTIF_WM_HINTS` function bits
    pub const MWM_FUNC_RESIZE: u32 = 1 << 1;
    pub const MWM_FUNC_MOVE: u32 = 1 << 2;
    pub const MWM_FUNC_CLOSE: u32 = 1 << 5;

    /// WM_CLASS value (instance\0class\0)
    pub const WM_CLASS: &[u8] = b"desk-icons\0desk-icons\0";

    /// Window title
    pub const WM_NAME: &[u8] = b"Desktop Icons";

    /// Core font used for icon titles
    pub const TITLE_FONT: &[u8] = b"fixed";
}

/// Mouse button constants
pub mod mouse {
    /// Left mouse button number
    pub const BUTTON_LEFT: u8 = 1;
}

/// Icon grid drawing constants
pub mod grid {
    /// Default cell gap when the layout does not set one
    pub const DEFAULT_GAP: u32 = 12;

    /// Padding between the window border and the first cell
    pub const PADDING: u32 = 16;

    /// Upper bound on declared rows and columns
    pub const MAX_TRACKS: u32 = 256;

    /// Height reserved below each icon tile for its title
    pub const TITLE_HEIGHT: u32 = 16;

    /// Default tile color for icons without a style
    pub const TILE_COLOR: u32 = 0x3A3F4B;

    /// Window background per theme
    pub const BACKGROUND_DARK: u32 = 0x1E2128;
    pub const BACKGROUND_LIGHT: u32 = 0xF2F2F2;

    /// Title text color per theme
    pub const TEXT_DARK: u32 = 0xFFFFFF;
    pub const TEXT_LIGHT: u32 = 0x202020;
}

/// Shell operation constants
pub mod shell {
    /// Desktop opener used for files, directories, URLs and steam:// links
    pub const OPENER: &str = "xdg-open";

    /// Steam URI prefix for launching a game by app id
    pub const STEAM_RUN_PREFIX: &str = "steam://rungameid/";
}

/// Daemon loop timing
pub mod daemon {
    /// Sleep between event polls when nothing is pending
    pub const IDLE_SLEEP_MS: u64 = 16;

    /// How long startup waits for the tray to register with a StatusNotifier host
    pub const TRAY_REGISTER_TIMEOUT_MS: u64 = 3000;
}
