//! Configuration management for desk-icons
//!
//! - **app**: window/ui/behavior settings (`window-config.json`)
//! - **window_spec**: the declarative window geometry and stacking description
//! - **icons**: icon grid entries (`icons.json`)

pub mod app;
pub mod icons;
pub mod window_spec;

// Re-export commonly used types
pub use app::{AppConfig, BehaviorConfig, Theme, UiConfig};
pub use icons::{IconConfig, IconData, IconKind, IconLayout};
pub use window_spec::{PlatformLevel, PositionSpec, PositionX, PositionY, SizeSpec, WindowLevel, WindowSpec};
