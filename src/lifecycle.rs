//! Live widget windows and the config they are kept in sync with
//!
//! The manager does not create or destroy platform windows itself; the daemon
//! hands windows in and receives them back for destruction. Every
//! configuration change is re-applied to the existing windows in place.

use std::collections::BTreeMap;

use tracing::{debug, error, info, warn};

use crate::config::{AppConfig, PlatformLevel, WindowLevel};
use crate::display::DisplayDescriptor;
use crate::geometry::{resolve_on_display, ResolvedGeometry};
use crate::handle::WindowHandle;
use crate::stacking::{resolve_stacking, StackingCoordinator};
use crate::types::WindowId;

#[derive(Debug)]
struct ManagedWindow<W> {
    handle: W,
    /// Requested display; `None` follows `AppConfig::display_index`
    display_index: Option<usize>,
    main: bool,
}

pub struct WindowManager<W: WindowHandle> {
    config: AppConfig,
    coordinator: StackingCoordinator,
    windows: BTreeMap<WindowId, ManagedWindow<W>>,
}

impl<W: WindowHandle> WindowManager<W> {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            coordinator: StackingCoordinator::new(),
            windows: BTreeMap::new(),
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn coordinator(&self) -> &StackingCoordinator {
        &self.coordinator
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    pub fn contains(&self, id: WindowId) -> bool {
        self.windows.contains_key(&id)
    }

    pub fn ids(&self) -> Vec<WindowId> {
        self.windows.keys().copied().collect()
    }

    pub fn get(&self, id: WindowId) -> Option<&W> {
        self.windows.get(&id).map(|w| &w.handle)
    }

    pub fn get_mut(&mut self, id: WindowId) -> Option<&mut W> {
        self.windows.get_mut(&id).map(|w| &mut w.handle)
    }

    pub fn handles_mut(&mut self) -> impl Iterator<Item = &mut W> {
        self.windows.values_mut().map(|w| &mut w.handle)
    }

    /// Geometry a window on `display_index` would get under the current config
    pub fn geometry_for(&self, displays: &[DisplayDescriptor], display_index: Option<usize>) -> Option<ResolvedGeometry> {
        resolve_on_display(&self.config.window, displays, display_index.or(self.config.display_index))
    }

    /// Take ownership of a freshly created window and bring it in line with the config
    pub fn insert(&mut self, handle: W, display_index: Option<usize>, main: bool, displays: &[DisplayDescriptor]) {
        let id = handle.id();
        info!(window = id, ?display_index, main, "Managing window");
        self.windows.insert(id, ManagedWindow { handle, display_index, main });
        self.apply(id, displays);
    }

    /// Resolve geometry and stacking for one window and apply both.
    /// Platform failures are logged; the window may end up partially configured.
    pub fn apply(&mut self, id: WindowId, displays: &[DisplayDescriptor]) {
        let Some(entry) = self.windows.get_mut(&id) else {
            warn!(window = id, "Apply requested for unknown window");
            return;
        };
        let spec = &self.config.window;
        let index = entry.display_index.or(self.config.display_index);

        match resolve_on_display(spec, displays, index) {
            Some(geometry) => {
                info!(window = id, x = geometry.x, y = geometry.y, width = geometry.width, height = geometry.height, "Applying geometry");
                if let Err(e) = entry.handle.set_size(geometry.width, geometry.height) {
                    error!(window = id, error = %format!("{e:#}"), "Failed to resize window");
                }
                if let Err(e) = entry.handle.set_position(geometry.x, geometry.y) {
                    error!(window = id, error = %format!("{e:#}"), "Failed to move window");
                }
            }
            None => warn!(window = id, "No display attached, keeping current geometry"),
        }

        if let Err(e) = entry.handle.apply_hints(spec) {
            error!(window = id, error = %format!("{e:#}"), "Failed to apply window hints");
        }
        if let Err(e) = entry.handle.set_focusable(spec.focusable) {
            error!(window = id, error = %format!("{e:#}"), "Failed to set input hint");
        }

        let directive = resolve_stacking(spec);
        self.coordinator.apply(&mut entry.handle, directive);
    }

    pub fn apply_all(&mut self, displays: &[DisplayDescriptor]) {
        for id in self.ids() {
            self.apply(id, displays);
        }
    }

    /// Replace the config and re-apply it to every live window
    pub fn update_config(&mut self, config: AppConfig, displays: &[DisplayDescriptor]) {
        info!(windows = self.windows.len(), "Broadcasting config update");
        self.config = config;
        self.apply_all(displays);
        debug!(stay_behind = self.coordinator.stay_behind_count(), "Config update applied");
    }

    pub fn set_window_level(&mut self, level: WindowLevel, fine_level: Option<PlatformLevel>, displays: &[DisplayDescriptor]) {
        info!(level = level.as_str(), fine_level = ?fine_level, "Window level change requested");
        self.config.window.window_level = level;
        self.config.window.level = fine_level;
        self.apply_all(displays);
    }

    /// Toggle keyboard focus for every window without touching geometry
    pub fn set_focusable(&mut self, focusable: bool) {
        info!(focusable, "Focusable change requested");
        self.config.window.focusable = focusable;
        for (id, entry) in self.windows.iter_mut() {
            if let Err(e) = entry.handle.set_focusable(focusable) {
                error!(window = id, error = %format!("{e:#}"), "Failed to set input hint");
            }
        }
    }

    pub fn bring_to_front(&mut self) {
        for (id, entry) in self.windows.iter_mut() {
            if self.coordinator.is_stay_behind(*id) {
                continue;
            }
            if let Err(e) = entry.handle.raise() {
                error!(window = id, error = %format!("{e:#}"), "Failed to raise window");
            }
        }
    }

    pub fn on_focus_gained(&mut self, id: WindowId) -> bool {
        match self.windows.get_mut(&id) {
            Some(entry) => self.coordinator.on_focus_gained(&mut entry.handle),
            None => false,
        }
    }

    /// The platform window is already gone; drop bookkeeping without touching it
    pub fn window_destroyed(&mut self, id: WindowId) -> Option<W> {
        self.coordinator.forget(id);
        let removed = self.windows.remove(&id).map(|entry| entry.handle);
        if removed.is_some() {
            info!(window = id, "Window destroyed");
        }
        removed
    }

    /// Detach and hand back one window so the caller can destroy it
    pub fn remove(&mut self, id: WindowId) -> Option<W> {
        let mut entry = self.windows.remove(&id)?;
        self.coordinator.detach_stay_behind(&mut entry.handle);
        Some(entry.handle)
    }

    /// Detach and hand back every window that is not the main window
    pub fn take_secondary(&mut self) -> Vec<W> {
        let secondary: Vec<WindowId> = self
            .windows
            .iter()
            .filter(|(_, entry)| !entry.main)
            .map(|(id, _)| *id)
            .collect();
        info!(count = secondary.len(), "Closing secondary windows");
        secondary.into_iter().filter_map(|id| self.remove(id)).collect()
    }

    /// Detach everything (clearing the stay-behind set) and hand back all windows
    pub fn take_all(&mut self) -> Vec<W> {
        self.coordinator
            .detach_all(self.windows.values_mut().map(|entry| &mut entry.handle));
        std::mem::take(&mut self.windows)
            .into_values()
            .map(|entry| entry.handle)
            .collect()
    }
}
