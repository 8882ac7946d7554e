//! Window stacking: always-on-top levels and stay-behind mode
//!
//! `WindowLevel` is the authoritative policy; the optional `PlatformLevel`
//! only refines `AlwaysOnTop`. Stay-behind has no dedicated X11 primitive that
//! window managers honor consistently, so it is done by focus interception: a
//! stay-behind window may receive focus but gives it away (and lowers itself)
//! as soon as it gets it.

use std::collections::HashSet;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::config::{PlatformLevel, WindowLevel, WindowSpec};
use crate::handle::WindowHandle;
use crate::types::WindowId;

/// Concrete stacking request for one window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackingDirective {
    pub always_on_top: bool,
    pub fine_level: Option<PlatformLevel>,
    pub stay_behind: bool,
}

/// Map the coarse/fine level pair of `spec` to a directive
pub fn resolve_stacking(spec: &WindowSpec) -> StackingDirective {
    match spec.window_level {
        WindowLevel::Default => StackingDirective {
            always_on_top: false,
            fine_level: None,
            stay_behind: false,
        },
        WindowLevel::AlwaysOnTop => StackingDirective {
            always_on_top: true,
            fine_level: spec.level,
            stay_behind: false,
        },
        WindowLevel::StayBehind => StackingDirective {
            always_on_top: false,
            fine_level: None,
            stay_behind: true,
        },
    }
}

/// Owns the set of windows currently in stay-behind mode.
///
/// Membership in `stay_behind` is the only record of the mode: a window is in
/// the set exactly while its focus subscription is installed.
#[derive(Debug, Default)]
pub struct StackingCoordinator {
    stay_behind: HashSet<WindowId>,
}

impl StackingCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_stay_behind(&self, id: WindowId) -> bool {
        self.stay_behind.contains(&id)
    }

    pub fn stay_behind_count(&self) -> usize {
        self.stay_behind.len()
    }

    /// Apply `directive` to `handle`. Platform failures are logged and the
    /// remaining steps still run.
    pub fn apply<H: WindowHandle + ?Sized>(&mut self, handle: &mut H, directive: StackingDirective) {
        let id = handle.id();
        if let Err(e) = handle.set_always_on_top(directive.always_on_top, directive.fine_level) {
            error!(window = id, error = %format!("{e:#}"), "Failed to set always-on-top");
        }

        if directive.stay_behind {
            if let Err(e) = self.attach_stay_behind(handle) {
                error!(window = id, error = %format!("{e:#}"), "Failed to enter stay-behind mode");
            }
        } else {
            self.detach_stay_behind(handle);
        }
    }

    /// inactive -> active: register, subscribe to focus, give focus away now.
    /// Attaching an already active window does nothing.
    pub fn attach_stay_behind<H: WindowHandle + ?Sized>(&mut self, handle: &mut H) -> Result<()> {
        let id = handle.id();
        if self.stay_behind.contains(&id) {
            debug!(window = id, "Already in stay-behind mode");
            return Ok(());
        }

        handle.subscribe_focus()?;
        self.stay_behind.insert(id);
        info!(window = id, "Stay-behind mode enabled");

        if let Err(e) = handle.relinquish_focus() {
            warn!(window = id, error = %format!("{e:#}"), "Failed to relinquish focus");
        }
        Ok(())
    }

    /// active -> inactive. Safe to call on a window that is not in the set.
    pub fn detach_stay_behind<H: WindowHandle + ?Sized>(&mut self, handle: &mut H) {
        let id = handle.id();
        if !self.stay_behind.remove(&id) {
            return;
        }
        if let Err(e) = handle.unsubscribe_focus() {
            warn!(window = id, error = %format!("{e:#}"), "Failed to remove focus subscription");
        }
        info!(window = id, "Stay-behind mode disabled");
    }

    /// Drop a window that no longer exists; no calls are made on it
    pub fn forget(&mut self, id: WindowId) -> bool {
        let removed = self.stay_behind.remove(&id);
        if removed {
            debug!(window = id, "Forgot destroyed stay-behind window");
        }
        removed
    }

    /// Focus-gained notification. Stay-behind windows relinquish focus once
    /// per notification; returns whether that happened.
    pub fn on_focus_gained<H: WindowHandle + ?Sized>(&mut self, handle: &mut H) -> bool {
        let id = handle.id();
        if !self.stay_behind.contains(&id) {
            return false;
        }
        debug!(window = id, "Stay-behind window gained focus, relinquishing");
        if let Err(e) = handle.relinquish_focus() {
            warn!(window = id, error = %format!("{e:#}"), "Failed to relinquish focus");
        }
        true
    }

    /// Tear down every subscription still held by a live window and clear the set
    pub fn detach_all<'h, H>(&mut self, handles: impl IntoIterator<Item = &'h mut H>)
    where
        H: WindowHandle + 'h,
    {
        for handle in handles {
            self.detach_stay_behind(handle);
        }
        if !self.stay_behind.is_empty() {
            debug!(remaining = self.stay_behind.len(), "Clearing stay-behind entries without live windows");
            self.stay_behind.clear();
        }
    }
}
