//! Operations the core performs on a live window
//!
//! The lifecycle manager owns the windows; geometry and stacking logic only
//! talk to them through this trait. Every call may fail at the platform level,
//! callers log those failures and keep going.

use anyhow::Result;

use crate::config::{PlatformLevel, WindowSpec};
use crate::types::WindowId;

pub trait WindowHandle {
    fn id(&self) -> WindowId;

    fn set_size(&mut self, width: u32, height: u32) -> Result<()>;

    fn set_position(&mut self, x: i32, y: i32) -> Result<()>;

    /// Toggle always-on-top; `level` refines the stacking when enabled
    fn set_always_on_top(&mut self, on_top: bool, level: Option<PlatformLevel>) -> Result<()>;

    /// Give focus away and drop below other windows
    fn relinquish_focus(&mut self) -> Result<()>;

    /// Start delivering focus-gained notifications for this window
    fn subscribe_focus(&mut self) -> Result<()>;

    /// Stop delivering focus-gained notifications for this window
    fn unsubscribe_focus(&mut self) -> Result<()>;

    /// Pass-through flags: min size, resizable, movable, all workspaces
    fn apply_hints(&mut self, spec: &WindowSpec) -> Result<()>;

    fn raise(&mut self) -> Result<()>;

    /// Whether the window accepts keyboard focus
    fn set_focusable(&mut self, focusable: bool) -> Result<()>;
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use anyhow::bail;

    #[derive(Debug, Clone, PartialEq)]
    pub enum Call {
        SetSize(u32, u32),
        SetPosition(i32, i32),
        SetAlwaysOnTop(bool, Option<PlatformLevel>),
        RelinquishFocus,
        SubscribeFocus,
        UnsubscribeFocus,
        ApplyHints,
        Raise,
        SetFocusable(bool),
    }

    /// Records every call; optionally fails always-on-top requests
    #[derive(Debug, Default)]
    pub struct RecordingHandle {
        pub id: WindowId,
        pub calls: Vec<Call>,
        pub fail_always_on_top: bool,
    }

    impl RecordingHandle {
        pub fn new(id: WindowId) -> Self {
            Self { id, ..Self::default() }
        }

        pub fn count(&self, call: &Call) -> usize {
            self.calls.iter().filter(|c| *c == call).count()
        }
    }

    impl WindowHandle for RecordingHandle {
        fn id(&self) -> WindowId {
            self.id
        }

        fn set_size(&mut self, width: u32, height: u32) -> Result<()> {
            self.calls.push(Call::SetSize(width, height));
            Ok(())
        }

        fn set_position(&mut self, x: i32, y: i32) -> Result<()> {
            self.calls.push(Call::SetPosition(x, y));
            Ok(())
        }

        fn set_always_on_top(&mut self, on_top: bool, level: Option<PlatformLevel>) -> Result<()> {
            self.calls.push(Call::SetAlwaysOnTop(on_top, level));
            if self.fail_always_on_top {
                bail!("window manager rejected _NET_WM_STATE change");
            }
            Ok(())
        }

        fn relinquish_focus(&mut self) -> Result<()> {
            self.calls.push(Call::RelinquishFocus);
            Ok(())
        }

        fn subscribe_focus(&mut self) -> Result<()> {
            self.calls.push(Call::SubscribeFocus);
            Ok(())
        }

        fn unsubscribe_focus(&mut self) -> Result<()> {
            self.calls.push(Call::UnsubscribeFocus);
            Ok(())
        }

        fn apply_hints(&mut self, _spec: &WindowSpec) -> Result<()> {
            self.calls.push(Call::ApplyHints);
            Ok(())
        }

        fn raise(&mut self) -> Result<()> {
            self.calls.push(Call::Raise);
            Ok(())
        }

        fn set_focusable(&mut self, focusable: bool) -> Result<()> {
            self.calls.push(Call::SetFocusable(focusable));
            Ok(())
        }
    }
}
