//! X11 event dispatch for widget windows

use anyhow::Result;
use tracing::{debug, info, warn};
use x11rb::protocol::xproto::{Atom, NotifyDetail, NotifyMode};
use x11rb::protocol::Event;

use crate::config::IconData;
use crate::constants::mouse;
use crate::handle::WindowHandle;
use crate::lifecycle::WindowManager;
use crate::types::WindowId;
use crate::widget::WidgetSurface;
use crate::x11_utils::CachedAtoms;

/// Work the daemon has to do in response to an event
#[derive(Debug, Clone, PartialEq)]
pub enum EventAction {
    Launch(IconData),
    /// The window manager asked to close this window
    CloseRequested(WindowId),
}

/// Atoms needed to recognize `WM_DELETE_WINDOW`
#[derive(Debug, Clone, Copy)]
pub struct ProtocolAtoms {
    pub wm_protocols: Atom,
    pub wm_delete_window: Atom,
}

impl From<&CachedAtoms> for ProtocolAtoms {
    fn from(atoms: &CachedAtoms) -> Self {
        Self {
            wm_protocols: atoms.wm_protocols,
            wm_delete_window: atoms.wm_delete_window,
        }
    }
}

pub fn handle_event<W>(manager: &mut WindowManager<W>, atoms: ProtocolAtoms, event: Event) -> Result<Option<EventAction>>
where
    W: WindowHandle + WidgetSurface,
{
    match event {
        Event::Expose(event) => {
            // Only the last of a batch of expose events repaints
            if event.count == 0
                && let Some(widget) = manager.get(event.window)
            {
                widget.redraw()?;
            }
        }
        Event::ConfigureNotify(event) => {
            if let Some(widget) = manager.get_mut(event.window) {
                widget.on_resized(event.width as u32, event.height as u32);
            }
        }
        Event::FocusIn(event) => {
            // Pointer-root focus and grab transitions are not real activations;
            // handing focus back to the pointer root would otherwise loop here
            if event.detail == NotifyDetail::POINTER || event.mode != NotifyMode::NORMAL {
                return Ok(None);
            }
            if manager.on_focus_gained(event.event) {
                debug!(window = event.event, "Relinquished focus of stay-behind window");
            }
        }
        Event::ButtonRelease(event) => {
            if event.detail != mouse::BUTTON_LEFT {
                return Ok(None);
            }
            let icon = manager
                .get(event.event)
                .and_then(|widget| widget.icon_at(event.event_x as i32, event.event_y as i32))
                .cloned();
            if let Some(icon) = icon {
                info!(window = event.event, icon = %icon.id, "Icon clicked");
                return Ok(Some(EventAction::Launch(icon)));
            }
        }
        Event::ClientMessage(event) => {
            let data = event.data.as_data32();
            if event.type_ == atoms.wm_protocols
                && data[0] == atoms.wm_delete_window
                && manager.contains(event.window)
            {
                info!(window = event.window, "Close requested by window manager");
                return Ok(Some(EventAction::CloseRequested(event.window)));
            }
        }
        Event::DestroyNotify(event) => {
            if let Some(mut widget) = manager.window_destroyed(event.window) {
                widget.mark_destroyed();
            }
        }
        Event::Error(error) => {
            warn!(error = ?error, "X11 protocol error");
        }
        _ => {}
    }
    Ok(None)
}
