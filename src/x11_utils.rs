use anyhow::{Context, Result};
use x11rb::connection::Connection;
use x11rb::protocol::xproto::*;
use x11rb::rust_connection::RustConnection;
use x11rb::wrapper::ConnectionExt as WrapperExt;

use crate::config::PlatformLevel;
use crate::constants::x11;

/// Application context holding immutable shared state
pub struct AppContext<'a> {
    pub conn: &'a RustConnection,
    pub screen: &'a Screen,
    pub atoms: &'a CachedAtoms,
}

/// Pre-cached X11 atoms to avoid repeated roundtrips
#[derive(Debug)]
pub struct CachedAtoms {
    pub wm_protocols: Atom,
    pub wm_delete_window: Atom,
    pub wm_class: Atom,
    pub net_wm_name: Atom,
    pub utf8_string: Atom,
    pub net_wm_pid: Atom,
    pub net_wm_state: Atom,
    pub net_wm_state_above: Atom,
    pub net_wm_state_below: Atom,
    pub net_wm_state_skip_taskbar: Atom,
    pub net_wm_state_skip_pager: Atom,
    pub net_wm_state_sticky: Atom,
    pub net_wm_desktop: Atom,
    pub net_wm_window_type: Atom,
    pub net_wm_window_type_normal: Atom,
    pub net_wm_window_type_utility: Atom,
    pub net_wm_window_type_menu: Atom,
    pub net_wm_window_type_dialog: Atom,
    pub net_wm_window_type_toolbar: Atom,
    pub net_wm_window_type_dock: Atom,
    pub net_wm_window_type_popup_menu: Atom,
    pub net_wm_window_type_notification: Atom,
    pub net_wm_window_opacity: Atom,
    pub net_workarea: Atom,
    pub net_current_desktop: Atom,
    pub net_active_window: Atom,
    pub motif_wm_hints: Atom,
}

fn intern(conn: &RustConnection, name: &str) -> Result<Atom> {
    Ok(conn
        .intern_atom(false, name.as_bytes())
        .with_context(|| format!("Failed to intern {name} atom"))?
        .reply()
        .with_context(|| format!("Failed to get reply for {name} atom"))?
        .atom)
}

impl CachedAtoms {
    pub fn new(conn: &RustConnection) -> Result<Self> {
        // Do all intern_atom roundtrips once at startup
        Ok(Self {
            wm_protocols: intern(conn, "WM_PROTOCOLS")?,
            wm_delete_window: intern(conn, "WM_DELETE_WINDOW")?,
            wm_class: intern(conn, "WM_CLASS")?,
            net_wm_name: intern(conn, "_NET_WM_NAME")?,
            utf8_string: intern(conn, "UTF8_STRING")?,
            net_wm_pid: intern(conn, "_NET_WM_PID")?,
            net_wm_state: intern(conn, "_NET_WM_STATE")?,
            net_wm_state_above: intern(conn, "_NET_WM_STATE_ABOVE")?,
            net_wm_state_below: intern(conn, "_NET_WM_STATE_BELOW")?,
            net_wm_state_skip_taskbar: intern(conn, "_NET_WM_STATE_SKIP_TASKBAR")?,
            net_wm_state_skip_pager: intern(conn, "_NET_WM_STATE_SKIP_PAGER")?,
            net_wm_state_sticky: intern(conn, "_NET_WM_STATE_STICKY")?,
            net_wm_desktop: intern(conn, "_NET_WM_DESKTOP")?,
            net_wm_window_type: intern(conn, "_NET_WM_WINDOW_TYPE")?,
            net_wm_window_type_normal: intern(conn, "_NET_WM_WINDOW_TYPE_NORMAL")?,
            net_wm_window_type_utility: intern(conn, "_NET_WM_WINDOW_TYPE_UTILITY")?,
            net_wm_window_type_menu: intern(conn, "_NET_WM_WINDOW_TYPE_MENU")?,
            net_wm_window_type_dialog: intern(conn, "_NET_WM_WINDOW_TYPE_DIALOG")?,
            net_wm_window_type_toolbar: intern(conn, "_NET_WM_WINDOW_TYPE_TOOLBAR")?,
            net_wm_window_type_dock: intern(conn, "_NET_WM_WINDOW_TYPE_DOCK")?,
            net_wm_window_type_popup_menu: intern(conn, "_NET_WM_WINDOW_TYPE_POPUP_MENU")?,
            net_wm_window_type_notification: intern(conn, "_NET_WM_WINDOW_TYPE_NOTIFICATION")?,
            net_wm_window_opacity: intern(conn, "_NET_WM_WINDOW_OPACITY")?,
            net_workarea: intern(conn, "_NET_WORKAREA")?,
            net_current_desktop: intern(conn, "_NET_CURRENT_DESKTOP")?,
            net_active_window: intern(conn, "_NET_ACTIVE_WINDOW")?,
            motif_wm_hints: intern(conn, "_MOTIF_WM_HINTS")?,
        })
    }

    /// Window type hint used to express a fine stacking level.
    /// Most EWMH window managers stack these types in the same relative order
    /// as the corresponding macOS window levels.
    pub fn window_type_for(&self, level: Option<PlatformLevel>) -> Atom {
        match level {
            None | Some(PlatformLevel::Normal) => self.net_wm_window_type_normal,
            Some(PlatformLevel::Floating) => self.net_wm_window_type_utility,
            Some(PlatformLevel::TornOffMenu) => self.net_wm_window_type_menu,
            Some(PlatformLevel::ModalPanel) => self.net_wm_window_type_dialog,
            Some(PlatformLevel::MainMenu) => self.net_wm_window_type_toolbar,
            Some(PlatformLevel::Status) => self.net_wm_window_type_dock,
            Some(PlatformLevel::PopUpMenu) => self.net_wm_window_type_popup_menu,
            Some(PlatformLevel::ScreenSaver) => self.net_wm_window_type_notification,
        }
    }
}

/// Ask the window manager to add or remove up to two `_NET_WM_STATE` atoms
pub fn send_wm_state(
    conn: &RustConnection,
    screen: &Screen,
    atoms: &CachedAtoms,
    window: Window,
    add: bool,
    first: Atom,
    second: Atom,
) -> Result<()> {
    let action = if add { x11::NET_WM_STATE_ADD } else { x11::NET_WM_STATE_REMOVE };
    let event = ClientMessageEvent::new(
        32,
        window,
        atoms.net_wm_state,
        [action, first, second, x11::SOURCE_PAGER, 0],
    );
    conn.send_event(
        false,
        screen.root,
        EventMask::SUBSTRUCTURE_NOTIFY | EventMask::SUBSTRUCTURE_REDIRECT,
        event,
    )
    .context(format!("Failed to send _NET_WM_STATE change for window {}", window))?;
    Ok(())
}

/// Move a window to a desktop (`x11::ALL_DESKTOPS` for every desktop)
pub fn send_wm_desktop(
    conn: &RustConnection,
    screen: &Screen,
    atoms: &CachedAtoms,
    window: Window,
    desktop: u32,
) -> Result<()> {
    let event = ClientMessageEvent::new(
        32,
        window,
        atoms.net_wm_desktop,
        [desktop, x11::SOURCE_PAGER, 0, 0, 0],
    );
    conn.send_event(
        false,
        screen.root,
        EventMask::SUBSTRUCTURE_NOTIFY | EventMask::SUBSTRUCTURE_REDIRECT,
        event,
    )
    .context(format!("Failed to send _NET_WM_DESKTOP change for window {}", window))?;
    Ok(())
}

/// Replace `_NET_WM_WINDOW_TYPE` on a window
pub fn set_window_type(conn: &RustConnection, atoms: &CachedAtoms, window: Window, window_type: Atom) -> Result<()> {
    conn.change_property32(
        PropMode::REPLACE,
        window,
        atoms.net_wm_window_type,
        AtomEnum::ATOM,
        &[window_type],
    )
    .context(format!("Failed to set _NET_WM_WINDOW_TYPE for window {}", window))?;
    Ok(())
}

/// Motif hints: no decorations, and only the allowed WM functions
pub fn set_motif_hints(conn: &RustConnection, atoms: &CachedAtoms, window: Window, resizable: bool, movable: bool) -> Result<()> {
    let mut functions = x11::MWM_FUNC_CLOSE;
    if resizable {
        functions |= x11::MWM_FUNC_RESIZE;
    }
    if movable {
        functions |= x11::MWM_FUNC_MOVE;
    }
    let flags = x11::MWM_HINTS_FUNCTIONS | x11::MWM_HINTS_DECORATIONS;
    conn.change_property32(
        PropMode::REPLACE,
        window,
        atoms.motif_wm_hints,
        atoms.motif_wm_hints,
        &[flags, functions, 0, 0, 0],
    )
    .context(format!("Failed to set _MOTIF_WM_HINTS for window {}", window))?;
    Ok(())
}

/// Read `_NET_WORKAREA` for the current desktop, if the window manager publishes it
pub fn current_workarea(conn: &RustConnection, screen: &Screen, atoms: &CachedAtoms) -> Result<Option<(i32, i32, u32, u32)>> {
    let desktop = conn
        .get_property(false, screen.root, atoms.net_current_desktop, AtomEnum::CARDINAL, 0, 1)
        .context("Failed to query _NET_CURRENT_DESKTOP")?
        .reply()
        .context("Failed to get reply for _NET_CURRENT_DESKTOP")?
        .value32()
        .and_then(|mut values| values.next())
        .unwrap_or(0) as usize;

    let values: Vec<u32> = match conn
        .get_property(false, screen.root, atoms.net_workarea, AtomEnum::CARDINAL, 0, u32::MAX)
        .context("Failed to query _NET_WORKAREA")?
        .reply()
        .context("Failed to get reply for _NET_WORKAREA")?
        .value32()
    {
        Some(values) => values.collect(),
        None => return Ok(None),
    };

    let start = desktop * 4;
    let area = values.get(start..start + 4).or_else(|| values.get(0..4));
    Ok(area.map(|a| (a[0] as i32, a[1] as i32, a[2], a[3])))
}

/// Resolve an atom's name (used for RandR monitor labels)
pub fn atom_name(conn: &RustConnection, atom: Atom) -> Result<String> {
    let reply = conn
        .get_atom_name(atom)
        .context(format!("Failed to query name of atom {}", atom))?
        .reply()
        .context(format!("Failed to get reply for name of atom {}", atom))?;
    Ok(String::from_utf8_lossy(&reply.name).into_owned())
}

/// Hand keyboard focus back to whatever is under the pointer
pub fn release_focus(conn: &RustConnection) -> Result<()> {
    conn.set_input_focus(InputFocus::POINTER_ROOT, InputFocus::POINTER_ROOT, x11rb::CURRENT_TIME)
        .context("Failed to return input focus to pointer root")?;
    conn.flush().context("Failed to flush X11 connection after releasing focus")?;
    Ok(())
}
