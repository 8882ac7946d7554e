//! The desktop icon widget window
//!
//! A managed, undecorated X11 window that paints the icon grid with core
//! protocol requests. Stacking and geometry are driven from outside through
//! [`WindowHandle`]; the widget itself only knows how to draw and how to
//! translate clicks into icons.

pub mod grid;

use anyhow::{Context, Result};
use tracing::{debug, error, info};
use x11rb::connection::Connection;
use x11rb::properties::{WmHints, WmSizeHints};
use x11rb::protocol::xproto::*;
use x11rb::rust_connection::RustConnection;
use x11rb::wrapper::ConnectionExt as WrapperExt;

use crate::config::{AppConfig, IconConfig, IconData, PlatformLevel, Theme, WindowSpec};
use crate::constants::{grid as grid_style, x11};
use crate::geometry::ResolvedGeometry;
use crate::handle::WindowHandle;
use crate::types::WindowId;
use crate::x11_utils::{release_focus, send_wm_desktop, send_wm_state, set_motif_hints, set_window_type, AppContext, CachedAtoms};

use self::grid::GridLayout;

/// Approximate advance of the `fixed` core font
const GLYPH_WIDTH: u32 = 6;

fn base_event_mask() -> EventMask {
    EventMask::EXPOSURE | EventMask::STRUCTURE_NOTIFY | EventMask::BUTTON_PRESS | EventMask::BUTTON_RELEASE
}

/// `#rrggbb` / `#rgb` to a 24-bit pixel value
pub fn parse_hex_color(value: &str) -> Option<u32> {
    let hex = value.trim().strip_prefix('#')?;
    match hex.len() {
        6 => u32::from_str_radix(hex, 16).ok(),
        3 => {
            let short = u32::from_str_radix(hex, 16).ok()?;
            let (r, g, b) = ((short >> 8) & 0xF, (short >> 4) & 0xF, short & 0xF);
            Some((r * 0x11) << 16 | (g * 0x11) << 8 | b * 0x11)
        }
        _ => None,
    }
}

/// Title bytes for an 8-bit core font: non-ASCII becomes `?`, cut to `max_chars`
pub fn title_bytes(title: &str, max_chars: usize) -> Vec<u8> {
    let mut bytes: Vec<u8> = title
        .chars()
        .map(|c| if c.is_ascii() && !c.is_ascii_control() { c as u8 } else { b'?' })
        .collect();
    if bytes.len() > max_chars {
        bytes.truncate(max_chars.saturating_sub(2));
        if max_chars >= 2 {
            bytes.extend_from_slice(b"..");
        }
    }
    bytes
}

/// `_NET_WM_WINDOW_OPACITY` value for a 0.0..=1.0 transparency setting
pub fn opacity_value(transparency: f32) -> u32 {
    (transparency.clamp(0.0, 1.0) as f64 * u32::MAX as f64) as u32
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Palette {
    background: u32,
    text: u32,
}

impl Palette {
    fn for_theme(theme: Theme) -> Self {
        match theme {
            Theme::Dark => Self { background: grid_style::BACKGROUND_DARK, text: grid_style::TEXT_DARK },
            Theme::Light => Self { background: grid_style::BACKGROUND_LIGHT, text: grid_style::TEXT_LIGHT },
        }
    }
}

/// Drawing and input side of a widget window, driven by the event loop
pub trait WidgetSurface {
    fn redraw(&self) -> Result<()>;

    /// The server resized the window (WM or user drag)
    fn on_resized(&mut self, width: u32, height: u32);

    /// Icon under a window-relative point
    fn icon_at(&self, x: i32, y: i32) -> Option<&IconData>;

    /// The server already destroyed the window; skip teardown requests
    fn mark_destroyed(&mut self);
}

pub struct Widget<'a> {
    pub window: Window,
    width: u32,
    height: u32,
    icons: IconConfig,
    grid: GridLayout,
    palette: Palette,
    /// Set once the server reported the window gone; skips teardown requests
    destroyed: bool,

    root: Window,
    gc: Gcontext,
    font: Font,

    conn: &'a RustConnection,
    screen: &'a Screen,
    atoms: &'a CachedAtoms,
}

impl<'a> Widget<'a> {
    fn create_window(ctx: &AppContext, geometry: &ResolvedGeometry, background: u32) -> Result<Window> {
        let window = ctx.conn.generate_id()
            .context("Failed to generate X11 window ID")?;
        ctx.conn.create_window(
            ctx.screen.root_depth,
            window,
            ctx.screen.root,
            geometry.x.clamp(i16::MIN as i32, i16::MAX as i32) as i16,
            geometry.y.clamp(i16::MIN as i32, i16::MAX as i32) as i16,
            geometry.width.clamp(1, u16::MAX as u32) as u16,
            geometry.height.clamp(1, u16::MAX as u32) as u16,
            0,
            WindowClass::INPUT_OUTPUT,
            ctx.screen.root_visual,
            &CreateWindowAux::new()
                .background_pixel(background)
                .event_mask(base_event_mask()),
        )
        .context("Failed to create widget window")?;
        Ok(window)
    }

    /// Identity, protocols and initial EWMH state; all of it must be in place before mapping
    fn setup_window_properties(ctx: &AppContext, window: Window, config: &AppConfig) -> Result<()> {
        ctx.conn.change_property8(PropMode::REPLACE, window, ctx.atoms.wm_class, AtomEnum::STRING, x11::WM_CLASS)
            .context("Failed to set WM_CLASS")?;
        ctx.conn.change_property8(PropMode::REPLACE, window, AtomEnum::WM_NAME, AtomEnum::STRING, x11::WM_NAME)
            .context("Failed to set WM_NAME")?;
        ctx.conn.change_property8(PropMode::REPLACE, window, ctx.atoms.net_wm_name, ctx.atoms.utf8_string, x11::WM_NAME)
            .context("Failed to set _NET_WM_NAME")?;
        ctx.conn.change_property32(PropMode::REPLACE, window, ctx.atoms.wm_protocols, AtomEnum::ATOM, &[ctx.atoms.wm_delete_window])
            .context("Failed to set WM_PROTOCOLS")?;
        ctx.conn.change_property32(PropMode::REPLACE, window, ctx.atoms.net_wm_pid, AtomEnum::CARDINAL, &[std::process::id()])
            .context("Failed to set _NET_WM_PID")?;
        ctx.conn.change_property32(
            PropMode::REPLACE,
            window,
            ctx.atoms.net_wm_window_opacity,
            AtomEnum::CARDINAL,
            &[opacity_value(config.ui.transparency)],
        )
        .context("Failed to set window opacity")?;

        let mut state = Vec::new();
        if config.behavior.hide_from_taskbar {
            state.extend([ctx.atoms.net_wm_state_skip_taskbar, ctx.atoms.net_wm_state_skip_pager]);
        }
        if config.window.visible_on_all_workspaces {
            state.push(ctx.atoms.net_wm_state_sticky);
            ctx.conn.change_property32(PropMode::REPLACE, window, ctx.atoms.net_wm_desktop, AtomEnum::CARDINAL, &[x11::ALL_DESKTOPS])
                .context("Failed to set _NET_WM_DESKTOP")?;
        }
        ctx.conn.change_property32(PropMode::REPLACE, window, ctx.atoms.net_wm_state, AtomEnum::ATOM, &state)
            .context("Failed to set initial _NET_WM_STATE")?;

        set_motif_hints(ctx.conn, ctx.atoms, window, config.window.resizable, config.window.movable)?;
        Ok(())
    }

    fn create_gc(ctx: &AppContext, window: Window, palette: Palette) -> Result<(Font, Gcontext)> {
        let font = ctx.conn.generate_id()
            .context("Failed to generate ID for title font")?;
        ctx.conn.open_font(font, x11::TITLE_FONT)
            .context("Failed to open core font for icon titles")?;
        let gc = ctx.conn.generate_id()
            .context("Failed to generate ID for graphics context")?;
        ctx.conn.create_gc(
            gc,
            window,
            &CreateGCAux::new()
                .foreground(palette.text)
                .background(palette.background)
                .font(font)
                .graphics_exposures(0),
        )
        .context("Failed to create graphics context")?;
        Ok((font, gc))
    }

    /// Create the window at `geometry`. The window is not mapped until [`Widget::map`].
    pub fn new(ctx: &AppContext<'a>, config: &AppConfig, icons: &IconConfig, geometry: ResolvedGeometry) -> Result<Self> {
        let palette = Palette::for_theme(config.ui.theme);
        let window = Self::create_window(ctx, &geometry, palette.background)?;

        struct WindowGuard<'c> {
            conn: &'c RustConnection,
            window: Window,
            should_cleanup: bool,
        }

        impl Drop for WindowGuard<'_> {
            fn drop(&mut self) {
                if self.should_cleanup {
                    if let Err(e) = self.conn.destroy_window(self.window) {
                        error!(window = self.window, error = %e, "Failed to clean up window after initialization failure");
                    }
                    let _ = self.conn.flush();
                }
            }
        }

        let mut guard = WindowGuard { conn: ctx.conn, window, should_cleanup: true };

        Self::setup_window_properties(ctx, window, config)?;
        let (font, gc) = Self::create_gc(ctx, window, palette)?;

        let width = geometry.width.max(1);
        let height = geometry.height.max(1);
        let widget = Self {
            window,
            width,
            height,
            grid: GridLayout::compute(&icons.layout, &icons.icons, width, height),
            icons: icons.clone(),
            palette,
            destroyed: false,
            root: ctx.screen.root,
            gc,
            font,
            conn: ctx.conn,
            screen: ctx.screen,
            atoms: ctx.atoms,
        };

        info!(window, x = geometry.x, y = geometry.y, width, height, "Created widget window");
        guard.should_cleanup = false;
        Ok(widget)
    }

    pub fn map(&self) -> Result<()> {
        self.conn.map_window(self.window)
            .context(format!("Failed to map widget window {}", self.window))?;
        self.conn.flush()
            .context("Failed to flush X11 connection after mapping")?;
        Ok(())
    }

    pub fn unmap(&self) -> Result<()> {
        self.conn.unmap_window(self.window)
            .context(format!("Failed to unmap widget window {}", self.window))?;
        self.conn.flush()
            .context("Failed to flush X11 connection after unmapping")?;
        Ok(())
    }

    /// Theme and opacity changes from an updated config
    pub fn update_appearance(&mut self, config: &AppConfig) -> Result<()> {
        self.palette = Palette::for_theme(config.ui.theme);
        self.conn.change_window_attributes(self.window, &ChangeWindowAttributesAux::new().background_pixel(self.palette.background))
            .context("Failed to update window background")?;
        self.conn.change_property32(
            PropMode::REPLACE,
            self.window,
            self.atoms.net_wm_window_opacity,
            AtomEnum::CARDINAL,
            &[opacity_value(config.ui.transparency)],
        )
        .context("Failed to update window opacity")?;
        self.redraw()
    }

    pub fn set_icons(&mut self, icons: &IconConfig) -> Result<()> {
        self.icons = icons.clone();
        self.relayout();
        self.redraw()
    }

    fn relayout(&mut self) {
        self.grid = GridLayout::compute(&self.icons.layout, &self.icons.icons, self.width, self.height);
    }

    fn fill(&self, color: u32, rect: Rectangle) -> Result<()> {
        self.conn.change_gc(self.gc, &ChangeGCAux::new().foreground(color))
            .context("Failed to change fill color")?;
        self.conn.poly_fill_rectangle(self.window, self.gc, &[rect])
            .context("Failed to fill rectangle")?;
        Ok(())
    }

    fn set_event_mask(&self, mask: EventMask) -> Result<()> {
        self.conn.change_window_attributes(self.window, &ChangeWindowAttributesAux::new().event_mask(mask))
            .context(format!("Failed to change event mask for window {}", self.window))?;
        self.conn.flush()
            .context("Failed to flush X11 connection after changing event mask")?;
        Ok(())
    }

    fn restack(&self, mode: StackMode) -> Result<()> {
        self.conn.configure_window(self.window, &ConfigureWindowAux::new().stack_mode(mode))
            .context(format!("Failed to restack window {}", self.window))?;
        Ok(())
    }
}

impl WidgetSurface for Widget<'_> {
    /// Paint background, tiles and titles
    fn redraw(&self) -> Result<()> {
        self.fill(self.palette.background, Rectangle {
            x: 0,
            y: 0,
            width: self.width.min(u16::MAX as u32) as u16,
            height: self.height.min(u16::MAX as u32) as u16,
        })?;

        for cell in &self.grid.cells {
            let Some(icon) = self.icons.icons.get(cell.icon) else { continue };
            let style = icon.style.as_ref();
            let tile_color = style
                .and_then(|s| s.background_color.as_deref())
                .and_then(parse_hex_color)
                .unwrap_or(grid_style::TILE_COLOR);
            let text_color = style
                .and_then(|s| s.text_color.as_deref())
                .and_then(parse_hex_color)
                .unwrap_or(self.palette.text);

            let rect = cell.rect;
            // Tiles pushed past the X11 coordinate range are never visible
            let (Ok(x), Ok(y)) = (i16::try_from(rect.x), i16::try_from(rect.y)) else {
                continue;
            };
            self.fill(tile_color, Rectangle {
                x,
                y,
                width: rect.width.min(u16::MAX as u32) as u16,
                height: rect.height.min(u16::MAX as u32) as u16,
            })?;

            if rect.height < grid_style::TITLE_HEIGHT {
                continue;
            }
            let text = title_bytes(&icon.title, (rect.width / GLYPH_WIDTH) as usize);
            if text.is_empty() {
                continue;
            }
            let text_width = text.len() as u32 * GLYPH_WIDTH;
            let text_x = rect.x.saturating_add_unsigned(rect.width.saturating_sub(text_width) / 2)
                .min(i16::MAX as i32);
            let baseline = rect.bottom().saturating_sub(4).min(i16::MAX as i32);
            self.conn.change_gc(self.gc, &ChangeGCAux::new().foreground(text_color).background(tile_color))
                .context("Failed to change text colors")?;
            self.conn.image_text8(self.window, self.gc, text_x as i16, baseline as i16, &text)
                .context(format!("Failed to draw title for icon '{}'", icon.id))?;
        }

        self.conn.flush()
            .context("Failed to flush X11 connection after redraw")?;
        Ok(())
    }

    fn on_resized(&mut self, width: u32, height: u32) {
        if (width, height) != (self.width, self.height) {
            debug!(window = self.window, width, height, "Widget resized");
            self.width = width.max(1);
            self.height = height.max(1);
            self.relayout();
        }
    }

    fn icon_at(&self, x: i32, y: i32) -> Option<&IconData> {
        self.grid.hit_test(x, y).and_then(|index| self.icons.icons.get(index))
    }

    fn mark_destroyed(&mut self) {
        self.destroyed = true;
    }
}

impl WindowHandle for Widget<'_> {
    fn id(&self) -> WindowId {
        self.window
    }

    fn set_size(&mut self, width: u32, height: u32) -> Result<()> {
        let width = width.max(1);
        let height = height.max(1);
        self.conn.configure_window(self.window, &ConfigureWindowAux::new().width(width).height(height))
            .context(format!("Failed to resize window {} to {}x{}", self.window, width, height))?;
        self.conn.flush()
            .context("Failed to flush X11 connection after resize")?;
        self.on_resized(width, height);
        Ok(())
    }

    fn set_position(&mut self, x: i32, y: i32) -> Result<()> {
        self.conn.configure_window(self.window, &ConfigureWindowAux::new().x(x).y(y))
            .context(format!("Failed to move window {} to ({}, {})", self.window, x, y))?;
        self.conn.flush()
            .context("Failed to flush X11 connection after move")?;
        Ok(())
    }

    fn set_always_on_top(&mut self, on_top: bool, level: Option<PlatformLevel>) -> Result<()> {
        let window_type = if on_top {
            self.atoms.window_type_for(level)
        } else {
            self.atoms.net_wm_window_type_normal
        };
        set_window_type(self.conn, self.atoms, self.window, window_type)?;
        send_wm_state(self.conn, self.screen, self.atoms, self.window, on_top, self.atoms.net_wm_state_above, 0)?;
        if on_top {
            send_wm_state(self.conn, self.screen, self.atoms, self.window, false, self.atoms.net_wm_state_below, 0)?;
        }
        self.conn.flush()
            .context("Failed to flush X11 connection after stacking change")?;
        debug!(window = self.window, on_top, ?level, "Always-on-top updated");
        Ok(())
    }

    fn relinquish_focus(&mut self) -> Result<()> {
        self.restack(StackMode::BELOW)?;
        release_focus(self.conn)
    }

    fn subscribe_focus(&mut self) -> Result<()> {
        self.set_event_mask(base_event_mask() | EventMask::FOCUS_CHANGE)
    }

    fn unsubscribe_focus(&mut self) -> Result<()> {
        self.set_event_mask(base_event_mask())
    }

    fn apply_hints(&mut self, spec: &WindowSpec) -> Result<()> {
        let mut hints = WmSizeHints::new();
        if spec.resizable {
            hints.min_size = Some((spec.min_width as i32, spec.min_height as i32));
        } else {
            let fixed = (self.width as i32, self.height as i32);
            hints.min_size = Some(fixed);
            hints.max_size = Some(fixed);
        }
        hints.set_normal_hints(self.conn, self.window)
            .context(format!("Failed to set WM_NORMAL_HINTS for window {}", self.window))?;

        set_motif_hints(self.conn, self.atoms, self.window, spec.resizable, spec.movable)?;

        if spec.visible_on_all_workspaces {
            send_wm_desktop(self.conn, self.screen, self.atoms, self.window, x11::ALL_DESKTOPS)?;
        }
        send_wm_state(
            self.conn,
            self.screen,
            self.atoms,
            self.window,
            spec.visible_on_all_workspaces,
            self.atoms.net_wm_state_sticky,
            0,
        )?;
        self.conn.flush()
            .context("Failed to flush X11 connection after window hints")?;
        Ok(())
    }

    fn raise(&mut self) -> Result<()> {
        self.restack(StackMode::ABOVE)?;
        let event = ClientMessageEvent::new(
            32,
            self.window,
            self.atoms.net_active_window,
            [x11::SOURCE_PAGER, x11rb::CURRENT_TIME, 0, 0, 0],
        );
        self.conn.send_event(
            false,
            self.root,
            EventMask::SUBSTRUCTURE_REDIRECT | EventMask::SUBSTRUCTURE_NOTIFY,
            event,
        )
        .context(format!("Failed to send activation request for window {}", self.window))?;
        self.conn.flush()
            .context("Failed to flush X11 connection after raise")?;
        Ok(())
    }

    fn set_focusable(&mut self, focusable: bool) -> Result<()> {
        // WM_HINTS input=false tells the window manager never to give us focus
        let mut hints = WmHints::new();
        hints.input = Some(focusable);
        hints.set(self.conn, self.window)
            .context(format!("Failed to set WM_HINTS for window {}", self.window))?;
        self.conn.flush()
            .context("Failed to flush X11 connection after focus hint")?;
        debug!(window = self.window, focusable, "Updated input hint");
        Ok(())
    }
}

impl Drop for Widget<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.conn.free_gc(self.gc) {
            error!(gc = self.gc, error = %e, "Failed to free GC");
        }
        if let Err(e) = self.conn.close_font(self.font) {
            error!(font = self.font, error = %e, "Failed to close font");
        }
        if !self.destroyed
            && let Err(e) = self.conn.destroy_window(self.window)
        {
            error!(window = self.window, error = %e, "Failed to destroy widget window");
        }
        if let Err(e) = self.conn.flush() {
            error!(error = %e, "Failed to flush X11 connection during cleanup");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_color() {
        assert_eq!(parse_hex_color("#3a3f4b"), Some(0x3A3F4B));
        assert_eq!(parse_hex_color(" #FFF "), Some(0xFFFFFF));
        assert_eq!(parse_hex_color("#f80"), Some(0xFF8800));
        assert_eq!(parse_hex_color("red"), None);
        assert_eq!(parse_hex_color("#12345"), None);
        assert_eq!(parse_hex_color("#zzzzzz"), None);
    }

    #[test]
    fn test_title_bytes_replaces_non_ascii() {
        assert_eq!(title_bytes("Café", 20), b"Caf?".to_vec());
        assert_eq!(title_bytes("🎮 Steam", 20), b"? Steam".to_vec());
    }

    #[test]
    fn test_title_bytes_truncates() {
        assert_eq!(title_bytes("Visual Studio Code", 8), b"Visual..".to_vec());
        assert_eq!(title_bytes("Terminal", 8), b"Terminal".to_vec());
        assert_eq!(title_bytes("Terminal", 1), Vec::<u8>::new());
    }

    #[test]
    fn test_opacity_value() {
        assert_eq!(opacity_value(1.0), u32::MAX);
        assert_eq!(opacity_value(0.0), 0);
        assert_eq!(opacity_value(2.0), u32::MAX);
        assert_eq!(opacity_value(0.5), u32::MAX / 2);
    }

    #[test]
    fn test_palette_follows_theme() {
        assert_eq!(Palette::for_theme(Theme::Dark).background, grid_style::BACKGROUND_DARK);
        assert_eq!(Palette::for_theme(Theme::Light).text, grid_style::TEXT_LIGHT);
    }
}
