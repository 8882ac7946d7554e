//! Monitor enumeration
//!
//! Displays are snapshots: monitors can be hot-plugged, so callers query them
//! again whenever they need current data instead of caching the list.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use x11rb::protocol::randr::ConnectionExt as RandrExt;

use crate::types::Rect;
use crate::x11_utils::{atom_name, current_workarea, AppContext};

/// One physical monitor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayDescriptor {
    /// RandR monitor name atom (0 for the whole-screen fallback)
    pub id: u32,
    /// Position among currently attached displays
    pub index: usize,
    pub label: String,
    pub primary: bool,
    /// Usable area excluding panels and docks
    pub work_area: Rect,
    pub bounds: Rect,
    pub scale_factor: f64,
}

pub trait DisplaySource {
    fn list_displays(&self) -> Result<Vec<DisplayDescriptor>>;

    fn primary_display(&self) -> Result<DisplayDescriptor> {
        let displays = self.list_displays()?;
        displays
            .iter()
            .find(|d| d.primary)
            .or_else(|| displays.first())
            .cloned()
            .context("No displays attached")
    }
}

/// Displays of an X11 screen via RandR monitors and `_NET_WORKAREA`
pub struct X11Displays<'c, 'a> {
    ctx: &'c AppContext<'a>,
}

impl<'c, 'a> X11Displays<'c, 'a> {
    pub fn new(ctx: &'c AppContext<'a>) -> Self {
        Self { ctx }
    }

    fn whole_screen(&self) -> Rect {
        Rect::new(
            0,
            0,
            self.ctx.screen.width_in_pixels as u32,
            self.ctx.screen.height_in_pixels as u32,
        )
    }
}

impl DisplaySource for X11Displays<'_, '_> {
    fn list_displays(&self) -> Result<Vec<DisplayDescriptor>> {
        let conn = self.ctx.conn;
        let workarea = current_workarea(conn, self.ctx.screen, self.ctx.atoms)
            .inspect_err(|e| warn!(error = %format!("{e:#}"), "Cannot read _NET_WORKAREA, using monitor bounds"))
            .ok()
            .flatten()
            .map(|(x, y, w, h)| Rect::new(x, y, w, h));

        let monitors = conn
            .randr_get_monitors(self.ctx.screen.root, true)
            .context("Failed to query RandR monitors")?
            .reply()
            .context("Failed to get reply for RandR monitors query")?
            .monitors;

        let bounds_list: Vec<(u32, String, bool, Rect)> = if monitors.is_empty() {
            warn!("RandR reported no monitors, treating the whole screen as one display");
            vec![(0, "screen".to_string(), true, self.whole_screen())]
        } else {
            monitors
                .iter()
                .map(|m| {
                    let label = atom_name(conn, m.name).unwrap_or_else(|_| format!("monitor-{}", m.name));
                    let bounds = Rect::new(m.x as i32, m.y as i32, m.width as u32, m.height as u32);
                    (m.name, label, m.primary, bounds)
                })
                .collect()
        };

        let displays = bounds_list
            .into_iter()
            .enumerate()
            .map(|(index, (id, label, primary, bounds))| {
                let work_area = workarea
                    .and_then(|area| bounds.intersect(&area))
                    .unwrap_or(bounds);
                debug!(index, label = %label, ?bounds, ?work_area, primary, "Discovered display");
                DisplayDescriptor {
                    id,
                    index,
                    label,
                    primary,
                    work_area,
                    bounds,
                    // X11 has no per-monitor scale; DPI scaling is left to the toolkit
                    scale_factor: 1.0,
                }
            })
            .collect();

        Ok(displays)
    }
}
