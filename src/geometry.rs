//! Window geometry resolution
//!
//! Turns a [`WindowSpec`] plus the target display's work area into an absolute
//! rectangle in virtual-desktop coordinates. Everything here is pure: malformed
//! input has already been folded into enum fallbacks by the config layer, and
//! the remaining arithmetic cannot fail.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::{PositionX, PositionY, SizeSpec, WindowSpec};
use crate::constants::positioning::EDGE_MARGIN;
use crate::display::DisplayDescriptor;

/// Absolute window rectangle produced by [`resolve_geometry`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedGeometry {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

/// Round half up (`-0.5` -> `0`, `2.5` -> `3`)
fn round_half_up(value: f64) -> i64 {
    (value + 0.5).floor() as i64
}

fn resolve_size(size: SizeSpec, work_dimension: u32) -> u32 {
    match size {
        SizeSpec::Pixels(n) => n,
        SizeSpec::Percent(percent) => {
            let percent = if percent.is_nan() { 0.0 } else { percent.max(0.0) };
            let pixels = round_half_up(work_dimension as f64 * percent / 100.0);
            pixels.clamp(0, u32::MAX as i64) as u32
        }
    }
}

fn centered(work_dimension: u32, size: u32) -> i64 {
    round_half_up((work_dimension as f64 - size as f64) / 2.0)
}

fn far_edge(work_dimension: u32, size: u32) -> i64 {
    work_dimension as i64 - size as i64 - EDGE_MARGIN as i64
}

fn resolve_x(x: &PositionX, work_width: u32, width: u32) -> i64 {
    match x {
        PositionX::Left => EDGE_MARGIN as i64,
        PositionX::Right => far_edge(work_width, width),
        PositionX::Center | PositionX::CenterBottom => centered(work_width, width),
        PositionX::Absolute(n) => *n as i64,
        PositionX::Unrecognized(_) => centered(work_width, width),
    }
}

fn resolve_y(y: &PositionY, work_height: u32, height: u32) -> i64 {
    match y {
        PositionY::Top => EDGE_MARGIN as i64,
        PositionY::Bottom => far_edge(work_height, height),
        PositionY::Center => centered(work_height, height),
        PositionY::Absolute(n) => *n as i64,
        PositionY::Unrecognized(_) => far_edge(work_height, height),
    }
}

fn saturate(value: i64) -> i32 {
    value.clamp(i32::MIN as i64, i32::MAX as i64) as i32
}

/// Resolve `spec` against `display`.
///
/// Sizes are resolved first so alignment uses the final pixel size. Offsets are
/// not clamped; a window may end up partially off-screen. Min sizes are left to
/// the window itself.
pub fn resolve_geometry(spec: &WindowSpec, display: &DisplayDescriptor) -> ResolvedGeometry {
    let work = display.work_area;
    let width = resolve_size(spec.width, work.width);
    let height = resolve_size(spec.height, work.height);

    let x = resolve_x(&spec.position.x, work.width, width) + spec.position.offset_x as i64;
    let y = resolve_y(&spec.position.y, work.height, height) + spec.position.offset_y as i64;

    ResolvedGeometry {
        x: saturate(x + work.x as i64),
        y: saturate(y + work.y as i64),
        width,
        height,
    }
}

/// Pick the display at `index`, falling back to the primary display (then the
/// first one) when the index is absent or out of range
pub fn select_display(displays: &[DisplayDescriptor], index: Option<usize>) -> Option<&DisplayDescriptor> {
    if let Some(index) = index {
        if let Some(display) = displays.get(index) {
            return Some(display);
        }
        warn!(index, available = displays.len(), "Display index out of range, using primary display");
    }
    displays.iter().find(|d| d.primary).or_else(|| displays.first())
}

/// [`select_display`] followed by [`resolve_geometry`]. `None` only when no
/// display is attached at all.
pub fn resolve_on_display(
    spec: &WindowSpec,
    displays: &[DisplayDescriptor],
    index: Option<usize>,
) -> Option<ResolvedGeometry> {
    select_display(displays, index).map(|display| resolve_geometry(spec, display))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{PositionSpec, WindowSpec};
    use crate::types::Rect;

    fn display(index: usize, x: i32, y: i32, width: u32, height: u32, primary: bool) -> DisplayDescriptor {
        DisplayDescriptor {
            id: index as u32 + 100,
            index,
            label: format!("DP-{index}"),
            primary,
            work_area: Rect::new(x, y, width, height),
            bounds: Rect::new(x, y, width, height),
            scale_factor: 1.0,
        }
    }

    fn spec(width: SizeSpec, height: SizeSpec, x: PositionX, y: PositionY, offset_x: i32, offset_y: i32) -> WindowSpec {
        WindowSpec {
            width,
            height,
            position: PositionSpec { x, y, offset_x, offset_y },
            ..WindowSpec::default()
        }
    }

    fn full_hd() -> DisplayDescriptor {
        display(0, 0, 0, 1920, 1080, true)
    }

    #[test]
    fn test_percent_width_rounds() {
        for percent in [0.0, 1.0, 33.3, 50.0, 66.7, 100.0, 150.0] {
            let s = spec(SizeSpec::Percent(percent), SizeSpec::Pixels(100), PositionX::Left, PositionY::Top, 0, 0);
            let geometry = resolve_geometry(&s, &full_hd());
            assert_eq!(geometry.width as i64, round_half_up(1920.0 * percent / 100.0), "percent={percent}");
        }
    }

    #[test]
    fn test_unparseable_percent_is_zero() {
        let s = spec(SizeSpec::parse("abc%"), SizeSpec::Percent(f64::NAN), PositionX::Left, PositionY::Top, 0, 0);
        let geometry = resolve_geometry(&s, &full_hd());
        assert_eq!(geometry.width, 0);
        assert_eq!(geometry.height, 0);
    }

    #[test]
    fn test_numeric_string_truncates() {
        let s = spec(SizeSpec::parse("399.9"), SizeSpec::Pixels(100), PositionX::Left, PositionY::Top, 0, 0);
        assert_eq!(resolve_geometry(&s, &full_hd()).width, 399);
    }

    #[test]
    fn test_left_ignores_width() {
        for width in [10, 400, 1920, 3000] {
            let s = spec(SizeSpec::Pixels(width), SizeSpec::Pixels(100), PositionX::Left, PositionY::Top, 7, 0);
            assert_eq!(resolve_geometry(&s, &full_hd()).x, 20 + 7);
        }
    }

    #[test]
    fn test_right_alignment() {
        let s = spec(SizeSpec::Pixels(400), SizeSpec::Pixels(100), PositionX::Right, PositionY::Top, -5, 0);
        assert_eq!(resolve_geometry(&s, &full_hd()).x, 1920 - 400 - 20 - 5);
    }

    #[test]
    fn test_center_full_width_is_zero() {
        let s = spec(SizeSpec::Pixels(1920), SizeSpec::Pixels(100), PositionX::Center, PositionY::Top, 0, 0);
        assert_eq!(resolve_geometry(&s, &full_hd()).x, 0);
        let s = spec(SizeSpec::Percent(100.0), SizeSpec::Pixels(100), PositionX::Center, PositionY::Top, 0, 0);
        assert_eq!(resolve_geometry(&s, &full_hd()).x, 0);
    }

    #[test]
    fn test_center_rounds_half_up_when_oversized() {
        // (1920 - 1921) / 2 = -0.5 rounds to 0, not -1
        let s = spec(SizeSpec::Pixels(1921), SizeSpec::Pixels(100), PositionX::Center, PositionY::Top, 0, 0);
        assert_eq!(resolve_geometry(&s, &full_hd()).x, 0);
        let s = spec(SizeSpec::Pixels(1919), SizeSpec::Pixels(100), PositionX::Center, PositionY::Top, 0, 0);
        assert_eq!(resolve_geometry(&s, &full_hd()).x, 1);
    }

    #[test]
    fn test_vertical_rules() {
        let top = spec(SizeSpec::Pixels(100), SizeSpec::Pixels(300), PositionX::Left, PositionY::Top, 0, 0);
        let center = spec(SizeSpec::Pixels(100), SizeSpec::Pixels(300), PositionX::Left, PositionY::Center, 0, 0);
        let bottom = spec(SizeSpec::Pixels(100), SizeSpec::Pixels(300), PositionX::Left, PositionY::Bottom, 0, 0);
        assert_eq!(resolve_geometry(&top, &full_hd()).y, 20);
        assert_eq!(resolve_geometry(&center, &full_hd()).y, 390);
        assert_eq!(resolve_geometry(&bottom, &full_hd()).y, 1080 - 300 - 20);
    }

    #[test]
    fn test_unrecognized_tokens_fall_back() {
        let s = spec(
            SizeSpec::Pixels(400),
            SizeSpec::Pixels(300),
            PositionX::Unrecognized("middle".into()),
            PositionY::Unrecognized("100".into()),
            0,
            0,
        );
        let geometry = resolve_geometry(&s, &full_hd());
        assert_eq!(geometry.x, 760);
        assert_eq!(geometry.y, 1080 - 300 - 20);
    }

    #[test]
    fn test_absolute_position_and_unclamped_offsets() {
        let s = spec(SizeSpec::Pixels(400), SizeSpec::Pixels(300), PositionX::Absolute(100), PositionY::Absolute(50), -500, 2000);
        let geometry = resolve_geometry(&s, &full_hd());
        assert_eq!(geometry.x, -400);
        assert_eq!(geometry.y, 2050);
    }

    #[test]
    fn test_min_size_not_enforced() {
        let mut s = spec(SizeSpec::Pixels(50), SizeSpec::Pixels(60), PositionX::Left, PositionY::Top, 0, 0);
        s.min_width = 300;
        s.min_height = 400;
        let geometry = resolve_geometry(&s, &full_hd());
        assert_eq!((geometry.width, geometry.height), (50, 60));
    }

    #[test]
    fn test_idempotent() {
        let s = WindowSpec::default();
        assert_eq!(resolve_geometry(&s, &full_hd()), resolve_geometry(&s, &full_hd()));
    }

    #[test]
    fn test_display_origin_is_additive() {
        let s = spec(SizeSpec::Percent(40.0), SizeSpec::Pixels(500), PositionX::Right, PositionY::Center, 3, -9);
        let origin = display(0, 0, 0, 1280, 1024, true);
        let shifted = display(1, 1920, 32, 1280, 1024, false);
        let base = resolve_geometry(&s, &origin);
        let moved = resolve_geometry(&s, &shifted);
        assert_eq!(moved.x, base.x + 1920);
        assert_eq!(moved.y, base.y + 32);
        assert_eq!((moved.width, moved.height), (base.width, base.height));
    }

    #[test]
    fn test_scenario_primary_display() {
        let s = spec(SizeSpec::Percent(50.0), SizeSpec::Pixels(400), PositionX::CenterBottom, PositionY::Bottom, 0, -50);
        let geometry = resolve_geometry(&s, &full_hd());
        assert_eq!(geometry, ResolvedGeometry { x: 480, y: 610, width: 960, height: 400 });
    }

    #[test]
    fn test_scenario_second_display() {
        let s = spec(SizeSpec::Percent(50.0), SizeSpec::Pixels(400), PositionX::CenterBottom, PositionY::Bottom, 0, -50);
        let second = display(1, 1920, 0, 1280, 1024, false);
        let geometry = resolve_geometry(&s, &second);
        assert_eq!(geometry.width, 640);
        assert_eq!(geometry.x, 320 + 1920);
        assert_eq!(geometry.y, 1024 - 400 - 20 - 50);
    }

    #[test]
    fn test_select_display_fallback_to_primary() {
        let displays = vec![display(0, 0, 0, 1280, 1024, false), display(1, 1280, 0, 1920, 1080, true)];
        assert_eq!(select_display(&displays, Some(0)).map(|d| d.index), Some(0));
        assert_eq!(select_display(&displays, Some(5)).map(|d| d.index), Some(1));
        assert_eq!(select_display(&displays, None).map(|d| d.index), Some(1));
    }

    #[test]
    fn test_select_display_without_primary_uses_first() {
        let displays = vec![display(0, 0, 0, 1280, 1024, false), display(1, 1280, 0, 1920, 1080, false)];
        assert_eq!(select_display(&displays, Some(9)).map(|d| d.index), Some(0));
        assert!(select_display(&[], Some(0)).is_none());
    }

    #[test]
    fn test_resolve_on_display_out_of_range() {
        let displays = vec![full_hd(), display(1, 1920, 0, 1280, 1024, false)];
        let s = WindowSpec::default();
        assert_eq!(resolve_on_display(&s, &displays, Some(7)), Some(resolve_geometry(&s, &displays[0])));
        assert_eq!(resolve_on_display(&s, &displays, Some(1)), Some(resolve_geometry(&s, &displays[1])));
        assert_eq!(resolve_on_display(&s, &[], None), None);
    }
}
