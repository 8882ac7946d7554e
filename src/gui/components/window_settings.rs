use eframe::egui;

use crate::config::{PlatformLevel, PositionX, PositionY, SizeSpec, WindowLevel, WindowSpec};
use crate::display::DisplayDescriptor;
use crate::gui::constants::*;

/// Anchor choices shown in the horizontal position combo
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnchorX {
    Left,
    Center,
    CenterBottom,
    Right,
    Custom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnchorY {
    Top,
    Center,
    Bottom,
    Custom,
}

impl AnchorX {
    const ALL: [AnchorX; 5] = [AnchorX::Left, AnchorX::Center, AnchorX::CenterBottom, AnchorX::Right, AnchorX::Custom];

    fn label(self) -> &'static str {
        match self {
            AnchorX::Left => "Left",
            AnchorX::Center => "Center",
            AnchorX::CenterBottom => "Center (bottom)",
            AnchorX::Right => "Right",
            AnchorX::Custom => "Custom",
        }
    }

    /// Unrecognized tokens show as `Center`, which is how they resolve
    pub fn of(x: &PositionX) -> Self {
        match x {
            PositionX::Left => AnchorX::Left,
            PositionX::Center | PositionX::Unrecognized(_) => AnchorX::Center,
            PositionX::CenterBottom => AnchorX::CenterBottom,
            PositionX::Right => AnchorX::Right,
            PositionX::Absolute(_) => AnchorX::Custom,
        }
    }

    pub fn to_position(self, custom: i32) -> PositionX {
        match self {
            AnchorX::Left => PositionX::Left,
            AnchorX::Center => PositionX::Center,
            AnchorX::CenterBottom => PositionX::CenterBottom,
            AnchorX::Right => PositionX::Right,
            AnchorX::Custom => PositionX::Absolute(custom),
        }
    }
}

impl AnchorY {
    const ALL: [AnchorY; 4] = [AnchorY::Top, AnchorY::Center, AnchorY::Bottom, AnchorY::Custom];

    fn label(self) -> &'static str {
        match self {
            AnchorY::Top => "Top",
            AnchorY::Center => "Center",
            AnchorY::Bottom => "Bottom",
            AnchorY::Custom => "Custom",
        }
    }

    /// Unrecognized tokens show as `Bottom`, which is how they resolve
    pub fn of(y: &PositionY) -> Self {
        match y {
            PositionY::Top => AnchorY::Top,
            PositionY::Center => AnchorY::Center,
            PositionY::Bottom | PositionY::Unrecognized(_) => AnchorY::Bottom,
            PositionY::Absolute(_) => AnchorY::Custom,
        }
    }

    pub fn to_position(self, custom: i32) -> PositionY {
        match self {
            AnchorY::Top => PositionY::Top,
            AnchorY::Center => PositionY::Center,
            AnchorY::Bottom => PositionY::Bottom,
            AnchorY::Custom => PositionY::Absolute(custom),
        }
    }
}

fn level_label(level: WindowLevel) -> &'static str {
    match level {
        WindowLevel::Default => "Normal",
        WindowLevel::AlwaysOnTop => "Always on top",
        WindowLevel::StayBehind => "Stay behind",
    }
}

/// Text buffers for fields that are edited as free text
pub struct WindowSettingsState {
    width_text: String,
    height_text: String,
    custom_x: i32,
    custom_y: i32,
}

impl WindowSettingsState {
    pub fn new(spec: &WindowSpec) -> Self {
        let custom_x = match spec.position.x {
            PositionX::Absolute(n) => n,
            _ => 0,
        };
        let custom_y = match spec.position.y {
            PositionY::Absolute(n) => n,
            _ => 0,
        };
        Self {
            width_text: spec.width.to_string(),
            height_text: spec.height.to_string(),
            custom_x,
            custom_y,
        }
    }
}

/// Size field that accepts `400` or `80%`; returns true when `size` changed
fn size_field(ui: &mut egui::Ui, label: &str, text: &mut String, size: &mut SizeSpec) -> bool {
    let mut changed = false;
    ui.horizontal(|ui| {
        ui.label(label);
        let response = ui.add(egui::TextEdit::singleline(text).desired_width(80.0));
        if response.changed() {
            let parsed = SizeSpec::parse(text);
            if parsed != *size {
                *size = parsed;
                changed = true;
            }
        }
        ui.weak(format!("= {size}"))
            .on_hover_text("Pixels, or a percentage of the display work area (e.g. 80%)");
    });
    changed
}

pub fn ui(
    ui: &mut egui::Ui,
    spec: &mut WindowSpec,
    display_index: &mut Option<usize>,
    displays: &[DisplayDescriptor],
    state: &mut WindowSettingsState,
) -> bool {
    let mut changed = false;

    ui.group(|ui| {
        ui.label(egui::RichText::new("Window").strong());
        ui.add_space(ITEM_SPACING);

        changed |= size_field(ui, "Width:", &mut state.width_text, &mut spec.width);
        changed |= size_field(ui, "Height:", &mut state.height_text, &mut spec.height);

        ui.horizontal(|ui| {
            ui.label("Minimum:");
            changed |= ui.add(egui::DragValue::new(&mut spec.min_width).range(0..=8192).suffix(" px")).changed();
            ui.label("x");
            changed |= ui.add(egui::DragValue::new(&mut spec.min_height).range(0..=8192).suffix(" px")).changed();
        });

        ui.add_space(ITEM_SPACING);

        ui.horizontal(|ui| {
            ui.label("Horizontal:");
            let mut anchor = AnchorX::of(&spec.position.x);
            egui::ComboBox::from_id_salt("position_x")
                .selected_text(anchor.label())
                .show_ui(ui, |ui| {
                    for choice in AnchorX::ALL {
                        ui.selectable_value(&mut anchor, choice, choice.label());
                    }
                });
            if anchor == AnchorX::Custom {
                changed |= ui.add(egui::DragValue::new(&mut state.custom_x).suffix(" px")).changed();
            }
            let position = anchor.to_position(state.custom_x);
            if position != spec.position.x && !matches!(spec.position.x, PositionX::Unrecognized(_) if anchor == AnchorX::Center) {
                spec.position.x = position;
                changed = true;
            }
        });

        ui.horizontal(|ui| {
            ui.label("Vertical:");
            let mut anchor = AnchorY::of(&spec.position.y);
            egui::ComboBox::from_id_salt("position_y")
                .selected_text(anchor.label())
                .show_ui(ui, |ui| {
                    for choice in AnchorY::ALL {
                        ui.selectable_value(&mut anchor, choice, choice.label());
                    }
                });
            if anchor == AnchorY::Custom {
                changed |= ui.add(egui::DragValue::new(&mut state.custom_y).suffix(" px")).changed();
            }
            let position = anchor.to_position(state.custom_y);
            if position != spec.position.y && !matches!(spec.position.y, PositionY::Unrecognized(_) if anchor == AnchorY::Bottom) {
                spec.position.y = position;
                changed = true;
            }
        });

        ui.horizontal(|ui| {
            ui.label("Offset:");
            ui.label("X:");
            changed |= ui.add(egui::DragValue::new(&mut spec.position.offset_x)).changed();
            ui.label("Y:");
            changed |= ui.add(egui::DragValue::new(&mut spec.position.offset_y)).changed();
        });

        ui.horizontal(|ui| {
            ui.label("Display:");
            let selected = match *display_index {
                Some(index) => displays
                    .get(index)
                    .map(|d| format!("{}: {}", d.index, d.label))
                    .unwrap_or_else(|| format!("{index} (not attached)")),
                None => "Primary".to_string(),
            };
            egui::ComboBox::from_id_salt("display_index")
                .selected_text(selected)
                .show_ui(ui, |ui| {
                    changed |= ui.selectable_value(&mut *display_index, None, "Primary").changed();
                    for display in displays {
                        let label = format!("{}: {} ({}x{})", display.index, display.label, display.bounds.width, display.bounds.height);
                        changed |= ui.selectable_value(&mut *display_index, Some(display.index), label).changed();
                    }
                });
            if displays.is_empty() {
                ui.weak("(start the widget to list displays)");
            }
        });
    });

    ui.add_space(SECTION_SPACING);

    ui.group(|ui| {
        ui.label(egui::RichText::new("Stacking").strong());
        ui.add_space(ITEM_SPACING);

        ui.horizontal(|ui| {
            ui.label("Level:");
            for level in WindowLevel::ALL {
                changed |= ui.radio_value(&mut spec.window_level, level, level_label(level)).changed();
            }
        });

        ui.add_enabled_ui(spec.window_level == WindowLevel::AlwaysOnTop, |ui| {
            ui.horizontal(|ui| {
                ui.label("Fine level:");
                let selected = spec.level.map(|l| l.as_str()).unwrap_or("default");
                egui::ComboBox::from_id_salt("fine_level")
                    .selected_text(selected)
                    .show_ui(ui, |ui| {
                        changed |= ui.selectable_value(&mut spec.level, None, "default").changed();
                        for level in PlatformLevel::ALL {
                            changed |= ui.selectable_value(&mut spec.level, Some(level), level.as_str()).changed();
                        }
                    });
            });
        });

        ui.add_space(ITEM_SPACING);
        changed |= ui.checkbox(&mut spec.resizable, "Resizable").changed();
        changed |= ui.checkbox(&mut spec.movable, "Movable").changed();
        changed |= ui.checkbox(&mut spec.visible_on_all_workspaces, "Visible on all workspaces").changed();
        changed |= ui.checkbox(&mut spec.fullscreenable, "Allow fullscreen").changed();
        changed |= ui.checkbox(&mut spec.focusable, "Focusable").changed();
    });

    changed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anchor_round_trip() {
        for anchor in AnchorX::ALL {
            assert_eq!(AnchorX::of(&anchor.to_position(42)), anchor);
        }
        for anchor in AnchorY::ALL {
            assert_eq!(AnchorY::of(&anchor.to_position(-7)), anchor);
        }
    }

    #[test]
    fn test_unrecognized_shows_resolved_anchor() {
        assert_eq!(AnchorX::of(&PositionX::Unrecognized("middle".into())), AnchorX::Center);
        assert_eq!(AnchorY::of(&PositionY::Unrecognized("100".into())), AnchorY::Bottom);
    }

    #[test]
    fn test_state_seeds_text_from_spec() {
        let mut spec = WindowSpec::default();
        spec.width = SizeSpec::Percent(80.0);
        spec.position.x = PositionX::Absolute(120);
        let state = WindowSettingsState::new(&spec);
        assert_eq!(state.width_text, "80%");
        assert_eq!(state.height_text, "600");
        assert_eq!(state.custom_x, 120);
        assert_eq!(state.custom_y, 0);
    }
}
