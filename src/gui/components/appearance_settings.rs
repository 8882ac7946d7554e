use eframe::egui;

use crate::config::{BehaviorConfig, Theme, UiConfig};
use crate::gui::constants::*;

pub fn ui(ui: &mut egui::Ui, appearance: &mut UiConfig, behavior: &mut BehaviorConfig) -> bool {
    let mut changed = false;

    ui.group(|ui| {
        ui.label(egui::RichText::new("Appearance").strong());
        ui.add_space(ITEM_SPACING);

        ui.horizontal(|ui| {
            ui.label("Theme:");
            changed |= ui.radio_value(&mut appearance.theme, Theme::Dark, "Dark").changed();
            changed |= ui.radio_value(&mut appearance.theme, Theme::Light, "Light").changed();
        });

        ui.horizontal(|ui| {
            ui.label("Opacity:");
            let mut percent = (appearance.transparency * 100.0).round() as u32;
            if ui.add(egui::Slider::new(&mut percent, 10..=100).suffix("%")).changed() {
                appearance.transparency = percent as f32 / 100.0;
                changed = true;
            }
        });

        ui.horizontal(|ui| {
            ui.label("Border Radius:");
            changed |= ui.add(egui::Slider::new(&mut appearance.border_radius, 0..=30).suffix("px")).changed();
        });

        changed |= ui.checkbox(&mut appearance.rounded_corners, "Rounded corners").changed();
        changed |= ui.checkbox(&mut appearance.show_title_bar, "Show title bar").changed();
        changed |= ui.checkbox(&mut appearance.show_scrollbar, "Show scrollbar").changed();
    });

    ui.add_space(SECTION_SPACING);

    ui.group(|ui| {
        ui.label(egui::RichText::new("Behavior").strong());
        ui.add_space(ITEM_SPACING);

        changed |= ui.checkbox(&mut behavior.hide_to_tray, "Hide to tray instead of quitting").changed();
        changed |= ui.checkbox(&mut behavior.start_minimized, "Start minimized").changed();
        changed |= ui.checkbox(&mut behavior.hide_from_taskbar, "Hide from taskbar").changed();
        changed |= ui.checkbox(&mut behavior.auto_start, "Start on login").changed();
    });

    changed
}
