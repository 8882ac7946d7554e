//! Settings panel implemented with egui/eframe
//!
//! Edits the config file directly. Saving also pushes the new config to a
//! running widget over IPC; the widget not running is not a save failure.

pub mod components;
pub mod constants;

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use eframe::{egui, CreationContext, NativeOptions};
use tracing::{error, info, warn};

use crate::config::AppConfig;
use crate::display::DisplayDescriptor;
use crate::ipc::{WidgetClient, WidgetRequest, WidgetResponse};

use self::components::{appearance_settings, window_settings};
use self::constants::*;

/// What happened when a saved config was offered to the widget
#[derive(Debug, Clone, PartialEq)]
pub enum PushOutcome {
    Applied,
    NotRunning,
    Rejected(String),
}

/// Send one request to the widget at `socket`; `None` when no widget answers
pub fn send_to_widget(socket: &Path, request: WidgetRequest) -> Option<Result<WidgetResponse>> {
    let mut client = WidgetClient::connect_to(socket).ok()?;
    Some(client.request(request))
}

pub fn push_config(socket: &Path, config: &AppConfig) -> PushOutcome {
    match send_to_widget(socket, WidgetRequest::UpdateConfig(config.clone())) {
        None => PushOutcome::NotRunning,
        Some(Ok(WidgetResponse::Ready)) => PushOutcome::Applied,
        Some(Ok(WidgetResponse::Error(message))) => PushOutcome::Rejected(message),
        Some(Ok(other)) => PushOutcome::Rejected(format!("unexpected response {other:?}")),
        Some(Err(e)) => PushOutcome::Rejected(format!("{e:#}")),
    }
}

/// Write the file, then let a running widget pick the change up
pub fn save_and_push(config: &AppConfig, config_path: &Path, socket: &Path) -> Result<PushOutcome> {
    config.save_to(config_path)?;
    Ok(push_config(socket, config))
}

struct StatusMessage {
    text: String,
    color: egui::Color32,
}

impl StatusMessage {
    fn new(text: impl Into<String>, color: egui::Color32) -> Self {
        Self { text: text.into(), color }
    }
}

struct SettingsApp {
    config: AppConfig,
    config_path: PathBuf,
    socket_path: PathBuf,
    displays: Vec<DisplayDescriptor>,
    window_state: window_settings::WindowSettingsState,
    new_window_display: Option<usize>,
    dirty: bool,
    status: Option<StatusMessage>,
}

impl SettingsApp {
    fn new(_cc: &CreationContext<'_>, config_path: PathBuf, socket_path: PathBuf) -> Self {
        info!(config = %config_path.display(), "Initializing settings panel");
        let config = AppConfig::load_from(&config_path);
        let mut app = Self {
            window_state: window_settings::WindowSettingsState::new(&config.window),
            config,
            config_path,
            socket_path,
            displays: Vec::new(),
            new_window_display: None,
            dirty: false,
            status: None,
        };
        app.refresh_displays();
        app
    }

    fn refresh_displays(&mut self) {
        match send_to_widget(&self.socket_path, WidgetRequest::ListDisplays) {
            Some(Ok(WidgetResponse::Displays(displays))) => self.displays = displays,
            Some(Ok(other)) => warn!(response = ?other, "Unexpected reply to ListDisplays"),
            Some(Err(e)) => warn!(error = ?e, "Failed to list displays"),
            None => self.status = Some(StatusMessage::new("Widget is not running", STATUS_WARN)),
        }
    }

    fn reload(&mut self) {
        self.config = AppConfig::load_from(&self.config_path);
        self.window_state = window_settings::WindowSettingsState::new(&self.config.window);
        self.dirty = false;
        self.status = Some(StatusMessage::new("Reloaded from disk", STATUS_OK));
    }

    fn save(&mut self) {
        self.status = Some(match save_and_push(&self.config, &self.config_path, &self.socket_path) {
            Ok(PushOutcome::Applied) => {
                self.dirty = false;
                StatusMessage::new("Saved and applied", STATUS_OK)
            }
            Ok(PushOutcome::NotRunning) => {
                self.dirty = false;
                StatusMessage::new("Saved (widget not running, applies on next start)", STATUS_WARN)
            }
            Ok(PushOutcome::Rejected(message)) => {
                self.dirty = false;
                warn!(%message, "Widget rejected config update");
                StatusMessage::new(format!("Saved, but the widget did not apply it: {message}"), STATUS_WARN)
            }
            Err(e) => {
                error!(error = ?e, "Failed to save config");
                StatusMessage::new(format!("Save failed: {e:#}"), STATUS_ERROR)
            }
        });
    }

    /// Fire-and-report for the window action buttons
    fn command(&mut self, request: WidgetRequest, done: &str) {
        self.status = Some(match send_to_widget(&self.socket_path, request) {
            None => StatusMessage::new("Widget is not running", STATUS_WARN),
            Some(Ok(WidgetResponse::Error(message))) => StatusMessage::new(message, STATUS_ERROR),
            Some(Ok(_)) => StatusMessage::new(done, STATUS_OK),
            Some(Err(e)) => StatusMessage::new(format!("{e:#}"), STATUS_ERROR),
        });
    }

    fn window_actions(&mut self, ui: &mut egui::Ui) {
        ui.group(|ui| {
            ui.label(egui::RichText::new("Windows").strong());
            ui.add_space(ITEM_SPACING);

            ui.horizontal(|ui| {
                if ui.button("Bring to front").clicked() {
                    self.command(WidgetRequest::BringToFront, "Raised widget windows");
                }
                if ui.button("Close extra windows").clicked() {
                    self.command(WidgetRequest::CloseSecondaryWindows, "Closed secondary windows");
                }
            });

            ui.horizontal(|ui| {
                let selected = match self.new_window_display {
                    Some(index) => format!("Display {index}"),
                    None => "Configured display".to_string(),
                };
                egui::ComboBox::from_id_salt("new_window_display")
                    .selected_text(selected)
                    .show_ui(ui, |ui| {
                        ui.selectable_value(&mut self.new_window_display, None, "Configured display");
                        for display in &self.displays {
                            ui.selectable_value(&mut self.new_window_display, Some(display.index), format!("{}: {}", display.index, display.label));
                        }
                    });
                if ui.button("Open window").clicked() {
                    let display_index = self.new_window_display;
                    self.command(WidgetRequest::CreateWindow { display_index }, "Opened a new widget window");
                }
            });
        });
    }
}

impl eframe::App for SettingsApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        egui::TopBottomPanel::bottom("actions").show(ctx, |ui| {
            ui.add_space(ITEM_SPACING);
            ui.horizontal(|ui| {
                if ui.add_enabled(self.dirty, egui::Button::new("Save")).clicked() {
                    self.save();
                }
                if ui.button("Reload").clicked() {
                    self.reload();
                }
                if ui.button("Refresh displays").clicked() {
                    self.refresh_displays();
                }
            });
            if let Some(status) = &self.status {
                ui.colored_label(status.color, &status.text);
            }
            ui.add_space(ITEM_SPACING);
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::vertical().show(ui, |ui| {
                ui.add_space(PADDING);
                ui.heading("Desktop Icons Settings");
                ui.add_space(SECTION_SPACING);

                let config = &mut self.config;
                self.dirty |= window_settings::ui(
                    ui,
                    &mut config.window,
                    &mut config.display_index,
                    &self.displays,
                    &mut self.window_state,
                );
                ui.add_space(SECTION_SPACING);
                self.dirty |= appearance_settings::ui(ui, &mut config.ui, &mut config.behavior);
                ui.add_space(SECTION_SPACING);
                self.window_actions(ui);
            });
        });
    }
}

pub fn run_settings(config_path: PathBuf, socket_path: PathBuf) -> Result<()> {
    let options = NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([WINDOW_WIDTH, WINDOW_HEIGHT])
            .with_min_inner_size([WINDOW_MIN_WIDTH, WINDOW_MIN_HEIGHT])
            .with_title("Desktop Icons Settings"),
        ..Default::default()
    };

    eframe::run_native(
        "Desktop Icons Settings",
        options,
        Box::new(move |cc| Ok(Box::new(SettingsApp::new(cc, config_path, socket_path)))),
    )
    .map_err(|err| anyhow!("Failed to launch settings panel: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WindowLevel;

    fn scratch(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("desk-icons-gui-{}-{}", name, std::process::id()))
    }

    #[test]
    fn test_save_without_widget_is_not_a_failure() {
        let dir = scratch("save");
        let config_path = dir.join("window-config.json");
        let socket = dir.join("missing.sock");

        let mut config = AppConfig::default();
        config.window.window_level = WindowLevel::AlwaysOnTop;
        let outcome = save_and_push(&config, &config_path, &socket).unwrap();

        assert_eq!(outcome, PushOutcome::NotRunning);
        assert_eq!(AppConfig::load_from(&config_path), config);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_push_reaches_running_widget() {
        use crate::ipc::{spawn_listener, WidgetServer};

        let dir = scratch("push");
        let socket = dir.join("widget.sock");
        let server = WidgetServer::bind_to(socket.clone()).unwrap();
        let (tx, rx) = std::sync::mpsc::channel();
        spawn_listener(server, tx);
        let daemon = std::thread::spawn(move || {
            let command = rx.recv().unwrap();
            let applied = matches!(command.request, WidgetRequest::UpdateConfig(_));
            command.respond(WidgetResponse::Ready);
            applied
        });

        assert_eq!(push_config(&socket, &AppConfig::default()), PushOutcome::Applied);
        assert!(daemon.join().unwrap());

        crate::ipc::remove_socket(&socket);
        let _ = std::fs::remove_dir_all(&dir);
    }
}
