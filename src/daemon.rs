//! Widget daemon - owns the X11 connection and every widget window
//!
//! Everything that touches windows runs on this thread. The IPC listener and
//! the tray only send commands over channels, which the loop drains between
//! X11 events.

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::process::Command;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::time::Duration;
use tracing::{debug, error, info, warn};
use x11rb::connection::Connection;
use x11rb::rust_connection::RustConnection;

use crate::config::{AppConfig, IconConfig};
use crate::constants::daemon::IDLE_SLEEP_MS;
use crate::display::{DisplayDescriptor, DisplaySource, X11Displays};
use crate::event_handler::{handle_event, EventAction, ProtocolAtoms};
use crate::ipc::{remove_socket, spawn_listener, IpcCommand, WidgetRequest, WidgetResponse, WidgetServer};
use crate::launcher;
use crate::lifecycle::WindowManager;
use crate::tray::{spawn_tray, TrayCommand};
use crate::types::WindowId;
use crate::widget::Widget;
use crate::x11_utils::{AppContext, CachedAtoms};

/// Files the daemon reads and the socket it serves
#[derive(Debug, Clone)]
pub struct DaemonPaths {
    pub config: PathBuf,
    pub icons: PathBuf,
    pub socket: PathBuf,
}

/// What closing a window from the window manager does
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CloseBehavior {
    Hide,
    Destroy,
}

fn close_behavior(main: bool, hide_to_tray: bool, tray_available: bool) -> CloseBehavior {
    if main && hide_to_tray && tray_available {
        CloseBehavior::Hide
    } else {
        CloseBehavior::Destroy
    }
}

struct Daemon<'c, 'a> {
    ctx: &'c AppContext<'a>,
    paths: DaemonPaths,
    icons: IconConfig,
    manager: WindowManager<Widget<'a>>,
    main_window: Option<WindowId>,
    tray_available: bool,
    running: bool,
}

impl<'c, 'a> Daemon<'c, 'a> {
    /// Fresh snapshot; monitors may have changed since the last call
    fn displays(&self) -> Vec<DisplayDescriptor> {
        X11Displays::new(self.ctx)
            .list_displays()
            .inspect_err(|e| error!(error = %format!("{e:#}"), "Failed to enumerate displays"))
            .unwrap_or_default()
    }

    /// Create, map and configure a widget window
    fn open_on_display(&mut self, display_index: Option<usize>, main: bool) -> Result<WindowId> {
        let displays = self.displays();
        let geometry = self
            .manager
            .geometry_for(&displays, display_index)
            .context("Cannot open a widget window without an attached display")?;

        let widget = Widget::new(self.ctx, self.manager.config(), &self.icons, geometry)
            .context("Failed to create widget window")?;
        let id = widget.window;

        // EWMH state requests only take effect on mapped windows, so map first
        let start_hidden = main && self.manager.config().behavior.start_minimized;
        if start_hidden {
            info!(window = id, "Starting minimized");
        } else {
            widget.map()?;
        }
        self.manager.insert(widget, display_index, main, &displays);
        Ok(id)
    }

    fn open_main(&mut self) -> Result<()> {
        let id = self.open_on_display(None, true)?;
        self.main_window = Some(id);
        Ok(())
    }

    fn show(&mut self) {
        match self.main_window.and_then(|id| self.manager.get(id)) {
            Some(widget) => {
                if let Err(e) = widget.map() {
                    error!(error = %format!("{e:#}"), "Failed to show widget");
                }
                self.manager.bring_to_front();
            }
            None => {
                info!("Main window is gone, opening a new one");
                if let Err(e) = self.open_main() {
                    error!(error = %format!("{e:#}"), "Failed to reopen main window");
                }
            }
        }
    }

    fn hide(&self) {
        if let Some(widget) = self.main_window.and_then(|id| self.manager.get(id))
            && let Err(e) = widget.unmap()
        {
            error!(error = %format!("{e:#}"), "Failed to hide widget");
        }
    }

    /// Re-apply a new config to every window in place
    fn apply_config(&mut self, config: AppConfig) {
        let displays = self.displays();
        self.manager.update_config(config, &displays);
        let config = self.manager.config().clone();
        for widget in self.manager.handles_mut() {
            if let Err(e) = widget.update_appearance(&config) {
                error!(window = widget.window, error = %format!("{e:#}"), "Failed to update appearance");
            }
        }
    }

    fn reload(&mut self) {
        info!(config = %self.paths.config.display(), icons = %self.paths.icons.display(), "Reloading configuration from disk");
        self.icons = IconConfig::load_from(&self.paths.icons);
        for widget in self.manager.handles_mut() {
            if let Err(e) = widget.set_icons(&self.icons) {
                error!(window = widget.window, error = %format!("{e:#}"), "Failed to update icons");
            }
        }
        self.apply_config(AppConfig::load_from(&self.paths.config));
    }

    fn close_secondary(&mut self) {
        let closed = self.manager.take_secondary();
        info!(count = closed.len(), "Secondary windows closed");
        drop(closed);
    }

    /// Detach everything and destroy all windows
    fn close_all(&mut self) {
        let windows = self.manager.take_all();
        info!(count = windows.len(), "Closing all widget windows");
        drop(windows);
        self.main_window = None;
    }

    fn close_window(&mut self, id: WindowId) {
        let main = self.main_window == Some(id);
        match close_behavior(main, self.manager.config().behavior.hide_to_tray, self.tray_available) {
            CloseBehavior::Hide => {
                info!(window = id, "Hiding main window to tray");
                self.hide();
            }
            CloseBehavior::Destroy => {
                drop(self.manager.remove(id));
                if main {
                    self.main_window = None;
                    info!("Main window closed, shutting down");
                    self.running = false;
                }
            }
        }
    }

    fn handle_request(&mut self, request: WidgetRequest) -> WidgetResponse {
        debug!(request = ?request, "Handling IPC request");
        match request {
            WidgetRequest::Ping => WidgetResponse::Pong,
            WidgetRequest::GetConfig => WidgetResponse::Config(self.manager.config().clone()),
            WidgetRequest::UpdateConfig(config) => {
                self.apply_config(config);
                WidgetResponse::Ready
            }
            WidgetRequest::ReloadConfig => {
                self.reload();
                WidgetResponse::Ready
            }
            WidgetRequest::SetWindowLevel { level, fine_level } => {
                let displays = self.displays();
                self.manager.set_window_level(level, fine_level, &displays);
                WidgetResponse::Ready
            }
            WidgetRequest::BringToFront => {
                self.show();
                WidgetResponse::Ready
            }
            WidgetRequest::SetFocusable { focusable } => {
                self.manager.set_focusable(focusable);
                WidgetResponse::Ready
            }
            WidgetRequest::ListDisplays => match X11Displays::new(self.ctx).list_displays() {
                Ok(displays) => WidgetResponse::Displays(displays),
                Err(e) => WidgetResponse::Error(format!("{e:#}")),
            },
            WidgetRequest::CreateWindow { display_index } => match self.open_on_display(display_index, false) {
                Ok(_) => WidgetResponse::Ready,
                Err(e) => {
                    error!(?display_index, error = %format!("{e:#}"), "Failed to open window");
                    WidgetResponse::Error(format!("{e:#}"))
                }
            },
            WidgetRequest::CloseSecondaryWindows => {
                self.close_secondary();
                WidgetResponse::Ready
            }
            WidgetRequest::Shutdown => {
                info!("Shutdown requested over IPC");
                self.running = false;
                WidgetResponse::Ready
            }
        }
    }

    fn handle_tray(&mut self, command: TrayCommand) {
        info!(command = ?command, "Tray command");
        match command {
            TrayCommand::Show => self.show(),
            TrayCommand::Hide => self.hide(),
            TrayCommand::OpenSettings => {
                if let Err(e) = spawn_settings(&self.paths) {
                    error!(error = %format!("{e:#}"), "Failed to open settings");
                }
            }
            TrayCommand::ReloadConfig => self.reload(),
            TrayCommand::Quit => self.running = false,
        }
    }

    fn handle_action(&mut self, action: EventAction) {
        match action {
            EventAction::Launch(icon) => {
                if let Err(e) = launcher::launch(&icon) {
                    error!(icon = %icon.id, error = %format!("{e:#}"), "Launch failed");
                }
            }
            EventAction::CloseRequested(id) => self.close_window(id),
        }
    }
}

/// Run the settings panel as a separate process against the same files
fn spawn_settings(paths: &DaemonPaths) -> Result<()> {
    let exe = std::env::current_exe().context("Failed to locate own executable")?;
    let mut child = Command::new(&exe)
        .arg("--config")
        .arg(&paths.config)
        .arg("--icons")
        .arg(&paths.icons)
        .arg("--socket")
        .arg(&paths.socket)
        .arg("settings")
        .spawn()
        .with_context(|| format!("Failed to start settings panel from {}", exe.display()))?;
    std::thread::spawn(move || {
        if let Err(e) = child.wait() {
            warn!(error = %e, "Failed to wait for settings process");
        }
    });
    Ok(())
}

fn run_loop(
    daemon: &mut Daemon<'_, '_>,
    conn: &RustConnection,
    protocols: ProtocolAtoms,
    shutdown: &AtomicBool,
    ipc_rx: &mpsc::Receiver<IpcCommand>,
    tray_rx: Option<&mpsc::Receiver<TrayCommand>>,
) -> Result<()> {
    while daemon.running {
        if shutdown.load(Ordering::Relaxed) {
            info!("Termination signal received");
            break;
        }

        while let Ok(command) = ipc_rx.try_recv() {
            let response = daemon.handle_request(command.request.clone());
            command.respond(response);
        }

        if let Some(rx) = tray_rx {
            while let Ok(command) = rx.try_recv() {
                daemon.handle_tray(command);
            }
        }

        let event = conn.poll_for_event()
            .context("Lost connection to X11 server")?;
        match event {
            Some(event) => match handle_event(&mut daemon.manager, protocols, event) {
                Ok(Some(action)) => daemon.handle_action(action),
                Ok(None) => {}
                Err(e) => error!(error = ?e, "Event handling error"),
            },
            None => std::thread::sleep(Duration::from_millis(IDLE_SLEEP_MS)),
        }
    }
    Ok(())
}

pub fn run_daemon(paths: DaemonPaths) -> Result<()> {
    let (conn, screen_num) = x11rb::connect(None)
        .context("Failed to connect to X11 server. Is DISPLAY set correctly?")?;
    let screen = &conn.setup().roots[screen_num];
    info!(
        screen = screen_num,
        width = screen.width_in_pixels,
        height = screen.height_in_pixels,
        "Connected to X11 server"
    );

    let atoms = CachedAtoms::new(&conn)
        .context("Failed to cache X11 atoms at startup")?;
    let ctx = AppContext { conn: &conn, screen, atoms: &atoms };
    let protocols = ProtocolAtoms::from(&atoms);

    let shutdown = Arc::new(AtomicBool::new(false));
    for signal in [signal_hook::consts::SIGINT, signal_hook::consts::SIGTERM] {
        signal_hook::flag::register(signal, Arc::clone(&shutdown))
            .with_context(|| format!("Failed to register handler for signal {signal}"))?;
    }

    let server = WidgetServer::bind_to(paths.socket.clone())?;
    let (ipc_tx, ipc_rx) = mpsc::channel::<IpcCommand>();
    let _listener = spawn_listener(server, ipc_tx);

    let tray_rx = spawn_tray()
        .inspect_err(|e| warn!(error = %format!("{e:#}"), "Tray unavailable"))
        .ok();

    let config = AppConfig::load_from(&paths.config);
    info!(config = ?config, "Loaded widget configuration");
    let icons = IconConfig::load_from(&paths.icons);

    let mut daemon = Daemon {
        ctx: &ctx,
        paths,
        icons,
        manager: WindowManager::new(config),
        main_window: None,
        tray_available: tray_rx.is_some(),
        running: true,
    };
    let result = daemon.open_main().and_then(|()| {
        info!(windows = daemon.manager.len(), "Widget daemon running");
        run_loop(&mut daemon, &conn, protocols, &shutdown, &ipc_rx, tray_rx.as_ref())
    });

    // Windows are detached and destroyed on every exit path, errors included
    daemon.close_all();
    let _ = conn.flush();
    remove_socket(&daemon.paths.socket);
    info!("Widget daemon stopped");
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tray::wait_for_registration;

    #[test]
    fn test_main_window_hides_to_tray() {
        assert_eq!(close_behavior(true, true, true), CloseBehavior::Hide);
    }

    #[test]
    fn test_close_destroys_without_tray() {
        assert_eq!(close_behavior(true, true, false), CloseBehavior::Destroy);
        assert_eq!(close_behavior(true, false, true), CloseBehavior::Destroy);
    }

    #[test]
    fn test_failed_tray_registration_closes_instead_of_hiding() {
        let (ready_tx, ready_rx) = mpsc::sync_channel(1);
        let (_tx, rx) = mpsc::channel();
        ready_tx.send(Err("no StatusNotifierWatcher".to_string())).unwrap();

        let tray_rx = wait_for_registration(&ready_rx, rx, Duration::from_millis(100)).ok();
        assert!(tray_rx.is_none());
        assert_eq!(close_behavior(true, true, tray_rx.is_some()), CloseBehavior::Destroy);
    }

    #[test]
    fn test_secondary_windows_always_destroy() {
        assert_eq!(close_behavior(false, true, true), CloseBehavior::Destroy);
    }
}
