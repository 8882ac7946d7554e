//! System tray via D-Bus StatusNotifier (ksni)
//!
//! The tray lives on its own thread with a current-thread tokio runtime. Menu
//! activations are only forwarded to the daemon loop, never acted on here.
//! Startup blocks until the icon is registered or registration has failed.

use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use ksni::menu::{MenuItem, StandardItem};
use ksni::TrayMethods;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrayCommand {
    Show,
    Hide,
    OpenSettings,
    ReloadConfig,
    Quit,
}

struct WidgetTray {
    commands: mpsc::Sender<TrayCommand>,
}

impl WidgetTray {
    fn send(&self, command: TrayCommand) {
        if self.commands.send(command).is_err() {
            warn!(?command, "Daemon loop is gone, dropping tray command");
        }
    }

    fn item(label: &str, icon_name: &str, command: TrayCommand) -> MenuItem<Self> {
        StandardItem {
            label: label.into(),
            icon_name: icon_name.into(),
            activate: Box::new(move |tray: &mut Self| tray.send(command)),
            ..Default::default()
        }
        .into()
    }
}

impl ksni::Tray for WidgetTray {
    fn id(&self) -> String {
        env!("CARGO_PKG_NAME").into()
    }

    fn title(&self) -> String {
        "Desktop Icons".into()
    }

    fn icon_name(&self) -> String {
        "view-grid".into()
    }

    /// Left click brings the widget back
    fn activate(&mut self, _x: i32, _y: i32) {
        self.send(TrayCommand::Show);
    }

    fn menu(&self) -> Vec<MenuItem<Self>> {
        vec![
            Self::item("Show", "view-visible", TrayCommand::Show),
            Self::item("Hide", "view-hidden", TrayCommand::Hide),
            MenuItem::Separator,
            Self::item("Settings", "preferences-system", TrayCommand::OpenSettings),
            Self::item("Reload Config", "view-refresh", TrayCommand::ReloadConfig),
            MenuItem::Separator,
            Self::item("Quit", "application-exit", TrayCommand::Quit),
        ]
    }
}

/// Registration outcome reported by the tray thread
type Registration = std::result::Result<(), String>;

/// Start the tray thread and wait until it has registered with a
/// StatusNotifier host; commands arrive on the returned receiver.
/// Fails when no host accepts the icon, so callers can tell whether the
/// tray is really there.
pub fn spawn_tray() -> Result<mpsc::Receiver<TrayCommand>> {
    let (tx, rx) = mpsc::channel();
    let (ready_tx, ready_rx) = mpsc::sync_channel::<Registration>(1);
    thread::Builder::new()
        .name("tray".into())
        .spawn(move || {
            let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
                Ok(runtime) => runtime,
                Err(e) => {
                    error!(error = ?e, "Failed to build tokio runtime for tray");
                    let _ = ready_tx.send(Err(format!("tokio runtime: {e}")));
                    return;
                }
            };
            runtime.block_on(async move {
                match (WidgetTray { commands: tx }).spawn().await {
                    Ok(_handle) => {
                        info!("Tray icon registered");
                        let _ = ready_tx.send(Ok(()));
                        // The service runs until the process exits
                        std::future::pending::<()>().await;
                    }
                    Err(e) => {
                        warn!(error = ?e, "No StatusNotifier host available, running without tray");
                        let _ = ready_tx.send(Err(e.to_string()));
                    }
                }
            });
        })
        .context("Failed to spawn tray thread")?;

    let timeout = Duration::from_millis(crate::constants::daemon::TRAY_REGISTER_TIMEOUT_MS);
    wait_for_registration(&ready_rx, rx, timeout)
}

/// Hand out the command receiver only once the tray thread reports success
pub(crate) fn wait_for_registration(
    ready: &mpsc::Receiver<Registration>,
    commands: mpsc::Receiver<TrayCommand>,
    timeout: Duration,
) -> Result<mpsc::Receiver<TrayCommand>> {
    match ready.recv_timeout(timeout) {
        Ok(Ok(())) => Ok(commands),
        Ok(Err(reason)) => Err(anyhow!("Tray registration failed: {reason}")),
        Err(mpsc::RecvTimeoutError::Timeout) => Err(anyhow!("Tray did not register within {timeout:?}")),
        Err(mpsc::RecvTimeoutError::Disconnected) => Err(anyhow!("Tray thread exited before registering")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ksni::Tray;

    fn activate(tray: &mut WidgetTray, item: &MenuItem<WidgetTray>) -> bool {
        match item {
            MenuItem::Standard(standard) => {
                (standard.activate)(tray);
                true
            }
            _ => false,
        }
    }

    #[test]
    fn test_menu_items_forward_commands() {
        let (tx, rx) = mpsc::channel();
        let mut tray = WidgetTray { commands: tx };
        let menu = tray.menu();

        for item in &menu {
            activate(&mut tray, item);
        }
        let received: Vec<TrayCommand> = rx.try_iter().collect();
        assert_eq!(
            received,
            vec![
                TrayCommand::Show,
                TrayCommand::Hide,
                TrayCommand::OpenSettings,
                TrayCommand::ReloadConfig,
                TrayCommand::Quit,
            ]
        );
    }

    #[test]
    fn test_activate_shows_widget() {
        let (tx, rx) = mpsc::channel();
        let mut tray = WidgetTray { commands: tx };
        tray.activate(0, 0);
        assert_eq!(rx.try_recv().unwrap(), TrayCommand::Show);
    }

    #[test]
    fn test_registration_success_hands_out_commands() {
        let (ready_tx, ready_rx) = mpsc::sync_channel(1);
        let (tx, rx) = mpsc::channel();
        ready_tx.send(Ok(())).unwrap();

        let commands = wait_for_registration(&ready_rx, rx, Duration::from_millis(100)).unwrap();
        tx.send(TrayCommand::Hide).unwrap();
        assert_eq!(commands.try_recv().unwrap(), TrayCommand::Hide);
    }

    #[test]
    fn test_registration_failure_is_an_error() {
        let (ready_tx, ready_rx) = mpsc::sync_channel(1);
        let (_tx, rx) = mpsc::channel();
        ready_tx.send(Err("no watcher".to_string())).unwrap();
        let error = wait_for_registration(&ready_rx, rx, Duration::from_millis(100)).unwrap_err();
        assert!(error.to_string().contains("no watcher"));
    }

    #[test]
    fn test_silent_or_dead_tray_thread_is_an_error() {
        let (_ready_tx, ready_rx) = mpsc::sync_channel::<Registration>(1);
        let (_tx, rx) = mpsc::channel();
        assert!(wait_for_registration(&ready_rx, rx, Duration::from_millis(10)).is_err());

        let (ready_tx, ready_rx) = mpsc::sync_channel::<Registration>(1);
        drop(ready_tx);
        let (_tx, rx) = mpsc::channel();
        assert!(wait_for_registration(&ready_rx, rx, Duration::from_millis(100)).is_err());
    }

    #[test]
    fn test_send_after_daemon_exit_does_not_panic() {
        let (tx, rx) = mpsc::channel();
        drop(rx);
        let tray = WidgetTray { commands: tx };
        tray.send(TrayCommand::Quit);
    }
}
