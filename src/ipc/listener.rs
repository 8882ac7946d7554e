//! IPC listener thread for the widget daemon
//!
//! Windows live on the daemon's main thread, so the listener never touches
//! them: each decoded request is forwarded over a channel together with a
//! reply sender, and the listener blocks until the main loop answers.

use anyhow::{Context, Result};
use std::os::unix::net::UnixStream;
use std::sync::mpsc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use super::{read_message, write_message, WidgetRequest, WidgetResponse, WidgetServer};

/// How long the listener waits for the main loop before answering with an error
const DISPATCH_TIMEOUT: Duration = Duration::from_secs(5);

/// A request waiting for the main loop
#[derive(Debug)]
pub struct IpcCommand {
    pub request: WidgetRequest,
    pub reply: mpsc::Sender<WidgetResponse>,
}

impl IpcCommand {
    pub fn respond(self, response: WidgetResponse) {
        if self.reply.send(response).is_err() {
            warn!("IPC client went away before the response was ready");
        }
    }
}

/// Spawn IPC listener thread that forwards requests to `commands`
pub fn spawn_listener(server: WidgetServer, commands: mpsc::Sender<IpcCommand>) -> std::thread::JoinHandle<()> {
    std::thread::spawn(move || {
        if let Err(e) = run_listener(&server, &commands) {
            error!(error = ?e, "IPC listener thread crashed");
        }
    })
}

fn run_listener(server: &WidgetServer, commands: &mpsc::Sender<IpcCommand>) -> Result<()> {
    info!(socket = ?server.path(), "IPC listener started");

    loop {
        let mut stream = server.accept()?;
        debug!("IPC client connected");

        match serve_client(&mut stream, commands) {
            Ok(ClientOutcome::Disconnected) => debug!("IPC client disconnected"),
            Ok(ClientOutcome::DaemonGone) => {
                info!("Main loop stopped, closing IPC listener");
                return Ok(());
            }
            Err(e) => warn!(error = ?e, "IPC connection closed with error"),
        }
    }
}

enum ClientOutcome {
    Disconnected,
    DaemonGone,
}

fn serve_client(stream: &mut UnixStream, commands: &mpsc::Sender<IpcCommand>) -> Result<ClientOutcome> {
    loop {
        let request: WidgetRequest = match read_message(stream) {
            Ok(request) => request,
            // EOF or garbage: drop this client, keep accepting others
            Err(e) => {
                debug!(error = ?e, "Stopped reading from IPC client");
                return Ok(ClientOutcome::Disconnected);
            }
        };
        debug!(?request, "IPC request received");

        let (reply_tx, reply_rx) = mpsc::channel();
        if commands.send(IpcCommand { request, reply: reply_tx }).is_err() {
            write_message(stream, &WidgetResponse::Error("widget is shutting down".into()))?;
            return Ok(ClientOutcome::DaemonGone);
        }

        let response = reply_rx
            .recv_timeout(DISPATCH_TIMEOUT)
            .unwrap_or_else(|e| WidgetResponse::Error(format!("no response from widget: {e}")));
        write_message(stream, &response).context("Failed to send IPC response")?;
    }
}
