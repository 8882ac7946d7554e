//! IPC (Inter-Process Communication) via Unix sockets
//!
//! Message-based control channel into the running widget daemon, used by the
//! settings panel and the `ctl` subcommand. Uses length-prefixed JSON over
//! Unix domain sockets.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::constants::ipc::{MAX_MESSAGE_SIZE, SOCKET_NAME};

pub mod listener;
mod messages;
pub use listener::{spawn_listener, IpcCommand};
pub use messages::{WidgetRequest, WidgetResponse};

/// How long a client waits for the daemon to answer
const RESPONSE_TIMEOUT: Duration = Duration::from_secs(5);

/// Get default socket path (XDG_RUNTIME_DIR with fallback to cache)
pub fn default_socket_path() -> Result<PathBuf> {
    if let Ok(runtime_dir) = std::env::var("XDG_RUNTIME_DIR") {
        return Ok(PathBuf::from(runtime_dir).join(SOCKET_NAME));
    }

    // Fallback to cache dir
    let cache = dirs::cache_dir()
        .context("Failed to determine cache directory (no XDG_RUNTIME_DIR or HOME)")?;
    Ok(cache.join(SOCKET_NAME))
}

/// Client connection to the widget daemon
pub struct WidgetClient {
    pub(crate) stream: UnixStream,
}

impl WidgetClient {
    /// Connect to specific socket path
    pub fn connect_to(path: &Path) -> Result<Self> {
        let stream = UnixStream::connect(path)
            .context(format!("Failed to connect to widget at {}", path.display()))?;
        stream
            .set_read_timeout(Some(RESPONSE_TIMEOUT))
            .context("Failed to set IPC read timeout")?;
        Ok(Self { stream })
    }

    pub fn send_request(&mut self, req: &WidgetRequest) -> Result<()> {
        write_message(&mut self.stream, req)
    }

    /// Receive response (blocks up to the response timeout)
    pub fn recv_response(&mut self) -> Result<WidgetResponse> {
        read_message(&mut self.stream)
    }

    /// Send request and wait for response (convenience method)
    pub fn request(&mut self, req: WidgetRequest) -> Result<WidgetResponse> {
        self.send_request(&req)?;
        self.recv_response()
    }
}

/// Server listener for the widget daemon
pub struct WidgetServer {
    listener: UnixListener,
    socket_path: PathBuf,
}

impl WidgetServer {
    /// Create server and bind to specific socket path
    pub fn bind_to(socket_path: PathBuf) -> Result<Self> {
        if let Some(parent) = socket_path.parent() {
            std::fs::create_dir_all(parent)
                .context(format!("Failed to create socket directory: {}", parent.display()))?;
        }

        // A live daemon answers on the socket; anything else is a stale leftover
        if socket_path.exists() {
            if UnixStream::connect(&socket_path).is_ok() {
                return Err(anyhow!("Another widget daemon is already listening on {}", socket_path.display()));
            }
            std::fs::remove_file(&socket_path)
                .context(format!("Failed to remove stale socket: {}", socket_path.display()))?;
        }

        let listener = UnixListener::bind(&socket_path)
            .context(format!("Failed to bind socket at {}", socket_path.display()))?;

        // Set permissions to 0700 (owner only)
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&socket_path, std::fs::Permissions::from_mode(0o700))
                .context("Failed to set socket permissions")?;
        }

        Ok(Self {
            listener,
            socket_path,
        })
    }

    /// Accept incoming connection (blocking)
    pub fn accept(&self) -> Result<UnixStream> {
        let (stream, _addr) = self.listener.accept()
            .context("Failed to accept IPC connection")?;
        Ok(stream)
    }

    pub fn path(&self) -> &Path {
        &self.socket_path
    }
}

/// Remove the socket file of a server that is shutting down
pub fn remove_socket(path: &Path) {
    let _ = std::fs::remove_file(path);
}

/// Write length-prefixed message to stream
pub(crate) fn write_message<T: Serialize, W: Write>(stream: &mut W, msg: &T) -> Result<()> {
    let json = serde_json::to_vec(msg).context("Failed to serialize message to JSON")?;

    // Write length prefix (u32 little-endian)
    let len = json.len() as u32;
    stream
        .write_all(&len.to_le_bytes())
        .context("Failed to write message length")?;

    stream
        .write_all(&json)
        .context("Failed to write message payload")?;

    stream.flush().context("Failed to flush stream")?;

    Ok(())
}

/// Read length-prefixed message from stream
pub(crate) fn read_message<T: for<'de> Deserialize<'de>, R: Read>(stream: &mut R) -> Result<T> {
    let mut len_buf = [0u8; 4];
    stream
        .read_exact(&mut len_buf)
        .context("Failed to read message length")?;
    let len = u32::from_le_bytes(len_buf) as usize;

    // Sanity check (prevent DoS via huge allocation)
    if len > MAX_MESSAGE_SIZE {
        return Err(anyhow!("Message too large: {} bytes (max: {})", len, MAX_MESSAGE_SIZE));
    }

    let mut json_buf = vec![0u8; len];
    stream
        .read_exact(&mut json_buf)
        .context("Failed to read message payload")?;

    serde_json::from_slice(&json_buf).context("Failed to deserialize message from JSON")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AppConfig, PlatformLevel, WindowLevel};

    #[test]
    fn test_request_over_socket_pair() {
        let (mut a, mut b) = UnixStream::pair().unwrap();
        let req = WidgetRequest::SetWindowLevel {
            level: WindowLevel::AlwaysOnTop,
            fine_level: Some(PlatformLevel::ScreenSaver),
        };
        write_message(&mut a, &req).unwrap();
        let received: WidgetRequest = read_message(&mut b).unwrap();
        assert_eq!(received, req);
    }

    #[test]
    fn test_config_update_keeps_all_sections() {
        let mut config = AppConfig::default();
        config.window.window_level = WindowLevel::StayBehind;
        config.display_index = Some(1);
        config.ui.transparency = 0.5;

        let mut buf = Vec::new();
        write_message(&mut buf, &WidgetRequest::UpdateConfig(config.clone())).unwrap();
        let received: WidgetRequest = read_message(&mut buf.as_slice()).unwrap();
        assert_eq!(received, WidgetRequest::UpdateConfig(config));
    }

    #[test]
    fn test_length_prefix_is_little_endian() {
        let mut buf = Vec::new();
        write_message(&mut buf, &WidgetResponse::Pong).unwrap();
        let payload = br#""Pong""#;
        assert_eq!(&buf[..4], &(payload.len() as u32).to_le_bytes());
        assert_eq!(&buf[4..], payload);
    }

    #[test]
    fn test_oversized_message_rejected() {
        let mut buf = ((MAX_MESSAGE_SIZE + 1) as u32).to_le_bytes().to_vec();
        buf.extend_from_slice(b"{}");
        let result: Result<WidgetResponse> = read_message(&mut buf.as_slice());
        assert!(result.unwrap_err().to_string().contains("too large"));
    }

    #[test]
    fn test_truncated_message_is_error() {
        let mut buf = 100u32.to_le_bytes().to_vec();
        buf.extend_from_slice(b"\"Po");
        let result: Result<WidgetResponse> = read_message(&mut buf.as_slice());
        assert!(result.is_err());
    }

    #[test]
    fn test_bind_replaces_stale_socket() {
        let dir = std::env::temp_dir().join(format!("desk-icons-ipc-test-{}", std::process::id()));
        let path = dir.join("widget.sock");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(&path, b"").unwrap();

        let server = WidgetServer::bind_to(path.clone()).unwrap();
        let mut client = WidgetClient::connect_to(&path).unwrap();
        let mut stream = server.accept().unwrap();

        client.send_request(&WidgetRequest::Ping).unwrap();
        let req: WidgetRequest = read_message(&mut stream).unwrap();
        assert_eq!(req, WidgetRequest::Ping);
        write_message(&mut stream, &WidgetResponse::Pong).unwrap();
        assert_eq!(client.recv_response().unwrap(), WidgetResponse::Pong);

        remove_socket(&path);
        let _ = std::fs::remove_dir_all(&dir);
    }
}
