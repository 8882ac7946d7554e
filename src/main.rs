#![forbid(unsafe_code)]

mod config;
mod constants;
mod daemon;
mod display;
mod event_handler;
mod geometry;
mod gui;
mod handle;
mod ipc;
mod launcher;
mod lifecycle;
mod stacking;
mod tray;
mod types;
mod widget;
mod x11_utils;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{info, Level as TraceLevel};
use tracing_subscriber::FmtSubscriber;
use x11rb::connection::Connection;

use config::{AppConfig, IconConfig, PlatformLevel, WindowLevel};
use daemon::{run_daemon, DaemonPaths};
use display::{DisplaySource, X11Displays};
use geometry::resolve_on_display;
use ipc::{WidgetClient, WidgetRequest, WidgetResponse};
use x11_utils::{AppContext, CachedAtoms};

#[derive(Parser, Debug)]
#[command(name = "desk-icons", about = "Desktop icon grid widget for X11", version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Window/UI/behavior config file
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Icon grid file
    #[arg(long, global = true, value_name = "PATH")]
    icons: Option<PathBuf>,

    /// Daemon control socket
    #[arg(long, global = true, value_name = "PATH")]
    socket: Option<PathBuf>,

    /// trace, debug, info, warn or error (overrides LOG_LEVEL)
    #[arg(long, global = true, value_name = "LEVEL")]
    log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the widget (default)
    Run,
    /// Open the settings panel
    Settings,
    /// List attached displays as JSON
    Displays,
    /// Print the geometry the configured window would get
    Resolve {
        /// Display index; defaults to the configured one
        #[arg(long)]
        display: Option<usize>,
    },
    /// Send a command to the running widget
    Ctl {
        #[command(subcommand)]
        action: CtlAction,
    },
}

#[derive(Subcommand, Debug)]
enum CtlAction {
    Ping,
    /// Re-read config and icon files
    Reload,
    Shutdown,
    /// Change the stacking level of every window
    Level {
        /// default, alwaysOnTop or stayBehind
        level: String,
        /// Fine always-on-top level, e.g. floating or screen-saver
        #[arg(long)]
        fine: Option<String>,
    },
    /// Open another widget window
    NewWindow {
        #[arg(long)]
        display: Option<usize>,
    },
    CloseSecondary,
    /// Raise every window that is not stay-behind
    Front,
    /// Allow or forbid keyboard focus on the widget windows
    Focusable {
        #[arg(action = clap::ArgAction::Set)]
        focusable: bool,
    },
    /// Print the running widget's config
    Config,
}

fn parse_level(text: &str) -> TraceLevel {
    match text.to_lowercase().as_str() {
        "trace" => TraceLevel::TRACE,
        "debug" => TraceLevel::DEBUG,
        "warn" => TraceLevel::WARN,
        "error" => TraceLevel::ERROR,
        _ => TraceLevel::INFO,
    }
}

fn init_logging(cli_level: Option<&str>) -> Result<()> {
    let level = match cli_level {
        Some(level) => parse_level(level),
        None => parse_level(&std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string())),
    };

    // stdout is reserved for command output
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to install tracing subscriber")?;
    Ok(())
}

fn paths(cli: &Cli) -> Result<DaemonPaths> {
    Ok(DaemonPaths {
        config: cli.config.clone().unwrap_or_else(AppConfig::path),
        icons: cli.icons.clone().unwrap_or_else(IconConfig::path),
        socket: match &cli.socket {
            Some(socket) => socket.clone(),
            None => ipc::default_socket_path()?,
        },
    })
}

/// Run `f` against the displays of the default X11 screen
fn with_displays<T>(f: impl FnOnce(Vec<display::DisplayDescriptor>) -> Result<T>) -> Result<T> {
    let (conn, screen_num) = x11rb::connect(None)
        .context("Failed to connect to X11 server. Is DISPLAY set correctly?")?;
    let screen = &conn.setup().roots[screen_num];
    let atoms = CachedAtoms::new(&conn)?;
    let ctx = AppContext { conn: &conn, screen, atoms: &atoms };
    let displays = X11Displays::new(&ctx).list_displays()?;
    f(displays)
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value).context("Failed to serialize output")?);
    Ok(())
}

fn ctl_request(action: CtlAction) -> Result<WidgetRequest> {
    Ok(match action {
        CtlAction::Ping => WidgetRequest::Ping,
        CtlAction::Reload => WidgetRequest::ReloadConfig,
        CtlAction::Shutdown => WidgetRequest::Shutdown,
        CtlAction::Level { level, fine } => {
            let fine_level = match fine {
                Some(text) => match PlatformLevel::parse(&text) {
                    Some(level) => Some(level),
                    None => bail!("Unknown fine level '{text}'"),
                },
                None => None,
            };
            let level = match WindowLevel::parse(&level) {
                Some(level) => level,
                None => bail!("Unknown window level '{level}'"),
            };
            WidgetRequest::SetWindowLevel { level, fine_level }
        }
        CtlAction::NewWindow { display } => WidgetRequest::CreateWindow { display_index: display },
        CtlAction::CloseSecondary => WidgetRequest::CloseSecondaryWindows,
        CtlAction::Front => WidgetRequest::BringToFront,
        CtlAction::Focusable { focusable } => WidgetRequest::SetFocusable { focusable },
        CtlAction::Config => WidgetRequest::GetConfig,
    })
}

fn run_ctl(socket: &std::path::Path, action: CtlAction) -> Result<()> {
    let request = ctl_request(action)?;
    let mut client = WidgetClient::connect_to(socket)
        .context("Widget is not running")?;
    match client.request(request)? {
        WidgetResponse::Pong => println!("pong"),
        WidgetResponse::Ready => println!("ok"),
        WidgetResponse::Config(config) => print_json(&config)?,
        WidgetResponse::Displays(displays) => print_json(&displays)?,
        WidgetResponse::Error(message) => bail!("Widget reported an error: {message}"),
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_level.as_deref())?;
    let paths = paths(&cli)?;

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => {
            info!(config = %paths.config.display(), icons = %paths.icons.display(), "Starting widget daemon");
            run_daemon(paths)
        }
        Command::Settings => gui::run_settings(paths.config, paths.socket),
        Command::Displays => with_displays(|displays| print_json(&displays)),
        Command::Resolve { display } => {
            let config = AppConfig::load_from(&paths.config);
            with_displays(|displays| {
                let geometry = resolve_on_display(&config.window, &displays, display.or(config.display_index))
                    .context("No displays attached")?;
                print_json(&geometry)
            })
        }
        Command::Ctl { action } => run_ctl(&paths.socket, action),
    }
}
