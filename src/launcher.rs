//! Opening icon targets
//!
//! Targets are handed to the desktop as-is; nothing checks beforehand whether
//! a path or URL actually exists.

use std::process::Command;

use anyhow::{bail, Context, Result};
use tracing::{info, warn};

use crate::config::{IconData, IconKind};
use crate::constants::shell::{OPENER, STEAM_RUN_PREFIX};

/// Program plus arguments for one launch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl LaunchCommand {
    fn opener(target: impl Into<String>) -> Self {
        Self { program: OPENER.to_string(), args: vec![target.into()] }
    }
}

fn required<'i>(field: &'i Option<String>, name: &str, icon: &IconData) -> Result<&'i str> {
    match field.as_deref().map(str::trim) {
        Some(value) if !value.is_empty() => Ok(value),
        _ => bail!("Icon '{}' ({:?}) has no {}", icon.id, icon.kind, name),
    }
}

/// Work out what to run for `icon`
pub fn command_for(icon: &IconData) -> Result<LaunchCommand> {
    let command = match icon.kind {
        IconKind::App => LaunchCommand { program: required(&icon.path, "path", icon)?.to_string(), args: Vec::new() },
        IconKind::File | IconKind::Directory => LaunchCommand::opener(required(&icon.path, "path", icon)?),
        IconKind::Url => LaunchCommand::opener(required(&icon.url, "url", icon)?),
        IconKind::SteamGame => {
            let id = required(&icon.steam_id, "steamId", icon)?;
            LaunchCommand::opener(format!("{STEAM_RUN_PREFIX}{id}"))
        }
    };
    Ok(command)
}

/// Start the target in the background
pub fn launch(icon: &IconData) -> Result<()> {
    let command = command_for(icon)?;
    info!(icon = %icon.id, program = %command.program, args = ?command.args, "Launching");

    let mut child = Command::new(&command.program)
        .args(&command.args)
        .spawn()
        .with_context(|| format!("Failed to launch '{}' for icon '{}'", command.program, icon.id))?;

    // Reap in the background so finished launches do not linger as zombies
    let id = icon.id.clone();
    std::thread::spawn(move || match child.wait() {
        Ok(status) if !status.success() => warn!(icon = %id, %status, "Launched process exited with failure"),
        Ok(_) => {}
        Err(e) => warn!(icon = %id, error = %e, "Failed to wait for launched process"),
    });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn icon(kind: IconKind) -> IconData {
        IconData {
            id: "test".into(),
            title: "Test".into(),
            description: None,
            icon: String::new(),
            thumbnail: None,
            kind,
            path: None,
            url: None,
            steam_id: None,
            width: None,
            height: None,
            grid_position: None,
            style: None,
            is_visible: true,
            order: None,
        }
    }

    #[test]
    fn test_app_runs_path_directly() {
        let mut app = icon(IconKind::App);
        app.path = Some("/usr/bin/firefox".into());
        assert_eq!(command_for(&app).unwrap(), LaunchCommand { program: "/usr/bin/firefox".into(), args: vec![] });
    }

    #[test]
    fn test_directory_and_url_use_opener() {
        let mut dir = icon(IconKind::Directory);
        dir.path = Some("/home/user/Downloads".into());
        assert_eq!(command_for(&dir).unwrap(), LaunchCommand::opener("/home/user/Downloads"));

        let mut url = icon(IconKind::Url);
        url.url = Some("https://github.com".into());
        let command = command_for(&url).unwrap();
        assert_eq!(command.program, "xdg-open");
        assert_eq!(command.args, vec!["https://github.com".to_string()]);
    }

    #[test]
    fn test_steam_game_uri() {
        let mut game = icon(IconKind::SteamGame);
        game.steam_id = Some("570".into());
        assert_eq!(command_for(&game).unwrap().args, vec!["steam://rungameid/570".to_string()]);
    }

    #[test]
    fn test_missing_field_is_error() {
        assert!(command_for(&icon(IconKind::Url)).is_err());
        assert!(command_for(&icon(IconKind::SteamGame)).is_err());

        let mut blank = icon(IconKind::File);
        blank.path = Some("   ".into());
        let err = command_for(&blank).unwrap_err();
        assert!(err.to_string().contains("has no path"));
    }

    #[test]
    fn test_url_icon_ignores_path() {
        let mut url = icon(IconKind::Url);
        url.path = Some("/tmp".into());
        assert!(command_for(&url).is_err());
    }
}
