// reviewer-core/src/tools/music.rs

//! Spotify control through AppleScript, gated by the safety controller.

use super::{spawn, CommandBuilder};
use crate::context::ToolContext;
use crate::errors::ToolError;
use crate::format::format_outcome;
use crate::playlists::Playlist;
use crate::safety::{evaluate, DeviceProbe, MusicAction, MusicRequest, Verdict, LAUNCH_COMMAND};
use crate::utils::{applescript_escape, shell_quote};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

const INFO_SCRIPT: &str = r#"tell application "Spotify"
  if player state is playing then
    set trackName to name of current track
    set artistName to artist of current track
    set albumName to album of current track
    return "Now playing: " & trackName & " by " & artistName & " from " & albumName
  else
    return "Spotify is not playing"
  end if
end tell"#;

#[derive(Deserialize, Debug, Clone)]
pub struct MusicArgs {
    pub action: MusicAction,
    /// Spotify URI to play.
    #[serde(default)]
    pub uri: Option<String>,
    /// Target level, clamped to 0..=100.
    #[serde(default)]
    pub volume: Option<f64>,
    #[serde(default)]
    pub mood: Option<String>,
}

impl MusicArgs {
    fn uri(&self) -> Option<&str> {
        self.uri.as_deref().map(str::trim).filter(|u| !u.is_empty())
    }

    fn volume(&self) -> Option<u8> {
        self.volume.map(|v| v.round().clamp(0.0, 100.0) as u8)
    }

    /// The mood a `play` request resolves to: the explicit one, or the
    /// configured default when neither a mood nor a URI was given.
    fn mood<'a>(&'a self, ctx: &'a ToolContext) -> Option<&'a str> {
        if self.action != MusicAction::Play {
            return None;
        }
        match self.mood.as_deref().map(str::trim).filter(|m| !m.is_empty()) {
            Some(mood) => Some(mood),
            None if self.uri().is_none() => ctx.config.music.default_mood.as_deref(),
            None => None,
        }
    }

    fn playlist<'a>(&'a self, ctx: &'a ToolContext) -> Result<Option<(&'a str, &'a Playlist)>, ToolError> {
        match self.mood(ctx) {
            Some(mood) => Ok(Some((mood, ctx.catalog.resolve(mood)?))),
            None => Ok(None),
        }
    }
}

fn osascript(script: &str) -> String {
    format!("osascript -e {}", shell_quote(script))
}

fn tell_spotify(command: &str) -> String {
    osascript(&format!("tell application \"Spotify\" to {}", command))
}

pub struct Music;

impl CommandBuilder for Music {
    type Args = MusicArgs;

    fn action_name(&self) -> &'static str {
        "Music Control"
    }

    fn build_command(&self, ctx: &ToolContext, args: &MusicArgs) -> Result<String, ToolError> {
        if !ctx.platform.is_macos() {
            return Err(ToolError::UnsupportedPlatform(
                "Music control is only available on macOS".to_string(),
            ));
        }

        Ok(match args.action {
            MusicAction::Play => match (args.playlist(ctx)?, args.uri()) {
                (Some((_, playlist)), _) => {
                    tell_spotify(&format!("play track \"{}\"", applescript_escape(&playlist.uri)))
                }
                (None, Some(uri)) if uri.starts_with("spotify:") => {
                    tell_spotify(&format!("play track \"{}\"", applescript_escape(uri)))
                }
                (None, Some(uri)) => {
                    // No search support: anything but a Spotify URI resumes playback.
                    debug!(uri = %uri, "Not a Spotify URI; resuming playback instead");
                    tell_spotify("play")
                }
                (None, None) => tell_spotify("play"),
            },
            MusicAction::Pause => tell_spotify("pause"),
            MusicAction::PlayPause => tell_spotify("playpause"),
            MusicAction::Next => tell_spotify("next track"),
            MusicAction::Previous => tell_spotify("previous track"),
            MusicAction::Volume => {
                let level = args.volume().ok_or_else(|| ToolError::missing("volume"))?;
                tell_spotify(&format!("set sound volume to {}", level))
            }
            MusicAction::Mute => tell_spotify("set sound volume to 0"),
            MusicAction::Info => osascript(INFO_SCRIPT),
        })
    }
}

/// Validates, checks device state against the volume policy, then runs the
/// command. Safety rejections come back as `Ok` text.
pub async fn music(ctx: &ToolContext, args: &MusicArgs, cancel: CancellationToken) -> Result<String, ToolError> {
    let command = Music.build_command(ctx, args)?;
    let action = Music.action_name();
    let playlist = args.playlist(ctx)?;

    let options = ctx.run_options(cancel.clone());
    let snapshot = DeviceProbe::new(ctx.runner.as_ref(), &options)
        .snapshot_for(args.action)
        .await;
    let request = MusicRequest {
        action: args.action,
        uri: args.uri(),
        mood: playlist.map(|(mood, _)| mood),
        volume: args.volume(),
    };

    match evaluate(&request, &snapshot, &ctx.volume_policy()) {
        Verdict::Reject(rejection) => {
            info!(action = %args.action, title = %rejection.title, "Music request rejected by safety check");
            return Ok(rejection.to_string());
        }
        Verdict::Proceed { launch_first: true } => {
            info!("Spotify is not running; launching it");
            let launched = ctx.run(LAUNCH_COMMAND, &options).await;
            if !launched.success() {
                warn!(exit_code = launched.exit_code, stderr = %launched.stderr.trim(), "Failed to launch Spotify");
            }
            tokio::select! {
                _ = tokio::time::sleep(ctx.timings.warmup) => {}
                _ = cancel.cancelled() => {}
            }
        }
        Verdict::Proceed { launch_first: false } => {}
    }

    let outcome = spawn(ctx, action, &command, cancel).await;
    if outcome.success() {
        if let Some((mood, playlist)) = playlist {
            return Ok(format!("Playing {} playlist for {} mood", playlist.display_name, mood));
        }
        if let (MusicAction::Volume, Some(level)) = (args.action, request.volume) {
            return Ok(format!("Volume set to {}% (hearing protection active)", level));
        }
    }
    Ok(format_outcome(&outcome, action, false).into())
}
