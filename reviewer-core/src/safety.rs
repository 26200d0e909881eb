// reviewer-core/src/safety.rs

//! Hearing and playback protection for the music tool.
//!
//! The device state is read fresh into a [`SafetySnapshot`] before every
//! request. Whether the request may proceed is decided by [`evaluate`], a
//! pure function of the request, the snapshot and the [`VolumePolicy`].
//! Rejections are not errors: they render as `❌ SAFETY: ...` text with
//! suggestions and are returned to the caller as a successful response.

use crate::config::MusicConfig;
use crate::exec::{ProcessRunner, RunOptions};
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info, warn};

pub const MUTED_QUERY: &str = "osascript -e 'output muted of (get volume settings)'";
pub const RUNNING_QUERY: &str =
    "osascript -e 'tell application \"System Events\" to (name of processes) contains \"Spotify\"'";
pub const PLAYER_STATE_QUERY: &str = "osascript -e 'tell application \"Spotify\" to player state as string'";
pub const VOLUME_QUERY: &str = "osascript -e 'tell application \"Spotify\" to sound volume'";
pub const LAUNCH_COMMAND: &str = "osascript -e 'tell application \"Spotify\" to activate'";
pub const PAUSE_COMMAND: &str = "osascript -e 'tell application \"Spotify\" to pause'";
pub const RESUME_COMMAND: &str = "osascript -e 'tell application \"Spotify\" to play'";

/// Volume assumed when the player does not report one.
const FALLBACK_VOLUME: u8 = 50;

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MusicAction {
    Play,
    Pause,
    PlayPause,
    Next,
    Previous,
    Volume,
    Mute,
    Info,
}

impl MusicAction {
    pub const ALL: [MusicAction; 8] = [
        MusicAction::Play,
        MusicAction::Pause,
        MusicAction::PlayPause,
        MusicAction::Next,
        MusicAction::Previous,
        MusicAction::Volume,
        MusicAction::Mute,
        MusicAction::Info,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MusicAction::Play => "play",
            MusicAction::Pause => "pause",
            MusicAction::PlayPause => "playpause",
            MusicAction::Next => "next",
            MusicAction::Previous => "previous",
            MusicAction::Volume => "volume",
            MusicAction::Mute => "mute",
            MusicAction::Info => "info",
        }
    }
}

impl fmt::Display for MusicAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MusicAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MusicAction::ALL
            .into_iter()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| format!("Unknown action: {}", s))
    }
}

/// Limits on volume increases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VolumePolicy {
    pub safe_ceiling: u8,
    pub max_step_increase: u8,
}

impl From<&MusicConfig> for VolumePolicy {
    fn from(music: &MusicConfig) -> Self {
        Self {
            safe_ceiling: music.safe_volume,
            max_step_increase: music.volume_increment,
        }
    }
}

impl Default for VolumePolicy {
    fn default() -> Self {
        Self {
            safe_ceiling: 70,
            max_step_increase: 20,
        }
    }
}

/// Point-in-time device state. Never cached between requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SafetySnapshot {
    pub is_muted: bool,
    pub app_running: bool,
    pub is_playing: bool,
    pub current_volume: u8,
}

/// What the caller asked the player to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MusicRequest<'a> {
    pub action: MusicAction,
    pub uri: Option<&'a str>,
    pub mood: Option<&'a str>,
    /// Requested level, already clamped to 0..=100.
    pub volume: Option<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SafetyRejection {
    pub title: String,
    pub message: String,
    pub suggestions: Vec<String>,
}

impl SafetyRejection {
    fn new(title: impl Into<String>, message: impl Into<String>, suggestions: Vec<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            suggestions,
        }
    }
}

impl fmt::Display for SafetyRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "❌ SAFETY: {} - {}", self.title, self.message)?;
        if !self.suggestions.is_empty() {
            write!(f, " | Try: {}", self.suggestions.join("; "))?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Go ahead; start the player first when `launch_first` is set.
    Proceed { launch_first: bool },
    Reject(SafetyRejection),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolumeVerdict {
    Allow,
    AboveCeiling { suggested: u8 },
    StepTooLarge { suggested: u8 },
}

/// Ceiling first, then step size. Decreases and no-ops are always allowed.
pub fn evaluate_volume(requested: u8, current: u8, policy: &VolumePolicy) -> VolumeVerdict {
    if requested <= current {
        return VolumeVerdict::Allow;
    }
    if requested > policy.safe_ceiling && current <= policy.safe_ceiling {
        return VolumeVerdict::AboveCeiling {
            suggested: policy.safe_ceiling,
        };
    }
    if requested - current > policy.max_step_increase {
        let suggested = current.saturating_add(policy.max_step_increase).min(requested);
        return VolumeVerdict::StepTooLarge { suggested };
    }
    VolumeVerdict::Allow
}

pub fn evaluate(request: &MusicRequest<'_>, snapshot: &SafetySnapshot, policy: &VolumePolicy) -> Verdict {
    let action = request.action;

    if snapshot.is_muted && action != MusicAction::Info {
        return Verdict::Reject(SafetyRejection::new(
            "🔇 System Audio Muted",
            "System is muted",
            vec!["unmute first".into(), "use info action".into()],
        ));
    }

    if !snapshot.app_running && action != MusicAction::Play {
        return Verdict::Reject(SafetyRejection::new(
            "Spotify Not Running",
            "Spotify is not running",
            vec!["start Spotify first".into(), "use play to launch it".into()],
        ));
    }

    if action == MusicAction::Play
        && snapshot.app_running
        && snapshot.is_playing
        && (request.uri.is_none() || request.mood.is_some())
    {
        let (message, alternative) = match request.mood {
            Some(mood) => (
                format!("Cannot switch to {} playlist", mood),
                format!("pause then play mood {}", mood),
            ),
            None => ("Cannot interrupt playback".to_string(), "use next/previous".to_string()),
        };
        return Verdict::Reject(SafetyRejection::new(
            "🎵 Already Playing",
            message,
            vec!["pause first".into(), "specify track/artist".into(), alternative],
        ));
    }

    if action == MusicAction::Volume {
        if let Some(requested) = request.volume {
            let current = snapshot.current_volume;
            match evaluate_volume(requested, current, policy) {
                VolumeVerdict::Allow => {}
                VolumeVerdict::AboveCeiling { suggested } => {
                    return Verdict::Reject(SafetyRejection::new(
                        "⚠️ Volume Too High",
                        format!(
                            "{}% exceeds safe level ({}%). Current: {}%",
                            requested, policy.safe_ceiling, current
                        ),
                        vec![
                            format!("try {}%", suggested),
                            format!("increase by {}% max", policy.max_step_increase),
                            "use multiple steps".into(),
                        ],
                    ));
                }
                VolumeVerdict::StepTooLarge { suggested } => {
                    return Verdict::Reject(SafetyRejection::new(
                        "⚠️ Volume Jump Too Large",
                        format!("+{}% increase ({}% → {}%)", requested - current, current, requested),
                        vec![
                            format!("try {}% first", suggested),
                            "increase gradually".into(),
                            "protect hearing".into(),
                        ],
                    ));
                }
            }
        }
    }

    Verdict::Proceed {
        launch_first: action == MusicAction::Play && !snapshot.app_running,
    }
}

/// Delays around player state changes. Zero in tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaTimings {
    /// Wait after launching the player before sending it commands.
    pub warmup: Duration,
    /// Wait after a spoken notification before resuming playback.
    pub settle: Duration,
}

impl MediaTimings {
    pub fn immediate() -> Self {
        Self {
            warmup: Duration::ZERO,
            settle: Duration::ZERO,
        }
    }
}

impl Default for MediaTimings {
    fn default() -> Self {
        Self {
            warmup: Duration::from_secs(3),
            settle: Duration::from_millis(1500),
        }
    }
}

/// Reads player and system audio state through AppleScript queries.
///
/// Failed queries degrade to the permissive reading (not muted, not
/// playing, volume 50) except the running check, which reads as not running.
pub struct DeviceProbe<'a> {
    runner: &'a dyn ProcessRunner,
    options: &'a RunOptions,
}

impl<'a> DeviceProbe<'a> {
    pub fn new(runner: &'a dyn ProcessRunner, options: &'a RunOptions) -> Self {
        Self { runner, options }
    }

    async fn query(&self, script: &str) -> Option<String> {
        let outcome = self.runner.run(script, self.options).await;
        if outcome.success() {
            Some(outcome.stdout.trim().to_string())
        } else {
            debug!(command = %script, exit_code = outcome.exit_code, "Device query failed");
            None
        }
    }

    pub async fn is_muted(&self) -> bool {
        self.query(MUTED_QUERY).await.as_deref() == Some("true")
    }

    pub async fn is_app_running(&self) -> bool {
        self.query(RUNNING_QUERY).await.as_deref() == Some("true")
    }

    /// Only meaningful when the app is running; asking a stopped app for its
    /// state launches it.
    pub async fn is_playing(&self) -> bool {
        self.query(PLAYER_STATE_QUERY).await.as_deref() == Some("playing")
    }

    pub async fn app_volume(&self) -> u8 {
        self.query(VOLUME_QUERY)
            .await
            .and_then(|v| v.parse::<u8>().ok())
            .map(|v| v.min(100))
            .unwrap_or(FALLBACK_VOLUME)
    }

    /// Reads the parts of the device state `action` depends on.
    pub async fn snapshot_for(&self, action: MusicAction) -> SafetySnapshot {
        let is_muted = action != MusicAction::Info && self.is_muted().await;
        let app_running = self.is_app_running().await;
        let is_playing = app_running && action == MusicAction::Play && self.is_playing().await;
        let current_volume = if app_running && action == MusicAction::Volume {
            self.app_volume().await
        } else {
            FALLBACK_VOLUME
        };
        let snapshot = SafetySnapshot {
            is_muted,
            app_running,
            is_playing,
            current_volume,
        };
        debug!(?snapshot, %action, "Read device state");
        snapshot
    }
}

/// Pauses playback around a spoken notification and resumes it afterwards.
///
/// Every step is best-effort: failures are logged and never surfaced.
pub struct PlaybackCoordinator<'a> {
    probe: DeviceProbe<'a>,
    timings: MediaTimings,
}

impl<'a> PlaybackCoordinator<'a> {
    pub fn new(runner: &'a dyn ProcessRunner, options: &'a RunOptions, timings: MediaTimings) -> Self {
        Self {
            probe: DeviceProbe::new(runner, options),
            timings,
        }
    }

    /// Returns true when playback was active and is now paused.
    pub async fn pause_if_playing(&self) -> bool {
        if !self.probe.is_app_running().await || !self.probe.is_playing().await {
            return false;
        }
        let outcome = self.probe.runner.run(PAUSE_COMMAND, self.probe.options).await;
        if outcome.success() {
            info!("Paused playback for notification");
            true
        } else {
            warn!(exit_code = outcome.exit_code, stderr = %outcome.stderr.trim(), "Failed to pause playback");
            false
        }
    }

    /// Waits for the settle delay, then resumes playback.
    pub async fn resume(&self) {
        if !self.timings.settle.is_zero() {
            tokio::time::sleep(self.timings.settle).await;
        }
        let outcome = self.probe.runner.run(RESUME_COMMAND, self.probe.options).await;
        if outcome.success() {
            info!("Resumed playback after notification");
        } else {
            warn!(exit_code = outcome.exit_code, stderr = %outcome.stderr.trim(), "Failed to resume playback");
        }
    }
}
