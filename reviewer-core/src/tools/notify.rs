// reviewer-core/src/tools/notify.rs
use super::{spawn, CommandBuilder};
use crate::context::ToolContext;
use crate::errors::ToolError;
use crate::format::format_outcome;
use crate::safety::PlaybackCoordinator;
use crate::utils::shell_quote;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::warn;

pub const CONSOLE_FALLBACK_COMMAND: &str = "echo \"Notification sent to console\"";

#[derive(Deserialize, Debug, Default, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Question,
    Alert,
    Confirmation,
    #[default]
    Info,
}

impl NotificationKind {
    fn spoken_prefix(&self) -> &'static str {
        match self {
            NotificationKind::Question => "Question: ",
            NotificationKind::Alert => "Alert! ",
            NotificationKind::Confirmation => "Please confirm: ",
            NotificationKind::Info => "",
        }
    }

    fn label(&self) -> &'static str {
        match self {
            NotificationKind::Question => "QUESTION",
            NotificationKind::Alert => "ALERT",
            NotificationKind::Confirmation => "CONFIRMATION",
            NotificationKind::Info => "INFO",
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct NotifyArgs {
    pub message: String,
    #[serde(rename = "type", default)]
    pub kind: NotificationKind,
    #[serde(default)]
    pub voice: Option<String>,
    /// Words per minute.
    #[serde(default)]
    pub rate: Option<u32>,
}

/// Speaks a message with `say` on macOS; elsewhere writes it to the log.
pub struct Notify;

impl CommandBuilder for Notify {
    type Args = NotifyArgs;

    fn action_name(&self) -> &'static str {
        "Notify"
    }

    fn build_command(&self, ctx: &ToolContext, args: &NotifyArgs) -> Result<String, ToolError> {
        if args.message.trim().is_empty() {
            return Err(ToolError::invalid("message", "must not be empty"));
        }
        if args.rate == Some(0) {
            return Err(ToolError::invalid("rate", "must be greater than zero"));
        }
        if !ctx.platform.is_macos() {
            return Ok(CONSOLE_FALLBACK_COMMAND.to_string());
        }

        let mut parts = vec!["say".to_string()];
        if let Some(voice) = args.voice.as_deref().filter(|v| !v.trim().is_empty()) {
            parts.push("-v".to_string());
            parts.push(shell_quote(voice));
        }
        if let Some(rate) = args.rate {
            parts.push("-r".to_string());
            parts.push(rate.to_string());
        }
        parts.push(shell_quote(&format!("{}{}", args.kind.spoken_prefix(), args.message)));
        Ok(parts.join(" "))
    }
}

/// Log target for notifications shown on the console instead of spoken.
pub const CONSOLE_TARGET: &str = "notification";

/// Runs a notification. On macOS, active playback is paused for the
/// duration of the speech and resumed after the settle delay.
pub async fn notify(ctx: &ToolContext, args: &NotifyArgs, cancel: CancellationToken) -> Result<String, ToolError> {
    let command = Notify.build_command(ctx, args)?;
    let action = Notify.action_name();

    if !ctx.platform.is_macos() {
        // Logged at warn so the default server filter still shows it.
        warn!(target: CONSOLE_TARGET, "[{}] {}", args.kind.label(), args.message);
        let outcome = spawn(ctx, action, &command, cancel).await;
        return Ok(format_outcome(&outcome, action, false).into());
    }

    // Pause and resume must not be skipped by a cancelled request.
    let media_options = ctx.run_options(CancellationToken::new());
    let coordinator = PlaybackCoordinator::new(ctx.runner.as_ref(), &media_options, ctx.timings);
    let paused = coordinator.pause_if_playing().await;

    let outcome = spawn(ctx, action, &command, cancel).await;

    if paused {
        coordinator.resume().await;
    }
    Ok(format_outcome(&outcome, action, false).into())
}
