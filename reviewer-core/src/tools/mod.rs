// reviewer-core/src/tools/mod.rs

//! Tool implementations.
//!
//! Process-backed tools (`run_tests`, `run_linter`, `notify`, `music`)
//! implement [`CommandBuilder`]: they turn typed arguments into a command
//! line and leave spawning and report formatting to [`run_command`].
//! Prompt tools call the language model; `memory` talks to the store.
//!
//! **Important:** builders quote user-supplied text but trust configured
//! commands verbatim. Configuration is operator-controlled.

pub mod memory;
pub mod music;
pub mod notify;
pub mod prompts;
pub mod run_linter;

use crate::context::ToolContext;
use crate::errors::ToolError;
use crate::exec::ExecutionOutcome;
use crate::format::format_outcome;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Turns a tool's arguments into the command line it runs.
pub trait CommandBuilder {
    type Args;

    /// Name used in reports and error messages (`Test`, `Lint`, ...).
    fn action_name(&self) -> &'static str;

    fn build_command(&self, ctx: &ToolContext, args: &Self::Args) -> Result<String, ToolError>;

    /// Whether a successful run still gets the full report.
    fn force_full_report(&self, _args: &Self::Args) -> bool {
        false
    }
}

/// Runs an already built command and returns the raw outcome.
pub async fn spawn(ctx: &ToolContext, action: &str, command: &str, cancel: CancellationToken) -> ExecutionOutcome {
    info!(tool = action, command = %command, "Running command");
    let options = ctx.run_options(cancel);
    let outcome = ctx.run(command, &options).await;
    info!(tool = action, exit_code = outcome.exit_code, "Command finished");
    outcome
}

/// Builds, runs and formats in one step.
pub async fn run_command<B: CommandBuilder>(
    builder: &B,
    ctx: &ToolContext,
    args: &B::Args,
    cancel: CancellationToken,
) -> Result<String, ToolError> {
    let command = builder.build_command(ctx, args)?;
    let outcome = spawn(ctx, builder.action_name(), &command, cancel).await;
    Ok(format_outcome(&outcome, builder.action_name(), builder.force_full_report(args)).into())
}
