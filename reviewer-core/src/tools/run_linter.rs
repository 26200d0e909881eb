// reviewer-core/src/tools/run_linter.rs
use super::CommandBuilder;
use crate::context::ToolContext;
use crate::errors::ToolError;
use crate::utils::shell_quote;
use serde::Deserialize;

#[derive(Deserialize, Debug, Default, Clone)]
pub struct RunLinterArgs {
    #[serde(default)]
    pub fix: bool,
    #[serde(default)]
    pub files: Vec<String>,
}

pub struct RunLinter;

impl CommandBuilder for RunLinter {
    type Args = RunLinterArgs;

    fn action_name(&self) -> &'static str {
        "Lint"
    }

    fn build_command(&self, ctx: &ToolContext, args: &RunLinterArgs) -> Result<String, ToolError> {
        let command = &ctx.config.lint_command;
        let mut parts = vec![command.clone()];
        if args.fix && !command.contains("--fix") {
            parts.push("--fix".to_string());
        }
        for file in &args.files {
            if file.trim().is_empty() {
                return Err(ToolError::invalid("files", "file paths must not be empty"));
            }
            parts.push(shell_quote(file));
        }
        Ok(parts.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Platform;
    use crate::exec::testing::ScriptedRunner;
    use crate::tools::run_command;
    use crate::tools::test_support::{config, context, context_with};
    use std::sync::Arc;
    use tokio_util::sync::CancellationToken;

    fn args(fix: bool, files: &[&str]) -> RunLinterArgs {
        RunLinterArgs {
            fix,
            files: files.iter().map(|f| f.to_string()).collect(),
        }
    }

    #[test]
    fn test_plain_command() {
        let ctx = context(Arc::new(ScriptedRunner::new()), Platform::Linux);
        assert_eq!(RunLinter.build_command(&ctx, &args(false, &[])).unwrap(), "npm run lint");
    }

    #[test]
    fn test_fix_and_files() {
        let ctx = context(Arc::new(ScriptedRunner::new()), Platform::Linux);
        let cmd = RunLinter
            .build_command(&ctx, &args(true, &["src/a.ts", "src/my file.ts"]))
            .unwrap();
        assert_eq!(cmd, "npm run lint --fix 'src/a.ts' 'src/my file.ts'");
    }

    #[test]
    fn test_fix_not_duplicated() {
        let mut cfg = config();
        cfg.lint_command = "eslint . --fix".to_string();
        let ctx = context_with(cfg, Arc::new(ScriptedRunner::new()), Platform::Linux);
        assert_eq!(RunLinter.build_command(&ctx, &args(true, &[])).unwrap(), "eslint . --fix");
    }

    #[test]
    fn test_empty_file_rejected() {
        let ctx = context(Arc::new(ScriptedRunner::new()), Platform::Linux);
        let err = RunLinter.build_command(&ctx, &args(false, &[" "])).unwrap_err();
        assert!(err.to_string().contains("'files'"));
    }

    #[tokio::test]
    async fn test_success_is_summarised() {
        let runner = Arc::new(ScriptedRunner::new().respond("npm run lint", "\n✔ No problems\nmore detail"));
        let ctx = context(runner, Platform::Linux);
        let text = run_command(&RunLinter, &ctx, &args(false, &[]), CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(text, "Success [Lint] | ✔ No problems");
    }
}
