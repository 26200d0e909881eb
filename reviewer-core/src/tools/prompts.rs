// reviewer-core/src/tools/prompts.rs

//! Tools that hand a prompt to the language model and return its reply.

use crate::context::ToolContext;
use crate::errors::ToolError;
use serde::Deserialize;
use tracing::info;

/// Builds the two prompts for one model call.
pub trait PromptBuilder {
    type Args;

    fn action_name(&self) -> &'static str;
    fn system_prompt(&self, args: &Self::Args) -> String;
    fn user_prompt(&self, args: &Self::Args) -> String;
}

pub async fn ask<P: PromptBuilder>(builder: &P, ctx: &ToolContext, args: &P::Args) -> Result<String, ToolError> {
    let provider = ctx.provider().await?;
    let system = builder.system_prompt(args);
    let user = builder.user_prompt(args);
    info!(tool = builder.action_name(), provider = provider.name(), prompt_chars = user.len(), "Calling language model");
    Ok(provider.chat(&system, &user).await?)
}

fn with_section(mut text: String, label: &str, value: Option<&str>) -> String {
    if let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) {
        text.push_str(&format!("\n\n{}: {}", label, value));
    }
    text
}

#[derive(Deserialize, Debug, Default, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SpecFormat {
    #[default]
    Markdown,
    Structured,
}

#[derive(Deserialize, Debug, Clone)]
pub struct GenerateSpecArgs {
    pub prompt: String,
    #[serde(default)]
    pub context: Option<String>,
    #[serde(default)]
    pub format: SpecFormat,
}

pub struct GenerateSpec;

impl PromptBuilder for GenerateSpec {
    type Args = GenerateSpecArgs;

    fn action_name(&self) -> &'static str {
        "generating specification"
    }

    fn system_prompt(&self, args: &GenerateSpecArgs) -> String {
        let format = match args.format {
            SpecFormat::Structured => {
                "Output in a structured format with clear sections, requirements, and acceptance criteria."
            }
            SpecFormat::Markdown => "Output in clean markdown format.",
        };
        format!(
            "You are a technical specification writer. Generate detailed, clear, and actionable \
             specifications based on the requirements provided.\n{}\n\
             Focus on:\n\
             - Clear objectives and goals\n\
             - Detailed requirements (functional and non-functional)\n\
             - Technical architecture and design decisions\n\
             - Implementation approach\n\
             - Success criteria and testing requirements\n\
             - Edge cases and error handling",
            format
        )
    }

    fn user_prompt(&self, args: &GenerateSpecArgs) -> String {
        with_section(
            format!("Generate a specification for: {}", args.prompt),
            "Additional context",
            args.context.as_deref(),
        )
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct ReviewSpecArgs {
    pub spec: String,
    #[serde(default, alias = "focusAreas")]
    pub focus_areas: Vec<String>,
    /// Maturity of the project, e.g. "MVP" or "production API".
    #[serde(default, alias = "projectContext")]
    pub project_context: Option<String>,
}

pub struct ReviewSpec;

impl PromptBuilder for ReviewSpec {
    type Args = ReviewSpecArgs;

    fn action_name(&self) -> &'static str {
        "reviewing specification"
    }

    fn system_prompt(&self, args: &ReviewSpecArgs) -> String {
        let mut prompt = String::from(
            "You are a critical technical reviewer specializing in specification analysis. \
             Review the provided specification and provide constructive, critical feedback.\n\
             Focus on:\n\
             - Completeness and clarity of requirements\n\
             - Technical feasibility and architectural soundness\n\
             - Missing edge cases or error scenarios\n\
             - Ambiguities that could lead to implementation issues\n\
             - Security and performance considerations\n\
             - Testability and success criteria clarity\n",
        );
        if !args.focus_areas.is_empty() {
            prompt.push_str(&format!(
                "\nPay special attention to these areas: {}\n",
                args.focus_areas.join(", ")
            ));
        }
        if let Some(project) = args.project_context.as_deref().filter(|p| !p.trim().is_empty()) {
            prompt.push_str(&format!(
                "\nThis is a {} project; scale the depth of your critique to match.\n",
                project.trim()
            ));
        }
        prompt.push_str("\nBe direct and specific in your feedback. Point out both strengths and weaknesses.");
        prompt
    }

    fn user_prompt(&self, args: &ReviewSpecArgs) -> String {
        format!("Review this specification:\n\n{}", args.spec)
    }
}

#[derive(Deserialize, Debug, Default, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ReviewType {
    Security,
    Performance,
    Style,
    Logic,
    #[default]
    All,
}

impl ReviewType {
    fn focus(&self) -> &'static str {
        match self {
            ReviewType::Security => {
                "Security vulnerabilities, input validation, authentication/authorization issues, data exposure risks"
            }
            ReviewType::Performance => {
                "Performance bottlenecks, inefficient algorithms, memory leaks, unnecessary computations"
            }
            ReviewType::Style => "Code style consistency, naming conventions, code organization, readability",
            ReviewType::Logic => {
                "Business logic errors, edge cases, error handling, correctness of implementation"
            }
            ReviewType::All => "All aspects including security, performance, code style, and logic",
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct ReviewCodeArgs {
    pub diff: String,
    #[serde(default)]
    pub context: Option<String>,
    #[serde(default, alias = "reviewType")]
    pub review_type: ReviewType,
}

pub struct ReviewCode;

impl PromptBuilder for ReviewCode {
    type Args = ReviewCodeArgs;

    fn action_name(&self) -> &'static str {
        "reviewing code"
    }

    fn system_prompt(&self, args: &ReviewCodeArgs) -> String {
        format!(
            "You are an expert code reviewer. Review the provided code changes critically and \
             provide actionable feedback.\n\
             Focus on: {}\n\n\
             Provide:\n\
             - Specific line-by-line feedback where issues are found\n\
             - Severity level for each issue (critical, major, minor)\n\
             - Concrete suggestions for improvement\n\
             - Recognition of good practices when present\n\n\
             Be constructive but thorough in identifying potential issues.",
            args.review_type.focus()
        )
    }

    fn user_prompt(&self, args: &ReviewCodeArgs) -> String {
        with_section(
            format!("Review these code changes:\n\n{}", args.diff),
            "Context",
            args.context.as_deref(),
        )
    }
}
