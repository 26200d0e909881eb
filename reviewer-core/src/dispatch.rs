// reviewer-core/src/dispatch.rs

//! Tool registry: names, descriptions and input schemas, plus routing of a
//! validated call to the tool that handles it.

use crate::context::ToolContext;
use crate::errors::ToolError;
use crate::safety::MusicAction;
use crate::tools::memory::memory;
use crate::tools::music::music;
use crate::tools::notify::notify;
use crate::tools::prompts::{ask, GenerateSpec, ReviewCode, ReviewSpec};
use crate::tools::run_linter::RunLinter;
use crate::tools::run_tests::RunTests;
use crate::tools::run_command;
use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

pub type JsonObject = Map<String, Value>;

/// What a tool call hands back: one text payload and an error flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolResponse {
    pub text: String,
    pub is_error: bool,
}

impl ToolResponse {
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_error: false,
        }
    }

    pub fn error(action: &str, err: &ToolError) -> Self {
        Self {
            text: format!("Error {}: {}", action, err),
            is_error: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ToolDefinition {
    pub name: &'static str,
    /// Used in error text (`Error <action>: ...`).
    pub action: &'static str,
    pub description: &'static str,
    pub input_schema: Arc<JsonObject>,
}

fn create_schema_object(properties: Vec<(&str, Value)>, required: Vec<&str>) -> Arc<JsonObject> {
    let props_map: JsonObject = properties
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();
    let req_vec: Vec<Value> = required.into_iter().map(|s| Value::String(s.to_string())).collect();
    let schema = json!({
        "type": "object",
        "properties": props_map,
        "required": req_vec
    });
    let map = match schema {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    Arc::new(map)
}

pub fn tool_definitions() -> Vec<ToolDefinition> {
    let music_actions: Vec<&str> = MusicAction::ALL.iter().map(|a| a.as_str()).collect();
    vec![
        ToolDefinition {
            name: "generate_spec",
            action: "generating specification",
            description: "Generate a specification document with the configured language model",
            input_schema: create_schema_object(
                vec![
                    ("prompt", json!({ "type": "string", "description": "Description of what specification to generate" })),
                    ("context", json!({ "type": "string", "description": "Additional context or requirements" })),
                    ("format", json!({ "type": "string", "enum": ["markdown", "structured"], "default": "markdown", "description": "Output format for the specification" })),
                ],
                vec!["prompt"],
            ),
        },
        ToolDefinition {
            name: "review_spec",
            action: "reviewing specification",
            description: "Review a specification for completeness and provide critical feedback",
            input_schema: create_schema_object(
                vec![
                    ("spec", json!({ "type": "string", "description": "The specification document to review" })),
                    ("focus_areas", json!({ "type": "array", "items": { "type": "string" }, "description": "Specific areas to focus the review on" })),
                    ("project_context", json!({ "type": "string", "description": "Project maturity, e.g. \"MVP\", \"learning project\", \"production API\"" })),
                ],
                vec!["spec"],
            ),
        },
        ToolDefinition {
            name: "review_code",
            action: "reviewing code",
            description: "Review code changes and provide feedback",
            input_schema: create_schema_object(
                vec![
                    ("diff", json!({ "type": "string", "description": "Git diff or code changes to review" })),
                    ("context", json!({ "type": "string", "description": "Context about the changes" })),
                    ("review_type", json!({ "type": "string", "enum": ["security", "performance", "style", "logic", "all"], "default": "all", "description": "Type of review to perform" })),
                ],
                vec!["diff"],
            ),
        },
        ToolDefinition {
            name: "run_tests",
            action: "Test",
            description: "Run the project's tests. Without a pattern the whole suite runs with coverage",
            input_schema: create_schema_object(
                vec![("pattern", json!({ "type": "string", "description": "Test file pattern to match" }))],
                vec![],
            ),
        },
        ToolDefinition {
            name: "run_linter",
            action: "Lint",
            description: "Run the project's linter",
            input_schema: create_schema_object(
                vec![
                    ("fix", json!({ "type": "boolean", "default": false, "description": "Attempt to fix issues automatically" })),
                    ("files", json!({ "type": "array", "items": { "type": "string" }, "description": "Specific files to lint" })),
                ],
                vec![],
            ),
        },
        ToolDefinition {
            name: "notify",
            action: "Notify",
            description: "Speak a notification aloud (macOS). Music is paused while speaking",
            input_schema: create_schema_object(
                vec![
                    ("message", json!({ "type": "string", "description": "Text to speak" })),
                    ("type", json!({ "type": "string", "enum": ["question", "alert", "confirmation", "info"], "default": "info", "description": "Kind of notification; sets the spoken prefix" })),
                    ("voice", json!({ "type": "string", "description": "System voice name" })),
                    ("rate", json!({ "type": "integer", "minimum": 1, "description": "Speech rate in words per minute" })),
                ],
                vec!["message"],
            ),
        },
        ToolDefinition {
            name: "music",
            action: "Music Control",
            description: "Control Spotify playback (macOS) with hearing protection: volume increases are capped and gradual",
            input_schema: create_schema_object(
                vec![
                    ("action", json!({ "type": "string", "enum": music_actions, "description": "Playback action" })),
                    ("uri", json!({ "type": "string", "description": "Spotify URI to play" })),
                    ("volume", json!({ "type": "number", "description": "Volume level 0-100 for the volume action" })),
                    ("mood", json!({ "type": "string", "description": "Mood playlist to play (focus, relax, energize, chill, work, or configured)" })),
                ],
                vec!["action"],
            ),
        },
        ToolDefinition {
            name: "memory",
            action: "Memory",
            description: "Store and recall notes across tool calls",
            input_schema: create_schema_object(
                vec![
                    ("action", json!({ "type": "string", "enum": ["set", "get", "list", "delete", "search", "clear"], "description": "Memory operation" })),
                    ("key", json!({ "type": "string", "description": "Entry key" })),
                    ("value", json!({ "type": "string", "description": "Entry value for set" })),
                    ("tags", json!({ "type": "array", "items": { "type": "string" }, "description": "Tags for set, or filter for list" })),
                    ("pattern", json!({ "type": "string", "description": "Search text" })),
                    ("persist", json!({ "type": "boolean", "default": false, "description": "Save the entry to disk (set only)" })),
                ],
                vec!["action"],
            ),
        },
    ]
}

fn type_matches(expected: &str, value: &Value) -> bool {
    match expected {
        "string" => value.is_string(),
        "boolean" => value.is_boolean(),
        "number" => value.is_number(),
        // `200.0` would not deserialize into an integer field.
        "integer" => value.is_i64() || value.is_u64(),
        "array" => value.is_array(),
        "object" => value.is_object(),
        _ => true,
    }
}

fn check_property(field: &str, schema: &Value, value: &Value) -> Result<(), ToolError> {
    // Explicit nulls read as absent.
    if value.is_null() {
        return Ok(());
    }
    if let Some(expected) = schema.get("type").and_then(Value::as_str) {
        if !type_matches(expected, value) {
            return Err(ToolError::invalid(field, format!("expected {}", expected)));
        }
    }
    if let Some(allowed) = schema.get("enum").and_then(Value::as_array) {
        if !allowed.contains(value) {
            let names: Vec<&str> = allowed.iter().filter_map(Value::as_str).collect();
            return Err(ToolError::invalid(
                field,
                format!("{} is not one of: {}", value, names.join(", ")),
            ));
        }
    }
    if let Some(minimum) = schema.get("minimum").and_then(Value::as_f64) {
        if value.as_f64().map(|v| v < minimum).unwrap_or(false) {
            return Err(ToolError::invalid(field, format!("must be at least {}", minimum)));
        }
    }
    if let (Some(items), Some(values)) = (schema.get("items"), value.as_array()) {
        for item in values {
            check_property(field, items, item)?;
        }
    }
    Ok(())
}

/// Checks required fields, types, enum membership and bounds. Unknown
/// fields are ignored.
pub fn validate_arguments(schema: &JsonObject, args: &JsonObject) -> Result<(), ToolError> {
    if let Some(required) = schema.get("required").and_then(Value::as_array) {
        for field in required.iter().filter_map(Value::as_str) {
            if args.get(field).map(Value::is_null).unwrap_or(true) {
                return Err(ToolError::missing(field));
            }
        }
    }
    if let Some(properties) = schema.get("properties").and_then(Value::as_object) {
        for (field, property) in properties {
            if let Some(value) = args.get(field) {
                check_property(field, property, value)?;
            }
        }
    }
    Ok(())
}

fn parse<T: DeserializeOwned>(args: JsonObject) -> Result<T, ToolError> {
    let args: JsonObject = args.into_iter().filter(|(_, v)| !v.is_null()).collect();
    serde_json::from_value(Value::Object(args)).map_err(|e| ToolError::invalid("arguments", e.to_string()))
}

pub struct ToolDispatcher {
    ctx: Arc<ToolContext>,
    definitions: Vec<ToolDefinition>,
}

impl ToolDispatcher {
    pub fn new(ctx: Arc<ToolContext>) -> Self {
        Self {
            ctx,
            definitions: tool_definitions(),
        }
    }

    pub fn definitions(&self) -> &[ToolDefinition] {
        &self.definitions
    }

    pub fn context(&self) -> &ToolContext {
        &self.ctx
    }

    /// Runs the named tool. Validation and collaborator failures come back
    /// as an error response; everything else, safety rejections and failed
    /// commands included, is a successful response.
    pub async fn dispatch(&self, name: &str, arguments: Option<JsonObject>, cancel: CancellationToken) -> ToolResponse {
        let Some(definition) = self.definitions.iter().find(|d| d.name == name) else {
            error!(tool = name, "Unknown tool requested");
            return ToolResponse::error(name, &ToolError::UnknownTool(name.to_string()));
        };
        info!(tool = name, "Tool call");

        let args = arguments.unwrap_or_default();
        let result = match validate_arguments(&definition.input_schema, &args) {
            Ok(()) => self.route(name, args, cancel).await,
            Err(e) => Err(e),
        };
        match result {
            Ok(text) => ToolResponse::success(text),
            Err(e) => {
                info!(tool = name, error = %e, "Tool call failed");
                ToolResponse::error(definition.action, &e)
            }
        }
    }

    async fn route(&self, name: &str, args: JsonObject, cancel: CancellationToken) -> Result<String, ToolError> {
        let ctx = self.ctx.as_ref();
        match name {
            "generate_spec" => ask(&GenerateSpec, ctx, &parse(args)?).await,
            "review_spec" => ask(&ReviewSpec, ctx, &parse(args)?).await,
            "review_code" => ask(&ReviewCode, ctx, &parse(args)?).await,
            "run_tests" => run_command(&RunTests, ctx, &parse(args)?, cancel).await,
            "run_linter" => run_command(&RunLinter, ctx, &parse(args)?, cancel).await,
            "notify" => notify(ctx, &parse(args)?, cancel).await,
            "music" => music(ctx, &parse(args)?, cancel).await,
            "memory" => memory(ctx, &parse(args)?),
            other => Err(ToolError::UnknownTool(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Platform;
    use crate::exec::testing::ScriptedRunner;
    use crate::tools::prompts::testing::EchoProvider;
    use crate::tools::test_support::context;

    fn dispatcher(runner: ScriptedRunner, platform: Platform) -> ToolDispatcher {
        let ctx = context(Arc::new(runner), platform).with_provider(Arc::new(EchoProvider::replying("LGTM")));
        ToolDispatcher::new(Arc::new(ctx))
    }

    fn args(value: Value) -> Option<JsonObject> {
        match value {
            Value::Object(map) => Some(map),
            _ => None,
        }
    }

    #[test]
    fn test_every_tool_is_listed_once() {
        let names: Vec<&str> = tool_definitions().iter().map(|d| d.name).collect();
        assert_eq!(
            names,
            vec!["generate_spec", "review_spec", "review_code", "run_tests", "run_linter", "notify", "music", "memory"]
        );
        for def in tool_definitions() {
            assert_eq!(def.input_schema["type"], "object");
        }
    }

    #[test]
    fn test_validation_names_the_field() {
        let defs = tool_definitions();
        let music_schema = &defs.iter().find(|d| d.name == "music").unwrap().input_schema;

        let err = validate_arguments(music_schema, &JsonObject::new()).unwrap_err();
        assert_eq!(err.to_string(), "Missing required argument 'action'");

        let err = validate_arguments(music_schema, &args(json!({"action": "shuffle"})).unwrap()).unwrap_err();
        assert!(err.to_string().starts_with("Invalid argument 'action': \"shuffle\" is not one of: play"));

        let err = validate_arguments(music_schema, &args(json!({"action": "volume", "volume": "loud"})).unwrap())
            .unwrap_err();
        assert_eq!(err.to_string(), "Invalid argument 'volume': expected number");

        assert!(validate_arguments(music_schema, &args(json!({"action": "volume", "volume": 40})).unwrap()).is_ok());
    }

    #[test]
    fn test_validation_of_arrays_and_bounds() {
        let defs = tool_definitions();
        let find = |name: &str| defs.iter().find(|d| d.name == name).unwrap().input_schema.clone();

        let err = validate_arguments(&find("run_linter"), &args(json!({"files": ["a.ts", 3]})).unwrap()).unwrap_err();
        assert_eq!(err.to_string(), "Invalid argument 'files': expected string");

        let err = validate_arguments(&find("notify"), &args(json!({"message": "hi", "rate": 0})).unwrap()).unwrap_err();
        assert!(err.to_string().contains("'rate'"));

        let err = validate_arguments(&find("notify"), &args(json!({"message": "hi", "rate": 1.5})).unwrap()).unwrap_err();
        assert_eq!(err.to_string(), "Invalid argument 'rate': expected integer");

        let err = validate_arguments(&find("notify"), &args(json!({"message": "hi", "rate": 200.0})).unwrap()).unwrap_err();
        assert_eq!(err.to_string(), "Invalid argument 'rate': expected integer");

        assert!(validate_arguments(&find("run_tests"), &args(json!({"pattern": null})).unwrap()).is_ok());
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let d = dispatcher(ScriptedRunner::new(), Platform::Linux);
        let response = d.dispatch("deploy", None, CancellationToken::new()).await;
        assert!(response.is_error);
        assert_eq!(response.text, "Error deploy: Unknown tool: deploy");
    }

    #[tokio::test]
    async fn test_error_text_uses_action_name() {
        let d = dispatcher(ScriptedRunner::new(), Platform::MacOs);
        let response = d
            .dispatch("music", args(json!({"action": "play", "mood": "sleepy"})), CancellationToken::new())
            .await;
        assert!(response.is_error);
        assert!(response.text.starts_with("Error Music Control: Unknown mood 'sleepy'"), "{}", response.text);

        let response = d.dispatch("notify", args(json!({})), CancellationToken::new()).await;
        assert_eq!(response.text, "Error Notify: Missing required argument 'message'");
    }

    #[tokio::test]
    async fn test_routes_to_tools() {
        let d = dispatcher(
            ScriptedRunner::new().fail("npm test", 2, "1 failing"),
            Platform::Linux,
        );
        let response = d
            .dispatch("run_tests", args(json!({"pattern": "auth"})), CancellationToken::new())
            .await;
        assert!(!response.is_error);
        assert_eq!(response.text, "Failed (exit 2) [Test]\n\n1 failing");

        let response = d
            .dispatch("review_code", args(json!({"diff": "+fn main() {}"})), CancellationToken::new())
            .await;
        assert_eq!(response, ToolResponse::success("LGTM"));

        let response = d
            .dispatch("memory", args(json!({"action": "set", "key": "k", "value": "v"})), CancellationToken::new())
            .await;
        assert_eq!(response.text, "✅ Memory: Set 'k' = 'v'");

        let response = d
            .dispatch("music", args(json!({"action": "pause"})), CancellationToken::new())
            .await;
        assert_eq!(response.text, "Error Music Control: Music control is only available on macOS");
    }

    #[tokio::test]
    async fn test_float_rate_names_the_field() {
        let d = dispatcher(ScriptedRunner::new(), Platform::Linux);
        let response = d
            .dispatch("notify", args(json!({"message": "hi", "rate": 200.0})), CancellationToken::new())
            .await;
        assert!(response.is_error);
        assert_eq!(response.text, "Error Notify: Invalid argument 'rate': expected integer");

        let response = d
            .dispatch("notify", args(json!({"message": "hi", "rate": 200})), CancellationToken::new())
            .await;
        assert!(!response.is_error, "{}", response.text);
    }

    #[tokio::test]
    async fn test_safety_rejection_is_not_an_error() {
        let runner = ScriptedRunner::new().respond("output muted", "true");
        let d = dispatcher(runner, Platform::MacOs);
        let response = d
            .dispatch("music", args(json!({"action": "next"})), CancellationToken::new())
            .await;
        assert!(!response.is_error);
        assert!(response.text.starts_with("❌ SAFETY: 🔇 System Audio Muted"));
    }
}
