// reviewer-server/src/server.rs
use reviewer_core::{ToolContext, ToolDispatcher};
use rmcp::{
    model::{
        CallToolRequestParam, CallToolResult, Content, ErrorData as McpError, Implementation,
        ListToolsResult, PaginatedRequestParam, ProtocolVersion, ServerCapabilities, ServerInfo, Tool,
    },
    service::{RequestContext, RoleServer},
    ServerHandler,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

const INSTRUCTIONS: &str = "Development helper tools: generate and review specifications, review code, \
run the project's tests and linter, speak notifications, control Spotify with hearing protection, \
and keep notes in a key-value memory.";

#[derive(Clone)]
pub struct ReviewerServer {
    dispatcher: Arc<ToolDispatcher>,
}

impl ReviewerServer {
    pub fn new(ctx: ToolContext) -> Self {
        Self {
            dispatcher: Arc::new(ToolDispatcher::new(Arc::new(ctx))),
        }
    }

    pub fn tools(&self) -> Vec<Tool> {
        self.dispatcher
            .definitions()
            .iter()
            .map(|def| Tool::new(def.name, def.description, def.input_schema.clone()))
            .collect()
    }

    /// Tool failures are reported in-band (`is_error`), never as protocol errors.
    pub async fn invoke(&self, params: CallToolRequestParam, cancel: CancellationToken) -> CallToolResult {
        let response = self
            .dispatcher
            .dispatch(&params.name, params.arguments, cancel)
            .await;
        let content = vec![Content::text(response.text)];
        if response.is_error {
            CallToolResult::error(content)
        } else {
            CallToolResult::success(content)
        }
    }
}

impl ServerHandler for ReviewerServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "reviewer-mcp".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            instructions: Some(INSTRUCTIONS.into()),
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, McpError> {
        Ok(ListToolsResult {
            tools: self.tools(),
            next_cursor: None,
        })
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        debug!(tool = %request.name, "Received tool call");
        Ok(self.invoke(request, context.ct.clone()).await)
    }
}
