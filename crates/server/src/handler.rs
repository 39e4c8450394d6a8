//! MCP ServerHandler implementation for WhatsappService.
//!
//! - `get_info()` - advertises the tool capability
//! - `list_tools()` - lists every gateway tool with its JSON schema
//! - `call_tool()` - dispatches to [`WhatsappService::handle_call`]

use crate::service::WhatsappService;
use crate::tool_schemas::all_tools;
use rmcp::model::{
    CallToolRequestParam, CallToolResult, InitializeResult, ListToolsResult,
    PaginatedRequestParam, ServerCapabilities,
};
use rmcp::ServerHandler;

const INSTRUCTIONS: &str = "WhatsApp gateway. Responses are trimmed and cached for 30s; \
use get_whatsapp_chats or get_whatsapp_contacts to find JIDs before reading history.";

impl ServerHandler for WhatsappService {
    fn get_info(&self) -> InitializeResult {
        InitializeResult {
            capabilities: ServerCapabilities {
                tools: Some(Default::default()),
                ..Default::default()
            },
            instructions: Some(INSTRUCTIONS.into()),
            ..Default::default()
        }
    }

    fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: rmcp::service::RequestContext<rmcp::RoleServer>,
    ) -> impl std::future::Future<Output = Result<ListToolsResult, rmcp::ErrorData>> + Send + '_
    {
        std::future::ready(Ok(ListToolsResult {
            tools: all_tools(),
            next_cursor: None,
        }))
    }

    /// Bridge failures come back as ordinary results with `is_error` set;
    /// only unknown tools and mistyped arguments become protocol errors.
    fn call_tool(
        &self,
        request: CallToolRequestParam,
        _context: rmcp::service::RequestContext<rmcp::RoleServer>,
    ) -> impl std::future::Future<Output = Result<CallToolResult, rmcp::ErrorData>> + Send + '_
    {
        Box::pin(async move {
            self.handle_call(request.name.as_ref(), request.arguments.as_ref())
                .await
                .map_err(|e| rmcp::ErrorData::invalid_params(format!("{e:#}"), None))
        })
    }
}
