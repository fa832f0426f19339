//! MCP (Model Context Protocol) server exposing the document bridge.
//! Provides 3 tools: `analyze_pdf_ner`, `analyze_text_ner`, `check_api_status`.
//! Launch: `pdf-ner mcp-server --api-url http://localhost:8000`
//!
//! Tool parameters are wrapped in `Parameters<T>` from
//! `rmcp::handler::server::wrapper::Parameters`; plain structs don't satisfy
//! the `#[tool_router]` extractor bound. Every tool returns its envelope as
//! pretty JSON text and never reports a protocol-level error.

use rmcp::{
    handler::server::tool::ToolRouter,
    handler::server::wrapper::Parameters,
    model::*,
    tool, tool_handler, tool_router,
    transport::stdio,
    ErrorData as McpError, ServerHandler, ServiceExt,
};
use serde::Serialize;

use crate::bridge::NerBridge;

// ─── Parameter Structs ───────────────────────────────────────────────────────

#[derive(serde::Deserialize, schemars::JsonSchema)]
pub struct AnalyzePdfParams {
    /// Base64 encoded PDF file content
    pub pdf_base64: String,
}

#[derive(serde::Deserialize, schemars::JsonSchema)]
pub struct AnalyzeTextParams {
    /// Text content to analyze
    pub text: String,
}

#[derive(serde::Deserialize, schemars::JsonSchema)]
pub struct StatusParams {}

// ─── Tools ───────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct Tools {
    tool_router: ToolRouter<Self>,
    bridge: NerBridge,
}

impl Tools {
    fn tool_ok(value: &impl Serialize) -> CallToolResult {
        let json = serde_json::to_string_pretty(value).unwrap_or_default();
        CallToolResult::success(vec![Content::text(json)])
    }
}

#[tool_router]
impl Tools {
    pub fn new(bridge: NerBridge) -> Self {
        Self {
            tool_router: Self::tool_router(),
            bridge,
        }
    }

    #[tool(
        description = "Extract text from a PDF file and perform Named Entity Recognition (NER) analysis. \
                       Decodes the base64-encoded PDF, extracts text from all pages, calls the NER API and \
                       returns the entities found with their scores and positions."
    )]
    pub async fn analyze_pdf_ner(
        &self,
        Parameters(p): Parameters<AnalyzePdfParams>,
    ) -> Result<CallToolResult, McpError> {
        let envelope = self.bridge.analyze_pdf(&p.pdf_base64).await;
        Ok(Self::tool_ok(&envelope))
    }

    #[tool(description = "Perform Named Entity Recognition (NER) analysis on provided text.")]
    pub async fn analyze_text_ner(
        &self,
        Parameters(p): Parameters<AnalyzeTextParams>,
    ) -> Result<CallToolResult, McpError> {
        let envelope = self.bridge.analyze_text(&p.text).await;
        Ok(Self::tool_ok(&envelope))
    }

    #[tool(description = "Check if the NER API server is running and accessible.")]
    pub async fn check_api_status(
        &self,
        Parameters(_p): Parameters<StatusParams>,
    ) -> Result<CallToolResult, McpError> {
        let status = self.bridge.check_status().await;
        Ok(Self::tool_ok(&status))
    }
}

// ─── ServerHandler ───────────────────────────────────────────────────────────

#[tool_handler]
impl ServerHandler for Tools {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(format!(
                "PDF NER Extractor. Extracts text from PDFs and runs named entity recognition \
                 through the NER API at {}.",
                self.bridge.config().base_url
            )),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

// ─── Entry Point ─────────────────────────────────────────────────────────────

pub async fn run_mcp_server(bridge: NerBridge) -> Result<(), String> {
    tracing::info!(api = %bridge.config().base_url, "Starting MCP server on stdio");

    let service = Tools::new(bridge)
        .serve(stdio())
        .await
        .map_err(|e| format!("MCP server error: {}", e))?;
    service
        .waiting()
        .await
        .map_err(|e| format!("MCP server terminated: {}", e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::tests::closed_port_url;
    use crate::config::BridgeConfig;

    async fn tools() -> Tools {
        let bridge = NerBridge::from_config(BridgeConfig::new(closed_port_url().await)).unwrap();
        Tools::new(bridge)
    }

    fn result_json(result: CallToolResult) -> serde_json::Value {
        let value = serde_json::to_value(&result).unwrap();
        let text = value["content"][0]["text"].as_str().unwrap().to_string();
        serde_json::from_str(&text).unwrap()
    }

    #[tokio::test]
    async fn test_exposes_three_tools() {
        let tools = tools().await;
        let mut names: Vec<String> = tools
            .tool_router
            .list_all()
            .into_iter()
            .map(|t| t.name.to_string())
            .collect();
        names.sort();
        assert_eq!(names, vec!["analyze_pdf_ner", "analyze_text_ner", "check_api_status"]);
    }

    #[tokio::test]
    async fn test_failures_are_envelopes_not_errors() {
        let tools = tools().await;

        let result = tools
            .analyze_pdf_ner(Parameters(AnalyzePdfParams {
                pdf_base64: "!!".to_string(),
            }))
            .await
            .unwrap();
        let json = result_json(result);
        assert_eq!(json["success"], false);
        assert!(json["error"].is_string());

        let result = tools
            .check_api_status(Parameters(StatusParams {}))
            .await
            .unwrap();
        let json = result_json(result);
        assert_eq!(json["success"], false);
        assert!(json["message"].as_str().unwrap().contains("Cannot connect"));
    }
}
