//! JSON-RPC 2.0 envelope types and the closed set of methods this server understands.

use crate::tools::ToolCall;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

pub const JSONRPC_VERSION: &str = "2.0";
pub const PROTOCOL_VERSION: &str = "2024-11-05";
pub const SERVER_NAME: &str = "api_scan";
pub const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// JSON-RPC error object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[error("JSON-RPC error {code}: {message}")]
pub struct RpcError {
    pub code: i64,
    pub message: String,
}

impl RpcError {
    pub const PARSE_ERROR: i64 = -32700;
    pub const INVALID_REQUEST: i64 = -32600;
    pub const METHOD_NOT_FOUND: i64 = -32601;
    pub const INTERNAL_ERROR: i64 = -32603;

    #[must_use]
    pub fn parse_error() -> Self {
        Self {
            code: Self::PARSE_ERROR,
            message: "Parse error".to_string(),
        }
    }

    #[must_use]
    pub fn invalid_request(detail: &str) -> Self {
        Self {
            code: Self::INVALID_REQUEST,
            message: format!("Invalid Request: {detail}"),
        }
    }

    #[must_use]
    pub fn method_not_found(method: Option<&str>) -> Self {
        Self {
            code: Self::METHOD_NOT_FOUND,
            message: format!("Method not found: {}", method.unwrap_or("<missing>")),
        }
    }

    #[must_use]
    pub fn unknown_tool(name: &str) -> Self {
        Self {
            code: Self::METHOD_NOT_FOUND,
            message: format!("Unknown tool: {name}"),
        }
    }

    #[must_use]
    pub fn tool_execution(detail: impl std::fmt::Display) -> Self {
        Self {
            code: Self::INTERNAL_ERROR,
            message: format!("Tool execution error: {detail}"),
        }
    }

    #[must_use]
    pub fn internal(detail: impl std::fmt::Display) -> Self {
        Self {
            code: Self::INTERNAL_ERROR,
            message: format!("Internal error: {detail}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Result(Value),
    Error(RpcError),
}

/// One response line. Serializes as `{"jsonrpc":"2.0","id":…,"result"|"error":…}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Response {
    jsonrpc: &'static str,
    pub id: Value,
    #[serde(flatten)]
    pub outcome: Outcome,
}

impl Response {
    #[must_use]
    pub fn new(id: Value, outcome: Outcome) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            outcome,
        }
    }

    #[must_use]
    pub fn result(id: Value, result: Value) -> Self {
        Self::new(id, Outcome::Result(result))
    }

    #[must_use]
    pub fn error(id: Value, error: RpcError) -> Self {
        Self::new(id, Outcome::Error(error))
    }

    #[must_use]
    pub fn error_code(&self) -> Option<i64> {
        match &self.outcome {
            Outcome::Error(e) => Some(e.code),
            Outcome::Result(_) => None,
        }
    }
}

/// A decoded message before method routing.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    /// Request id; `null` when absent.
    pub id: Value,
    pub method: Option<String>,
    pub params: Value,
}

impl Envelope {
    /// Split a decoded JSON value into id / method / params.
    ///
    /// # Errors
    ///
    /// Returns `-32600` if the message is not a JSON object.
    pub fn from_value(msg: Value) -> Result<Self, RpcError> {
        let Value::Object(mut obj) = msg else {
            return Err(RpcError::invalid_request("expected a JSON object"));
        };
        let id = obj.remove("id").unwrap_or(Value::Null);
        let method = obj
            .remove("method")
            .and_then(|m| m.as_str().map(str::to_string));
        let params = obj.remove("params").unwrap_or(Value::Null);
        Ok(Self { id, method, params })
    }
}

/// Every method the server routes, with its typed parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Initialize,
    /// `initialized` / `notifications/*`: processed, never answered.
    Notification(String),
    ToolsList,
    ListOfferings,
    ServerInfo,
    ToolsCall(ToolCall),
    ResourcesList,
    PromptsList,
    Ping,
}

impl Request {
    /// Route a method name (plus params) to a request variant.
    ///
    /// # Errors
    ///
    /// Returns `-32601` for unknown methods and tools, and the tool-argument errors produced by
    /// [`ToolCall::from_params`].
    pub fn parse(method: Option<&str>, params: &Value) -> Result<Self, RpcError> {
        match method {
            Some("initialize") => Ok(Self::Initialize),
            Some(m @ "initialized") => Ok(Self::Notification(m.to_string())),
            Some(m) if m.starts_with("notifications/") => Ok(Self::Notification(m.to_string())),
            Some("tools/list") => Ok(Self::ToolsList),
            Some("listOfferings") => Ok(Self::ListOfferings),
            Some("serverInfo") => Ok(Self::ServerInfo),
            Some("tools/call") => ToolCall::from_params(params).map(Self::ToolsCall),
            Some("resources/list") => Ok(Self::ResourcesList),
            Some("prompts/list") => Ok(Self::PromptsList),
            Some("ping") => Ok(Self::Ping),
            other => Err(RpcError::method_not_found(other)),
        }
    }
}
