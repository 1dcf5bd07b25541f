//! MCP tool server for the Huawei Cloud API Explorer catalog.
//!
//! Speaks line-delimited JSON-RPC 2.0 on stdin/stdout and exposes three tools: list products,
//! list a product's APIs, and fetch one API's (normalized) detail.

pub mod dispatcher;
pub mod logging;
pub mod protocol;
pub mod tools;

pub use dispatcher::{Dispatcher, StopReason, serve};
pub use protocol::{Request, Response, RpcError};
pub use tools::{ToolCall, ToolResult};
