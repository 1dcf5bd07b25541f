//! Line-oriented request dispatch.
//!
//! [`Dispatcher::handle_line`] turns one input line into at most one response; [`serve`] pumps a
//! reader through it until end of input or cancellation. Requests are handled strictly one at a
//! time.

use crate::protocol::{
    Envelope, Outcome, PROTOCOL_VERSION, Request, Response, RpcError, SERVER_NAME,
    SERVER_VERSION,
};
use crate::tools;
use apiscan_catalog::{Catalog, CatalogSource};
use futures::FutureExt as _;
use serde_json::{Value, json};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;

const SERVER_DESCRIPTION: &str = "Huawei Cloud API Explorer catalog tools";

pub struct Dispatcher<S> {
    catalog: Catalog<S>,
}

impl<S: CatalogSource> Dispatcher<S> {
    #[must_use]
    pub fn new(catalog: Catalog<S>) -> Self {
        Self { catalog }
    }

    /// Handle one raw input line. Returns `None` for blank lines and notifications.
    pub async fn handle_line(&self, line: &str) -> Option<Response> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        match serde_json::from_str::<Value>(line) {
            Ok(msg) => self.handle_message(msg).await,
            Err(e) => {
                tracing::debug!(error = %e, "unparseable input line");
                Some(Response::error(Value::Null, RpcError::parse_error()))
            }
        }
    }

    /// Handle one decoded message. Panics raised while handling it become `-32603` responses.
    pub async fn handle_message(&self, msg: Value) -> Option<Response> {
        let envelope = match Envelope::from_value(msg) {
            Ok(e) => e,
            Err(err) => return Some(Response::error(Value::Null, err)),
        };
        let id = envelope.id.clone();
        let method = envelope.method.clone().unwrap_or_default();

        match AssertUnwindSafe(self.route(envelope)).catch_unwind().await {
            Ok(outcome) => outcome.map(|o| Response::new(id, o)),
            Err(panic) => {
                let detail = panic_message(panic.as_ref());
                tracing::error!(method = %method, panic = %detail, "handler panicked");
                Some(Response::error(id, RpcError::internal(detail)))
            }
        }
    }

    async fn route(&self, envelope: Envelope) -> Option<Outcome> {
        let request = match Request::parse(envelope.method.as_deref(), &envelope.params) {
            Ok(r) => r,
            Err(err) => {
                tracing::debug!(code = err.code, message = %err.message, "rejected request");
                return Some(Outcome::Error(err));
            }
        };

        let result = match request {
            Request::Notification(method) => {
                tracing::debug!(method = %method, "notification received");
                return None;
            }
            Request::Initialize => initialize_result(),
            Request::ToolsList => json!({"tools": tools::definitions()}),
            Request::ListOfferings => json!({
                "tools": tools::definitions(),
                "resources": [],
                "prompts": [],
            }),
            Request::ServerInfo => json!({
                "name": SERVER_NAME,
                "version": SERVER_VERSION,
                "description": SERVER_DESCRIPTION,
                "capabilities": capabilities(),
            }),
            Request::ResourcesList => json!({"resources": []}),
            Request::PromptsList => json!({"prompts": []}),
            Request::Ping => json!({"status": "ok"}),
            Request::ToolsCall(call) => {
                let tool = call.name();
                match tools::execute(&self.catalog, call).await {
                    Ok(result) => result.into_content(),
                    Err(e) => {
                        tracing::warn!(tool, error = %e, "tool call failed");
                        return Some(Outcome::Error(RpcError::tool_execution(e)));
                    }
                }
            }
        };
        Some(Outcome::Result(result))
    }
}

fn capabilities() -> Value {
    json!({"tools": {}, "resources": {}, "prompts": {}})
}

fn initialize_result() -> Value {
    json!({
        "protocolVersion": PROTOCOL_VERSION,
        "capabilities": capabilities(),
        "serverInfo": {"name": SERVER_NAME, "version": SERVER_VERSION},
    })
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "handler panicked".to_string()
    }
}

/// Why [`serve`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    EndOfInput,
    Cancelled,
}

/// Read requests line by line from `reader` and write responses to `writer` until input ends or
/// `shutdown` is cancelled. Cancellation is only observed between requests.
///
/// # Errors
///
/// Returns an error if reading input or writing a response fails.
pub async fn serve<S, R, W>(
    dispatcher: &Dispatcher<S>,
    mut reader: R,
    mut writer: W,
    shutdown: CancellationToken,
) -> std::io::Result<StopReason>
where
    S: CatalogSource,
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buf = Vec::new();
    loop {
        buf.clear();
        let read = tokio::select! {
            biased;
            () = shutdown.cancelled() => {
                tracing::info!("termination requested; stopping");
                return Ok(StopReason::Cancelled);
            }
            read = reader.read_until(b'\n', &mut buf) => read?,
        };
        if read == 0 {
            tracing::info!("end of input; stopping");
            return Ok(StopReason::EndOfInput);
        }

        let response = match std::str::from_utf8(&buf) {
            Ok(line) => dispatcher.handle_line(line).await,
            Err(_) => Some(Response::error(Value::Null, RpcError::parse_error())),
        };
        if let Some(response) = response {
            write_json_line(&mut writer, &response).await?;
        }
    }
}

async fn write_json_line<W: AsyncWrite + Unpin>(
    writer: &mut W,
    response: &Response,
) -> std::io::Result<()> {
    let mut line = serde_json::to_vec(response).map_err(std::io::Error::other)?;
    line.push(b'\n');
    writer.write_all(&line).await?;
    writer.flush().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use apiscan_catalog::models::{ApiPage, ApiSummary, Product, ProductGroup};
    use apiscan_catalog::{CatalogError, Result};
    use async_trait::async_trait;
    use tokio::io::BufReader;

    #[derive(Default)]
    struct FakeSource {
        groups: Vec<ProductGroup>,
        apis: Vec<ApiSummary>,
        detail: Value,
        fail_products: bool,
        panic_on_detail: bool,
    }

    #[async_trait]
    impl CatalogSource for FakeSource {
        async fn fetch_products(&self) -> Result<Vec<ProductGroup>> {
            if self.fail_products {
                return Err(CatalogError::Upstream("HTTP 503 from v5/products".to_string()));
            }
            Ok(self.groups.clone())
        }

        async fn fetch_api_page(
            &self,
            _short_code: &str,
            offset: usize,
            limit: usize,
        ) -> Result<ApiPage> {
            Ok(ApiPage {
                count: self.apis.len(),
                api_basic_infos: self.apis.iter().skip(offset).take(limit).cloned().collect(),
            })
        }

        async fn fetch_api_detail(&self, _short_code: &str, _api_name: &str) -> Result<Value> {
            assert!(!self.panic_on_detail, "detail endpoint exploded");
            Ok(self.detail.clone())
        }
    }

    fn ecs_source() -> FakeSource {
        FakeSource {
            groups: vec![ProductGroup {
                name: "计算".to_string(),
                products: vec![
                    Product {
                        name: "弹性云服务器".to_string(),
                        short_code: "ECS".to_string(),
                        description: None,
                    },
                    Product {
                        name: "云硬盘".to_string(),
                        short_code: "EVS".to_string(),
                        description: None,
                    },
                ],
            }],
            apis: vec![ApiSummary {
                name: "CreateServers".to_string(),
                summary: "创建云服务器".to_string(),
                method: "POST".to_string(),
                ..ApiSummary::default()
            }],
            detail: json!({"name": "CreateServers", "uri": "/v1/{project_id}/cloudservers"}),
            ..FakeSource::default()
        }
    }

    fn dispatcher(source: FakeSource) -> Dispatcher<FakeSource> {
        Dispatcher::new(Catalog::new(source))
    }

    async fn call(d: &Dispatcher<FakeSource>, line: &str) -> Value {
        let resp = d.handle_line(line).await.expect("response expected");
        serde_json::to_value(resp).expect("serialize")
    }

    #[tokio::test]
    async fn ping_and_unknown_method() {
        let d = dispatcher(FakeSource::default());

        let resp = call(&d, r#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#).await;
        assert_eq!(resp["id"], json!(1));
        assert_eq!(resp["result"], json!({"status": "ok"}));

        let resp = call(&d, r#"{"jsonrpc":"2.0","id":2,"method":"bogus"}"#).await;
        assert_eq!(resp["id"], json!(2));
        assert_eq!(resp["error"]["code"], json!(-32601));
    }

    #[tokio::test]
    async fn malformed_input_gets_null_id() {
        let d = dispatcher(FakeSource::default());

        let resp = call(&d, "{not json").await;
        assert_eq!(resp["id"], Value::Null);
        assert_eq!(resp["error"]["code"], json!(-32700));

        let resp = call(&d, "[1,2,3]").await;
        assert_eq!(resp["id"], Value::Null);
        assert_eq!(resp["error"]["code"], json!(-32600));

        let resp = call(&d, r#"{"id":9}"#).await;
        assert_eq!(resp["id"], json!(9));
        assert_eq!(resp["error"]["code"], json!(-32601));
    }

    #[tokio::test]
    async fn blank_lines_and_notifications_are_silent() {
        let d = dispatcher(FakeSource::default());
        assert!(d.handle_line("   ").await.is_none());
        assert!(d.handle_line(r#"{"jsonrpc":"2.0","method":"initialized"}"#).await.is_none());
        assert!(
            d.handle_line(r#"{"jsonrpc":"2.0","method":"notifications/cancelled"}"#)
                .await
                .is_none()
        );
    }

    #[tokio::test]
    async fn request_without_id_is_answered_with_null_id() {
        let d = dispatcher(FakeSource::default());
        let resp = call(&d, r#"{"jsonrpc":"2.0","method":"ping"}"#).await;
        assert_eq!(resp["id"], Value::Null);
        assert_eq!(resp["result"]["status"], json!("ok"));
    }

    #[tokio::test]
    async fn handshake_and_offerings() {
        let d = dispatcher(FakeSource::default());

        let resp = call(&d, r#"{"jsonrpc":"2.0","id":"a","method":"initialize"}"#).await;
        assert_eq!(resp["result"]["protocolVersion"], json!("2024-11-05"));
        assert_eq!(resp["result"]["serverInfo"]["name"], json!("api_scan"));
        assert!(resp["result"]["capabilities"]["tools"].is_object());

        let resp = call(&d, r#"{"jsonrpc":"2.0","id":2,"method":"tools/list"}"#).await;
        assert_eq!(resp["result"]["tools"].as_array().map(Vec::len), Some(3));

        let resp = call(&d, r#"{"jsonrpc":"2.0","id":3,"method":"listOfferings"}"#).await;
        assert_eq!(resp["result"]["tools"].as_array().map(Vec::len), Some(3));
        assert_eq!(resp["result"]["resources"], json!([]));
        assert_eq!(resp["result"]["prompts"], json!([]));

        let resp = call(&d, r#"{"jsonrpc":"2.0","id":4,"method":"serverInfo"}"#).await;
        assert_eq!(resp["result"]["name"], json!("api_scan"));
        assert_eq!(resp["result"]["version"], json!(SERVER_VERSION));

        let resp = call(&d, r#"{"jsonrpc":"2.0","id":5,"method":"resources/list"}"#).await;
        assert_eq!(resp["result"], json!({"resources": []}));
    }

    #[tokio::test]
    async fn tool_calls_render_text_content() {
        let d = dispatcher(ecs_source());

        let resp = call(
            &d,
            r#"{"jsonrpc":"2.0","id":1,"method":"tools/call","params":{"name":"list_huawei_cloud_products"}}"#,
        )
        .await;
        let text = resp["result"]["content"][0]["text"].as_str().expect("text");
        assert!(text.contains("弹性云服务器") && text.contains("云硬盘"), "{text}");

        let resp = call(
            &d,
            r#"{"jsonrpc":"2.0","id":2,"method":"tools/call","params":{"name":"get_huawei_cloud_api_info","arguments":{"product_name":"弹性云服务器","interface_name":"创建"}}}"#,
        )
        .await;
        let text = resp["result"]["content"][0]["text"].as_str().expect("text");
        assert!(text.contains("CreateServers"), "{text}");
        assert!(text.contains("/v1/{project_id}/cloudservers"), "{text}");

        let resp = call(
            &d,
            r#"{"jsonrpc":"2.0","id":3,"method":"tools/call","params":{"name":"list_product_apis","arguments":{"product_name":"弹性云服务器"}}}"#,
        )
        .await;
        let text = resp["result"]["content"][0]["text"].as_str().expect("text");
        assert!(text.contains("创建云服务器"), "{text}");
    }

    #[tokio::test]
    async fn lookup_misses_are_ordinary_results() {
        let d = dispatcher(ecs_source());
        let resp = call(
            &d,
            r#"{"jsonrpc":"2.0","id":1,"method":"tools/call","params":{"name":"list_product_apis","arguments":{"product_name":"不存在"}}}"#,
        )
        .await;
        assert!(resp.get("error").is_none());
        let text = resp["result"]["content"][0]["text"].as_str().expect("text");
        assert!(text.contains("不存在") && text.contains("not found"), "{text}");
    }

    #[tokio::test]
    async fn upstream_failure_is_tool_execution_error() {
        let d = dispatcher(FakeSource {
            fail_products: true,
            ..FakeSource::default()
        });
        let resp = call(
            &d,
            r#"{"jsonrpc":"2.0","id":7,"method":"tools/call","params":{"name":"list_huawei_cloud_products"}}"#,
        )
        .await;
        assert_eq!(resp["id"], json!(7));
        assert_eq!(resp["error"]["code"], json!(-32603));
        let message = resp["error"]["message"].as_str().expect("message");
        assert!(message.starts_with("Tool execution error"), "{message}");
    }

    #[tokio::test]
    async fn panicking_handler_becomes_internal_error() {
        let d = dispatcher(FakeSource {
            panic_on_detail: true,
            ..ecs_source()
        });
        let resp = call(
            &d,
            r#"{"jsonrpc":"2.0","id":3,"method":"tools/call","params":{"name":"get_huawei_cloud_api_info","arguments":{"product_name":"弹性云服务器","interface_name":"创建"}}}"#,
        )
        .await;
        assert_eq!(resp["id"], json!(3));
        assert_eq!(resp["error"]["code"], json!(-32603));
        assert!(
            resp["error"]["message"]
                .as_str()
                .is_some_and(|m| m.contains("detail endpoint exploded"))
        );

        let resp = call(&d, r#"{"jsonrpc":"2.0","id":4,"method":"ping"}"#).await;
        assert_eq!(resp["result"]["status"], json!("ok"));
    }

    #[tokio::test]
    async fn serve_continues_after_errors_until_eof() {
        let d = dispatcher(ecs_source());
        let input = concat!(
            "{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"tools/call\",\"params\":{\"name\":\"get_huawei_cloud_api_info\",\"arguments\":{\"product_name\":\"弹性云服务器\"}}}\n",
            "\n",
            "{\"jsonrpc\":\"2.0\",\"method\":\"notifications/initialized\"}\n",
            "garbage\n",
            "{\"jsonrpc\":\"2.0\",\"id\":2,\"method\":\"ping\"}",
        );
        let mut output = Vec::new();

        let reason = serve(
            &d,
            BufReader::new(input.as_bytes()),
            &mut output,
            CancellationToken::new(),
        )
        .await
        .expect("serve");
        assert_eq!(reason, StopReason::EndOfInput);

        let lines: Vec<Value> = String::from_utf8(output)
            .expect("utf8")
            .lines()
            .map(|l| serde_json::from_str(l).expect("json line"))
            .collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0]["id"], json!(1));
        assert_eq!(lines[0]["error"]["code"], json!(-32603));
        assert!(
            lines[0]["error"]["message"]
                .as_str()
                .is_some_and(|m| m.contains("interface_name"))
        );
        assert_eq!(lines[1]["error"]["code"], json!(-32700));
        assert_eq!(lines[2]["result"]["status"], json!("ok"));
    }

    #[tokio::test]
    async fn invalid_utf8_line_is_parse_error() {
        let d = dispatcher(FakeSource::default());
        let mut input = vec![0xff, 0xfe, b'\n'];
        input.extend_from_slice(b"{\"id\":1,\"method\":\"ping\"}\n");
        let mut output = Vec::new();

        serve(&d, &input[..], &mut output, CancellationToken::new())
            .await
            .expect("serve");
        let text = String::from_utf8(output).expect("utf8");
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("-32700"));
        assert!(lines[1].contains("\"ok\""));
    }

    #[tokio::test]
    async fn cancelled_token_stops_before_reading() {
        let d = dispatcher(FakeSource::default());
        let token = CancellationToken::new();
        token.cancel();
        let mut output = Vec::new();

        let reason = serve(
            &d,
            &b"{\"id\":1,\"method\":\"ping\"}\n"[..],
            &mut output,
            token,
        )
        .await
        .expect("serve");
        assert_eq!(reason, StopReason::Cancelled);
        assert!(output.is_empty());
    }
}
