use anyhow::Context as _;
use apiscan_test_support::{CatalogFixture, KillOnDrop, StubCatalog};
use serde_json::{Value, json};
use std::io::{Read as _, Write as _};
use std::process::{Command, Stdio};

/// Run the server binary against `stub`, feed it `input`, close stdin, and collect stdout lines.
async fn run_server(stub: &StubCatalog, input: String) -> anyhow::Result<Vec<Value>> {
    let bin = env!("CARGO_BIN_EXE_apiscan-mcp-server");
    let mut child = Command::new(bin)
        .arg("--base-url")
        .arg(stub.base_url())
        .arg("--timeout-secs")
        .arg("5")
        .env_remove("RUST_LOG")
        .env_remove("APISCAN_CONFIG")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .context("spawn apiscan-mcp-server")?;

    let mut stdin = child.stdin.take().context("child stdin")?;
    let mut stdout = child.stdout.take().context("child stdout")?;
    let _child = KillOnDrop(child);

    let output = tokio::task::spawn_blocking(move || -> anyhow::Result<String> {
        stdin.write_all(input.as_bytes())?;
        drop(stdin);
        let mut out = String::new();
        stdout.read_to_string(&mut out)?;
        Ok(out)
    })
    .await
    .context("join reader")??;

    output
        .lines()
        .map(|l| serde_json::from_str(l).with_context(|| format!("stdout line is not JSON: {l}")))
        .collect()
}

fn lines(requests: &[Value]) -> String {
    requests.iter().map(|r| format!("{r}\n")).collect()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn handshake_list_and_call_products() -> anyhow::Result<()> {
    let stub = StubCatalog::start(
        CatalogFixture::new().group("计算", &[("弹性云服务器", "ECS"), ("云硬盘", "EVS")]),
    )
    .await?;

    let input = lines(&[
        json!({"jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {}}),
        json!({"jsonrpc": "2.0", "method": "notifications/initialized"}),
        json!({"jsonrpc": "2.0", "id": 2, "method": "tools/list"}),
        json!({"jsonrpc": "2.0", "id": 3, "method": "tools/call",
               "params": {"name": "list_huawei_cloud_products", "arguments": {}}}),
    ]);
    let out = run_server(&stub, input).await?;

    assert_eq!(out.len(), 3, "{out:?}");
    assert_eq!(out[0]["result"]["protocolVersion"], json!("2024-11-05"));
    assert_eq!(out[1]["result"]["tools"].as_array().map(Vec::len), Some(3));

    let text = out[2]["result"]["content"][0]["text"]
        .as_str()
        .context("tool text")?;
    let listed: Vec<&str> = text
        .lines()
        .filter_map(|l| l.strip_prefix("- "))
        .collect();
    assert_eq!(listed, ["弹性云服务器", "云硬盘"]);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn bad_requests_do_not_stop_the_loop() -> anyhow::Result<()> {
    let stub = StubCatalog::start(
        CatalogFixture::new()
            .group("计算", &[("弹性云服务器", "ECS")])
            .apis("ECS", &[("CreateServers", "创建云服务器")])
            .detail("ECS", "CreateServers", json!({"name": "CreateServers"})),
    )
    .await?;

    let mut input = String::from("this is not json\n");
    input.push_str(&lines(&[
        json!({"jsonrpc": "2.0", "id": 1, "method": "tools/call",
               "params": {"name": "get_huawei_cloud_api_info",
                          "arguments": {"product_name": "弹性云服务器"}}}),
        json!({"jsonrpc": "2.0", "id": 2, "method": "bogus"}),
        json!({"jsonrpc": "2.0", "id": 3, "method": "tools/call",
               "params": {"name": "get_huawei_cloud_api_info",
                          "arguments": {"product_name": "弹性云服务器", "interface_name": "创建"}}}),
    ]));
    let out = run_server(&stub, input).await?;

    assert_eq!(out.len(), 4, "{out:?}");
    assert_eq!(out[0]["id"], Value::Null);
    assert_eq!(out[0]["error"]["code"], json!(-32700));
    assert_eq!(out[1]["error"]["code"], json!(-32603));
    assert_eq!(out[2]["error"]["code"], json!(-32601));
    let text = out[3]["result"]["content"][0]["text"]
        .as_str()
        .context("tool text")?;
    assert!(text.contains("API name: CreateServers"), "{text}");
    Ok(())
}
