use anyhow::Context as _;
use apiscan_catalog::{Catalog, CatalogConfig, HttpCatalogSource};
use apiscan_export::snapshot::{BATCH_FILE, PRODUCTS_FILE};
use apiscan_export::{BatchEntry, Exporter, SnapshotError, SnapshotWriter};
use apiscan_test_support::{APIS_PATH, CatalogFixture, StubCatalog};
use serde_json::json;
use std::path::Path;
use std::process::Command;

fn fixture() -> CatalogFixture {
    CatalogFixture::new()
        .group("计算", &[("弹性云服务器", "ECS")])
        .group("存储", &[("对象存储服务", "OBS")])
        .apis(
            "ECS",
            &[
                ("ListServers", "查询云服务器列表"),
                ("CreateServers", "创建云服务器"),
            ],
        )
        .detail(
            "ECS",
            "CreateServers",
            json!({
                "name": "CreateServers",
                "definitions": {"Server": {"properties": {"name": {"type": "string"}}}},
                "request_body": {"allOf": [{"$ref": "#/definitions/Server"}]}
            }),
        )
}

fn exporter(
    stub: &StubCatalog,
    out: &Path,
    page_size: usize,
) -> anyhow::Result<Exporter<HttpCatalogSource>> {
    let catalog = Catalog::from_config(&CatalogConfig {
        base_url: stub.base_url().to_string(),
        timeout_secs: 5,
        page_size,
    })?;
    Ok(Exporter::new(catalog, SnapshotWriter::new(out)))
}

fn read_yaml(path: &Path) -> anyhow::Result<serde_yaml::Value> {
    let text = std::fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    Ok(serde_yaml::from_str(&text)?)
}

#[tokio::test]
async fn exports_products_and_api_list() -> anyhow::Result<()> {
    let stub = StubCatalog::start(fixture().generated_apis("OBS", 23)).await?;
    let dir = tempfile::tempdir()?;
    let exporter = exporter(&stub, dir.path(), 10)?;

    let path = exporter.export_products().await?;
    assert!(path.ends_with(PRODUCTS_FILE));
    let doc = read_yaml(&path)?;
    assert_eq!(doc["products"]["count"].as_u64(), Some(2));
    assert_eq!(doc["products"]["items"][1]["group"].as_str(), Some("存储"));

    let path = exporter.export_product_apis("对象存储服务").await?;
    assert!(path.ends_with("OBS_apis.yml"));
    let doc = read_yaml(&path)?;
    assert_eq!(doc["product"]["short"].as_str(), Some("OBS"));
    assert_eq!(doc["product"]["api_count"].as_u64(), Some(23));
    assert_eq!(stub.hits(APIS_PATH), 3);
    Ok(())
}

#[tokio::test]
async fn exports_normalized_api_detail() -> anyhow::Result<()> {
    let stub = StubCatalog::start(fixture()).await?;
    let dir = tempfile::tempdir()?;
    let exporter = exporter(&stub, dir.path(), 100)?;

    let path = exporter.export_api_detail("弹性云服务器", "创建").await?;
    assert!(path.ends_with("ECS_CreateServers.yml"));

    let doc = read_yaml(&path)?;
    assert_eq!(doc["api"]["basic_info"]["summary"].as_str(), Some("创建云服务器"));
    let body = &doc["api"]["detail"]["request_body"];
    assert!(body.get("allOf").is_none());
    assert!(body["properties"].get("name").is_some());
    Ok(())
}

#[tokio::test]
async fn unknown_product_is_reported() -> anyhow::Result<()> {
    let stub = StubCatalog::start(fixture()).await?;
    let dir = tempfile::tempdir()?;
    let exporter = exporter(&stub, dir.path(), 100)?;

    let err = exporter.export_product_apis("不存在的产品").await.unwrap_err();
    assert!(matches!(err, SnapshotError::Catalog(ref e) if e.is_not_found()), "{err}");
    Ok(())
}

#[tokio::test]
async fn batch_skips_failures_and_requires_one_success() -> anyhow::Result<()> {
    let stub = StubCatalog::start(fixture()).await?;
    let dir = tempfile::tempdir()?;
    let exporter = exporter(&stub, dir.path(), 100)?;

    let entry = |product: &str, interface: &str, line| BatchEntry {
        product_name: product.to_string(),
        interface_name: interface.to_string(),
        line,
    };

    let report = exporter
        .export_batch(&[
            entry("弹性云服务器", "创建云服务器", 1),
            entry("弹性云服务器", "删除云服务器", 2),
        ])
        .await?;
    assert_eq!(report.exported, 1);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].entry.line, 2);
    assert!(report.path.ends_with(BATCH_FILE));
    let doc = read_yaml(&report.path)?;
    assert_eq!(doc["apis"]["count"].as_u64(), Some(1));

    let err = exporter
        .export_batch(&[entry("不存在的产品", "x", 1)])
        .await
        .unwrap_err();
    assert!(matches!(err, SnapshotError::NothingExported { attempted: 1 }), "{err}");
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn cli_writes_products_snapshot() -> anyhow::Result<()> {
    let stub = StubCatalog::start(fixture()).await?;
    let dir = tempfile::tempdir()?;
    let out = dir.path().join("exports");
    let base_url = stub.base_url().to_string();
    let out_arg = out.clone();
    let config = dir.path().join("absent-config.json");

    let status = tokio::task::spawn_blocking(move || {
        Command::new(env!("CARGO_BIN_EXE_apiscan-export"))
            .arg("--products")
            .arg("--output-dir")
            .arg(&out_arg)
            .arg("--base-url")
            .arg(&base_url)
            .arg("--config")
            .arg(&config)
            .env_remove("RUST_LOG")
            .output()
    })
    .await??;
    assert!(status.status.success(), "{status:?}");
    assert!(out.join(PRODUCTS_FILE).is_file());

    // Modes are mutually exclusive.
    let status = Command::new(env!("CARGO_BIN_EXE_apiscan-export"))
        .args(["--products", "--product-apis", "弹性云服务器"])
        .output()?;
    assert!(!status.status.success());
    Ok(())
}
