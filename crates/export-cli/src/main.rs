use anyhow::Context as _;
use apiscan_catalog::Catalog;
use apiscan_export::config::{DEFAULT_OUTPUT_DIR, default_config_path, load_config};
use apiscan_export::logging::{self, LogFormat};
use apiscan_export::{Exporter, SnapshotWriter, read_batch_file};
use clap::{ArgGroup, Parser};
use owo_colors::OwoColorize as _;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "apiscan-export")]
#[command(version, about = "Export Huawei Cloud API Explorer data as YAML snapshots", long_about = None)]
#[command(group(ArgGroup::new("mode").required(true).multiple(false)))]
#[command(after_help = "EXAMPLES:\n  \
    apiscan-export --products\n  \
    apiscan-export --product-apis 弹性云服务器\n  \
    apiscan-export --api-detail 弹性云服务器 创建云服务器\n  \
    apiscan-export --multiple-apis apis.txt --output-dir snapshots")]
struct Args {
    /// Export the full product catalog.
    #[arg(long, group = "mode")]
    products: bool,

    /// Export every API of one product.
    #[arg(long, value_name = "PRODUCT", group = "mode")]
    product_apis: Option<String>,

    /// Export one API's detail.
    #[arg(long, num_args = 2, value_names = ["PRODUCT", "INTERFACE"], group = "mode")]
    api_detail: Option<Vec<String>>,

    /// Export several APIs listed as `product,interface` lines in FILE.
    #[arg(long, value_name = "FILE", group = "mode")]
    multiple_apis: Option<PathBuf>,

    /// Output directory (created if missing). Defaults to `api_exports`.
    #[arg(long, env = "APISCAN_OUTPUT_DIR")]
    output_dir: Option<PathBuf>,

    /// Config file (JSON or YAML). Defaults to `$XDG_CONFIG_HOME/apiscan/config.json`.
    #[arg(long, env = "APISCAN_CONFIG")]
    config: Option<PathBuf>,

    #[arg(long, env = "APISCAN_BASE_URL")]
    base_url: Option<String>,

    #[arg(long, env = "APISCAN_TIMEOUT_SECS")]
    timeout_secs: Option<u64>,

    #[arg(long, env = "APISCAN_PAGE_SIZE")]
    page_size: Option<usize>,

    #[arg(long, env = "APISCAN_LOG_LEVEL", default_value = "info")]
    log_level: String,

    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

enum Mode {
    Products,
    ProductApis(String),
    ApiDetail { product: String, interface: String },
    MultipleApis(PathBuf),
}

impl Args {
    fn mode(&mut self) -> anyhow::Result<Mode> {
        if self.products {
            return Ok(Mode::Products);
        }
        if let Some(product) = self.product_apis.take() {
            return Ok(Mode::ProductApis(product));
        }
        if let Some(pair) = self.api_detail.take() {
            let [product, interface]: [String; 2] = pair
                .try_into()
                .map_err(|_| anyhow::anyhow!("--api-detail takes PRODUCT and INTERFACE"))?;
            return Ok(Mode::ApiDetail { product, interface });
        }
        if let Some(file) = self.multiple_apis.take() {
            return Ok(Mode::MultipleApis(file));
        }
        anyhow::bail!("one of --products, --product-apis, --api-detail, --multiple-apis is required")
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let mut args = Args::parse();
    logging::init(&args.log_level, args.log_format);

    match run(&mut args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {e:#}", "✗ export failed:".red().bold());
            ExitCode::FAILURE
        }
    }
}

async fn run(args: &mut Args) -> anyhow::Result<()> {
    let mode = args.mode()?;

    let config_path = match args.config.clone() {
        Some(p) => p,
        None => default_config_path()?,
    };
    let file_config = load_config(&config_path)?;
    let catalog_config = file_config.catalog.with_overrides(
        args.base_url.take(),
        args.timeout_secs,
        args.page_size,
    );
    let output_dir = args
        .output_dir
        .take()
        .or(file_config.output_dir)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR));

    let catalog = Catalog::from_config(&catalog_config).context("invalid catalog configuration")?;
    let exporter = Exporter::new(catalog, SnapshotWriter::new(&output_dir));

    let path = match mode {
        Mode::Products => {
            println!("Exporting the Huawei Cloud product catalog...");
            exporter.export_products().await?
        }
        Mode::ProductApis(product) => {
            println!("Exporting the API list of {product}...");
            exporter.export_product_apis(&product).await?
        }
        Mode::ApiDetail { product, interface } => {
            println!("Exporting {product} / {interface}...");
            exporter.export_api_detail(&product, &interface).await?
        }
        Mode::MultipleApis(file) => {
            let entries = read_batch_file(&file)?;
            println!("Found {} APIs in {}:", entries.len(), file.display());
            for (i, entry) in entries.iter().enumerate() {
                println!("  {}. {} - {}", i + 1, entry.product_name, entry.interface_name);
            }

            let report = exporter.export_batch(&entries).await?;
            for failure in &report.failures {
                println!(
                    "  {} line {}: {} - {}: {}",
                    "skipped".yellow(),
                    failure.entry.line,
                    failure.entry.product_name,
                    failure.entry.interface_name,
                    failure.reason
                );
            }
            println!("Exported {} of {} APIs.", report.exported, entries.len());
            report.path
        }
    };

    println!("{} {}", "✓ written:".green().bold(), path.display());
    Ok(())
}
