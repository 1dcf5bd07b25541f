//! The three catalog tools: their advertised definitions, argument parsing, execution, and the
//! typed results rendered back as text content.

use crate::protocol::RpcError;
use apiscan_catalog::{ApiSummary, Catalog, CatalogError, CatalogSource, ResolvedApi};
use apiscan_schema::normalize_detail;
use serde::Serialize;
use serde_json::{Value, json};
use std::fmt::Write as _;

pub const GET_API_INFO: &str = "get_huawei_cloud_api_info";
pub const LIST_PRODUCTS: &str = "list_huawei_cloud_products";
pub const LIST_PRODUCT_APIS: &str = "list_product_apis";

/// Tool entry as advertised by `tools/list`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    pub name: &'static str,
    pub description: &'static str,
    pub input_schema: Value,
}

/// Definitions of every tool, in advertised order.
#[must_use]
pub fn definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: GET_API_INFO,
            description: "Get the details of a Huawei Cloud API: the product name (e.g. 弹性云服务器) \
                          plus part of the interface summary (e.g. 创建云服务器).",
            input_schema: string_params(&[
                ("product_name", "Huawei Cloud product display name"),
                ("interface_name", "Interface summary, or a fragment of it"),
            ]),
        },
        ToolDefinition {
            name: LIST_PRODUCTS,
            description: "List every Huawei Cloud product known to the API Explorer.",
            input_schema: string_params(&[]),
        },
        ToolDefinition {
            name: LIST_PRODUCT_APIS,
            description: "List the APIs of one Huawei Cloud product.",
            input_schema: string_params(&[("product_name", "Huawei Cloud product display name")]),
        },
    ]
}

fn string_params(params: &[(&str, &str)]) -> Value {
    let properties: serde_json::Map<String, Value> = params
        .iter()
        .map(|(name, description)| {
            (
                (*name).to_string(),
                json!({"type": "string", "description": description}),
            )
        })
        .collect();
    let required: Vec<&str> = params.iter().map(|(name, _)| *name).collect();
    json!({"type": "object", "properties": properties, "required": required})
}

/// A validated `tools/call` request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolCall {
    GetApiInfo {
        product_name: String,
        interface_name: String,
    },
    ListProducts,
    ListProductApis {
        product_name: String,
    },
}

impl ToolCall {
    /// Parse `tools/call` params (`{name, arguments}`).
    ///
    /// # Errors
    ///
    /// Returns `-32601` for an unknown tool name and `-32603` when a required argument is
    /// missing, not a string, or empty.
    pub fn from_params(params: &Value) -> Result<Self, RpcError> {
        let name = params.get("name").and_then(Value::as_str);
        let arguments = params.get("arguments").unwrap_or(&Value::Null);

        match name {
            Some(GET_API_INFO) => Ok(Self::GetApiInfo {
                product_name: required_string(arguments, "product_name")?,
                interface_name: required_string(arguments, "interface_name")?,
            }),
            Some(LIST_PRODUCTS) => Ok(Self::ListProducts),
            Some(LIST_PRODUCT_APIS) => Ok(Self::ListProductApis {
                product_name: required_string(arguments, "product_name")?,
            }),
            other => Err(RpcError::unknown_tool(other.unwrap_or("<missing>"))),
        }
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::GetApiInfo { .. } => GET_API_INFO,
            Self::ListProducts => LIST_PRODUCTS,
            Self::ListProductApis { .. } => LIST_PRODUCT_APIS,
        }
    }
}

fn required_string(arguments: &Value, key: &str) -> Result<String, RpcError> {
    match arguments.get(key).and_then(Value::as_str).map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(RpcError::tool_execution(format_args!(
            "missing required argument '{key}'"
        ))),
    }
}

/// Product names in catalog order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductListing {
    pub names: Vec<String>,
}

impl ProductListing {
    #[must_use]
    pub fn render(&self) -> String {
        if self.names.is_empty() {
            return "No Huawei Cloud products are available.".to_string();
        }
        let mut text = format!("Huawei Cloud products ({} total):\n", self.names.len());
        for name in &self.names {
            text.push_str("\n- ");
            text.push_str(name);
        }
        text
    }
}

/// Every API of one product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiListing {
    pub product_name: String,
    pub apis: Vec<ApiSummary>,
}

impl ApiListing {
    #[must_use]
    pub fn render(&self) -> String {
        if self.apis.is_empty() {
            return format!("No APIs found for product '{}'.", self.product_name);
        }
        let mut text = format!(
            "APIs of product '{}' ({} total):\n",
            self.product_name,
            self.apis.len()
        );
        for api in &self.apis {
            let _ = write!(text, "\n- {} [{} {}]", api.summary, api.method, api.name);
        }
        text
    }
}

/// A resolved API with its detail already normalized.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiInfo {
    pub api: ResolvedApi,
}

impl ApiInfo {
    #[must_use]
    pub fn new(mut api: ResolvedApi) -> Self {
        api.detail = normalize_detail(&api.detail);
        Self { api }
    }

    #[must_use]
    pub fn render(&self) -> String {
        let api = &self.api;
        let detail = serde_json::to_string_pretty(&api.detail)
            .unwrap_or_else(|_| api.detail.to_string());
        format!(
            "Huawei Cloud API information:\n\n\
             Product: {} ({})\n\
             Interface: {}\n\
             API name: {}\n\
             Method: {}\n\n\
             Detail:\n{detail}",
            api.product_name,
            api.product_short,
            api.summary.summary,
            api.detail_name(),
            api.summary.method,
        )
    }
}

/// A lookup miss, reported to the caller as an ordinary result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotFound {
    Product { product_name: String },
    Api { product_name: String, interface_name: String },
}

impl NotFound {
    #[must_use]
    pub fn render(&self) -> String {
        match self {
            Self::Product { product_name } => {
                format!("Product '{product_name}' not found in the Huawei Cloud catalog.")
            }
            Self::Api {
                product_name,
                interface_name,
            } => format!("Interface '{interface_name}' not found in product '{product_name}'."),
        }
    }

    fn from_error(err: CatalogError) -> Result<Self, CatalogError> {
        match err {
            CatalogError::ProductNotFound(product_name) => Ok(Self::Product { product_name }),
            CatalogError::ApiNotFound { product, interface } => Ok(Self::Api {
                product_name: product,
                interface_name: interface,
            }),
            other => Err(other),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ToolResult {
    Products(ProductListing),
    Apis(ApiListing),
    ApiInfo(ApiInfo),
    NotFound(NotFound),
}

impl ToolResult {
    #[must_use]
    pub fn render(&self) -> String {
        match self {
            Self::Products(r) => r.render(),
            Self::Apis(r) => r.render(),
            Self::ApiInfo(r) => r.render(),
            Self::NotFound(r) => r.render(),
        }
    }

    /// Wrap the rendered text as MCP tool-call content.
    #[must_use]
    pub fn into_content(self) -> Value {
        json!({"content": [{"type": "text", "text": self.render()}]})
    }
}

/// Run a tool against the catalog. Lookup misses become [`ToolResult::NotFound`].
///
/// # Errors
///
/// Returns upstream and configuration failures from the catalog.
pub async fn execute<S: CatalogSource>(
    catalog: &Catalog<S>,
    call: ToolCall,
) -> Result<ToolResult, CatalogError> {
    let outcome = match call {
        ToolCall::ListProducts => catalog.list_products().await.map(|groups| {
            ToolResult::Products(ProductListing {
                names: groups
                    .into_iter()
                    .flat_map(|g| g.products)
                    .map(|p| p.name)
                    .collect(),
            })
        }),
        ToolCall::ListProductApis { product_name } => product_apis(catalog, product_name).await,
        ToolCall::GetApiInfo {
            product_name,
            interface_name,
        } => catalog
            .resolve_api_by_user_input(&product_name, &interface_name)
            .await
            .map(|api| ToolResult::ApiInfo(ApiInfo::new(api))),
    };

    outcome.or_else(|e| NotFound::from_error(e).map(ToolResult::NotFound))
}

async fn product_apis<S: CatalogSource>(
    catalog: &Catalog<S>,
    product_name: String,
) -> Result<ToolResult, CatalogError> {
    let short = catalog.resolve_short_code(&product_name).await?;
    let apis = catalog.list_apis(&short).await?;
    Ok(ToolResult::Apis(ApiListing { product_name, apis }))
}
