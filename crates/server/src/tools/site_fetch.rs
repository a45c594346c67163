//! site_fetch tool implementation.
//!
//! Offers a request to the offline cache controller, the way a page on the
//! site would issue it. Requests the controller does not take are fetched
//! directly and never cached.

use rmcp::{ErrorData as McpError, model::*};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use shelf_client::resolve;
use shelf_core::{Destination, Error, Intercept, Network, OfflineController, Request, Response, ResponseType, ServedFrom};

use super::body_preview;

/// Input parameters for site_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SiteFetchParams {
    /// Site path (`/libros`) or absolute URL.
    pub url: String,

    /// HTTP method (default: GET).
    #[serde(default = "default_method")]
    pub method: String,

    /// Request destination: "document", "font", "image", "script", "style",
    /// or empty for a plain fetch.
    #[serde(default)]
    pub destination: String,
}

fn default_method() -> String {
    "GET".into()
}

/// Who produced the response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum FetchSource {
    Network,
    Cache,
    /// The controller declined the request; it went straight to the network.
    Passthrough,
}

impl From<ServedFrom> for FetchSource {
    fn from(source: ServedFrom) -> Self {
        match source {
            ServedFrom::Network => FetchSource::Network,
            ServedFrom::Cache => FetchSource::Cache,
        }
    }
}

/// Output structure for site_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SiteFetchOutput {
    /// Final URL of the response.
    pub url: String,
    pub status: u16,
    pub response_type: ResponseType,
    pub source: FetchSource,
    /// Content-Type header.
    pub content_type: Option<String>,
    /// Body as text (lossy UTF-8, first 64 KiB).
    pub body: String,
    pub body_truncated: bool,
    /// Full body length in bytes.
    pub bytes: usize,
}

impl SiteFetchOutput {
    fn new(response: &Response, source: FetchSource) -> Self {
        let (body, body_truncated) = body_preview(&response.body);
        Self {
            url: response.url.to_string(),
            status: response.status,
            response_type: response.response_type,
            source,
            content_type: response.content_type().map(str::to_string),
            body,
            body_truncated,
            bytes: response.body.len(),
        }
    }
}

/// Implementation of the site_fetch tool.
pub async fn fetch_impl(
    controller: &OfflineController, network: &dyn Network, params: SiteFetchParams,
) -> Result<CallToolResult, McpError> {
    if params.url.trim().is_empty() {
        return Err(Error::InvalidInput("url cannot be empty".into()).into());
    }
    if params.method.trim().is_empty() {
        return Err(Error::InvalidInput("method cannot be empty".into()).into());
    }

    let url = resolve(controller.origin(), &params.url).map_err(|e| Error::InvalidUrl(e.to_string()))?;
    let request = Request::new(params.method.trim(), url).with_destination(Destination::parse(&params.destination));

    let (response, source) = match controller.intercept(request).await? {
        Intercept::Respond(served) => (served.response, served.source.into()),
        Intercept::PassThrough(request) => (network.fetch(&request).await?, FetchSource::Passthrough),
    };

    tracing::debug!(url = %response.url, status = response.status, source = ?source, "site_fetch");

    let output = SiteFetchOutput::new(&response, source);
    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::{StubNetwork, active_controller, controller};
    use std::sync::Arc;

    fn params(url: &str, method: &str, destination: &str) -> SiteFetchParams {
        SiteFetchParams { url: url.into(), method: method.into(), destination: destination.into() }
    }

    fn output(result: CallToolResult) -> SiteFetchOutput {
        let text = result.content[0].as_text().unwrap().text.clone();
        serde_json::from_str(&text).unwrap()
    }

    #[test]
    fn test_params_defaults() {
        let params: SiteFetchParams = serde_json::from_str(r#"{"url": "/libros"}"#).unwrap();
        assert_eq!(params.method, "GET");
        assert_eq!(params.destination, "");
    }

    #[tokio::test]
    async fn test_fetch_empty_url() {
        let network = Arc::new(StubNetwork::new());
        let controller = controller(network.clone());
        let result = fetch_impl(&controller, network.as_ref(), params("  ", "GET", "")).await;
        assert!(result.is_err());
        assert_eq!(network.calls(), 0);
    }

    #[tokio::test]
    async fn test_fetch_precached_asset_from_cache() {
        let network = Arc::new(StubNetwork::new());
        let controller = active_controller(network.clone()).await;
        let before = network.calls();

        let result = fetch_impl(&controller, network.as_ref(), params("/favicon.svg", "GET", "image"))
            .await
            .unwrap();
        let out = output(result);

        assert_eq!(out.source, FetchSource::Cache);
        assert_eq!(out.body, "<svg/>");
        assert_eq!(out.url, "http://localhost:4321/favicon.svg");
        assert_eq!(network.calls(), before);
    }

    #[tokio::test]
    async fn test_fetch_document_network_first_then_offline() {
        let network = Arc::new(StubNetwork::new());
        let controller = active_controller(network.clone()).await;
        network.serve("/libros", 200, "<html>libros</html>");

        let live = output(
            fetch_impl(&controller, network.as_ref(), params("/libros", "GET", "document"))
                .await
                .unwrap(),
        );
        assert_eq!(live.source, FetchSource::Network);
        controller.settle().await;

        network.set_offline(true);
        let offline = output(
            fetch_impl(&controller, network.as_ref(), params("/libros", "GET", "document"))
                .await
                .unwrap(),
        );
        assert_eq!(offline.source, FetchSource::Cache);
        assert_eq!(offline.body, "<html>libros</html>");
    }

    #[tokio::test]
    async fn test_fetch_offline_miss_is_error() {
        let network = Arc::new(StubNetwork::new());
        let controller = active_controller(network.clone()).await;
        network.set_offline(true);

        let err = fetch_impl(&controller, network.as_ref(), params("/nunca", "GET", "document"))
            .await
            .unwrap_err();
        assert_eq!(err.code.0, -32001);
    }

    #[tokio::test]
    async fn test_fetch_post_passes_through() {
        let network = Arc::new(StubNetwork::new());
        let controller = active_controller(network.clone()).await;
        network.serve("/contacto", 200, "ok");

        let out = output(
            fetch_impl(&controller, network.as_ref(), params("/contacto", "POST", "document"))
                .await
                .unwrap(),
        );
        assert_eq!(out.source, FetchSource::Passthrough);
        controller.settle().await;
        assert!(controller.storage().entries("fil25-runtime-v1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_fetch_cross_origin_passes_through() {
        let network = Arc::new(StubNetwork::new());
        let controller = active_controller(network.clone()).await;

        let out = output(
            fetch_impl(&controller, network.as_ref(), params("https://cdn.example.com/a.js", "GET", "script"))
                .await
                .unwrap(),
        );
        assert_eq!(out.source, FetchSource::Passthrough);
        assert_eq!(out.response_type, ResponseType::Cors);
    }

    #[tokio::test]
    async fn test_fetch_before_activation_passes_through() {
        let network = Arc::new(StubNetwork::new());
        let controller = controller(network.clone());
        network.serve("/style.css", 200, "body {}");

        let out = output(
            fetch_impl(&controller, network.as_ref(), params("/style.css", "GET", "style"))
                .await
                .unwrap(),
        );
        assert_eq!(out.source, FetchSource::Passthrough);
        assert_eq!(out.bytes, 7);
    }
}
