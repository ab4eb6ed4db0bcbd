//! HED schema provider
//!
//! Retrieves the HED XML document once at startup, either over HTTP or from
//! a local file, and turns it into an immutable [`Schema`].

use hed_common::Schema;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

const USER_AGENT: &str = concat!("hed-bot/", env!("CARGO_PKG_VERSION"));
const FETCH_TIMEOUT_SECS: u64 = 60;

/// Schema retrieval errors
#[derive(Debug, Error)]
pub enum SchemaFetchError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Failed to retrieve schema. Status code: {0}: {1}")]
    HttpStatus(u16, String),

    #[error("Failed to read schema file {0}: {1}")]
    FileError(PathBuf, String),

    #[error("Parse error: {0}")]
    ParseError(#[from] hed_common::Error),
}

/// Parsed schema together with the document it came from
///
/// The raw XML is kept for prompts configured to embed the full document.
#[derive(Debug, Clone)]
pub struct SchemaDocument {
    pub schema: Schema,
    pub xml: String,
}

impl SchemaDocument {
    pub fn from_xml(xml: String) -> Result<Self, SchemaFetchError> {
        let schema = Schema::from_hed_xml(&xml)?;
        Ok(Self { schema, xml })
    }

    /// Load from a local HED XML file
    pub fn from_file(path: &Path) -> Result<Self, SchemaFetchError> {
        let xml = std::fs::read_to_string(path)
            .map_err(|e| SchemaFetchError::FileError(path.to_path_buf(), e.to_string()))?;
        tracing::info!(path = %path.display(), bytes = xml.len(), "Read HED schema file");
        Self::from_xml(xml)
    }
}

/// HTTP client for the HED schema document
pub struct SchemaClient {
    http_client: reqwest::Client,
    url: String,
}

impl SchemaClient {
    pub fn new(url: impl Into<String>) -> Result<Self, SchemaFetchError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(FETCH_TIMEOUT_SECS))
            .build()
            .map_err(|e| SchemaFetchError::NetworkError(e.to_string()))?;

        Ok(Self {
            http_client,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Download the raw XML document
    pub async fn fetch_xml(&self) -> Result<String, SchemaFetchError> {
        tracing::debug!(url = %self.url, "Fetching HED schema");

        let response = self
            .http_client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| SchemaFetchError::NetworkError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(SchemaFetchError::HttpStatus(status.as_u16(), error_text));
        }

        let xml = response
            .text()
            .await
            .map_err(|e| SchemaFetchError::NetworkError(e.to_string()))?;

        tracing::info!(url = %self.url, bytes = xml.len(), "Retrieved HED schema");

        Ok(xml)
    }

    /// Download and parse the schema
    pub async fn fetch(&self) -> Result<SchemaDocument, SchemaFetchError> {
        let xml = self.fetch_xml().await?;
        SchemaDocument::from_xml(xml)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, routing::get, Router};

    const XML: &str = r#"<HED version="8.3.0"><schema>
        <node><name>Item</name><node><name>Square</name></node></node>
    </schema></HED>"#;

    /// Serve `router` on an ephemeral local port and return its base URL
    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[test]
    fn test_client_creation() {
        let client = SchemaClient::new("http://localhost/HEDLatest.xml");
        assert!(client.is_ok());
    }

    #[tokio::test]
    async fn test_fetch_parses_schema() {
        let base = serve(Router::new().route("/HEDLatest.xml", get(|| async { XML }))).await;
        let client = SchemaClient::new(format!("{}/HEDLatest.xml", base)).unwrap();

        let document = client.fetch().await.unwrap();

        assert_eq!(document.schema.version(), Some("8.3.0"));
        assert!(document.schema.contains("Square"));
        assert_eq!(document.xml, XML);
    }

    #[tokio::test]
    async fn test_non_success_status_is_reported() {
        let base = serve(Router::new().route(
            "/HEDLatest.xml",
            get(|| async { (StatusCode::NOT_FOUND, "gone") }),
        ))
        .await;
        let client = SchemaClient::new(format!("{}/HEDLatest.xml", base)).unwrap();

        match client.fetch().await {
            Err(SchemaFetchError::HttpStatus(404, body)) => assert_eq!(body, "gone"),
            other => panic!("expected HttpStatus(404), got {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn test_unparseable_document_is_reported() {
        let base = serve(Router::new().route("/bad.xml", get(|| async { "<HED><schema>" }))).await;
        let client = SchemaClient::new(format!("{}/bad.xml", base)).unwrap();

        assert!(matches!(
            client.fetch().await,
            Err(SchemaFetchError::ParseError(_))
        ));
    }

    #[test]
    fn test_missing_file_is_reported() {
        let result = SchemaDocument::from_file(Path::new("/nonexistent/HED.xml"));
        assert!(matches!(result, Err(SchemaFetchError::FileError(_, _))));
    }
}
