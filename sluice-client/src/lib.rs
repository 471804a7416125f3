//! Sluice HTTP Client
//!
//! A small, type-safe HTTP client for the orchestration graph API.
//!
//! The bridge uses it to declare assets at definition time and to submit the
//! materializations produced by each run.
//!
//! # Example
//!
//! ```no_run
//! use sluice_client::GraphClient;
//!
//! #[tokio::main]
//! async fn main() -> sluice_client::Result<()> {
//!     let client = GraphClient::new("http://localhost:3000");
//!     let assets = client.list_assets().await?;
//!     println!("{} assets declared", assets.len());
//!     Ok(())
//! }
//! ```

mod assets;
pub mod error;
mod runs;

pub use error::{ClientError, Result};

use reqwest::Client;
use serde::de::DeserializeOwned;

/// HTTP client for the orchestration graph API
///
/// Endpoints are grouped by concern:
/// - Asset declarations (register, list)
/// - Run log (materialization batches)
#[derive(Debug, Clone)]
pub struct GraphClient {
    /// Base URL of the orchestration graph (e.g., "http://localhost:3000")
    base_url: String,
    /// HTTP client instance
    client: Client,
}

impl GraphClient {
    /// Create a new graph client
    ///
    /// # Arguments
    /// * `base_url` - The base URL of the graph API (e.g., "http://localhost:3000")
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, Client::new())
    }

    /// Create a new graph client with a custom HTTP client
    ///
    /// This allows you to configure timeouts, proxies, TLS settings, etc.
    ///
    /// # Example
    /// ```
    /// use sluice_client::GraphClient;
    /// use reqwest::Client;
    /// use std::time::Duration;
    ///
    /// let http_client = Client::builder()
    ///     .timeout(Duration::from_secs(30))
    ///     .build()
    ///     .unwrap();
    ///
    /// let client = GraphClient::with_client("http://localhost:3000", http_client);
    /// ```
    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    /// Get the base URL of the graph API
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Check the status code and deserialize the JSON body
    async fn handle_response<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            tracing::debug!("graph API returned {}: {}", status, error_text);
            return Err(ClientError::api_error(status.as_u16(), error_text));
        }

        response
            .json()
            .await
            .map_err(|e| ClientError::ParseError(format!("Failed to parse JSON response: {}", e)))
    }
}
