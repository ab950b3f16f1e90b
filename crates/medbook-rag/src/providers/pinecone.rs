//! Pinecone vector index provider
//!
//! `PineconeClient` covers the control plane (list, create, describe
//! indexes). `PineconeIndex` covers the data plane of one index (upsert,
//! query) and implements `VectorStoreProvider`.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::vector_store::VectorStoreProvider;
use crate::config::PineconeConfig;
use crate::error::{Error, Result};
use crate::types::{VectorMatch, VectorRecord};

/// Pinecone control-plane client
#[derive(Clone)]
pub struct PineconeClient {
    client: Client,
    controller_url: String,
}

/// Index description returned by the control plane
#[derive(Debug, Clone, Deserialize)]
pub struct IndexModel {
    pub name: String,
    #[serde(default)]
    pub dimension: Option<usize>,
    #[serde(default)]
    pub metric: Option<String>,
    /// Data-plane host, without scheme
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub status: IndexStatus,
}

/// Readiness of an index
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IndexStatus {
    #[serde(default)]
    pub ready: bool,
    #[serde(default)]
    pub state: Option<String>,
}

impl IndexModel {
    fn require_host(&self) -> Result<&str> {
        self.host
            .as_deref()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| Error::vector_db(format!("Index '{}' has no host yet", self.name)))
    }
}

#[derive(Deserialize)]
struct IndexList {
    #[serde(default)]
    indexes: Vec<IndexModel>,
}

#[derive(Serialize)]
struct CreateIndexRequest<'a> {
    name: &'a str,
    dimension: usize,
    metric: &'a str,
    spec: CreateIndexSpec<'a>,
}

#[derive(Serialize)]
struct CreateIndexSpec<'a> {
    serverless: ServerlessSpec<'a>,
}

#[derive(Serialize)]
struct ServerlessSpec<'a> {
    cloud: &'a str,
    region: &'a str,
}

impl PineconeClient {
    /// Build a client with the API key and version headers preset
    pub fn new(config: &PineconeConfig) -> Result<Self> {
        let api_key = config.require_api_key()?;

        let mut headers = HeaderMap::new();
        headers.insert(
            "Api-Key",
            HeaderValue::from_str(api_key.trim())
                .map_err(|_| Error::Config("PINECONE_API_KEY contains invalid characters".into()))?,
        );
        headers.insert(
            "X-Pinecone-API-Version",
            HeaderValue::from_str(&config.api_version)
                .map_err(|_| Error::Config(format!("Invalid API version '{}'", config.api_version)))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| Error::internal(format!("Failed to build Pinecone HTTP client: {}", e)))?;

        Ok(Self {
            client,
            controller_url: config.controller_url.trim_end_matches('/').to_string(),
        })
    }

    /// List all indexes in the project
    pub async fn list_indexes(&self) -> Result<Vec<IndexModel>> {
        let response = self
            .client
            .get(format!("{}/indexes", self.controller_url))
            .send()
            .await
            .map_err(|e| Error::vector_db(format!("Pinecone list indexes failed: {}", e)))?;

        let list: IndexList = checked(response, "list indexes")
            .await?
            .json()
            .await
            .map_err(|e| Error::vector_db(format!("Invalid list indexes response: {}", e)))?;

        Ok(list.indexes)
    }

    /// Describe one index
    pub async fn describe_index(&self, name: &str) -> Result<IndexModel> {
        let response = self
            .client
            .get(format!("{}/indexes/{}", self.controller_url, name))
            .send()
            .await
            .map_err(|e| Error::vector_db(format!("Pinecone describe index failed: {}", e)))?;

        checked(response, "describe index")
            .await?
            .json()
            .await
            .map_err(|e| Error::vector_db(format!("Invalid describe index response: {}", e)))
    }

    /// Create a serverless index. An index that already exists is not an error.
    pub async fn create_index(&self, config: &PineconeConfig, dimension: usize) -> Result<()> {
        let request = CreateIndexRequest {
            name: &config.index_name,
            dimension,
            metric: &config.metric,
            spec: CreateIndexSpec {
                serverless: ServerlessSpec {
                    cloud: &config.cloud,
                    region: &config.region,
                },
            },
        };

        let response = self
            .client
            .post(format!("{}/indexes", self.controller_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::vector_db(format!("Pinecone create index failed: {}", e)))?;

        if response.status() == StatusCode::CONFLICT {
            tracing::info!("Index '{}' was created concurrently", config.index_name);
            return Ok(());
        }

        checked(response, "create index").await?;
        Ok(())
    }

    /// Poll until the index reports ready or `timeout` elapses
    pub async fn wait_until_ready(
        &self,
        name: &str,
        poll_interval: Duration,
        timeout: Duration,
    ) -> Result<IndexModel> {
        let started = tokio::time::Instant::now();

        loop {
            let model = self.describe_index(name).await?;
            if model.status.ready {
                return Ok(model);
            }
            if started.elapsed() >= timeout {
                return Err(Error::vector_db(format!(
                    "Index '{}' not ready after {:?} (state: {})",
                    name,
                    timeout,
                    model.status.state.as_deref().unwrap_or("unknown")
                )));
            }
            tracing::debug!("Waiting for index '{}' to become ready", name);
            tokio::time::sleep(poll_interval).await;
        }
    }

    /// Make sure the configured index exists and is ready, creating it if
    /// missing.
    pub async fn ensure_index(&self, config: &PineconeConfig, dimension: usize) -> Result<IndexModel> {
        let existing = self.list_indexes().await?;

        match existing.into_iter().find(|i| i.name == config.index_name) {
            Some(index) => {
                if let Some(actual) = index.dimension {
                    if actual != dimension {
                        return Err(Error::Config(format!(
                            "Index '{}' has dimension {} but embeddings have {}",
                            index.name, actual, dimension
                        )));
                    }
                }
                tracing::info!("Using existing index '{}'", index.name);
                if index.status.ready && index.host.is_some() {
                    return Ok(index);
                }
            }
            None => {
                tracing::info!(
                    "Creating index '{}' ({} dims, {}, {}/{})",
                    config.index_name,
                    dimension,
                    config.metric,
                    config.cloud,
                    config.region
                );
                self.create_index(config, dimension).await?;
            }
        }

        self.wait_until_ready(
            &config.index_name,
            Duration::from_secs(config.ready_poll_secs),
            Duration::from_secs(config.ready_timeout_secs),
        )
        .await
    }

    /// Data-plane handle for an index host
    pub fn index(&self, host: &str, namespace: Option<String>) -> PineconeIndex {
        PineconeIndex {
            client: self.client.clone(),
            base_url: host_url(host),
            namespace,
        }
    }

    /// Data-plane handle for the configured index, resolving its host via
    /// the control plane unless one is configured.
    pub async fn connect(&self, config: &PineconeConfig) -> Result<PineconeIndex> {
        let host = match config.host.as_deref().filter(|h| !h.is_empty()) {
            Some(host) => host.to_string(),
            None => {
                let model = self.describe_index(&config.index_name).await?;
                model.require_host()?.to_string()
            }
        };
        tracing::info!("Connected to Pinecone index '{}' at {}", config.index_name, host);
        Ok(self.index(&host, config.namespace.clone()))
    }

    /// Data-plane handle from a described index
    pub fn index_for(&self, model: &IndexModel, namespace: Option<String>) -> Result<PineconeIndex> {
        Ok(self.index(model.require_host()?, namespace))
    }
}

/// Pinecone data-plane client for a single index
#[derive(Clone)]
pub struct PineconeIndex {
    client: Client,
    base_url: String,
    namespace: Option<String>,
}

#[derive(Serialize)]
struct UpsertRequest<'a> {
    vectors: &'a [VectorRecord],
    #[serde(skip_serializing_if = "Option::is_none")]
    namespace: Option<&'a str>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpsertResponse {
    #[serde(default)]
    upserted_count: usize,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    vector: &'a [f32],
    top_k: usize,
    include_metadata: bool,
    include_values: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    namespace: Option<&'a str>,
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<VectorMatch>,
}

#[async_trait]
impl VectorStoreProvider for PineconeIndex {
    async fn upsert(&self, records: &[VectorRecord]) -> Result<usize> {
        if records.is_empty() {
            return Ok(0);
        }

        let request = UpsertRequest {
            vectors: records,
            namespace: self.namespace.as_deref(),
        };

        let response = self
            .client
            .post(format!("{}/vectors/upsert", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::vector_db(format!("Pinecone upsert failed: {}", e)))?;

        let body: UpsertResponse = checked(response, "upsert")
            .await?
            .json()
            .await
            .map_err(|e| Error::vector_db(format!("Invalid upsert response: {}", e)))?;

        Ok(body.upserted_count)
    }

    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<VectorMatch>> {
        let request = QueryRequest {
            vector,
            top_k,
            include_metadata: true,
            include_values: false,
            namespace: self.namespace.as_deref(),
        };

        let response = self
            .client
            .post(format!("{}/query", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::vector_db(format!("Pinecone query failed: {}", e)))?;

        let body: QueryResponse = checked(response, "query")
            .await?
            .json()
            .await
            .map_err(|e| Error::vector_db(format!("Invalid query response: {}", e)))?;

        Ok(body.matches)
    }

    fn name(&self) -> &str {
        "pinecone"
    }
}

/// Pass successful responses through; turn the rest into errors carrying
/// the response body.
async fn checked(response: Response, action: &str) -> Result<Response> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    Err(Error::vector_db(format!(
        "Pinecone {} failed ({}): {}",
        action, status, body
    )))
}

/// Index hosts come back without a scheme
fn host_url(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("https://{}", host)
    }
}
