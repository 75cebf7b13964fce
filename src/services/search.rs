//! OpenSearch adapter for document indexing and retrieval.

use async_trait::async_trait;
use opensearch::{
    GetParts, IndexParts, OpenSearch, SearchParts,
    auth::Credentials,
    cert::CertificateValidation,
    cluster::ClusterHealthParts,
    http::{
        Url,
        response::Response,
        transport::{SingleNodeConnectionPool, TransportBuilder},
    },
};
use serde_json::{Value, json};
use thiserror::Error;

use crate::{config::SearchConfig, error::ApiError};

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("invalid search host `{0}`")]
    InvalidHost(String),
    #[error("failed to build search transport: {0}")]
    Build(String),
    #[error("search transport error: {0}")]
    Transport(#[from] opensearch::Error),
    #[error("document not found")]
    NotFound,
    #[error("search engine returned {status}: {body}")]
    Status { status: u16, body: String },
}

impl From<SearchError> for ApiError {
    fn from(err: SearchError) -> Self {
        match err {
            SearchError::NotFound => ApiError::not_found("Document not found"),
            SearchError::Transport(_) => {
                ApiError::ServiceUnavailable("Search service unavailable".to_string())
            }
            SearchError::Status { status, .. } if (400..500).contains(&status) => ApiError::Http {
                status,
                message: "Search request rejected".to_string(),
            },
            other => ApiError::Upstream(other.to_string()),
        }
    }
}

/// Document store with full-text search.
///
/// Responses are the engine's JSON bodies, passed through untouched.
#[async_trait]
pub trait SearchIndex: Send + Sync {
    /// Create or replace `doc_id` in `index`.
    async fn index_document(
        &self,
        index: &str,
        doc_id: &str,
        document: &Value,
    ) -> Result<Value, SearchError>;

    async fn get_document(&self, index: &str, doc_id: &str) -> Result<Value, SearchError>;

    /// Query string search, or `match_all` when `query` is `None`.
    async fn search(
        &self,
        index: &str,
        query: Option<&str>,
        size: u32,
    ) -> Result<Value, SearchError>;

    async fn cluster_health(&self) -> Result<Value, SearchError>;
}

pub struct OpenSearchIndex {
    client: OpenSearch,
}

impl OpenSearchIndex {
    /// Build a client for a single node. No request is sent until first use.
    pub fn connect(host: &str, config: &SearchConfig) -> Result<Self, SearchError> {
        let address = if host.contains("://") {
            host.to_string()
        } else {
            format!("http://{host}")
        };
        let url = Url::parse(&address).map_err(|_| SearchError::InvalidHost(host.to_string()))?;

        let mut builder = TransportBuilder::new(SingleNodeConnectionPool::new(url));
        if let Some(username) = &config.username {
            builder = builder.auth(Credentials::Basic(
                username.clone(),
                config.password.clone().unwrap_or_default(),
            ));
        }
        if !config.verify_certs {
            builder = builder.cert_validation(CertificateValidation::None);
        }

        let transport = builder
            .build()
            .map_err(|e| SearchError::Build(e.to_string()))?;
        Ok(Self {
            client: OpenSearch::new(transport),
        })
    }
}

async fn json_body(response: Response) -> Result<Value, SearchError> {
    let status = response.status_code();
    if status.is_success() {
        return Ok(response.json::<Value>().await?);
    }
    let body = response.text().await.unwrap_or_default();
    Err(SearchError::Status {
        status: status.as_u16(),
        body,
    })
}

fn search_body(query: Option<&str>, size: u32) -> Value {
    match query {
        Some(q) => json!({"size": size, "query": {"query_string": {"query": q}}}),
        None => json!({"size": size, "query": {"match_all": {}}}),
    }
}

#[async_trait]
impl SearchIndex for OpenSearchIndex {
    async fn index_document(
        &self,
        index: &str,
        doc_id: &str,
        document: &Value,
    ) -> Result<Value, SearchError> {
        let response = self
            .client
            .index(IndexParts::IndexId(index, doc_id))
            .body(document)
            .send()
            .await?;
        json_body(response).await
    }

    async fn get_document(&self, index: &str, doc_id: &str) -> Result<Value, SearchError> {
        let response = self
            .client
            .get(GetParts::IndexId(index, doc_id))
            .send()
            .await?;
        if response.status_code().as_u16() == 404 {
            return Err(SearchError::NotFound);
        }
        json_body(response).await
    }

    async fn search(
        &self,
        index: &str,
        query: Option<&str>,
        size: u32,
    ) -> Result<Value, SearchError> {
        let response = self
            .client
            .search(SearchParts::Index(&[index]))
            .body(search_body(query, size))
            .send()
            .await?;
        if response.status_code().as_u16() == 404 {
            return Err(SearchError::NotFound);
        }
        json_body(response).await
    }

    async fn cluster_health(&self) -> Result<Value, SearchError> {
        let response = self
            .client
            .cluster()
            .health(ClusterHealthParts::None)
            .send()
            .await?;
        json_body(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_body_defaults_to_match_all() {
        assert_eq!(
            search_body(None, 10),
            json!({"size": 10, "query": {"match_all": {}}})
        );
        assert_eq!(
            search_body(Some("title:rust"), 5)["query"]["query_string"]["query"],
            "title:rust"
        );
    }

    #[test]
    fn test_host_without_scheme_is_accepted() {
        let index = OpenSearchIndex::connect("localhost:9200", &SearchConfig::default());
        assert!(index.is_ok());
    }

    #[test]
    fn test_status_errors_map_by_class() {
        let client_error: ApiError = SearchError::Status {
            status: 400,
            body: "{}".to_string(),
        }
        .into();
        assert_eq!(client_error.status().as_u16(), 400);

        let server_error: ApiError = SearchError::Status {
            status: 503,
            body: "{}".to_string(),
        }
        .into();
        assert_eq!(server_error.kind(), "upstream_error");

        let missing: ApiError = SearchError::NotFound.into();
        assert_eq!(missing.public_message(), "Document not found");
    }
}
