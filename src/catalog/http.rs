//! reqwest-backed catalog client.

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use serde::de::DeserializeOwned;

use super::{
    ArticleDetail, CatalogClient, FetchResult, ImagePayload, SearchBody, SearchPage,
};
use crate::config::CatalogConfig;
use crate::error::{Error, RemoteFetchError, Result};
use crate::types::{ImageId, ProductId};

/// HTTP client for the catalog API
#[derive(Clone, Debug)]
pub struct HttpCatalogClient {
    http: reqwest::Client,
    /// Base URL without trailing slash
    base_url: String,
    body: SearchBody,
}

impl HttpCatalogClient {
    /// Build a client from configuration
    ///
    /// # Errors
    /// Returns error if the base URL does not parse or the HTTP client cannot be created
    pub fn new(config: &CatalogConfig) -> Result<Self> {
        url::Url::parse(&config.base_url).map_err(|e| Error::Config {
            message: format!("invalid base URL {:?}: {}", config.base_url, e),
            key: Some("catalog.base_url".to_string()),
        })?;

        let mut builder = reqwest::Client::builder().user_agent(config.user_agent.clone());
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|e| Error::Other(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            body: SearchBody::default(),
        })
    }

    /// URL of the search endpoint (query string added per request)
    pub fn search_url(&self) -> String {
        format!("{}/articles/search", self.base_url)
    }

    /// URL of a product's detail endpoint
    pub fn detail_url(&self, product_id: &ProductId) -> String {
        format!(
            "{}/articles/{}",
            self.base_url,
            urlencoding::encode(product_id.as_str())
        )
    }

    /// URL of one image, a pure function of the (product, image) pair
    pub fn image_url(&self, product_id: &ProductId, image_id: &ImageId) -> String {
        format!(
            "{}/articles/{}/media/{}",
            self.base_url,
            urlencoding::encode(product_id.as_str()),
            urlencoding::encode(image_id.as_str())
        )
    }

    async fn search<T: DeserializeOwned>(&self, offset: u64, limit: u64) -> FetchResult<T> {
        let url = self.search_url();
        let request = self
            .http
            .post(&url)
            .query(&[
                ("limit", limit.to_string()),
                ("offset", offset.to_string()),
                ("orderBy", "relevance".to_string()),
                ("orderDir", "desc".to_string()),
            ])
            .json(&self.body);

        self.json(request, url).await
    }

    /// Send a request and decode a JSON response
    async fn json<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        url: String,
    ) -> FetchResult<T> {
        let response = send(request, &url).await?;
        let response = ensure_success(response, &url).await?;

        let content_type = header_content_type(&response);
        let is_json = content_type
            .as_deref()
            .map(|ct| ct.to_ascii_lowercase().contains("application/json"))
            .unwrap_or(false);
        if !is_json {
            return Err(RemoteFetchError::NotJson { url, content_type });
        }

        let body = response
            .bytes()
            .await
            .map_err(|source| RemoteFetchError::Transport {
                url: url.clone(),
                source,
            })?;

        serde_json::from_slice(&body).map_err(|source| RemoteFetchError::MalformedBody { url, source })
    }
}

#[async_trait]
impl CatalogClient for HttpCatalogClient {
    async fn total_count(&self) -> FetchResult<u64> {
        let page: SearchPage = self.search(0, 1).await?;
        Ok(page.total)
    }

    async fn search_page(&self, offset: u64, limit: u64) -> FetchResult<SearchPage> {
        self.search(offset, limit).await
    }

    async fn article_detail(&self, product_id: &ProductId) -> FetchResult<ArticleDetail> {
        let url = self.detail_url(product_id);
        let request = self.http.get(&url);
        self.json(request, url).await
    }

    async fn fetch_image(
        &self,
        product_id: &ProductId,
        image_id: &ImageId,
    ) -> FetchResult<ImagePayload> {
        let url = self.image_url(product_id, image_id);
        let response = send(self.http.get(&url), &url).await?;
        let response = ensure_success(response, &url).await?;

        let content_type = header_content_type(&response);
        let bytes = response
            .bytes()
            .await
            .map_err(|source| RemoteFetchError::Transport { url, source })?;

        Ok(ImagePayload {
            content_type,
            bytes: bytes.to_vec(),
        })
    }
}

async fn send(request: reqwest::RequestBuilder, url: &str) -> FetchResult<reqwest::Response> {
    request
        .send()
        .await
        .map_err(|source| RemoteFetchError::Transport {
            url: url.to_string(),
            source,
        })
}

/// Turn a non-2xx response into [`RemoteFetchError::Status`], keeping its body text
async fn ensure_success(response: reqwest::Response, url: &str) -> FetchResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(RemoteFetchError::Status {
        url: url.to_string(),
        status: status.as_u16(),
        body,
    })
}

fn header_content_type(response: &reqwest::Response) -> Option<String> {
    response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}
