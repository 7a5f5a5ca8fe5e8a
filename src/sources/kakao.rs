//! Kakao (Daum) book search source implementation.

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;

use crate::config::ApiKey;
use crate::models::{Page, SearchRequest, SearchResponseBody};
use crate::sources::{PageSource, SourceError};
use crate::utils::HttpClient;

/// Book search endpoint
pub const KAKAO_BOOK_SEARCH_URL: &str = "https://dapi.kakao.com/v3/search/book";

/// Scheme used in the `Authorization` header
pub const AUTH_SCHEME: &str = "KakaoAK";

/// Longest error body excerpt carried in a [`SourceError`]
const ERROR_BODY_LIMIT: usize = 300;

/// Kakao book search source
///
/// Holds the credential it was constructed with; it never looks at the
/// environment itself.
#[derive(Debug, Clone)]
pub struct KakaoBookSource {
    client: HttpClient,
    endpoint: String,
    auth_scheme: String,
    api_key: ApiKey,
}

impl KakaoBookSource {
    /// Create a source against the public endpoint
    pub fn new(client: HttpClient, api_key: ApiKey) -> Self {
        Self {
            client,
            endpoint: KAKAO_BOOK_SEARCH_URL.to_string(),
            auth_scheme: AUTH_SCHEME.to_string(),
            api_key,
        }
    }

    /// Point the source at a different endpoint (proxies, test servers)
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Override the `Authorization` scheme
    pub fn with_auth_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.auth_scheme = scheme.into();
        self
    }

    /// Build the request URL for one page
    fn build_url(&self, request: &SearchRequest, page_index: u32) -> String {
        let mut url = format!(
            "{}?query={}",
            self.endpoint,
            urlencoding::encode(&request.query)
        );
        if let Some(target) = request.target {
            url.push_str(&format!("&target={}", target.as_str()));
        }
        url.push_str(&format!(
            "&sort={}&page={}&size={}",
            request.sort.as_str(),
            page_index,
            request.size
        ));
        url
    }

    fn authorization(&self) -> String {
        format!("{} {}", self.auth_scheme, self.api_key.expose())
    }

    /// Decode a successful response body into a page
    fn parse_page(body: &str, page_index: u32) -> Result<Page, SourceError> {
        let data: SearchResponseBody = serde_json::from_str(body)?;
        Ok(Page::from_body(data, page_index))
    }
}

fn excerpt(body: &str) -> String {
    let trimmed = body.trim();
    match trimmed.char_indices().nth(ERROR_BODY_LIMIT) {
        Some((idx, _)) => format!("{}...", &trimmed[..idx]),
        None => trimmed.to_string(),
    }
}

#[async_trait]
impl PageSource for KakaoBookSource {
    fn id(&self) -> &str {
        "kakao"
    }

    async fn fetch_page(
        &self,
        request: &SearchRequest,
        page_index: u32,
    ) -> Result<Page, SourceError> {
        let url = self.build_url(request, page_index);
        tracing::debug!(page = page_index, %url, "requesting page");

        let response = self
            .client
            .client()
            .get(&url)
            .header(AUTHORIZATION, self.authorization())
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(SourceError::from_status(status.as_u16(), excerpt(&body)));
        }

        Self::parse_page(&body, page_index)
    }
}
