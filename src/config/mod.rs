//! Configuration management.
//!
//! Configuration is assembled once at startup, lowest precedence first:
//!
//! 1. built-in defaults
//! 2. a TOML file (`--config`, `./book-harvester.toml`, or
//!    `<config dir>/book-harvester/config.toml`)
//! 3. `BOOK_HARVESTER_*` environment variables, `__` separating sections
//!    (e.g. `BOOK_HARVESTER_HTTP__TIMEOUT_SECS=30`)
//! 4. command-line flags, applied by the binary
//!
//! ```toml
//! [api]
//! endpoint = "https://dapi.kakao.com/v3/search/book"
//! auth_scheme = "KakaoAK"
//!
//! [search]
//! target = "title"
//! sort = "accuracy"
//! size = 50
//! max_pages = 20
//!
//! [http]
//! timeout_secs = 10
//! connect_timeout_secs = 5
//! page_delay_ms = 200
//!
//! [retry]
//! max_retries = 3
//! initial_delay_ms = 500
//! backoff_multiplier = 2.0
//!
//! [output]
//! out_dir = "./out"
//! keep_partial = false
//!
//! [logging]
//! level = "info"
//! format = "pretty"
//! ```
//!
//! The REST API key comes from `api.key` or, more usually, from the
//! `KAKAO_REST_API_KEY` environment variable.

use serde::{Deserialize, Serialize, Serializer};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::models::{SearchRequest, Sort, Target, MAX_PAGE_SIZE};
use crate::sources::{AUTH_SCHEME, KAKAO_BOOK_SEARCH_URL};
use crate::utils::RetryConfig;

/// Environment variable holding the REST API key
pub const CREDENTIAL_ENV: &str = "KAKAO_REST_API_KEY";

/// Prefix for configuration environment variables
pub const ENV_PREFIX: &str = "BOOK_HARVESTER";

/// Config file name looked up in the working directory
pub const LOCAL_CONFIG_FILE: &str = "book-harvester.toml";

/// REST API credential
///
/// Never printed: `Debug` and `Serialize` both redact the value.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// The raw key, for building the `Authorization` header
    pub fn expose(&self) -> &str {
        &self.0
    }

    fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

impl Serialize for ApiKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str("***")
    }
}

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Endpoint and credential
    pub api: ApiConfig,

    /// Default search parameters
    pub search: SearchConfig,

    /// HTTP client and pacing
    pub http: HttpConfig,

    /// Retry/backoff policy
    pub retry: RetrySettings,

    /// Output location and partial-result policy
    pub output: OutputConfig,

    /// Logging settings
    pub logging: LoggingConfig,
}

/// API endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub endpoint: String,
    pub auth_scheme: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<ApiKey>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            endpoint: KAKAO_BOOK_SEARCH_URL.to_string(),
            auth_scheme: AUTH_SCHEME.to_string(),
            key: None,
        }
    }
}

/// Search defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub target: Target,
    pub sort: Sort,
    pub size: u8,
    pub max_pages: u32,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            target: Target::Title,
            sort: Sort::Accuracy,
            size: MAX_PAGE_SIZE,
            max_pages: 20,
        }
    }
}

/// HTTP configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Whole-request timeout
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
    /// Pause between successful page fetches
    pub page_delay_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            connect_timeout_secs: 5,
            page_delay_ms: 200,
            user_agent: None,
        }
    }
}

impl HttpConfig {
    pub fn page_delay(&self) -> Duration {
        Duration::from_millis(self.page_delay_ms)
    }
}

/// Retry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_retries: u32,
    pub initial_delay_ms: u64,
    pub backoff_multiplier: f64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay_ms: 500,
            backoff_multiplier: 2.0,
        }
    }
}

impl RetrySettings {
    pub fn to_retry_config(&self) -> RetryConfig {
        RetryConfig {
            max_retries: self.max_retries,
            initial_delay: Duration::from_millis(self.initial_delay_ms),
            backoff_multiplier: self.backoff_multiplier,
            ..RetryConfig::default()
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub out_dir: PathBuf,
    /// Write what was collected when a page fails for good
    pub keep_partial: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            out_dir: PathBuf::from("./out"),
            keep_partial: false,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

/// Console log format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Configuration errors; all of them are raised before any request is made
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("environment variable {0} is not set (export {0}='YOUR_REST_API_KEY')")]
    MissingCredential(&'static str),

    #[error("invalid {field}: {message}")]
    Invalid {
        field: &'static str,
        message: String,
    },

    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("failed to render configuration: {0}")]
    Render(#[from] toml::ser::Error),
}

impl ConfigError {
    fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        ConfigError::Invalid {
            field,
            message: message.into(),
        }
    }
}

impl Config {
    /// Resolve the API key from `api.key`, else from [`CREDENTIAL_ENV`]
    pub fn api_key(&self) -> Result<ApiKey, ConfigError> {
        self.api_key_with(|name| std::env::var(name).ok())
    }

    /// Like [`Config::api_key`] with an explicit environment lookup
    pub fn api_key_with<F>(&self, lookup: F) -> Result<ApiKey, ConfigError>
    where
        F: FnOnce(&str) -> Option<String>,
    {
        if let Some(key) = self.api.key.as_ref().filter(|k| !k.is_blank()) {
            return Ok(key.clone());
        }
        lookup(CREDENTIAL_ENV)
            .map(|k| ApiKey::new(k.trim()))
            .filter(|k| !k.is_blank())
            .ok_or(ConfigError::MissingCredential(CREDENTIAL_ENV))
    }

    /// Check values that the type system does not
    pub fn validate(&self) -> Result<(), ConfigError> {
        let endpoint = url::Url::parse(&self.api.endpoint)
            .map_err(|e| ConfigError::invalid("api.endpoint", e.to_string()))?;
        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(ConfigError::invalid(
                "api.endpoint",
                format!("unsupported scheme '{}'", endpoint.scheme()),
            ));
        }
        if self.http.timeout_secs == 0 {
            return Err(ConfigError::invalid(
                "http.timeout_secs",
                "must be at least 1",
            ));
        }
        if self.http.connect_timeout_secs == 0 {
            return Err(ConfigError::invalid(
                "http.connect_timeout_secs",
                "must be at least 1",
            ));
        }
        let multiplier = self.retry.backoff_multiplier;
        if multiplier.is_nan() || multiplier < 1.0 {
            return Err(ConfigError::invalid(
                "retry.backoff_multiplier",
                "must be 1.0 or greater",
            ));
        }
        Ok(())
    }

    /// Build a search request for `query` from the `[search]` defaults
    pub fn search_request(&self, query: impl Into<String>) -> SearchRequest {
        SearchRequest::new(query)
            .target(Some(self.search.target))
            .sort(self.search.sort)
            .size(self.search.size)
            .max_pages(self.search.max_pages)
    }

    /// Effective configuration as TOML, credential redacted
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

/// Reject requests the API would refuse
pub fn validate_request(request: &SearchRequest) -> Result<(), ConfigError> {
    if request.query.trim().is_empty() {
        return Err(ConfigError::invalid("query", "must not be empty"));
    }
    if !(1..=MAX_PAGE_SIZE).contains(&request.size) {
        return Err(ConfigError::invalid(
            "size",
            format!("must be between 1 and {}, got {}", MAX_PAGE_SIZE, request.size),
        ));
    }
    if request.max_pages == 0 {
        return Err(ConfigError::invalid("max-pages", "must be at least 1"));
    }
    Ok(())
}

/// Load configuration from an optional file plus the environment
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let mut builder = config::Config::builder();
    if let Some(path) = path {
        builder = builder.add_source(config::File::from(path).required(true));
    }
    let settings = builder
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    Ok(settings.try_deserialize()?)
}

/// Find a config file in the default locations
pub fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from(LOCAL_CONFIG_FILE);
    if local.is_file() {
        return Some(local);
    }
    dirs::config_dir()
        .map(|dir| dir.join("book-harvester").join("config.toml"))
        .filter(|path| path.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.api.endpoint, KAKAO_BOOK_SEARCH_URL);
        assert_eq!(config.search.size, 50);
        assert_eq!(config.search.max_pages, 20);
        assert_eq!(config.http.timeout_secs, 10);
        assert_eq!(config.http.page_delay(), Duration::from_millis(200));
        assert_eq!(config.output.out_dir, PathBuf::from("./out"));
        assert!(!config.output.keep_partial);
        assert_eq!(config.retry.to_retry_config(), RetryConfig::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[search]
target = "publisher"
sort = "latest"
size = 10

[http]
timeout_secs = 3

[output]
out_dir = "/tmp/books"
keep_partial = true
"#,
        )
        .unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.search.target, Target::Publisher);
        assert_eq!(config.search.sort, Sort::Latest);
        assert_eq!(config.search.size, 10);
        assert_eq!(config.search.max_pages, 20);
        assert_eq!(config.http.timeout_secs, 3);
        assert_eq!(config.http.page_delay_ms, 200);
        assert!(config.output.keep_partial);
    }

    #[test]
    fn test_load_config_missing_file() {
        let result = load_config(Some(Path::new("/nonexistent/book-harvester.toml")));
        assert!(matches!(result, Err(ConfigError::Load(_))));
    }

    #[test]
    fn test_api_key_from_lookup() {
        let config = Config::default();
        let key = config
            .api_key_with(|name| {
                assert_eq!(name, CREDENTIAL_ENV);
                Some(" abc ".to_string())
            })
            .unwrap();
        assert_eq!(key.expose(), "abc");
    }

    #[test]
    fn test_api_key_missing() {
        let config = Config::default();
        assert!(matches!(
            config.api_key_with(|_| None),
            Err(ConfigError::MissingCredential(CREDENTIAL_ENV))
        ));
        assert!(matches!(
            config.api_key_with(|_| Some("   ".to_string())),
            Err(ConfigError::MissingCredential(_))
        ));
    }

    #[test]
    fn test_api_key_from_config_wins() {
        let mut config = Config::default();
        config.api.key = Some(ApiKey::new("from-file"));
        let key = config.api_key_with(|_| Some("from-env".to_string())).unwrap();
        assert_eq!(key.expose(), "from-file");
    }

    #[test]
    fn test_api_key_is_redacted() {
        let key = ApiKey::new("super-secret");
        assert_eq!(format!("{:?}", key), "ApiKey(***)");

        let mut config = Config::default();
        config.api.key = Some(key);
        let rendered = config.to_toml().unwrap();
        assert!(!rendered.contains("super-secret"));
        assert!(!format!("{:?}", config).contains("super-secret"));
    }

    #[test]
    fn test_validate_request() {
        assert!(validate_request(&SearchRequest::new("파이썬")).is_ok());
        assert!(validate_request(&SearchRequest::new("  ")).is_err());
        assert!(validate_request(&SearchRequest::new("q").size(0)).is_err());
        assert!(validate_request(&SearchRequest::new("q").size(51)).is_err());
        assert!(validate_request(&SearchRequest::new("q").size(1)).is_ok());
        assert!(validate_request(&SearchRequest::new("q").max_pages(0)).is_err());
    }

    #[test]
    fn test_validate_endpoint() {
        let mut config = Config::default();
        config.api.endpoint = "ftp://example.com".to_string();
        assert!(config.validate().is_err());

        config.api.endpoint = "not a url".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_http_and_retry() {
        let mut config = Config::default();
        config.http.timeout_secs = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { field: "http.timeout_secs", .. })
        ));

        let mut config = Config::default();
        config.retry.backoff_multiplier = 0.5;
        assert!(config.validate().is_err());
        config.retry.backoff_multiplier = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_search_request_from_config() {
        let mut config = Config::default();
        config.search.sort = Sort::Latest;
        let request = config.search_request("q");
        assert_eq!(request.sort, Sort::Latest);
        assert_eq!(request.target, Some(Target::Title));
    }
}
