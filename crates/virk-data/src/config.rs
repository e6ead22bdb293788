//! Runtime configuration for the registry client.
//!
//! Every component receives its configuration explicitly. Only
//! [`VirkConfig::from_env`] touches the process environment.

use crate::error::{DataError, Result};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Company search endpoint.
pub const COMPANY_SEARCH_URL: &str = "http://distribution.virk.dk/cvr-permanent/virksomhed/_search";

/// Financial statement search endpoint.
pub const STATEMENT_SEARCH_URL: &str = "http://distribution.virk.dk/offentliggoerelser/_search";

/// Scroll continuation and release endpoint.
pub const SCROLL_URL: &str = "http://distribution.virk.dk/_search/scroll";

/// User agent sent with every request.
const USER_AGENT: &str = "virk-etl/0.1 (https://github.com/factordynamics/virk)";

/// Basic-auth credentials for the distribution API.
#[derive(Clone, Default)]
pub struct Credentials {
    /// Account name
    pub username: String,
    /// Account password
    pub password: String,
}

impl Credentials {
    /// Create credentials from a username and password.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// HTTP client configuration
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Connect timeout for every request
    pub connect_timeout: Duration,
    /// Read timeout for search and scroll requests
    pub read_timeout: Duration,
    /// Timeout for the scroll release request
    pub cleanup_timeout: Duration,
    /// Timeout for a single document download
    pub document_timeout: Duration,
    /// User agent string
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(30),
            read_timeout: Duration::from_secs(300),
            cleanup_timeout: Duration::from_secs(10),
            document_timeout: Duration::from_secs(60),
            user_agent: USER_AGENT.to_string(),
        }
    }
}

/// Scroll session settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrollConfig {
    /// Hits per page
    pub page_size: usize,
    /// Server-side cursor keep-alive, e.g. `5m`
    pub keep_alive: String,
    /// Attempts per continuation page before the session is abandoned
    pub max_attempts: u32,
}

impl ScrollConfig {
    /// Scroll settings with the given keep-alive and the default page size.
    pub fn with_keep_alive(keep_alive: impl Into<String>) -> Self {
        Self {
            keep_alive: keep_alive.into(),
            ..Self::default()
        }
    }
}

impl Default for ScrollConfig {
    fn default() -> Self {
        Self {
            page_size: 3000,
            keep_alive: "5m".to_string(),
            max_attempts: 3,
        }
    }
}

/// Endpoints of the distribution API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    /// Company search
    pub companies: String,
    /// Financial statement search
    pub statements: String,
    /// Scroll continuation and release
    pub scroll: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            companies: COMPANY_SEARCH_URL.to_string(),
            statements: STATEMENT_SEARCH_URL.to_string(),
            scroll: SCROLL_URL.to_string(),
        }
    }
}

/// Complete client configuration.
#[derive(Debug, Clone, Default)]
pub struct VirkConfig {
    /// API credentials
    pub credentials: Credentials,
    /// API endpoints
    pub endpoints: Endpoints,
    /// HTTP timeouts and identity
    pub http: HttpConfig,
    /// Scroll settings for company searches
    pub company_scroll: ScrollConfig,
    /// Scroll settings for statement searches
    pub statement_scroll: ScrollConfig,
}

impl VirkConfig {
    /// Configuration with the given credentials and defaults elsewhere.
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            statement_scroll: ScrollConfig::with_keep_alive("1m"),
            ..Self::default()
        }
    }

    /// Load configuration from environment variables and defaults.
    ///
    /// `VIRK_USERNAME` and `VIRK_PASSWORD` are required. Endpoints, timeouts
    /// and scroll settings may be overridden with `VIRK_*` variables.
    pub fn from_env() -> Result<Self> {
        let username = required_env_var("VIRK_USERNAME")?;
        let password = required_env_var("VIRK_PASSWORD")?;
        let mut config = Self::new(Credentials::new(username, password));

        if let Ok(url) = std::env::var("VIRK_COMPANY_URL") {
            config.endpoints.companies = url;
        }
        if let Ok(url) = std::env::var("VIRK_STATEMENT_URL") {
            config.endpoints.statements = url;
        }
        if let Ok(url) = std::env::var("VIRK_SCROLL_URL") {
            config.endpoints.scroll = url;
        }

        if let Some(secs) = parse_env_var::<u64>("VIRK_CONNECT_TIMEOUT_SECONDS")? {
            config.http.connect_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_env_var::<u64>("VIRK_READ_TIMEOUT_SECONDS")? {
            config.http.read_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_env_var::<u64>("VIRK_DOCUMENT_TIMEOUT_SECONDS")? {
            config.http.document_timeout = Duration::from_secs(secs);
        }
        if let Some(size) = parse_env_var::<usize>("VIRK_PAGE_SIZE")? {
            config.company_scroll.page_size = size;
            config.statement_scroll.page_size = size;
        }
        if let Some(attempts) = parse_env_var::<u32>("VIRK_MAX_ATTEMPTS")? {
            config.company_scroll.max_attempts = attempts;
            config.statement_scroll.max_attempts = attempts;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        for scroll in [&self.company_scroll, &self.statement_scroll] {
            if scroll.page_size == 0 {
                return Err(DataError::Config("page size must be positive".to_string()));
            }
            if scroll.max_attempts == 0 {
                return Err(DataError::Config(
                    "max attempts must be at least 1".to_string(),
                ));
            }
        }
        Ok(())
    }
}

fn required_env_var(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| DataError::Config(format!("{key} must be set")))
}

/// Helper function to parse environment variable as a specific type
fn parse_env_var<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match std::env::var(key) {
        Ok(value) => value
            .parse()
            .map(Some)
            .map_err(|e| DataError::Config(format!("invalid {key}={value}: {e}"))),
        Err(_) => Ok(None),
    }
}
