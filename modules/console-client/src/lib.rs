pub mod error;

pub use error::{ConsoleError, Result};

use std::env;
use std::sync::Arc;
use std::time::Duration;

use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::ACCEPT;
use reqwest::redirect::Policy;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};
use url::Url;

/// Header carrying the anti-forgery token on authenticated API calls.
const CSRF_HEADER: &str = "X-CSRF-Token";

/// Sentinel the console stores when no anti-forgery token was issued.
const CSRF_NOT_DEFINED: &str = "NOT_DEFINED";

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; WOW64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/44.0.2403.157 Safari/537.36";

/// Console and federation endpoints plus session knobs.
#[derive(Debug, Clone)]
pub struct ConsoleConfig {
    pub console_url: String,
    pub destination: String,
    pub federation_url: String,
    pub issuer: String,
    pub csrf_cookie: String,
    pub user_agent: String,
    /// Grace period between the federation request and the sign-in verdict,
    /// covering asynchronous cookie issuance. A constant wait, not a retry.
    pub settle_delay: Duration,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            console_url: "https://console.aws.amazon.com".to_string(),
            destination: "https://console.aws.amazon.com/iam/home?region=us-east-1".to_string(),
            federation_url: "https://signin.aws.amazon.com/federation".to_string(),
            issuer: "tripleA".to_string(),
            csrf_cookie: "aws-csrf-token".to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            settle_delay: Duration::from_secs(20),
        }
    }
}

impl ConsoleConfig {
    /// Load configuration from environment variables, defaulting every field.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            console_url: env_or("CONSOLE_URL", &defaults.console_url),
            destination: env_or("CONSOLE_DESTINATION", &defaults.destination),
            federation_url: env_or("FEDERATION_URL", &defaults.federation_url),
            issuer: env_or("FEDERATION_ISSUER", &defaults.issuer),
            csrf_cookie: env_or("CSRF_COOKIE", &defaults.csrf_cookie),
            user_agent: env_or("CONSOLE_USER_AGENT", &defaults.user_agent),
            settle_delay: env::var("SETTLE_DELAY_SECS")
                .ok()
                .map(|v| {
                    Duration::from_secs(v.parse().expect("SETTLE_DELAY_SECS must be a number"))
                })
                .unwrap_or(defaults.settle_delay),
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Temporary session credentials, serialized in the field names the
/// federation endpoint expects.
#[derive(Debug, Clone, Serialize)]
pub struct SessionCredentials {
    #[serde(rename = "sessionId")]
    pub access_key_id: String,
    #[serde(rename = "sessionKey")]
    pub secret_access_key: String,
    #[serde(rename = "sessionToken")]
    pub session_token: String,
}

impl SessionCredentials {
    /// Read credentials from the standard AWS environment variables.
    /// Panics with a clear message if any are missing.
    pub fn from_env() -> Self {
        Self {
            access_key_id: required_env("AWS_ACCESS_KEY_ID"),
            secret_access_key: required_env("AWS_SECRET_ACCESS_KEY"),
            session_token: required_env("AWS_SESSION_TOKEN"),
        }
    }
}

fn required_env(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| panic!("{key} environment variable is required"))
}

#[derive(Debug, Deserialize)]
struct SigninTokenResponse {
    #[serde(rename = "SigninToken")]
    signin_token: String,
}

/// Unauthenticated console client. `login` consumes it and yields a
/// [`ConsoleSession`] on success.
///
/// Two HTTP clients share one cookie jar: the login client has redirects
/// disabled so the federation response's own status stays observable, while
/// API fetches follow redirects as usual.
pub struct ConsoleClient {
    login_http: reqwest::Client,
    api_http: reqwest::Client,
    jar: Arc<Jar>,
    config: ConsoleConfig,
}

impl ConsoleClient {
    pub fn new(config: ConsoleConfig) -> Result<Self> {
        let jar = Arc::new(Jar::default());
        let login_http = reqwest::Client::builder()
            .cookie_provider(jar.clone())
            .redirect(Policy::none())
            .user_agent(&config.user_agent)
            .build()?;
        let api_http = reqwest::Client::builder()
            .cookie_provider(jar.clone())
            .user_agent(&config.user_agent)
            .build()?;

        Ok(Self {
            login_http,
            api_http,
            jar,
            config,
        })
    }

    /// Exchange session credentials for a one-time federation signin token.
    pub async fn signin_token(&self, credentials: &SessionCredentials) -> Result<String> {
        let session = serde_json::to_string(credentials)?;
        let url = Url::parse_with_params(
            &self.config.federation_url,
            [("Action", "getSigninToken"), ("Session", session.as_str())],
        )
        .map_err(|e| ConsoleError::Parse(e.to_string()))?;

        let resp = self.api_http.get(url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(ConsoleError::Signin(format!("status {status}: {message}")));
        }

        let token: SigninTokenResponse = resp.json().await?;
        Ok(token.signin_token)
    }

    /// Exchange a one-time signin token for an authenticated session.
    ///
    /// Success is decided by the status of the federation request itself;
    /// everything else observed on the wire is ignored for the verdict. The
    /// settle delay runs before the check. Authentication failure is final,
    /// never retried.
    pub async fn login(self, signin_token: &str) -> Result<ConsoleSession> {
        let url = federation_login_url(&self.config, signin_token)?;
        info!("signing in via federation endpoint");

        // Default fail, like an unanswered request.
        let status = match self.login_http.get(url).send().await {
            Ok(resp) => resp.status().as_u16(),
            Err(e) => {
                warn!(error = %e, "federation request failed");
                400
            }
        };

        tokio::time::sleep(self.config.settle_delay).await;

        if status >= 400 {
            return Err(ConsoleError::Auth { status });
        }
        info!("signed in to console");

        // Load the destination page so console-side cookies (the anti-forgery
        // token among them) land in the jar. Not part of the sign-in verdict.
        if let Err(e) = self.api_http.get(&self.config.destination).send().await {
            debug!(error = %e, "destination preload failed");
        }

        let console_url = Url::parse(&self.config.console_url)
            .map_err(|e| ConsoleError::Parse(e.to_string()))?;
        let csrf = self.csrf_from_cookies(&console_url);
        if csrf.is_none() {
            warn!(cookie = %self.config.csrf_cookie, "no anti-forgery token in session cookies");
        }

        Ok(ConsoleSession {
            http: self.api_http,
            console_url,
            csrf,
        })
    }

    fn csrf_from_cookies(&self, console_url: &Url) -> Option<String> {
        let header = self.jar.cookies(console_url)?;
        cookie_value(header.to_str().ok()?, &self.config.csrf_cookie)
    }
}

/// Authenticated console session. Holding one means "fetches from here are
/// authenticated": the credentials live in the shared cookie jar and ride
/// along implicitly.
pub struct ConsoleSession {
    http: reqwest::Client,
    console_url: Url,
    csrf: Option<String>,
}

impl ConsoleSession {
    pub fn csrf_token(&self) -> Option<&str> {
        self.csrf.as_deref()
    }

    /// GET a JSON resource, resolving `url` against the console base when it
    /// is relative. Attaches the anti-forgery token header when one exists;
    /// a missing token is logged and the request goes out without it.
    pub async fn fetch_json(&self, url: &str) -> Result<Value> {
        let target = self
            .console_url
            .join(url)
            .map_err(|e| ConsoleError::Parse(e.to_string()))?;
        debug!(url = %target, "fetching JSON resource");

        let mut request = self.http.get(target).header(ACCEPT, "application/json");
        match &self.csrf {
            Some(token) => request = request.header(CSRF_HEADER, token),
            None => warn!("no anti-forgery token, sending request without it"),
        }

        let resp = request.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(ConsoleError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(resp.json().await?)
    }
}

fn federation_login_url(config: &ConsoleConfig, signin_token: &str) -> Result<Url> {
    Url::parse_with_params(
        &config.federation_url,
        [
            ("Action", "login"),
            ("Issuer", config.issuer.as_str()),
            ("Destination", config.destination.as_str()),
            ("SigninToken", signin_token),
        ],
    )
    .map_err(|e| ConsoleError::Parse(e.to_string()))
}

/// Pull one cookie's value out of a `Cookie:` header string. Empty values
/// and the not-defined sentinel count as absent.
fn cookie_value(header: &str, name: &str) -> Option<String> {
    for part in header.split(';') {
        let part = part.trim();
        if let Some(value) = part.strip_prefix(name) {
            if let Some(value) = value.strip_prefix('=') {
                if value.is_empty() || value == CSRF_NOT_DEFINED {
                    return None;
                }
                return Some(value.to_string());
            }
        }
    }
    None
}
