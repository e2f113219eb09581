// Test mocks for the collection engine.
//
// MockConsole (ResourceFetcher) — HashMap-based URL→response, with per-URL
// failures and artificial delays so tests can pin completion order.
// MockAuthenticator (ConsoleAuthenticator) — canned accept/reject.

use std::collections::HashMap;
use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde_json::Value;

use crate::traits::{ConsoleAuthenticator, ResourceFetcher};

/// HashMap-based resource fetcher. Returns `Err` for unregistered URLs.
/// Builder pattern: `.on_json()`, `.on_error()`, `.with_delay()`.
#[derive(Default)]
pub struct MockConsole {
    responses: HashMap<String, Value>,
    failures: HashMap<String, String>,
    delays: HashMap<String, Duration>,
}

impl MockConsole {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_json(mut self, url: &str, value: Value) -> Self {
        self.responses.insert(url.to_string(), value);
        self
    }

    pub fn on_error(mut self, url: &str, message: &str) -> Self {
        self.failures.insert(url.to_string(), message.to_string());
        self
    }

    /// Delay a URL's response. Under paused tokio time this pins completion
    /// order exactly.
    pub fn with_delay(mut self, url: &str, delay: Duration) -> Self {
        self.delays.insert(url.to_string(), delay);
        self
    }
}

#[async_trait]
impl ResourceFetcher for MockConsole {
    async fn fetch_json(&self, url: &str) -> Result<Value> {
        if let Some(delay) = self.delays.get(url) {
            tokio::time::sleep(*delay).await;
        }
        if let Some(message) = self.failures.get(url) {
            bail!("MockConsole: {message}");
        }
        self.responses
            .get(url)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("MockConsole: no response registered for {url}"))
    }
}

/// Canned authenticator: hands out its MockConsole, or rejects every token.
pub struct MockAuthenticator {
    console: MockConsole,
    reject: bool,
}

impl MockAuthenticator {
    pub fn accepting(console: MockConsole) -> Self {
        Self {
            console,
            reject: false,
        }
    }

    pub fn rejecting() -> Self {
        Self {
            console: MockConsole::new(),
            reject: true,
        }
    }
}

#[async_trait]
impl ConsoleAuthenticator for MockAuthenticator {
    type Session = MockConsole;

    async fn authenticate(self, _signin_token: &str) -> Result<MockConsole> {
        if self.reject {
            bail!("MockAuthenticator: sign-in rejected");
        }
        Ok(self.console)
    }
}
