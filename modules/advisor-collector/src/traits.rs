// Trait abstractions for the collection engine's two external calls.
//
// ResourceFetcher — the authenticated JSON-fetch primitive used for the
// catalog and for every per-service detail fetch.
// ConsoleAuthenticator — the signin-token exchange producing a session.
//
// These enable deterministic testing with MockConsole and MockAuthenticator:
// no network, no console. `cargo test` in seconds.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

use console_client::{ConsoleClient, ConsoleSession};

#[async_trait]
pub trait ResourceFetcher: Send + Sync {
    /// GET a JSON resource; session credentials ride along implicitly.
    async fn fetch_json(&self, url: &str) -> Result<Value>;
}

#[async_trait]
impl ResourceFetcher for ConsoleSession {
    async fn fetch_json(&self, url: &str) -> Result<Value> {
        Ok(self.fetch_json(url).await?)
    }
}

/// Exchanges a one-time signin token for an authenticated session. Consumes
/// the client: authentication happens once per run and is never retried.
#[async_trait]
pub trait ConsoleAuthenticator: Send + Sync + Sized {
    type Session: ResourceFetcher + Send + Sync + 'static;

    async fn authenticate(self, signin_token: &str) -> Result<Self::Session>;
}

#[async_trait]
impl ConsoleAuthenticator for ConsoleClient {
    type Session = ConsoleSession;

    async fn authenticate(self, signin_token: &str) -> Result<ConsoleSession> {
        Ok(self.login(signin_token).await?)
    }
}
