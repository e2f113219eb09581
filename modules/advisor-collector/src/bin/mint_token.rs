//! Diagnostic tool: mint a federation signin token from the session
//! credentials in the environment and print it, ready to hand to the
//! collector as its first argument.
//!
//! Usage: cargo run --bin mint_token

use anyhow::Result;
use console_client::{ConsoleClient, ConsoleConfig, SessionCredentials};

#[tokio::main]
async fn main() -> Result<()> {
    let credentials = SessionCredentials::from_env();
    let client = ConsoleClient::new(ConsoleConfig::from_env())?;
    let token = client.signin_token(&credentials).await?;
    println!("{token}");
    Ok(())
}
