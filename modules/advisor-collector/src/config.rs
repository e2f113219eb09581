use std::env;
use std::time::Duration;

/// Collection engine knobs, loaded from environment variables with defaults.
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    /// Service catalog endpoint, resolved against the console base URL.
    pub catalog_url: String,
    /// How long the completion wait sleeps between ledger scans when no
    /// completion signal arrives first.
    pub poll_period: Duration,
    /// Upper bound on one detail fetch; a task past it is recorded as an
    /// error. `None` means wait forever.
    pub task_timeout: Option<Duration>,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            catalog_url: "/iam/api/services".to_string(),
            poll_period: Duration::from_secs(5),
            task_timeout: Some(Duration::from_secs(60)),
        }
    }
}

impl CollectorConfig {
    /// Load configuration from environment variables. `TASK_TIMEOUT_SECS=0`
    /// disables the per-task timeout.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            catalog_url: env::var("CATALOG_URL").unwrap_or(defaults.catalog_url),
            poll_period: env::var("POLL_PERIOD_SECS")
                .ok()
                .map(|v| Duration::from_secs(parse_secs("POLL_PERIOD_SECS", &v)))
                .unwrap_or(defaults.poll_period),
            task_timeout: match env::var("TASK_TIMEOUT_SECS") {
                Ok(v) => {
                    let secs = parse_secs("TASK_TIMEOUT_SECS", &v);
                    (secs > 0).then(|| Duration::from_secs(secs))
                }
                Err(_) => defaults.task_timeout,
            },
        }
    }
}

fn parse_secs(key: &str, value: &str) -> u64 {
    value
        .parse()
        .unwrap_or_else(|_| panic!("{key} must be a number of seconds"))
}
