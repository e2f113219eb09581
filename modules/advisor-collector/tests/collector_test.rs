//! Collection engine scenarios on mock transports: fatal paths, partial
//! failure, and collision merges with completion order pinned by mock
//! delays under paused tokio time.

use std::time::Duration;

use serde_json::{json, Value};

use advisor_collector::collector::{run_collection, Collector};
use advisor_collector::config::CollectorConfig;
use advisor_collector::testing::{MockAuthenticator, MockConsole};

const CATALOG_URL: &str = "/iam/api/services";

fn test_config() -> CollectorConfig {
    CollectorConfig {
        catalog_url: CATALOG_URL.to_string(),
        poll_period: Duration::from_millis(50),
        task_timeout: Some(Duration::from_secs(60)),
    }
}

fn catalog_entry(name: &str, actions_href: &str) -> Value {
    json!({
        "serviceName": name,
        "_links": {"actions": {"href": actions_href}}
    })
}

#[tokio::test(start_paused = true)]
async fn single_service_aggregates_its_actions() {
    let console = MockConsole::new()
        .on_json(
            CATALOG_URL,
            json!({"_embedded": {"/services/iam": catalog_entry("iam", "/d1")}}),
        )
        .on_json("/d1", json!({"_links": {"results": ["r1"]}}));

    let report = Collector::new(console, test_config()).run().await.unwrap();

    assert_eq!(report.actions.len(), 1);
    assert_eq!(report.actions["iam"], json!({"_links": {"results": ["r1"]}}));
    // The catalog rides along exactly as fetched.
    assert_eq!(
        report.services["_embedded"]["/services/iam"]["serviceName"],
        "iam"
    );
}

#[tokio::test(start_paused = true)]
async fn colliding_names_concatenate_links_in_completion_order() {
    // Two catalog entries resolve to the same logical name; /d1 completes
    // first, /d2 second.
    let console = MockConsole::new()
        .on_json(
            CATALOG_URL,
            json!({"_embedded": {
                "/services/s3": catalog_entry("s3", "/d1"),
                "/services/s3v2": catalog_entry("s3", "/d2"),
            }}),
        )
        .on_json(
            "/d1",
            json!({"_links": {"results": ["r1"]}, "_embedded": {"Get": {"v": 1}}}),
        )
        .with_delay("/d1", Duration::from_millis(10))
        .on_json(
            "/d2",
            json!({"_links": {"results": ["r2"]}, "_embedded": {"Get": {"v": 2}, "Put": {"v": 2}}}),
        )
        .with_delay("/d2", Duration::from_millis(500));

    let report = Collector::new(console, test_config()).run().await.unwrap();

    assert_eq!(report.actions.len(), 1);
    assert_eq!(
        report.actions["s3"]["_links"]["results"],
        json!(["r1", "r2"])
    );
    // Shallow merge of keyed sub-documents, second completion's keys win.
    assert_eq!(
        report.actions["s3"]["_embedded"],
        json!({"Get": {"v": 2}, "Put": {"v": 2}})
    );
}

#[tokio::test(start_paused = true)]
async fn catalog_failure_is_fatal() {
    let console = MockConsole::new().on_error(CATALOG_URL, "boom");

    let err = Collector::new(console, test_config())
        .run()
        .await
        .unwrap_err();
    assert!(err.to_string().contains("service catalog fetch failed"));
}

#[tokio::test(start_paused = true)]
async fn task_failure_is_absorbed() {
    let console = MockConsole::new()
        .on_json(
            CATALOG_URL,
            json!({"_embedded": {
                "/services/iam": catalog_entry("iam", "/d1"),
                "/services/s3": catalog_entry("s3", "/d2"),
            }}),
        )
        .on_json("/d1", json!({"_links": {"results": ["r1"]}}))
        .on_error("/d2", "internal error");

    let report = Collector::new(console, test_config()).run().await.unwrap();

    // The erroring task is excluded; the run still succeeds.
    assert_eq!(report.actions.len(), 1);
    assert!(report.actions.contains_key("iam"));
    assert!(!report.actions.contains_key("s3"));
}

#[tokio::test(start_paused = true)]
async fn rejected_signin_aborts_the_run() {
    let err = run_collection(MockAuthenticator::rejecting(), "bad-token", test_config())
        .await
        .unwrap_err();
    assert!(err.to_string().contains("console sign-in failed"));
}

#[tokio::test(start_paused = true)]
async fn accepted_signin_runs_collection() {
    let console = MockConsole::new()
        .on_json(
            CATALOG_URL,
            json!({"_embedded": {"/services/iam": catalog_entry("iam", "/d1")}}),
        )
        .on_json("/d1", json!({"_links": {"results": ["r1"]}}));

    let report = run_collection(
        MockAuthenticator::accepting(console),
        "good-token",
        test_config(),
    )
    .await
    .unwrap();
    assert!(report.actions.contains_key("iam"));
}

#[tokio::test(start_paused = true)]
async fn empty_catalog_emits_empty_actions() {
    let console = MockConsole::new().on_json(CATALOG_URL, json!({"_embedded": {}}));

    let report = Collector::new(console, test_config()).run().await.unwrap();
    assert!(report.actions.is_empty());
    assert_eq!(report.services, json!({"_embedded": {}}));
}

#[tokio::test(start_paused = true)]
async fn stalled_task_eventually_errors() {
    // /d2 would answer after an hour; the per-task timeout turns it into an
    // error instead of stalling the run forever.
    let console = MockConsole::new()
        .on_json(
            CATALOG_URL,
            json!({"_embedded": {
                "/services/iam": catalog_entry("iam", "/d1"),
                "/services/s3": catalog_entry("s3", "/d2"),
            }}),
        )
        .on_json("/d1", json!({"_links": {"results": ["r1"]}}))
        .on_json("/d2", json!({"_links": {"results": ["r2"]}}))
        .with_delay("/d2", Duration::from_secs(3600));

    let report = Collector::new(console, test_config()).run().await.unwrap();

    assert!(report.actions.contains_key("iam"));
    assert!(!report.actions.contains_key("s3"));
}

#[tokio::test(start_paused = true)]
async fn identical_inputs_yield_identical_aggregates() {
    let build = || {
        MockConsole::new()
            .on_json(
                CATALOG_URL,
                json!({"_embedded": {
                    "/services/iam": catalog_entry("iam", "/d1"),
                    "/services/s3": catalog_entry("s3", "/d2"),
                }}),
            )
            .on_json("/d1", json!({"_links": {"results": ["r1"]}}))
            .on_json("/d2", json!({"_links": {"results": ["r2"]}}))
    };

    let first = Collector::new(build(), test_config()).run().await.unwrap();
    let second = Collector::new(build(), test_config()).run().await.unwrap();

    assert_eq!(
        serde_json::to_value(&first).unwrap(),
        serde_json::to_value(&second).unwrap()
    );
}
