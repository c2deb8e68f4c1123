use cfb_pipeline::api::{CfbdClient, RetryPolicy, create_http_client_with_timeout};
use cfb_pipeline::endpoints::{EndpointConfig, Source};
use cfb_pipeline::error::AppError;
use cfb_pipeline::extract::Extractor;
use cfb_pipeline::rate_tracker::{RateTracker, UsageState};
use serde_json::json;
use std::time::Duration;
use tempfile::{TempDir, tempdir};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> CfbdClient {
    let http = create_http_client_with_timeout(5, "test-key").unwrap();
    CfbdClient::new(http, server.uri()).with_retry_policy(RetryPolicy {
        max_retries: 3,
        base_delay: Duration::from_millis(5),
    })
}

fn tracker_in(dir: &TempDir, used: u64, budget: u64) -> RateTracker {
    let state = UsageState {
        calls_used: used,
        ..UsageState::fresh("2026-10", budget)
    };
    RateTracker::from_state(dir.path().join("state.json"), state)
}

fn endpoint(source: Source, table: &str) -> &'static EndpointConfig {
    source
        .endpoints()
        .iter()
        .find(|e| e.table == table)
        .unwrap()
}

/// Week decomposition: every regular week answers, the whole postseason is empty
#[tokio::test]
async fn test_week_partition_with_empty_postseason() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/plays"))
        .and(query_param("seasonType", "regular"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "a", "homeTeam": "Utah", "playType": "Rush"},
            {"id": "b", "homeTeam": "Utah", "playType": "Pass Reception"}
        ])))
        .expect(15)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/plays"))
        .and(query_param("seasonType", "postseason"))
        .respond_with(ResponseTemplate::new(400))
        .expect(5)
        .mount(&mock_server)
        .await;

    let dir = tempdir().unwrap();
    let mut tracker = tracker_in(&dir, 0, 1000);
    let client = client_for(&mock_server);

    let records = {
        let mut extractor = Extractor::new(&client, &mut tracker);
        let records = extractor
            .extract_endpoint(endpoint(Source::Plays, "plays"), &[2024], &[], 2026)
            .await
            .unwrap();
        assert_eq!(extractor.calls_made(), 20);
        records
    };

    assert_eq!(records.len(), 30);
    assert_eq!(tracker.calls_used(), 20);
    assert_eq!(records[0]["home_team"], "Utah");
    assert_eq!(records[0]["play_type"], "Rush");
    assert_eq!(records[0]["season"], 2024);
}

/// Game decomposition: ids are listed first and a game without data is skipped
#[tokio::test]
async fn test_game_partition_skips_games_without_data() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/games"))
        .and(query_param("seasonType", "regular"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 1}, {"id": 2}, {"id": 3}
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/games"))
        .and(query_param("seasonType", "postseason"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&mock_server)
        .await;

    for game_id in ["1", "3"] {
        Mock::given(method("GET"))
            .and(path("/plays/stats"))
            .and(query_param("gameId", game_id))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
                "gameId": game_id.parse::<i64>().unwrap(),
                "playId": "p1",
                "athleteId": "42",
                "statType": "Rush"
            }])))
            .expect(1)
            .mount(&mock_server)
            .await;
    }
    Mock::given(method("GET"))
        .and(path("/plays/stats"))
        .and(query_param("gameId", "2"))
        .respond_with(ResponseTemplate::new(400))
        .expect(1)
        .mount(&mock_server)
        .await;

    let dir = tempdir().unwrap();
    let mut tracker = tracker_in(&dir, 0, 1000);
    let client = client_for(&mock_server);

    let records = Extractor::new(&client, &mut tracker)
        .extract_endpoint(
            endpoint(Source::PlayStats, "play_stats"),
            &[2024],
            &[],
            2026,
        )
        .await
        .unwrap();

    let game_ids: Vec<i64> = records
        .iter()
        .map(|r| r["game_id"].as_i64().unwrap())
        .collect();
    assert_eq!(game_ids, vec![1, 3]);
    assert_eq!(tracker.calls_used(), 5);
}

/// No budget left: the extractor fails before any request leaves the process
#[tokio::test]
async fn test_exhausted_budget_makes_no_requests() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&mock_server)
        .await;

    let dir = tempdir().unwrap();
    let mut tracker = tracker_in(&dir, 1000, 1000);
    let client = client_for(&mock_server);

    let err = Extractor::new(&client, &mut tracker)
        .extract_endpoint(endpoint(Source::Games, "games"), &[2024], &[], 2026)
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::BudgetExhausted { .. }));
    assert_eq!(tracker.calls_used(), 1000);
    assert!(!dir.path().join("state.json").exists());
}

/// A rate-limited attempt is retried and only the successful answer is counted
#[tokio::test]
async fn test_rate_limit_retry_counts_once() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/games"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "0"))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/games"))
        .and(query_param("year", "2024"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": 9, "season": 2024}])))
        .mount(&mock_server)
        .await;

    let dir = tempdir().unwrap();
    let mut tracker = tracker_in(&dir, 0, 1000);
    let client = client_for(&mock_server);

    let records = Extractor::new(&client, &mut tracker)
        .extract_endpoint(endpoint(Source::Games, "games"), &[2024], &[], 2026)
        .await
        .unwrap();

    assert_eq!(records.len(), 1);
    assert_eq!(tracker.calls_used(), 1);

    let persisted: serde_json::Value = serde_json::from_str(
        &std::fs::read_to_string(dir.path().join("state.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(persisted["calls_used"], 1);
}

/// Server errors that never recover surface as errors and consume no budget
#[tokio::test]
async fn test_persistent_server_error_is_propagated() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/games"))
        .respond_with(ResponseTemplate::new(503))
        .expect(4)
        .mount(&mock_server)
        .await;

    let dir = tempdir().unwrap();
    let mut tracker = tracker_in(&dir, 0, 1000);
    let client = client_for(&mock_server);

    let err = Extractor::new(&client, &mut tracker)
        .extract_endpoint(endpoint(Source::Games, "games"), &[2024], &[], 2026)
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::ApiServerError { status: 503, .. }));
    assert_eq!(tracker.calls_used(), 0);
}
