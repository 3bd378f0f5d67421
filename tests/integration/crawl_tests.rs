//! Integration tests for the crawler
//!
//! These tests use wiremock to stand in for the dictionary search API and run
//! the full crawl cycle against a temporary SQLite database and checkpoint file.

use chrono::{NaiveDate, NaiveDateTime};
use hangul_harvest::clock::{Clock, SimulatedClock};
use hangul_harvest::crawler::{Coordinator, CrawlOutcome, CrawlSettings, PagedFetcher, QuotaGate};
use hangul_harvest::hangul::{Consonant, Keyspace};
use hangul_harvest::retry::RetryPolicy;
use hangul_harvest::state::{
    CheckpointStore, CrawlPhase, CrawlProgress, FileCheckpoint, MemoryCheckpoint,
};
use hangul_harvest::storage::{DictionaryStore, RunStatus, SqliteStorage, Storage};
use hangul_harvest::HarvestError;
use reqwest::Client;
use std::path::PathBuf;
use std::time::Duration;
use tempfile::TempDir;
use url::Url;
use wiremock::matchers::{method, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PAGE_SIZE: u32 = 100;

fn start_time() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 6, 1)
        .unwrap()
        .and_hms_opt(9, 0, 0)
        .unwrap()
}

/// Temp database and checkpoint paths shared by successive runs
struct Workspace {
    _dir: TempDir,
    db_path: PathBuf,
    checkpoint_path: PathBuf,
}

impl Workspace {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let db_path = dir.path().join("dictionary.db");
        let checkpoint_path = dir.path().join("state").join("progress.json");
        Self {
            _dir: dir,
            db_path,
            checkpoint_path,
        }
    }

    fn storage(&self) -> SqliteStorage {
        SqliteStorage::new(&self.db_path).unwrap()
    }

    fn checkpoint(&self) -> FileCheckpoint {
        FileCheckpoint::new(&self.checkpoint_path)
    }

    fn saved_checkpoint(&self) -> Option<CrawlProgress> {
        self.checkpoint().peek().unwrap()
    }
}

fn coordinator<K: CheckpointStore>(
    server: &MockServer,
    storage: SqliteStorage,
    checkpoint: K,
    clock: &SimulatedClock,
    daily_limit: u32,
    consonants: Vec<Consonant>,
    max_keys: Option<u64>,
) -> Coordinator<SqliteStorage, K, SimulatedClock> {
    let gate = QuotaGate::new(clock.clone(), daily_limit, Duration::ZERO);
    let fetcher = PagedFetcher::new(
        Client::new(),
        Url::parse(&server.uri()).unwrap(),
        "TESTKEY".to_string(),
        PAGE_SIZE,
        RetryPolicy::linear(3, Duration::from_secs(5)),
        gate,
        clock.clone(),
    );
    let settings = CrawlSettings {
        consonants,
        max_keys,
        storage_retry: RetryPolicy::fixed(3, Duration::from_secs(1)),
        config_hash: "integration".to_string(),
    };
    Coordinator::new(storage, checkpoint, fetcher, clock.clone(), settings)
}

/// `count` distinct two-syllable words starting with 가, numbered from `first`
fn words(first: u32, count: u32) -> Vec<String> {
    (first..first + count)
        .map(|i| format!("가{}", char::from_u32(0xAC00 + i).unwrap()))
        .collect()
}

fn page_body(total: u64, words: &[String]) -> serde_json::Value {
    let items: Vec<_> = words
        .iter()
        .map(|w| serde_json::json!({"word": w, "sense": {"definition": format!("{}의 뜻", w)}}))
        .collect();
    serde_json::json!({"channel": {"total": total, "item": items}})
}

async fn mount_page(server: &MockServer, q: &str, page: u32, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(query_param("q", q))
        .and(query_param("start", page.to_string()))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

/// Every query without a more specific mock finds nothing
async fn mount_empty_fallback(server: &MockServer) {
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_body(0, &[])))
        .with_priority(10)
        .mount(server)
        .await;
}

async fn requested_keys(server: &MockServer) -> Vec<(String, String)> {
    server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .map(|request| {
            let param = |name: &str| {
                request
                    .url
                    .query_pairs()
                    .find(|(k, _)| k == name)
                    .map(|(_, v)| v.into_owned())
                    .unwrap_or_default()
            };
            (param("q"), param("start"))
        })
        .collect()
}

#[tokio::test]
async fn test_multi_page_key_stores_every_page() {
    let server = MockServer::start().await;
    mount_page(&server, "가", 1, page_body(250, &words(0, 100))).await;
    mount_page(&server, "가", 2, page_body(250, &words(100, 100))).await;
    mount_page(&server, "가", 3, page_body(250, &words(200, 50))).await;

    let ws = Workspace::new();
    let clock = SimulatedClock::new(start_time());
    let mut crawler = coordinator(
        &server,
        ws.storage(),
        ws.checkpoint(),
        &clock,
        1000,
        vec![Consonant::Giyeok],
        Some(1),
    );

    let report = crawler.run().await.unwrap();

    assert_eq!(report.outcome, CrawlOutcome::KeyLimitReached);
    assert_eq!(report.summary.pages_fetched, 3);
    assert_eq!(report.summary.words_inserted, 250);
    assert_eq!(crawler.storage().count_words(Consonant::Giyeok).unwrap(), 250);
    assert!(crawler.storage().contains(Consonant::Giyeok, "가가").unwrap());

    let expected = CrawlProgress {
        consonant_index: 0,
        syllable_index: 1,
        page_cursor: 1,
    };
    assert_eq!(report.checkpoint, expected);
    assert_eq!(ws.saved_checkpoint(), Some(expected));

    let requests = requested_keys(&server).await;
    assert_eq!(
        requests,
        vec![
            ("가".to_string(), "1".to_string()),
            ("가".to_string(), "2".to_string()),
            ("가".to_string(), "3".to_string()),
        ]
    );
}

#[tokio::test]
async fn test_short_page_ends_key_early() {
    let server = MockServer::start().await;
    mount_page(&server, "가", 1, page_body(250, &words(0, 100))).await;
    mount_page(&server, "가", 2, page_body(250, &words(100, 40))).await;

    let ws = Workspace::new();
    let clock = SimulatedClock::new(start_time());
    let mut crawler = coordinator(
        &server,
        ws.storage(),
        ws.checkpoint(),
        &clock,
        1000,
        vec![Consonant::Giyeok],
        Some(1),
    );

    let report = crawler.run().await.unwrap();

    assert_eq!(report.summary.pages_fetched, 2);
    assert_eq!(report.summary.words_inserted, 140);
    assert_eq!(requested_keys(&server).await.len(), 2);
    assert_eq!(
        ws.saved_checkpoint(),
        Some(CrawlProgress {
            consonant_index: 0,
            syllable_index: 1,
            page_cursor: 1,
        })
    );
}

#[tokio::test]
async fn test_key_without_results_advances_checkpoint() {
    let server = MockServer::start().await;
    mount_empty_fallback(&server).await;

    let ws = Workspace::new();
    let clock = SimulatedClock::new(start_time());
    let mut crawler = coordinator(
        &server,
        ws.storage(),
        ws.checkpoint(),
        &clock,
        1000,
        vec![Consonant::Giyeok],
        Some(1),
    );

    let report = crawler.run().await.unwrap();

    assert_eq!(report.summary.keys_completed, 1);
    assert_eq!(report.summary.words_inserted, 0);
    assert_eq!(crawler.storage().count_all_words().unwrap(), 0);
    assert_eq!(requested_keys(&server).await.len(), 1);
    assert_eq!(
        ws.saved_checkpoint(),
        Some(CrawlProgress {
            consonant_index: 0,
            syllable_index: 1,
            page_cursor: 1,
        })
    );
}

#[tokio::test]
async fn test_second_run_resumes_from_file_checkpoint() {
    let server = MockServer::start().await;
    mount_empty_fallback(&server).await;

    let ws = Workspace::new();
    let clock = SimulatedClock::new(start_time());

    for _ in 0..2 {
        let mut crawler = coordinator(
            &server,
            ws.storage(),
            ws.checkpoint(),
            &clock,
            1000,
            vec![Consonant::Giyeok],
            Some(1),
        );
        crawler.run().await.unwrap();
    }

    let requests = requested_keys(&server).await;
    assert_eq!(
        requests,
        vec![
            ("가".to_string(), "1".to_string()),
            ("각".to_string(), "1".to_string()),
        ]
    );
    assert_eq!(
        ws.saved_checkpoint(),
        Some(CrawlProgress {
            consonant_index: 0,
            syllable_index: 2,
            page_cursor: 1,
        })
    );

    let latest = ws.storage().get_latest_run().unwrap().unwrap();
    assert_eq!(latest.status, RunStatus::Completed);
}

#[tokio::test]
async fn test_resume_never_moves_checkpoint_backwards() {
    let server = MockServer::start().await;
    mount_empty_fallback(&server).await;

    let resume = CrawlProgress {
        consonant_index: 2,
        syllable_index: 50,
        page_cursor: 1,
    };
    let ws = Workspace::new();
    let clock = SimulatedClock::new(start_time());
    let mut crawler = coordinator(
        &server,
        ws.storage(),
        MemoryCheckpoint::starting_at(resume),
        &clock,
        1000,
        vec![Consonant::Nieun],
        Some(2),
    );

    crawler.run().await.unwrap();

    let history = crawler.checkpoint().history();
    assert_eq!(history.len(), 2);
    assert!(history.iter().all(|saved| *saved > resume));
    assert!(history.windows(2).all(|pair| pair[0] < pair[1]));

    let first_key = Keyspace::new().starting_at(2, 50).next().unwrap();
    let requests = requested_keys(&server).await;
    assert_eq!(requests[0].0, first_key.syllable.to_string());
}

#[tokio::test]
async fn test_api_error_aborts_and_keeps_checkpoint() {
    let server = MockServer::start().await;
    mount_page(&server, "가", 1, page_body(250, &words(0, 100))).await;
    mount_page(
        &server,
        "가",
        2,
        serde_json::json!({
            "error": {"error_code": "020", "message": "등록되지 않은 인증키입니다."}
        }),
    )
    .await;

    let ws = Workspace::new();
    let clock = SimulatedClock::new(start_time());
    let mut crawler = coordinator(
        &server,
        ws.storage(),
        ws.checkpoint(),
        &clock,
        1000,
        vec![Consonant::Giyeok],
        None,
    );

    let result = crawler.run().await;

    assert!(matches!(result, Err(HarvestError::Fetch(_))));
    assert_eq!(crawler.phase(), CrawlPhase::Aborted);
    assert_eq!(crawler.storage().count_words(Consonant::Giyeok).unwrap(), 100);
    assert_eq!(
        ws.saved_checkpoint(),
        Some(CrawlProgress {
            consonant_index: 0,
            syllable_index: 0,
            page_cursor: 2,
        })
    );
    // Embedded API errors are not retried
    assert_eq!(requested_keys(&server).await.len(), 2);

    let run = crawler.storage().get_latest_run().unwrap().unwrap();
    assert_eq!(run.status, RunStatus::Failed);
}

#[tokio::test]
async fn test_server_error_is_retried_with_backoff() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(query_param("q", "가"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    mount_page(&server, "가", 1, page_body(2, &words(0, 2))).await;

    let ws = Workspace::new();
    let clock = SimulatedClock::new(start_time());
    let mut crawler = coordinator(
        &server,
        ws.storage(),
        ws.checkpoint(),
        &clock,
        1000,
        vec![Consonant::Giyeok],
        Some(1),
    );

    let report = crawler.run().await.unwrap();

    assert_eq!(report.summary.words_inserted, 2);
    assert_eq!(requested_keys(&server).await.len(), 2);
    assert!(clock.sleeps().contains(&Duration::from_secs(5)));
}

#[tokio::test]
async fn test_quota_exhaustion_waits_for_next_day() {
    let server = MockServer::start().await;
    mount_page(&server, "가", 1, page_body(250, &words(0, 100))).await;
    mount_page(&server, "가", 2, page_body(250, &words(100, 100))).await;
    mount_page(&server, "가", 3, page_body(250, &words(200, 50))).await;

    let ws = Workspace::new();
    let clock = SimulatedClock::new(start_time());
    let mut crawler = coordinator(
        &server,
        ws.storage(),
        ws.checkpoint(),
        &clock,
        2,
        vec![Consonant::Giyeok],
        Some(1),
    );

    let report = crawler.run().await.unwrap();

    assert_eq!(report.summary.words_inserted, 250);
    assert_eq!(requested_keys(&server).await.len(), 3);
    assert!(clock.sleeps().contains(&Duration::from_secs(15 * 3600)));
    assert_eq!(
        clock.now().date(),
        NaiveDate::from_ymd_opt(2024, 6, 2).unwrap()
    );
}

#[tokio::test]
async fn test_interrupt_abandons_in_flight_fetch() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(page_body(2, &words(0, 2)))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let ws = Workspace::new();
    let clock = SimulatedClock::new(start_time());
    let mut crawler = coordinator(
        &server,
        ws.storage(),
        ws.checkpoint(),
        &clock,
        1000,
        vec![Consonant::Giyeok],
        None,
    );

    let report = crawler
        .run_until(tokio::time::sleep(Duration::from_millis(100)))
        .await
        .unwrap();

    assert_eq!(report.outcome, CrawlOutcome::Interrupted);
    assert_eq!(report.checkpoint, CrawlProgress::origin());
    assert_eq!(crawler.storage().count_all_words().unwrap(), 0);
    assert_eq!(ws.saved_checkpoint(), None);

    let run = crawler.storage().get_latest_run().unwrap().unwrap();
    assert_eq!(run.status, RunStatus::Interrupted);
}
