//! Integration tests for the crawler
//!
//! The first tests drive the real GitHub client against a wiremock GraphQL
//! endpoint; the rest drive the scheduler with in-process search doubles to
//! exercise concurrency, caps and failure containment.

use async_trait::async_trait;
use chrono::NaiveDate;
use ghstars::api::{ApiError, RepoRecord, SearchApi, SearchPage};
use ghstars::config::Config;
use ghstars::{ConfigError, GhStarsError};
use ghstars::crawler::{crawl, CrawlScheduler, SchedulerOptions, SegmentPlanner};
use ghstars::state::CrawlSession;
use ghstars::storage::{
    RunRecord, RunStatus, SharedStorage, SnapshotRow, SqliteStorage, Storage, StorageError,
    StorageResult,
};
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use wiremock::matchers::{body_partial_json, body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PAGE_SIZE: u32 = 100;

fn snapshot_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 16).unwrap()
}

/// Creates a test configuration pointing at a mock endpoint
fn create_test_config(endpoint: &str, db_path: &str, target: u64) -> Config {
    let mut config = Config::default();
    config.github.token = Some("test-token".to_string());
    config.github.endpoint = endpoint.to_string();
    config.crawl.target = target;
    config.crawl.batch_size = PAGE_SIZE;
    config.crawl.workers = 1;
    config.crawl.date_windows = false;
    config.rate_limit.inter_request_delay_ms = 0;
    config.retry.base_delay_ms = 10;
    config.retry.max_delay_ms = 100;
    config.output.database_path = db_path.to_string();
    config
}

/// GraphQL search response with repositories `ids`
fn search_body(ids: std::ops::Range<i64>, cursor: &str, has_next: bool) -> serde_json::Value {
    let nodes: Vec<_> = ids
        .map(|id| {
            json!({
                "databaseId": id,
                "nameWithOwner": format!("owner/repo-{}", id),
                "stargazerCount": 100_000 + id,
                "primaryLanguage": { "name": "Rust" },
            })
        })
        .collect();
    json!({
        "data": {
            "search": {
                "pageInfo": { "endCursor": cursor, "hasNextPage": has_next },
                "nodes": nodes,
            },
            "rateLimit": { "cost": 1, "remaining": 4900 },
        }
    })
}

async fn mount_preflight(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/graphql"))
        .and(body_string_contains("viewer"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {
                "viewer": { "login": "octocat" },
                "rateLimit": { "limit": 5000, "cost": 1, "remaining": 5000, "resetAt": "2026-10-16T12:00:00Z" }
            }
        })))
        .expect(1)
        .mount(server)
        .await;
}

fn open_db(path: &std::path::Path) -> SqliteStorage {
    SqliteStorage::new(path).unwrap()
}

#[tokio::test]
async fn test_missing_token_creates_no_database() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("stars.db");
    let mut config = create_test_config("http://127.0.0.1:1/graphql", db_path.to_str().unwrap(), 10);
    config.github.token = None;

    let result = crawl(config, "test-hash".to_string()).await;

    assert!(matches!(
        result,
        Err(GhStarsError::Config(ConfigError::MissingToken))
    ));
    assert!(!db_path.exists());
}

#[tokio::test]
async fn test_end_to_end_target_reached_in_first_segment() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("stars.db");

    mount_preflight(&server).await;

    // Second page of the first segment, sized one past the 50 still needed
    Mock::given(method("POST"))
        .and(path("/graphql"))
        .and(body_partial_json(json!({
            "variables": { "q": "stars:>=100000", "first": 51, "after": "c1" }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(search_body(101..151, "c2", false)))
        .expect(1)
        .mount(&server)
        .await;

    // First page of the first segment
    Mock::given(method("POST"))
        .and(path("/graphql"))
        .and(body_partial_json(json!({
            "variables": { "q": "stars:>=100000", "first": 100, "after": null }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(search_body(1..101, "c1", true)))
        .expect(1)
        .mount(&server)
        .await;

    let config = create_test_config(
        &format!("{}/graphql", server.uri()),
        db_path.to_str().unwrap(),
        150,
    );

    let summary = crawl(config, "test-hash".to_string()).await.unwrap();

    assert_eq!(summary.fetched, 150);
    assert!(summary.target_reached);
    assert_eq!(summary.segments_run, 1);
    assert_eq!(summary.segments_failed, 0);
    assert_eq!(summary.segments_skipped, 16);

    let storage = open_db(&db_path);
    assert_eq!(storage.count_repositories().unwrap(), 150);
    assert_eq!(storage.count_snapshots().unwrap(), 150);

    let run = storage.get_latest_run().unwrap().unwrap();
    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(run.fetched, 150);
    assert_eq!(run.config_hash, "test-hash");
}

#[tokio::test]
async fn test_end_to_end_secondary_limit_is_waited_out() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("stars.db");

    mount_preflight(&server).await;

    Mock::given(method("POST"))
        .and(path("/graphql"))
        .and(body_string_contains("search"))
        .respond_with(
            ResponseTemplate::new(403)
                .insert_header("retry-after", "1")
                .set_body_string("You have exceeded a secondary rate limit"),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/graphql"))
        .and(body_string_contains("search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(search_body(1..11, "c1", false)))
        .mount(&server)
        .await;

    let config = create_test_config(
        &format!("{}/graphql", server.uri()),
        db_path.to_str().unwrap(),
        10,
    );

    let start = std::time::Instant::now();
    let summary = crawl(config, "test-hash".to_string()).await.unwrap();

    assert!(start.elapsed() >= Duration::from_secs(1));
    assert_eq!(summary.fetched, 10);
    assert!(summary.target_reached);
    assert_eq!(summary.segments_failed, 0);
}

#[tokio::test]
async fn test_end_to_end_bad_credentials_fail_the_run() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("stars.db");

    Mock::given(method("POST"))
        .and(path("/graphql"))
        .respond_with(ResponseTemplate::new(401).set_body_string(r#"{"message":"Bad credentials"}"#))
        .expect(1)
        .mount(&server)
        .await;

    let config = create_test_config(
        &format!("{}/graphql", server.uri()),
        db_path.to_str().unwrap(),
        10,
    );

    let result = crawl(config, "test-hash".to_string()).await;

    assert!(result.is_err());
    let storage = open_db(&db_path);
    assert_eq!(
        storage.get_latest_run().unwrap().unwrap().status,
        RunStatus::Failed
    );
    assert_eq!(storage.count_snapshots().unwrap(), 0);
}

// ===== In-process search doubles =====

/// Serves `per_query` repositories for every query, with ids disjoint
/// across queries, honoring page size and using the offset as cursor
struct PagedSearch {
    per_query: HashMap<String, u32>,
    default_per_query: u32,
    failing_query: Option<String>,
    bases: Mutex<HashMap<String, i64>>,
    pages_after_stop: AtomicU32,
    session: Mutex<Option<Arc<CrawlSession>>>,
}

impl PagedSearch {
    fn uniform(per_query: u32) -> Self {
        Self {
            per_query: HashMap::new(),
            default_per_query: per_query,
            failing_query: None,
            bases: Mutex::new(HashMap::new()),
            pages_after_stop: AtomicU32::new(0),
            session: Mutex::new(None),
        }
    }

    fn failing(mut self, query: &str) -> Self {
        self.failing_query = Some(query.to_string());
        self
    }

    fn watch(&self, session: &Arc<CrawlSession>) {
        *self.session.lock().unwrap() = Some(Arc::clone(session));
    }

    fn base_for(&self, query: &str) -> i64 {
        let mut bases = self.bases.lock().unwrap();
        let next = bases.len() as i64 * 1_000_000;
        *bases.entry(query.to_string()).or_insert(next)
    }
}

#[async_trait]
impl SearchApi for PagedSearch {
    async fn search(
        &self,
        query: &str,
        after: Option<&str>,
        batch_size: u32,
    ) -> Result<SearchPage, ApiError> {
        tokio::task::yield_now().await;

        if let Some(session) = self.session.lock().unwrap().as_ref() {
            if session.is_stopped() {
                self.pages_after_stop.fetch_add(1, Ordering::SeqCst);
            }
        }

        if self.failing_query.as_deref() == Some(query) {
            return Err(ApiError::Transport("connection reset".to_string()));
        }

        let total = self
            .per_query
            .get(query)
            .copied()
            .unwrap_or(self.default_per_query);
        let offset: u32 = after.and_then(|c| c.parse().ok()).unwrap_or(0);
        let end = (offset + batch_size).min(total);
        let base = self.base_for(query);

        let repos = (offset..end)
            .map(|i| RepoRecord {
                id: base + i64::from(i) + 1,
                name_with_owner: format!("owner/{}-{}", base, i),
                stars: 1,
                language: None,
            })
            .collect();

        Ok(SearchPage {
            repos,
            end_cursor: Some(end.to_string()),
            has_next_page: end < total,
            cost: 1,
            remaining: 5000,
        })
    }
}

fn memory_storage() -> SharedStorage {
    Arc::new(Mutex::new(SqliteStorage::new_in_memory().unwrap()))
}

fn build_scheduler(
    api: Arc<dyn SearchApi>,
    storage: SharedStorage,
    session: Arc<CrawlSession>,
    per_segment_cap: u32,
) -> CrawlScheduler {
    CrawlScheduler::new(
        session,
        api,
        storage,
        SegmentPlanner::default().with_date_windows(false),
        SchedulerOptions {
            snapshot_date: snapshot_date(),
            per_segment_cap,
            config_hash: "test-hash".to_string(),
        },
    )
}

#[tokio::test]
async fn test_cap_stops_pagination_at_980() {
    let mut per_query = HashMap::new();
    per_query.insert("stars:>=100000".to_string(), 2000);
    let api = Arc::new(PagedSearch {
        per_query,
        ..PagedSearch::uniform(0)
    });
    let storage = memory_storage();
    let session = Arc::new(CrawlSession::new(1_000_000, PAGE_SIZE, 1));

    let summary = build_scheduler(api, Arc::clone(&storage), session, 980)
        .run()
        .await
        .unwrap();

    assert_eq!(summary.fetched, 980);
    assert!(!summary.target_reached);
    assert_eq!(storage.lock().unwrap().count_snapshots().unwrap(), 980);
}

#[tokio::test]
async fn test_failing_segment_does_not_abort_siblings() {
    let api = Arc::new(PagedSearch::uniform(30).failing("stars:>=100000"));
    let storage = memory_storage();
    let session = Arc::new(CrawlSession::new(1_000_000, PAGE_SIZE, 3));

    let summary = build_scheduler(api, Arc::clone(&storage), session, 980)
        .run()
        .await
        .unwrap();

    assert_eq!(summary.segments_run, 17);
    assert_eq!(summary.segments_failed, 1);
    assert_eq!(summary.fetched, 16 * 30);
    assert_eq!(storage.lock().unwrap().count_repositories().unwrap(), 16 * 30);

    let run = storage.lock().unwrap().get_latest_run().unwrap().unwrap();
    assert_eq!(run.status, RunStatus::Partial);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_segments_are_not_double_counted() {
    // Disjoint result sets of 1, 11, 21, ... repositories
    let queries: Vec<String> = SegmentPlanner::default()
        .with_date_windows(false)
        .plan(snapshot_date())
        .into_iter()
        .map(|s| s.query)
        .collect();
    let per_query: HashMap<String, u32> = queries
        .iter()
        .enumerate()
        .map(|(i, q)| (q.clone(), i as u32 * 10 + 1))
        .collect();
    let expected: u64 = per_query.values().map(|&n| u64::from(n)).sum();

    let api = Arc::new(PagedSearch {
        per_query,
        ..PagedSearch::uniform(0)
    });
    let storage = memory_storage();
    let session = Arc::new(CrawlSession::new(1_000_000, 7, 8));

    let summary = build_scheduler(api, Arc::clone(&storage), session, 980)
        .run()
        .await
        .unwrap();

    assert_eq!(summary.fetched, expected);
    assert_eq!(
        storage.lock().unwrap().count_snapshots().unwrap(),
        expected
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_stop_signal_converges() {
    let api = Arc::new(PagedSearch::uniform(900));
    let session = Arc::new(CrawlSession::new(250, PAGE_SIZE, 4));
    api.watch(&session);
    let storage = memory_storage();

    let summary = build_scheduler(
        Arc::clone(&api) as Arc<dyn SearchApi>,
        Arc::clone(&storage),
        Arc::clone(&session),
        980,
    )
    .run()
    .await
    .unwrap();

    assert!(summary.target_reached);
    assert!(session.is_stopped());
    // Only pages already in flight when the flag went up may land
    assert!(summary.fetched >= 250);
    assert!(summary.fetched < 250 + 4 * u64::from(PAGE_SIZE));
    assert!(api.pages_after_stop.load(Ordering::SeqCst) <= 4);
    assert!(summary.segments_skipped > 0);
}

/// Storage that accepts `ok_pages` snapshot batches, then fails
struct FlakyStorage {
    inner: SqliteStorage,
    ok_pages: u32,
    batches: u32,
}

impl Storage for FlakyStorage {
    fn create_run(&mut self, target: u64, config_hash: &str) -> StorageResult<i64> {
        self.inner.create_run(target, config_hash)
    }

    fn finish_run(&mut self, run_id: i64, status: RunStatus, fetched: u64) -> StorageResult<()> {
        self.inner.finish_run(run_id, status, fetched)
    }

    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>> {
        self.inner.get_latest_run()
    }

    fn upsert_repository(
        &mut self,
        id: i64,
        name_owner: &str,
        language: Option<&str>,
    ) -> StorageResult<()> {
        self.inner.upsert_repository(id, name_owner, language)
    }

    fn bulk_insert_snapshots(&mut self, rows: &[SnapshotRow]) -> StorageResult<usize> {
        self.batches += 1;
        if self.batches > self.ok_pages {
            return Err(StorageError::Database("disk full".to_string()));
        }
        self.inner.bulk_insert_snapshots(rows)
    }

    fn get_snapshot(&self, repo_id: i64, date: NaiveDate) -> StorageResult<Option<i64>> {
        self.inner.get_snapshot(repo_id, date)
    }

    fn count_repositories(&self) -> StorageResult<u64> {
        self.inner.count_repositories()
    }

    fn count_snapshots(&self) -> StorageResult<u64> {
        self.inner.count_snapshots()
    }

    fn count_snapshots_on(&self, date: NaiveDate) -> StorageResult<u64> {
        self.inner.count_snapshots_on(date)
    }
}

#[tokio::test]
async fn test_persistence_failure_keeps_committed_counts() {
    let mut per_query = HashMap::new();
    per_query.insert("stars:>=100000".to_string(), 500);
    let api = Arc::new(PagedSearch {
        per_query,
        ..PagedSearch::uniform(0)
    });
    let storage: SharedStorage = Arc::new(Mutex::new(FlakyStorage {
        inner: SqliteStorage::new_in_memory().unwrap(),
        ok_pages: 2,
        batches: 0,
    }));
    let session = Arc::new(CrawlSession::new(1_000_000, PAGE_SIZE, 1));

    let summary = build_scheduler(api, Arc::clone(&storage), session, 980)
        .run()
        .await
        .unwrap();

    // Two pages persisted before the failure; the failed page is not counted
    assert_eq!(summary.fetched, 200);
    assert_eq!(summary.segments_failed, 1);
    assert_eq!(storage.lock().unwrap().count_snapshots().unwrap(), 200);
}

#[tokio::test]
async fn test_fetched_counter_matches_database_after_crawl() {
    let api = Arc::new(PagedSearch::uniform(120));
    let storage = memory_storage();
    let session = Arc::new(CrawlSession::new(1_000_000, PAGE_SIZE, 3));

    let summary = build_scheduler(api, Arc::clone(&storage), Arc::clone(&session), 980)
        .run()
        .await
        .unwrap();

    assert_eq!(session.fetched(), 17 * 120);
    assert_eq!(summary.fetched, 17 * 120);
    assert_eq!(
        storage.lock().unwrap().count_snapshots_on(snapshot_date()).unwrap(),
        17 * 120
    );
}
