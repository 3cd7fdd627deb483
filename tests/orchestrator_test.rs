// Orchestrator behavior against scripted in-memory fetchers

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use video_enricher::enricher::retry::RetryPolicy;
use video_enricher::enricher::{FetcherConfig, HttpClient, HttpError, MetadataFetcher, VideoMetadata};
use video_enricher::{
    FetchError, FetchErrorKind, FetchOutcome, InputItem, Orchestrator, PipelineConfig, PipelineError,
};

const ENGLISH_TITLE: &str = "A walk through the old harbour at sunrise";
const ENGLISH_DESCRIPTION: &str =
    "We follow the fishermen as they bring in the morning catch and talk about the weather.";

#[derive(Clone)]
enum Step {
    Ok,
    Fail(FetchErrorKind),
    Panic,
}

#[derive(Default)]
struct Script {
    delay: Duration,
    steps: Mutex<VecDeque<Step>>,
    text: Option<(String, String)>,
}

/// Fetcher driven by per-URL scripts; unscripted URLs succeed immediately
#[derive(Default)]
struct ScriptedFetcher {
    scripts: HashMap<String, Script>,
    calls: Mutex<HashMap<String, usize>>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl ScriptedFetcher {
    fn new() -> Self {
        Self::default()
    }

    fn item(mut self, name: &str, delay: Duration, steps: Vec<Step>) -> Self {
        self.scripts.insert(
            url(name),
            Script {
                delay,
                steps: Mutex::new(steps.into()),
                text: None,
            },
        );
        self
    }

    fn text(mut self, name: &str, title: &str, description: &str) -> Self {
        self.scripts.entry(url(name)).or_default().text =
            Some((title.to_string(), description.to_string()));
        self
    }

    fn calls(&self, name: &str) -> usize {
        self.calls.lock().unwrap().get(&url(name)).copied().unwrap_or(0)
    }

    fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }

    fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MetadataFetcher for ScriptedFetcher {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn is_available(&self) -> bool {
        true
    }

    async fn fetch(&self, url: &str, _config: &FetcherConfig) -> Result<VideoMetadata, FetchError> {
        *self.calls.lock().unwrap().entry(url.to_string()).or_default() += 1;
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        let script = self.scripts.get(url);
        let delay = script.map(|s| s.delay).unwrap_or_default();
        let step = script
            .and_then(|s| s.steps.lock().unwrap().pop_front())
            .unwrap_or(Step::Ok);

        tokio::time::sleep(delay).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let (title, description) = script
            .and_then(|s| s.text.clone())
            .unwrap_or_else(|| (ENGLISH_TITLE.to_string(), ENGLISH_DESCRIPTION.to_string()));

        match step {
            Step::Ok => Ok(VideoMetadata {
                id: url.rsplit('/').next().unwrap_or_default().to_string(),
                title,
                description,
                uploader: "Harbour Channel".to_string(),
                webpage_url: url.to_string(),
                published_at: None,
                duration_seconds: Some(120.0),
                is_live: false,
            }),
            Step::Fail(kind) => Err(FetchError::new(kind, format!("scripted {}", kind))),
            Step::Panic => panic!("scripted panic for {}", url),
        }
    }
}

/// HTTP client that resolves from a fixed redirect table
#[derive(Default)]
struct RedirectTable {
    redirects: HashMap<String, String>,
    resolves: AtomicUsize,
}

#[async_trait]
impl HttpClient for RedirectTable {
    async fn get(&self, _url: &str, _timeout: Duration) -> Result<Bytes, HttpError> {
        Ok(Bytes::new())
    }

    async fn resolve(&self, url: &str, _timeout: Duration) -> Result<String, HttpError> {
        self.resolves.fetch_add(1, Ordering::SeqCst);
        self.redirects.get(url).cloned().ok_or(HttpError::Status(404))
    }
}

fn url(name: &str) -> String {
    format!("https://videos.example.com/{}", name)
}

fn items(names: &[&str]) -> Vec<InputItem> {
    names.iter().map(|n| InputItem::new(url(n))).collect()
}

fn fast_config() -> PipelineConfig {
    PipelineConfig::default().with_retry(
        RetryPolicy::default()
            .with_base_delay(Duration::from_millis(5))
            .with_max_delay(Duration::from_millis(20)),
    )
}

fn orchestrator(fetcher: &Arc<ScriptedFetcher>) -> Orchestrator {
    Orchestrator::new(fetcher.clone(), Arc::new(RedirectTable::default()), fast_config()).unwrap()
}

fn sources(outcomes: &[FetchOutcome]) -> Vec<String> {
    outcomes.iter().map(|o| o.source().to_string()).collect()
}

const LONG: Duration = Duration::from_secs(30);

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_one_outcome_per_unique_identifier() {
    let fetcher = Arc::new(ScriptedFetcher::new().item("b", Duration::ZERO, vec![Step::Fail(FetchErrorKind::NotFound)]));
    let results = orchestrator(&fetcher)
        .run(&items(&["a", "b", "c", "a", "c"]), 2, LONG)
        .await
        .unwrap();

    assert_eq!(results.len(), 3);
    assert_eq!(results.per_submission().count(), 5);
    assert_eq!(results.summary().succeeded, 2);
    assert_eq!(results.summary().failed, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_order_follows_submission_not_completion() {
    let names = ["v0", "v1", "v2", "v3", "v4", "v5"];
    let fetcher = names.iter().enumerate().fold(ScriptedFetcher::new(), |f, (i, name)| {
        let delay = Duration::from_millis(20 * (names.len() - i) as u64);
        f.item(name, delay, vec![Step::Ok])
    });
    let fetcher = Arc::new(fetcher);

    let results = orchestrator(&fetcher).run(&items(&names), 6, LONG).await.unwrap();

    let expected: Vec<String> = names.iter().map(|n| url(n)).collect();
    assert_eq!(sources(results.outcomes()), expected);
    assert!(results.iter().all(FetchOutcome::is_success));
}

#[tokio::test]
async fn test_duplicates_share_one_fetch() {
    let fetcher = Arc::new(ScriptedFetcher::new());
    let results = orchestrator(&fetcher)
        .run(&items(&["dup", "other", "dup"]), 4, LONG)
        .await
        .unwrap();

    assert_eq!(fetcher.calls("dup"), 1);
    assert_eq!(results.len(), 2);

    let per_item: Vec<&FetchOutcome> = results.per_submission().collect();
    assert_eq!(per_item.len(), 3);
    assert_eq!(per_item[0], per_item[2]);
    assert_eq!(per_item[0].source(), url("dup"));
}

#[tokio::test]
async fn test_transient_twice_then_success() {
    let fetcher = Arc::new(ScriptedFetcher::new().item(
        "flaky",
        Duration::ZERO,
        vec![
            Step::Fail(FetchErrorKind::Transient),
            Step::Fail(FetchErrorKind::Transient),
            Step::Ok,
        ],
    ));
    let results = orchestrator(&fetcher).run(&items(&["flaky"]), 1, LONG).await.unwrap();

    assert!(results.outcomes()[0].is_success());
    assert_eq!(fetcher.calls("flaky"), 3);
}

#[tokio::test]
async fn test_rate_limited_is_retried() {
    let fetcher = Arc::new(ScriptedFetcher::new().item(
        "busy",
        Duration::ZERO,
        vec![Step::Fail(FetchErrorKind::RateLimited), Step::Ok],
    ));
    let results = orchestrator(&fetcher).run(&items(&["busy"]), 1, LONG).await.unwrap();

    assert!(results.outcomes()[0].is_success());
    assert_eq!(fetcher.calls("busy"), 2);
}

#[tokio::test]
async fn test_retry_ceiling_gives_terminal_failure() {
    let fetcher = Arc::new(ScriptedFetcher::new().item(
        "down",
        Duration::ZERO,
        vec![Step::Fail(FetchErrorKind::Transient); 5],
    ));
    let results = orchestrator(&fetcher).run(&items(&["down"]), 1, LONG).await.unwrap();

    let failure = results.failures().next().unwrap();
    assert_eq!(failure.kind, FetchErrorKind::Transient);
    assert_eq!(failure.attempts, 3);
    assert_eq!(fetcher.calls("down"), 3);
}

#[tokio::test]
async fn test_not_found_fails_without_retry() {
    let fetcher = Arc::new(ScriptedFetcher::new().item(
        "gone",
        Duration::ZERO,
        vec![Step::Fail(FetchErrorKind::NotFound), Step::Ok],
    ));
    let results = orchestrator(&fetcher).run(&items(&["gone"]), 1, LONG).await.unwrap();

    assert_eq!(results.outcomes()[0].error_kind(), Some(FetchErrorKind::NotFound));
    assert_eq!(results.failures().next().unwrap().attempts, 1);
    assert_eq!(fetcher.calls("gone"), 1);
}

#[tokio::test]
async fn test_unsupported_fails_without_retry() {
    let fetcher = Arc::new(ScriptedFetcher::new().item(
        "drm",
        Duration::ZERO,
        vec![Step::Fail(FetchErrorKind::Unsupported), Step::Ok],
    ));
    let results = orchestrator(&fetcher).run(&items(&["drm"]), 1, LONG).await.unwrap();

    assert_eq!(results.outcomes()[0].error_kind(), Some(FetchErrorKind::Unsupported));
    assert_eq!(fetcher.calls("drm"), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_overall_timeout_keeps_fast_results() {
    let fetcher = Arc::new(
        ScriptedFetcher::new()
            .item("fast1", Duration::from_millis(10), vec![Step::Ok])
            .item("slow1", Duration::from_secs(10), vec![Step::Ok])
            .item("fast2", Duration::from_millis(10), vec![Step::Fail(FetchErrorKind::NotFound)])
            .item("slow2", Duration::from_secs(10), vec![Step::Ok]),
    );
    let timeout = Duration::from_millis(300);

    let started = Instant::now();
    let results = orchestrator(&fetcher)
        .run(&items(&["fast1", "slow1", "fast2", "slow2"]), 4, timeout)
        .await
        .unwrap();
    let elapsed = started.elapsed();

    let kinds: Vec<Option<FetchErrorKind>> = results.iter().map(FetchOutcome::error_kind).collect();
    assert_eq!(
        kinds,
        vec![
            None,
            Some(FetchErrorKind::Timeout),
            Some(FetchErrorKind::NotFound),
            Some(FetchErrorKind::Timeout),
        ]
    );
    assert!(elapsed < timeout + Duration::from_millis(500), "took {:?}", elapsed);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_queued_items_time_out_too() {
    let fetcher = Arc::new(
        ScriptedFetcher::new()
            .item("first", Duration::from_secs(10), vec![Step::Ok])
            .item("second", Duration::from_secs(10), vec![Step::Ok]),
    );
    let results = orchestrator(&fetcher)
        .run(&items(&["first", "second"]), 1, Duration::from_millis(100))
        .await
        .unwrap();

    assert_eq!(results.len(), 2);
    assert!(results
        .iter()
        .all(|o| o.error_kind() == Some(FetchErrorKind::Timeout)));
    // one holds the only permit, the other never starts
    assert_eq!(fetcher.total_calls(), 1);
}

#[tokio::test]
async fn test_huge_timeout_means_no_deadline() {
    let fetcher = Arc::new(ScriptedFetcher::new().item("a", Duration::from_millis(10), vec![Step::Ok]));
    let orchestrator = orchestrator(&fetcher);

    let results = orchestrator
        .run(&items(&["a"]), 1, Duration::from_secs(u64::MAX))
        .await
        .unwrap();
    assert!(results.outcomes()[0].is_success());

    let results = orchestrator.run(&items(&["b"]), 1, Duration::MAX).await.unwrap();
    assert!(results.outcomes()[0].is_success());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_queued_item_never_starts_after_deadline() {
    let fetcher = Arc::new(
        ScriptedFetcher::new()
            .item("running", Duration::from_secs(10), vec![Step::Ok])
            .item("waiting1", Duration::ZERO, vec![Step::Ok])
            .item("waiting2", Duration::ZERO, vec![Step::Ok]),
    );
    let results = orchestrator(&fetcher)
        .run(&items(&["running", "waiting1", "waiting2"]), 1, Duration::from_millis(100))
        .await
        .unwrap();

    assert_eq!(
        results.get(&url("running")).and_then(FetchOutcome::error_kind),
        Some(FetchErrorKind::Timeout)
    );
    // items that won the permit before "running" finish; the rest never start
    let finished = results.successes().count();
    assert_eq!(fetcher.total_calls(), finished + 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_parallelism_is_bounded() {
    let names: Vec<String> = (0..12).map(|i| format!("item{}", i)).collect();
    let fetcher = names.iter().fold(ScriptedFetcher::new(), |f, name| {
        f.item(name, Duration::from_millis(40), vec![Step::Ok])
    });
    let fetcher = Arc::new(fetcher);
    let refs: Vec<&str> = names.iter().map(String::as_str).collect();

    let results = orchestrator(&fetcher).run(&items(&refs), 3, LONG).await.unwrap();

    assert_eq!(results.len(), 12);
    assert!(fetcher.peak() <= 3, "peak concurrency {}", fetcher.peak());
    assert!(fetcher.peak() >= 2, "workers never overlapped");
}

#[tokio::test]
async fn test_zero_parallelism_is_rejected_before_dispatch() {
    let fetcher = Arc::new(ScriptedFetcher::new());
    let err = orchestrator(&fetcher)
        .run(&items(&["a"]), 0, LONG)
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::InvalidParallelism(0)));
    assert_eq!(fetcher.total_calls(), 0);
}

#[tokio::test]
async fn test_zero_timeout_is_rejected() {
    let fetcher = Arc::new(ScriptedFetcher::new());
    let err = orchestrator(&fetcher)
        .run(&items(&["a"]), 1, Duration::ZERO)
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::ZeroTimeout));
}

#[tokio::test]
async fn test_empty_input_gives_empty_result() {
    let fetcher = Arc::new(ScriptedFetcher::new());
    let results = orchestrator(&fetcher).run(&[], 2, LONG).await.unwrap();
    assert!(results.is_empty());
}

#[tokio::test]
async fn test_invalid_input_never_reaches_fetcher() {
    let fetcher = Arc::new(ScriptedFetcher::new());
    let submitted = vec![
        InputItem::new(""),
        InputItem::new("not a url"),
        InputItem::new(url("ok")),
        InputItem::new("ftp://videos.example.com/x"),
    ];
    let results = orchestrator(&fetcher).run(&submitted, 2, LONG).await.unwrap();

    let kinds: Vec<Option<FetchErrorKind>> = results.iter().map(FetchOutcome::error_kind).collect();
    assert_eq!(
        kinds,
        vec![
            Some(FetchErrorKind::InvalidInput),
            Some(FetchErrorKind::InvalidInput),
            None,
            Some(FetchErrorKind::InvalidInput),
        ]
    );
    assert!(results.failures().all(|f| f.attempts == 0));
    assert_eq!(fetcher.total_calls(), 1);
}

#[tokio::test]
async fn test_all_failures_is_still_a_result() {
    let fetcher = Arc::new(
        ScriptedFetcher::new()
            .item("x", Duration::ZERO, vec![Step::Fail(FetchErrorKind::NotFound)])
            .item("y", Duration::ZERO, vec![Step::Fail(FetchErrorKind::Unsupported)]),
    );
    let results = orchestrator(&fetcher).run(&items(&["x", "y"]), 2, LONG).await.unwrap();

    let summary = results.summary();
    assert_eq!(summary.succeeded, 0);
    assert_eq!(summary.failed, 2);
    assert_eq!(summary.failures_by_kind.get("not_found"), Some(&1));
    assert_eq!(summary.failures_by_kind.get("unsupported"), Some(&1));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_panicking_worker_is_isolated() {
    let fetcher = Arc::new(
        ScriptedFetcher::new()
            .item("boom", Duration::ZERO, vec![Step::Panic])
            .item("fine", Duration::from_millis(20), vec![Step::Ok]),
    );
    let results = orchestrator(&fetcher).run(&items(&["boom", "fine"]), 2, LONG).await.unwrap();

    assert_eq!(results.outcomes()[0].error_kind(), Some(FetchErrorKind::Transient));
    assert!(results.outcomes()[1].is_success());
}

#[tokio::test]
async fn test_language_is_classified() {
    let fetcher = Arc::new(
        ScriptedFetcher::new()
            .text("en", ENGLISH_TITLE, ENGLISH_DESCRIPTION)
            .text(
                "es",
                "Un paseo por el puerto antiguo",
                "Seguimos a los pescadores mientras traen la pesca de la mañana y hablan del tiempo.",
            )
            .text("num", "2024", ""),
    );
    let results = orchestrator(&fetcher).run(&items(&["en", "es", "num"]), 3, LONG).await.unwrap();

    let languages: Vec<&str> = results.successes().map(|r| r.language.as_str()).collect();
    assert_eq!(languages, vec!["eng", "spa", "unknown"]);
}

#[tokio::test]
async fn test_short_links_are_resolved_before_fetch() {
    let fetcher = Arc::new(ScriptedFetcher::new());
    let mut http = RedirectTable::default();
    http.redirects
        .insert("https://bit.ly/abc".to_string(), url("resolved"));
    let http = Arc::new(http);

    let orchestrator = Orchestrator::new(fetcher.clone(), http.clone(), fast_config()).unwrap();
    let results = orchestrator
        .run(
            &[InputItem::new("https://bit.ly/abc"), InputItem::new(url("direct"))],
            2,
            LONG,
        )
        .await
        .unwrap();

    let record = results.get("https://bit.ly/abc").and_then(FetchOutcome::record).unwrap();
    assert_eq!(record.webpage_url, url("resolved"));
    assert_eq!(fetcher.calls("resolved"), 1);
    assert_eq!(fetcher.calls("direct"), 1);
    assert_eq!(http.resolves.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_failed_short_link_is_item_failure() {
    let fetcher = Arc::new(ScriptedFetcher::new());
    let orchestrator =
        Orchestrator::new(fetcher.clone(), Arc::new(RedirectTable::default()), fast_config()).unwrap();
    let results = orchestrator
        .run(&[InputItem::new("https://t.co/missing")], 1, LONG)
        .await
        .unwrap();

    assert_eq!(results.outcomes()[0].error_kind(), Some(FetchErrorKind::NotFound));
    assert_eq!(fetcher.total_calls(), 0);
}

#[tokio::test]
async fn test_run_with_config_uses_configured_limits() {
    let fetcher = Arc::new(ScriptedFetcher::new());
    let config = fast_config().with_max_parallelism(2);
    let orchestrator = Orchestrator::new(fetcher.clone(), Arc::new(RedirectTable::default()), config).unwrap();

    let results = orchestrator.run_with_config(&items(&["a", "b", "c"])).await.unwrap();
    assert_eq!(results.len(), 3);
    assert_eq!(orchestrator.config().max_parallelism, 2);
}

#[test]
fn test_new_rejects_invalid_config() {
    let fetcher = Arc::new(ScriptedFetcher::new());
    let result = Orchestrator::new(
        fetcher,
        Arc::new(RedirectTable::default()),
        PipelineConfig::default().with_max_parallelism(0),
    );
    assert!(matches!(result, Err(PipelineError::InvalidParallelism(0))));
}

#[test]
fn test_blocking_run_outside_runtime() {
    let fetcher = Arc::new(ScriptedFetcher::new().item("slowish", Duration::from_millis(20), vec![Step::Ok]));
    let results = orchestrator(&fetcher)
        .run_blocking(&items(&["slowish", "other"]), 2, LONG)
        .unwrap();

    assert_eq!(results.len(), 2);
    assert!(results.iter().all(FetchOutcome::is_success));
}

#[test]
fn test_crate_run_rejects_invalid_items_without_tools() {
    let results = video_enricher::run(&[InputItem::new("  "), InputItem::new("nope")], 2, LONG).unwrap();

    assert_eq!(results.len(), 2);
    assert!(results
        .iter()
        .all(|o| o.error_kind() == Some(FetchErrorKind::InvalidInput)));
    assert!(matches!(
        video_enricher::run(&[], 0, LONG),
        Err(PipelineError::InvalidParallelism(0))
    ));
}
