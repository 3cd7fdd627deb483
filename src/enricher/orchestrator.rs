// Orchestrator - bounded concurrent fetch + classify with ordered results
//
// Flow per run:
// 1. Validate and dedup inputs (first-seen order); rejects never take a slot
// 2. Spawn one task per unique item into a JoinSet, gated by a Semaphore
// 3. Each task: expand short link -> fetch with retry -> classify language
// 4. Collect outcomes into an index-addressed slot vector until the deadline
// 5. Abort whatever is still running, mark it Timeout, emit slots in order

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::config::PipelineConfig;
use super::errors::{FetchError, FetchErrorKind, PipelineError};
use super::extractors::{AutoFetcher, MetadataFetcher};
use super::http::{HttpClient, ReqwestHttpClient};
use super::input::{dedup_key, validate, ValidatedItem};
use super::language::LanguageClassifier;
use super::models::{FetchOutcome, InputItem, ItemHint, MetadataRecord, ResultSet};
use super::retry::retry;

/// Read-only state shared by every worker of a run
struct WorkerContext {
    fetcher: Arc<dyn MetadataFetcher>,
    http: Arc<dyn HttpClient>,
    classifier: LanguageClassifier,
    config: PipelineConfig,
}

/// Entry point of the enrichment pipeline
pub struct Orchestrator {
    ctx: Arc<WorkerContext>,
}

impl Orchestrator {
    pub fn new(
        fetcher: Arc<dyn MetadataFetcher>,
        http: Arc<dyn HttpClient>,
        config: PipelineConfig,
    ) -> Result<Self, PipelineError> {
        config.validate()?;
        let classifier = LanguageClassifier::new(config.classifier.clone());
        Ok(Self {
            ctx: Arc::new(WorkerContext {
                fetcher,
                http,
                classifier,
                config,
            }),
        })
    }

    /// yt-dlp (auto mode) for metadata and reqwest for HTTP
    pub fn with_defaults(config: PipelineConfig) -> Result<Self, PipelineError> {
        let http = ReqwestHttpClient::new(config.fetcher.proxy.as_deref())?;
        Self::new(Arc::new(AutoFetcher::new()), Arc::new(http), config)
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.ctx.config
    }

    /// `run` with the configured parallelism and overall timeout
    pub async fn run_with_config(&self, items: &[InputItem]) -> Result<ResultSet, PipelineError> {
        let config = &self.ctx.config;
        self.run(items, config.max_parallelism, config.overall_timeout)
            .await
    }

    /// Fetch and classify every item.
    ///
    /// Only contract violations return `Err`, before anything is dispatched.
    /// Per-item failures, including items cut off by `overall_timeout`, are
    /// recorded in the returned `ResultSet`, which is ordered by first
    /// submission.
    pub async fn run(
        &self,
        items: &[InputItem],
        max_parallelism: usize,
        overall_timeout: Duration,
    ) -> Result<ResultSet, PipelineError> {
        if max_parallelism == 0 {
            return Err(PipelineError::InvalidParallelism(max_parallelism));
        }
        if overall_timeout.is_zero() {
            return Err(PipelineError::ZeroTimeout);
        }

        let started = Instant::now();
        // None when the timeout is too large to represent: no deadline
        let deadline = started.checked_add(overall_timeout);
        let plan = Plan::build(items);

        info!(
            submitted = items.len(),
            unique = plan.identifiers.len(),
            max_parallelism,
            timeout_ms = overall_timeout.as_millis() as u64,
            "Starting enrichment run"
        );

        let mut slots: Vec<Option<FetchOutcome>> = vec![None; plan.identifiers.len()];
        let semaphore = Arc::new(Semaphore::new(max_parallelism));
        let mut workers = JoinSet::new();
        let mut task_slots = HashMap::new();

        for (index, planned) in plan.entries.into_iter().enumerate() {
            let item = match planned {
                Planned::Rejected(outcome) => {
                    slots[index] = Some(outcome);
                    continue;
                }
                Planned::Dispatch(item) => item,
            };

            let ctx = Arc::clone(&self.ctx);
            let semaphore = Arc::clone(&semaphore);
            let handle = workers.spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => {
                        return FetchOutcome::failure(
                            FetchError::transient("worker pool closed"),
                            &item.identifier,
                            0,
                        )
                    }
                };
                process_item(&ctx, &item).await
            });
            task_slots.insert(handle.id(), index);
        }

        let collect = async {
            while let Some(joined) = workers.join_next_with_id().await {
                match joined {
                    Ok((id, outcome)) => {
                        if let Some(&index) = task_slots.get(&id) {
                            slots[index] = Some(outcome);
                        }
                    }
                    Err(err) => {
                        if let Some(&index) = task_slots.get(&err.id()) {
                            warn!(identifier = %plan.identifiers[index], "Worker task failed: {}", err);
                            slots[index] = Some(FetchOutcome::failure(
                                FetchError::transient(format!("worker task failed: {}", err)),
                                &plan.identifiers[index],
                                0,
                            ));
                        }
                    }
                }
            }
        };

        let timed_out = match deadline {
            Some(deadline) => tokio::time::timeout_at(deadline, collect).await.is_err(),
            None => {
                collect.await;
                false
            }
        };

        if timed_out {
            warn!(
                in_flight = workers.len(),
                timeout_ms = overall_timeout.as_millis() as u64,
                "Overall timeout reached, abandoning in-flight items"
            );
            // Queued workers must not pick up permits freed by the aborts
            semaphore.close();
            workers.shutdown().await;
        }

        let outcomes: Vec<FetchOutcome> = slots
            .into_iter()
            .zip(&plan.identifiers)
            .map(|(slot, identifier)| {
                slot.unwrap_or_else(|| {
                    FetchOutcome::failure(
                        FetchError::new(
                            FetchErrorKind::Timeout,
                            format!("not finished within overall timeout of {:?}", overall_timeout),
                        ),
                        identifier,
                        0,
                    )
                })
            })
            .collect();

        let results = ResultSet::new(outcomes, plan.submission);
        let summary = results.summary();
        info!(
            succeeded = summary.succeeded,
            failed = summary.failed,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Enrichment run finished"
        );

        Ok(results)
    }

    /// Blocking wrapper around `run` for synchronous callers.
    ///
    /// Builds a multi-threaded runtime for the duration of the call. Must not
    /// be called from inside another tokio runtime.
    pub fn run_blocking(
        &self,
        items: &[InputItem],
        max_parallelism: usize,
        overall_timeout: Duration,
    ) -> Result<ResultSet, PipelineError> {
        if max_parallelism == 0 {
            return Err(PipelineError::InvalidParallelism(max_parallelism));
        }

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(max_parallelism.min(16))
            .thread_name("enricher-worker")
            .enable_all()
            .build()?;

        let result = runtime.block_on(self.run(items, max_parallelism, overall_timeout));
        runtime.shutdown_timeout(Duration::from_secs(1));
        result
    }
}

/// Dedup result: one entry per unique identifier plus the submission mapping
struct Plan {
    entries: Vec<Planned>,
    identifiers: Vec<String>,
    submission: Vec<usize>,
}

enum Planned {
    Dispatch(ValidatedItem),
    Rejected(FetchOutcome),
}

impl Plan {
    fn build(items: &[InputItem]) -> Self {
        let mut entries = Vec::new();
        let mut identifiers = Vec::new();
        let mut submission = Vec::with_capacity(items.len());
        let mut seen: HashMap<&str, usize> = HashMap::new();

        for item in items {
            let key = dedup_key(item);
            if let Some(&index) = seen.get(key) {
                debug!(identifier = key, "Duplicate identifier, reusing first outcome");
                submission.push(index);
                continue;
            }

            let index = entries.len();
            seen.insert(key, index);
            submission.push(index);
            identifiers.push(key.to_string());

            entries.push(match validate(item) {
                Ok(validated) => Planned::Dispatch(validated),
                Err(err) => {
                    debug!(identifier = key, "Rejected before dispatch: {}", err.message);
                    Planned::Rejected(FetchOutcome::failure(err, key, 0))
                }
            });
        }

        Self {
            entries,
            identifiers,
            submission,
        }
    }
}

/// Expand, fetch and classify one item; never fails, only records failures
async fn process_item(ctx: &WorkerContext, item: &ValidatedItem) -> FetchOutcome {
    let source = item.identifier.as_str();
    let mut attempts = 0;

    let url = if ctx.config.is_shortener(&item.host) {
        let (resolved, tries) = retry(&ctx.config.retry, "resolve", |_| async move {
            ctx.http
                .resolve(&item.url, ctx.config.http_timeout)
                .await
                .map_err(FetchError::from)
        })
        .await;
        attempts += tries;

        match resolved {
            Ok(url) => {
                debug!(identifier = source, resolved = %url, "Expanded short link");
                url
            }
            Err(err) => return FetchOutcome::failure(err, source, attempts),
        }
    } else {
        item.url.clone()
    };

    let (fetched, tries) = retry(&ctx.config.retry, ctx.fetcher.name(), |_| {
        ctx.fetcher.fetch(&url, &ctx.config.fetcher)
    })
    .await;
    attempts += tries;

    match fetched {
        Ok(mut meta) => {
            if item.hint == Some(ItemHint::Live) || meta.is_live {
                meta.duration_seconds = None;
            }
            let language = ctx
                .classifier
                .classify_fields(&meta.title, &meta.description);
            debug!(identifier = source, attempts, language = %language, "Fetched metadata");
            FetchOutcome::Success(MetadataRecord::from_metadata(meta, language, source))
        }
        Err(err) => {
            debug!(identifier = source, attempts, kind = %err.kind, "Item failed: {}", err.message);
            FetchOutcome::failure(err, source, attempts)
        }
    }
}
