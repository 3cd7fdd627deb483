// video-enricher - command-line driver for the enrichment pipeline
//
// Reads identifiers from the arguments (or stdin, one per line), runs the
// pipeline and prints the results as a table or JSON.

use std::io::Read;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use video_enricher::enricher::extractors::{normalize_timestamp, ExtractorMode};
use video_enricher::{
    FetchOutcome, InputItem, ItemHint, LanguageCode, Orchestrator, PipelineConfig, ResultFilter,
};

#[derive(Parser, Debug)]
#[command(name = "video-enricher")]
#[command(about = "Fetch video metadata concurrently and detect its language")]
#[command(version)]
struct Args {
    /// Video URLs or 11-character YouTube IDs; read from stdin when omitted
    identifiers: Vec<String>,

    /// Concurrent fetches
    #[arg(short, long)]
    parallelism: Option<usize>,

    /// Deadline for the whole run, in seconds
    #[arg(short, long)]
    timeout: Option<u64>,

    /// Proxy for yt-dlp and HTTP lookups (http://, https:// or socks5://)
    #[arg(long, env = "ENRICHER_PROXY")]
    proxy: Option<String>,

    /// yt-dlp flavour: auto, python or cli
    #[arg(long, default_value = "auto", value_parser = parse_mode)]
    mode: ExtractorMode,

    /// Treat bare IDs as YouTube Shorts
    #[arg(long)]
    shorts: bool,

    /// Print the result set as JSON
    #[arg(long)]
    json: bool,

    /// Keep records published at or after this date (YYYY-MM-DD or RFC 3339)
    #[arg(long, value_parser = parse_date)]
    after: Option<OffsetDateTime>,

    /// Keep records published at or before this date (YYYY-MM-DD or RFC 3339)
    #[arg(long, value_parser = parse_date)]
    before: Option<OffsetDateTime>,

    /// Keep records in this language (ISO 639-3, e.g. eng)
    #[arg(long)]
    language: Option<String>,

    /// Keep records whose title or description contains this text
    #[arg(short, long)]
    keyword: Option<String>,
}

fn parse_mode(raw: &str) -> Result<ExtractorMode, String> {
    match raw.to_ascii_lowercase().as_str() {
        "auto" => Ok(ExtractorMode::Auto),
        "python" => Ok(ExtractorMode::Python),
        "cli" => Ok(ExtractorMode::Cli),
        other => Err(format!("unknown mode '{}', expected auto, python or cli", other)),
    }
}

fn parse_date(raw: &str) -> Result<OffsetDateTime, String> {
    normalize_timestamp(raw).ok_or_else(|| format!("unrecognized date '{}'", raw))
}

impl Args {
    fn config(&self) -> PipelineConfig {
        let mut config = PipelineConfig::from_env();
        if let Some(parallelism) = self.parallelism {
            config = config.with_max_parallelism(parallelism);
        }
        if let Some(secs) = self.timeout {
            config = config.with_overall_timeout(Duration::from_secs(secs));
        }
        config.fetcher.mode = self.mode;
        if self.proxy.is_some() {
            config.fetcher.proxy = self.proxy.clone();
        }
        config
    }

    fn filter(&self) -> ResultFilter {
        ResultFilter {
            published_after: self.after,
            published_before: self.before,
            language: self.language.clone().map(LanguageCode::new),
            keyword: self.keyword.clone(),
        }
    }

    fn items(&self) -> Result<Vec<InputItem>> {
        let lines = if self.identifiers.is_empty() {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read identifiers from stdin")?;
            buf.lines()
                .map(str::trim)
                .filter(|l| !l.is_empty() && !l.starts_with('#'))
                .map(String::from)
                .collect()
        } else {
            self.identifiers.clone()
        };

        if lines.is_empty() {
            bail!("No identifiers given");
        }

        Ok(lines
            .into_iter()
            .map(|id| {
                let item = InputItem::new(id);
                if self.shorts {
                    item.with_hint(ItemHint::Short)
                } else {
                    item
                }
            })
            .collect())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    let items = args.items()?;
    let config = args.config();
    let filter = args.filter();

    info!(items = items.len(), mode = %config.fetcher.mode, "Enriching");

    let orchestrator = Orchestrator::with_defaults(config).context("Invalid configuration")?;
    let results = orchestrator
        .run_with_config(&items)
        .await
        .context("Enrichment run rejected")?;

    if args.json {
        let output = if filter.is_empty() {
            serde_json::to_string_pretty(&results.outcomes())?
        } else {
            serde_json::to_string_pretty(&filter.apply(&results))?
        };
        println!("{}", output);
        return Ok(());
    }

    for outcome in &results {
        match outcome {
            FetchOutcome::Success(record) if filter.matches(record) => {
                let published = record
                    .published_at
                    .and_then(|at| at.format(&Rfc3339).ok())
                    .unwrap_or_else(|| "-".to_string());
                let duration = record
                    .duration_seconds
                    .map(|d| format!("{:.0}s", d))
                    .unwrap_or_else(|| "-".to_string());
                println!(
                    "OK    {:<8} {:<21} {:>7}  {}  [{}]",
                    record.language.as_str(),
                    published,
                    duration,
                    record.title,
                    record.source
                );
            }
            FetchOutcome::Success(_) => {}
            FetchOutcome::Failure(failure) => {
                println!(
                    "FAIL  {:<16} {}  [{}] ({} attempts)",
                    failure.kind.to_string(),
                    failure.message,
                    failure.source,
                    failure.attempts
                );
            }
        }
    }

    let summary = results.summary();
    println!();
    println!("{} succeeded, {} failed", summary.succeeded, summary.failed);
    for (kind, count) in &summary.failures_by_kind {
        println!("  {}: {}", kind, count);
    }

    Ok(())
}
