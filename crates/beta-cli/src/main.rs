use std::sync::Arc;

use analysis_core::{AnalysisRequest, AnalysisStore, EmbeddingProvider, PeerTableSource};
use analysis_orchestrator::{BetaOrchestrator, Collaborators, PipelineConfig, SqliteHistoryStore};
use anyhow::{bail, Context, Result};
use chrono::{Months, Utc};
use clap::Parser;
use market_data_client::{MarketDataConfig, PeerTableScraper, YahooClient};
use ml_client::{MLClient, MLConfig};

mod cli;

use cli::{Cli, Commands};

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let json_logging = std::env::var("RUST_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    // Logs go to stderr so stdout carries only the JSON result
    if json_logging {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}

async fn history_store() -> Result<Option<SqliteHistoryStore>> {
    let Ok(url) = std::env::var("DATABASE_URL") else {
        return Ok(None);
    };
    let store = SqliteHistoryStore::new(&url)
        .await
        .with_context(|| format!("failed to open history database {}", url))?;
    Ok(Some(store))
}

fn build_orchestrator(config: PipelineConfig) -> BetaOrchestrator {
    let market = MarketDataConfig::from_env();
    let yahoo = Arc::new(YahooClient::new(&market));
    let ml = MLClient::new(MLConfig::default());

    tracing::info!("Market data: {} ({} req/min)", market.base_url, market.rate_limit_per_minute);
    tracing::info!(
        "Keywords: {}, embeddings: {}",
        ml.keywords.base_url(),
        if ml.embeddings.is_some() { "enabled" } else { "disabled" }
    );

    BetaOrchestrator::new(
        Collaborators {
            prices: yahoo.clone(),
            profiles: yahoo.clone(),
            recommendations: yahoo,
            peer_table: Some(Arc::new(PeerTableScraper::new(&market)) as Arc<dyn PeerTableSource>),
            keywords: Arc::new(ml.keywords),
            embeddings: ml.embeddings.map(|e| Arc::new(e) as Arc<dyn EmbeddingProvider>),
        },
        config,
    )
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze {
            ticker,
            exchange,
            from,
            to,
            no_history,
        } => {
            let end_date = to.unwrap_or_else(|| Utc::now().date_naive());
            let start_date = match from {
                Some(date) => date,
                None => end_date
                    .checked_sub_months(Months::new(12))
                    .context("end date too early to default the start date")?,
            };

            let config = PipelineConfig::from_env();
            tracing::info!(
                "Analyzing {} on {} from {} to {} (top {} peers, deadline {}s)",
                ticker,
                exchange,
                start_date,
                end_date,
                config.scoring.top_n,
                config.request_deadline.as_secs()
            );

            let orchestrator = build_orchestrator(config);
            let request = AnalysisRequest {
                subject_ticker: ticker,
                exchange,
                start_date,
                end_date,
            };

            let result = orchestrator
                .analyze(&request)
                .await
                .with_context(|| format!("analysis of {} failed", request.subject_ticker))?;

            println!("{}", serde_json::to_string_pretty(&result)?);

            // The process exits right after, so save in the foreground
            if !no_history {
                if let Some(store) = history_store().await? {
                    if let Err(e) = store.save(&result).await {
                        tracing::warn!("Failed to record analysis: {}", e);
                    }
                }
            }
        }
        Commands::History { limit } => {
            let Some(store) = history_store().await? else {
                bail!("DATABASE_URL is not set; no search history is available");
            };
            let recent = store.recent(limit).await.context("failed to read search history")?;
            println!("{}", serde_json::to_string_pretty(&recent)?);
        }
    }

    Ok(())
}
