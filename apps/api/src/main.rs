mod company;
mod config;
mod db;
mod errors;
mod llm_client;
mod memory;
mod models;
mod pipeline;
mod routes;
mod state;
mod style;
#[cfg(test)]
mod testing;

use anyhow::Result;
use aws_config::Region;
use aws_sdk_s3::config::Credentials;
use std::net::SocketAddr;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use std::sync::Arc;

use crate::company::ScrapingContextProvider;
use crate::config::Config;
use crate::db::create_pool;
use crate::llm_client::LlmClient;
use crate::memory::archive::S3OutcomeArchive;
use crate::memory::pg::PgMemory;
use crate::pipeline::candidates::LlmJobWriter;
use crate::pipeline::persistence::PersistenceBridge;
use crate::pipeline::scorer::LlmJudge;
use crate::pipeline::Collaborators;
use crate::routes::build_router;
use crate::state::AppState;
use crate::style::retriever::PgChunkRetriever;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting job posting API v{}", env!("CARGO_PKG_VERSION"));

    let db = create_pool(&config.database_url).await?;

    let redis = redis::Client::open(config.redis_url.clone())?;
    info!("Redis client initialized");

    let s3 = build_s3_client(&config).await;
    info!("S3 client initialized (bucket: {})", config.s3_bucket);

    let llm = LlmClient::new(config.anthropic_api_key.clone())?;
    info!("LLM client initialized (model: {})", llm_client::MODEL);

    let settings = config.pipeline;
    let memory = Arc::new(PgMemory::new(db.clone()));
    let archive = Arc::new(S3OutcomeArchive::new(s3, config.s3_bucket.clone()));
    let company = ScrapingContextProvider::new(redis, settings.scrape_timeout, settings.company_cache_ttl)?;

    let collaborators = Collaborators {
        generator: Arc::new(LlmJobWriter(llm.clone())),
        judge: Arc::new(LlmJudge(llm)),
        retriever: Arc::new(PgChunkRetriever::new(db)),
        company: Arc::new(company),
        persistence: PersistenceBridge::new(memory.clone(), memory.clone(), archive),
    };
    info!(
        "Pipeline timeouts: generation {}s, judge {}s, scrape {}s, retrieval {}s",
        settings.generation_timeout.as_secs(),
        settings.judge_timeout.as_secs(),
        settings.scrape_timeout.as_secs(),
        settings.retrieval_timeout.as_secs()
    );

    let state = AppState {
        collaborators,
        gold_examples: memory.clone(),
        feedback: memory.clone(),
        generations: memory,
        settings,
    };

    let app = build_router(state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive()),
    );

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Constructs an S3 client configured for MinIO (local) or AWS (production).
async fn build_s3_client(config: &Config) -> aws_sdk_s3::Client {
    let credentials = Credentials::new(
        &config.aws_access_key_id,
        &config.aws_secret_access_key,
        None,
        None,
        "jobpost-static",
    );

    let s3_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(Region::new("us-east-1"))
        .credentials_provider(credentials)
        .endpoint_url(&config.s3_endpoint)
        .load()
        .await;

    aws_sdk_s3::Client::new(&s3_config)
}
