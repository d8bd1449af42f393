//! Wiring from configuration to runnable services.

use std::sync::Arc;

use anyhow::{Context, Result};
use assay_extraction::{ExtractionService, TableSummarizer};
use assay_llm::{
    create_embedding_provider_with_limiter, create_generation_provider_with_limiter,
    ProviderRegistry, RateLimiter,
};
use assay_neo4j::{GraphWriter, Neo4jClient, Neo4jConfig, VisualizationService};
use assay_parser::PlainTextParser;
use assay_pipeline::{IngestPipeline, PipelineDeps};
use assay_qdrant::{QdrantClient, QdrantConfig, VectorService};
use assay_query::{
    AnswerSynthesizer, GraphRetriever, HybridRetriever, IntentClassifier, QueryWorkflow,
    VectorRetriever,
};
use assay_sqlite::{create_report_store, SqliteConfig, SqlitePool};
use tracing::debug;

use crate::config::AssayConfig;

/// All services the commands dispatch into, built once per invocation.
pub struct App {
    pub pipeline: IngestPipeline,
    pub workflow: QueryWorkflow,
    pub visualization: Arc<VisualizationService>,
}

pub async fn build(config: &AssayConfig) -> Result<App> {
    let pool = SqlitePool::new(SqliteConfig::new(&config.database.path))
        .context("failed to open report database")?;
    let store = create_report_store(pool);

    // One sliding-window budget for every LLM call this process makes.
    let limiter = Arc::new(RateLimiter::new(config.providers.calls_per_minute));
    let generation =
        create_generation_provider_with_limiter(&config.providers.generation, Some(limiter.clone()))
            .context("failed to build generation provider")?;
    let embeddings =
        create_embedding_provider_with_limiter(&config.providers.embedding, Some(limiter))
            .context("failed to build embedding provider")?;
    debug!(
        generation = generation.name(),
        embedding = embeddings.name(),
        "providers ready"
    );

    let mut neo4j_config = Neo4jConfig::new(
        config.neo4j.uri.clone(),
        config.neo4j.username.clone(),
        config.neo4j.password.clone(),
    );
    neo4j_config.database = config.neo4j.database.clone();
    let neo4j = Arc::new(Neo4jClient::new(neo4j_config));

    let qdrant = Arc::new(QdrantClient::new(QdrantConfig::new(
        config.qdrant.url.clone(),
        config.qdrant.collection.clone(),
        embeddings.dimensions(),
    )));
    qdrant
        .ensure_collection()
        .await
        .context("failed to prepare vector collection")?;

    let vectors = Arc::new(VectorService::new(qdrant, embeddings.clone()));
    let extraction = Arc::new(ExtractionService::new(generation.clone()));

    let deps = PipelineDeps {
        store,
        parser: Arc::new(PlainTextParser::new()),
        table_analyzer: Some(Arc::new(TableSummarizer::new(generation.clone()))),
        extraction,
        graph: Arc::new(GraphWriter::new(neo4j.clone())),
        vectors: vectors.clone(),
        visualization: Arc::new(VisualizationService::new(neo4j.clone())),
    };
    let pipeline = IngestPipeline::new(deps, config.pipeline.clone());

    let registry = ProviderRegistry::builder()
        .generation(generation.name().to_string(), generation.clone())
        .embedding(embeddings.name().to_string(), embeddings)
        .build();
    let workflow = QueryWorkflow::new(
        IntentClassifier::new(generation.clone()),
        HybridRetriever::new(
            GraphRetriever::new(generation.clone(), neo4j.clone()),
            VectorRetriever::new(vectors),
        ),
        AnswerSynthesizer::new(generation),
    )
    .with_registry(registry);

    Ok(App {
        pipeline,
        workflow,
        visualization: Arc::new(VisualizationService::new(neo4j)),
    })
}
