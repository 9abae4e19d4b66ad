//! Wiring configuration into long-lived pipeline handles.

use crate::embeddings::create_embedder;
use crate::pipeline::{Pipeline, PipelineSettings, PromptSet};
use crate::qdrant_index::QdrantIndex;
use crate::search_index::SearchIndex;
use crate::types::ExpansionMode;
use multiquery_core::{AppConfig, AppError, AppResult};
use multiquery_llm::{create_client, LlmClient};
use std::sync::Arc;
use std::time::Duration;

/// Build the chat client for the active provider.
pub fn build_llm(config: &AppConfig) -> AppResult<Arc<dyn LlmClient>> {
    let provider = config.provider.as_str();
    let endpoint = config
        .get_provider_config(provider)
        .and_then(|p| p.endpoint());
    let api_key = config.resolve_api_key(provider);

    tracing::debug!(provider, model = %config.model, "Creating LLM client");

    create_client(provider, endpoint, api_key.as_deref()).map_err(AppError::Config)
}

/// Build the search index, including its query embedder.
pub fn build_index(config: &AppConfig) -> AppResult<Arc<dyn SearchIndex>> {
    let provider = config.embedding_provider();
    let provider_config = config.get_provider_config(provider);
    let endpoint = provider_config.and_then(|p| p.endpoint());
    let model = provider_config.and_then(|p| p.embedding_model());
    let api_key = config.resolve_api_key(provider);

    let embedder = create_embedder(provider, endpoint, model, api_key.as_deref())?;

    tracing::debug!(
        url = %config.index.url,
        collection = %config.index.collection,
        embedder = embedder.provider_name(),
        embedding_model = embedder.model_name(),
        "Creating search index"
    );

    Ok(Arc::new(QdrantIndex::new(&config.index, embedder)?))
}

/// Pipeline settings from configuration.
pub fn pipeline_settings(config: &AppConfig) -> AppResult<PipelineSettings> {
    let mode = ExpansionMode::parse(&config.retrieval.mode).ok_or_else(|| {
        AppError::Config(format!("Unknown retrieval mode: {}", config.retrieval.mode))
    })?;

    let request_timeout = match config.retrieval.request_timeout_secs {
        0 => None,
        secs => Some(Duration::from_secs(secs)),
    };

    Ok(PipelineSettings {
        mode,
        model: config.model.clone(),
        top_k: config.retrieval.top_k,
        max_concurrency: config.retrieval.max_concurrency,
        request_timeout,
        temperature: None,
    })
}

/// Build a ready-to-run pipeline.
pub fn build_pipeline(config: &AppConfig) -> AppResult<Pipeline> {
    config.validate()?;

    let llm = build_llm(config)?;
    let index = build_index(config)?;
    let prompts = PromptSet::resolve(&config.workspace)?;
    let settings = pipeline_settings(config)?;

    tracing::info!(
        provider = llm.provider_name(),
        index = index.name(),
        mode = %settings.mode,
        top_k = settings.top_k,
        "Pipeline ready"
    );

    Ok(Pipeline::new(llm, index, prompts, settings))
}
