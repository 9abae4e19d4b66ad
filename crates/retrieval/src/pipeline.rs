//! The question-answering pipeline.
//!
//! EXPANDING -> RETRIEVING -> AGGREGATING -> GENERATING, wrapped in one
//! request-level deadline. Expansion parse failures fall through with
//! `[original]`; any external failure ends the run.

use crate::answer::AnswerGenerator;
use crate::context::assemble_context;
use crate::dedup::deduplicate;
use crate::expansion::{Expansion, QueryExpander};
use crate::fanout::fan_out;
use crate::search_index::SearchIndex;
use crate::types::{AskOptions, DocumentPool, ExpansionMode, GenerationRequest, SearchHit};
use multiquery_core::{AppError, AppResult};
use multiquery_llm::{LlmClient, LlmUsage};
use multiquery_prompt::{
    builtin_prompt, resolve_prompt, PromptDefinition, ANSWER_PROMPT_ID, DECOMPOSE_PROMPT_ID,
    PARAPHRASE_PROMPT_ID,
};
use serde::Serialize;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Where a pipeline run is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineStage {
    Start,
    Expanding,
    Retrieving,
    Aggregating,
    Generating,
    Done,
    Failed,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Start => "start",
            Self::Expanding => "expanding",
            Self::Retrieving => "retrieving",
            Self::Aggregating => "aggregating",
            Self::Generating => "generating",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Fixed settings shared by every run.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Default expansion mode
    pub mode: ExpansionMode,

    /// Model used for expansion and answers
    pub model: String,

    /// Default documents per search call
    pub top_k: usize,

    /// Upper bound on concurrent search calls
    pub max_concurrency: usize,

    /// Whole-run deadline; `None` disables it
    pub request_timeout: Option<Duration>,

    pub temperature: Option<f32>,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            mode: ExpansionMode::Decompose,
            model: "gemini-2.0-flash".to_string(),
            top_k: 3,
            max_concurrency: 8,
            request_timeout: Some(Duration::from_secs(120)),
            temperature: None,
        }
    }
}

/// The three prompt definitions a pipeline renders.
#[derive(Debug, Clone)]
pub struct PromptSet {
    pub answer: PromptDefinition,
    pub decompose: PromptDefinition,
    pub paraphrase: PromptDefinition,
}

impl PromptSet {
    /// Built-in prompts only.
    pub fn builtin() -> AppResult<Self> {
        let lookup = |id: &str| {
            builtin_prompt(id)
                .ok_or_else(|| AppError::Prompt(format!("Missing built-in prompt: {}", id)))
        };

        Ok(Self {
            answer: lookup(ANSWER_PROMPT_ID)?,
            decompose: lookup(DECOMPOSE_PROMPT_ID)?,
            paraphrase: lookup(PARAPHRASE_PROMPT_ID)?,
        })
    }

    /// Workspace overrides where present, built-ins otherwise.
    pub fn resolve(workspace: &Path) -> AppResult<Self> {
        Ok(Self {
            answer: resolve_prompt(workspace, ANSWER_PROMPT_ID)?,
            decompose: resolve_prompt(workspace, DECOMPOSE_PROMPT_ID)?,
            paraphrase: resolve_prompt(workspace, PARAPHRASE_PROMPT_ID)?,
        })
    }
}

/// Documents retrieved by one query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryCount {
    pub query: String,
    pub documents: usize,
}

/// Everything one run produced, in the order it was produced.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub question: String,
    pub mode: ExpansionMode,
    pub expansion: Expansion,
    pub retrieval_counts: Vec<QueryCount>,

    /// Documents before deduplication
    pub total_documents: usize,

    /// Documents after deduplication
    pub unique_documents: usize,

    pub documents: DocumentPool,
    pub context: String,
    pub answer: String,
    pub model: String,
    pub usage: LlmUsage,
}

/// Long-lived pipeline handle.
///
/// Holds only read-only state, so one instance can serve concurrent
/// questions; clone it freely.
#[derive(Clone)]
pub struct Pipeline {
    expander: QueryExpander,
    answerer: AnswerGenerator,
    index: Arc<dyn SearchIndex>,
    settings: PipelineSettings,
}

impl Pipeline {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        index: Arc<dyn SearchIndex>,
        prompts: PromptSet,
        settings: PipelineSettings,
    ) -> Self {
        let expander = QueryExpander::new(
            llm.clone(),
            settings.model.clone(),
            prompts.decompose,
            prompts.paraphrase,
        )
        .with_temperature(settings.temperature);

        let answerer = AnswerGenerator::new(llm, settings.model.clone(), prompts.answer)
            .with_temperature(settings.temperature);

        Self {
            expander,
            answerer,
            index,
            settings,
        }
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Expansion only.
    pub async fn expand(&self, question: &str, mode: Option<ExpansionMode>) -> AppResult<Expansion> {
        self.expander
            .expand(question, mode.unwrap_or(self.settings.mode))
            .await
    }

    /// One direct search call.
    pub async fn search(&self, query: &str, top_k: Option<usize>) -> AppResult<Vec<SearchHit>> {
        let k = top_k.unwrap_or(self.settings.top_k);
        self.index
            .search(query, k)
            .await
            .map_err(|e| AppError::Retrieval {
                query: query.to_string(),
                message: e.to_string(),
            })
    }

    /// Answer one question end to end.
    pub async fn run(&self, options: AskOptions) -> AppResult<PipelineReport> {
        let mut stage = PipelineStage::Start;

        let result = match self.settings.request_timeout {
            Some(deadline) => {
                match tokio::time::timeout(deadline, self.run_stages(&options, &mut stage)).await {
                    Ok(result) => result,
                    Err(_) => Err(AppError::Timeout {
                        millis: u64::try_from(deadline.as_millis()).unwrap_or(u64::MAX),
                    }),
                }
            }
            None => self.run_stages(&options, &mut stage).await,
        };

        match result {
            Ok(report) => {
                tracing::debug!(stage = %PipelineStage::Done, "Pipeline finished");
                Ok(report)
            }
            Err(e) => {
                tracing::error!(
                    stage = %PipelineStage::Failed,
                    failed_during = %stage,
                    error = %e,
                    "Pipeline failed"
                );
                Err(e)
            }
        }
    }

    async fn run_stages(
        &self,
        options: &AskOptions,
        stage: &mut PipelineStage,
    ) -> AppResult<PipelineReport> {
        let question = options.question.as_str();
        let mode = options.mode.unwrap_or(self.settings.mode);
        let top_k = options.top_k.unwrap_or(self.settings.top_k);

        *stage = PipelineStage::Expanding;
        let expansion = self.expander.expand(question, mode).await?;

        *stage = PipelineStage::Retrieving;
        let fanout = fan_out(
            self.index.as_ref(),
            &expansion.queries,
            top_k,
            self.settings.max_concurrency,
        )
        .await?;

        *stage = PipelineStage::Aggregating;
        let retrieval_counts = fanout
            .counts()
            .into_iter()
            .map(|(query, documents)| QueryCount { query, documents })
            .collect();
        let total_documents = fanout.total();
        let documents = deduplicate(fanout.into_documents());
        let context = assemble_context(&documents);

        tracing::info!(
            total = total_documents,
            unique = documents.len(),
            "Aggregated retrieved documents"
        );

        *stage = PipelineStage::Generating;
        let generation = self
            .answerer
            .generate(&GenerationRequest {
                question: question.to_string(),
                context: context.clone(),
            })
            .await?;

        *stage = PipelineStage::Done;

        Ok(PipelineReport {
            question: question.to_string(),
            mode,
            expansion,
            retrieval_counts,
            total_documents,
            unique_documents: documents.len(),
            documents,
            context,
            answer: generation.answer,
            model: generation.model,
            usage: generation.usage,
        })
    }
}
