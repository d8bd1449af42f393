//! The full query workflow: classify, retrieve, synthesize.

use assay_llm::ProviderRegistry;
use tracing::info;

use crate::intent::{IntentClassifier, QueryIntent};
use crate::retrieve::HybridRetriever;
use crate::state::{QueryResponse, QueryState};
use crate::synthesize::AnswerSynthesizer;

/// Which retrieval sides a run consults. Derived from the classified intent;
/// the default derivation consults both sides regardless, keeping the intent
/// advisory. Overriding [`QueryWorkflow::plan_for`] input is the seam for
/// gating retrieval on intent later.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetrievalPlan {
    pub use_graph: bool,
    pub use_vectors: bool,
}

impl RetrievalPlan {
    pub fn both() -> Self {
        Self {
            use_graph: true,
            use_vectors: true,
        }
    }
}

/// Per-run options: conversation attribution and generation-provider
/// selection by registry name.
#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    pub conversation_id: Option<String>,
    pub provider: Option<String>,
}

/// End-to-end question answering. [`run`](Self::run) is infallible by
/// contract: every internal failure is recorded in the response's `errors`
/// and degrades the answer rather than aborting the workflow.
pub struct QueryWorkflow {
    classifier: IntentClassifier,
    retriever: HybridRetriever,
    synthesizer: AnswerSynthesizer,
    registry: Option<ProviderRegistry>,
}

impl QueryWorkflow {
    pub fn new(
        classifier: IntentClassifier,
        retriever: HybridRetriever,
        synthesizer: AnswerSynthesizer,
    ) -> Self {
        Self {
            classifier,
            retriever,
            synthesizer,
            registry: None,
        }
    }

    /// Attach a provider registry so [`QueryOptions::provider`] can name an
    /// alternative generation provider for a single run.
    pub fn with_registry(mut self, registry: ProviderRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Map an intent to a retrieval plan. Currently every intent consults
    /// both sides; the classification is recorded for observability only.
    pub fn plan_for(&self, _intent: QueryIntent) -> RetrievalPlan {
        RetrievalPlan::both()
    }

    pub async fn run(&self, question: &str) -> QueryResponse {
        self.run_with(question, QueryOptions::default()).await
    }

    pub async fn run_with(&self, question: &str, options: QueryOptions) -> QueryResponse {
        let mut state = QueryState::new(question);
        state.conversation_id = options.conversation_id;

        // Provider override degrades like every other step: an unknown name
        // records an error and the run proceeds on the default provider.
        let override_provider = match (&options.provider, &self.registry) {
            (Some(name), Some(registry)) => match registry.generation(Some(name)) {
                Ok(provider) => Some(provider),
                Err(err) => {
                    state.add_error("provider_selection", err);
                    None
                }
            },
            (Some(name), None) => {
                state.add_error(
                    "provider_selection",
                    format!("no provider registry configured, cannot select {name:?}"),
                );
                None
            }
            (None, _) => None,
        };
        let (classifier, retriever, synthesizer) = match override_provider {
            Some(provider) => (
                self.classifier.with_provider(provider.clone()),
                self.retriever.with_provider(provider.clone()),
                self.synthesizer.with_provider(provider),
            ),
            None => (
                self.classifier.clone(),
                self.retriever.clone(),
                self.synthesizer.clone(),
            ),
        };

        let (intent, confidence, error) = classifier.classify(question).await;
        state.intent = Some(intent);
        state.intent_confidence = Some(confidence);
        if let Some(error) = error {
            state.add_error("intent_classification", error);
        }

        let plan = self.plan_for(intent);
        retriever
            .retrieve(&mut state, plan.use_graph, plan.use_vectors)
            .await;

        synthesizer.synthesize(&mut state).await;

        info!(
            intent = intent.as_str(),
            confidence,
            graph_rows = state.graph_rows.len(),
            vector_hits = state.vector_hits.len(),
            errors = state.errors.len(),
            "query complete"
        );
        state.into_response()
    }
}
