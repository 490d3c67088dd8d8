//! One-call query answering.
//!
//! [`QueryEngine`] parses a question with the [`QueryParser`] and hands the
//! result to the [`SearchDispatcher`], all inside a fresh [`QueryContext`]
//! so that logs and analytics share one query id.

use crate::config::EngineConfig;
use crate::dispatch::SearchDispatcher;
use crate::embedding::{ImageEmbedder, TextEmbedder};
use crate::llm::{LlmProvider, build_provider};
use crate::models::{ParsedQuery, ResponseEnvelope};
use crate::observability::{Analytics, QueryContext, enter_query_context, scope_query_context};
use crate::query::QueryParser;
use crate::security::AccessControl;
use crate::storage::VectorStore;
use crate::{Error, Result};
use serde::Serialize;
use std::sync::Arc;
use tracing::instrument;

/// Parse and dispatch result for one question.
#[derive(Debug, Clone, Serialize)]
pub struct EngineAnswer {
    /// Correlation id of this query.
    pub query_id: String,
    /// Classification and extracted parameters.
    pub parsed: ParsedQuery,
    /// Dispatch result.
    pub response: ResponseEnvelope,
}

/// Parser and dispatcher bundled.
#[derive(Debug, Clone)]
pub struct QueryEngine {
    parser: QueryParser,
    dispatcher: SearchDispatcher,
}

impl QueryEngine {
    /// Starts building an engine.
    #[must_use]
    pub fn builder(config: EngineConfig) -> QueryEngineBuilder {
        QueryEngineBuilder::new(config)
    }

    /// Creates an engine from existing parts.
    #[must_use]
    pub const fn from_parts(parser: QueryParser, dispatcher: SearchDispatcher) -> Self {
        Self { parser, dispatcher }
    }

    /// Returns the parser.
    #[must_use]
    pub const fn parser(&self) -> &QueryParser {
        &self.parser
    }

    /// Returns the dispatcher.
    #[must_use]
    pub const fn dispatcher(&self) -> &SearchDispatcher {
        &self.dispatcher
    }

    /// Parses `text`. With an external service configured, parsing runs on
    /// the blocking pool so that service calls do not stall the runtime.
    pub async fn parse(&self, text: &str) -> ParsedQuery {
        if self.parser.classifier().provider().is_none() {
            return self.parser.parse(text);
        }

        let parser = self.parser.clone();
        let owned = text.to_string();
        let context = crate::observability::current_query_id().map(QueryContext::from_id);
        let joined = tokio::task::spawn_blocking(move || {
            let _guard = context.map(enter_query_context);
            parser.parse(&owned)
        })
        .await;

        match joined {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::error!(error = %e, "Parse task failed, using rule-based parser");
                QueryParser::new().parse(text)
            },
        }
    }

    /// Parses and dispatches `text` on behalf of `user_id`. Never fails; a
    /// failed search is reported in the response envelope.
    #[instrument(name = "query.answer", skip(self, text, user_id))]
    pub async fn answer(&self, text: &str, user_id: Option<&str>) -> EngineAnswer {
        let context = QueryContext::new();
        let query_id = context.query_id().to_string();

        scope_query_context(context, async {
            let parsed = self.parse(text).await;
            let mut parameters = parsed.parameters.clone();
            parameters.query_id = Some(query_id.clone());

            let response = self
                .dispatcher
                .dispatch(parsed.search_text(), parsed.intent, parameters, user_id)
                .await;

            EngineAnswer {
                query_id: query_id.clone(),
                parsed,
                response,
            }
        })
        .await
    }
}

/// Builder for [`QueryEngine`].
pub struct QueryEngineBuilder {
    config: EngineConfig,
    vector_store: Option<Arc<dyn VectorStore>>,
    text_embedder: Option<Arc<dyn TextEmbedder>>,
    image_embedder: Option<Arc<dyn ImageEmbedder>>,
    access_control: Option<Arc<dyn AccessControl>>,
    analytics: Option<Arc<dyn Analytics>>,
    llm: Option<Arc<dyn LlmProvider>>,
}

impl QueryEngineBuilder {
    /// Creates a builder with no collaborators.
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            vector_store: None,
            text_embedder: None,
            image_embedder: None,
            access_control: None,
            analytics: None,
            llm: None,
        }
    }

    /// Sets the vector database.
    #[must_use]
    pub fn vector_store(mut self, store: Arc<dyn VectorStore>) -> Self {
        self.vector_store = Some(store);
        self
    }

    /// Sets the text embedder.
    #[must_use]
    pub fn text_embedder(mut self, embedder: Arc<dyn TextEmbedder>) -> Self {
        self.text_embedder = Some(embedder);
        self
    }

    /// Sets the image embedder.
    #[must_use]
    pub fn image_embedder(mut self, embedder: Arc<dyn ImageEmbedder>) -> Self {
        self.image_embedder = Some(embedder);
        self
    }

    /// Sets the access-control collaborator.
    #[must_use]
    pub fn access_control(mut self, access_control: Arc<dyn AccessControl>) -> Self {
        self.access_control = Some(access_control);
        self
    }

    /// Sets the analytics collaborator.
    #[must_use]
    pub fn analytics(mut self, analytics: Arc<dyn Analytics>) -> Self {
        self.analytics = Some(analytics);
        self
    }

    /// Sets the classification service, overriding the configured one.
    /// Used only when `classifier.use_llm` is set.
    #[must_use]
    pub fn llm(mut self, provider: Arc<dyn LlmProvider>) -> Self {
        self.llm = Some(provider);
        self
    }

    /// Builds the engine.
    ///
    /// # Errors
    ///
    /// Returns an error if the vector store or an embedder is missing.
    pub fn build(self) -> Result<QueryEngine> {
        let missing = |what: &str| Error::OperationFailed {
            operation: "build_query_engine".to_string(),
            cause: format!("{what} not configured"),
        };
        let store = self.vector_store.ok_or_else(|| missing("vector store"))?;
        let text_embedder = self.text_embedder.ok_or_else(|| missing("text embedder"))?;
        let image_embedder = self
            .image_embedder
            .ok_or_else(|| missing("image embedder"))?;

        let provider = if self.config.classifier.use_llm {
            self.llm.or_else(|| build_provider(&self.config.llm))
        } else {
            None
        };
        if self.config.classifier.use_llm && provider.is_none() {
            tracing::warn!("LLM classification enabled but no provider available, using rules");
        }
        let parser = QueryParser::from_config(&self.config.classifier, provider);

        let mut dispatcher =
            SearchDispatcher::new(store, text_embedder, image_embedder, self.config.dispatch);
        if let Some(access_control) = self.access_control {
            dispatcher = dispatcher.with_access_control(access_control);
        }
        if let Some(analytics) = self.analytics {
            dispatcher = dispatcher.with_analytics(analytics);
        }

        Ok(QueryEngine::from_parts(parser, dispatcher))
    }
}
