//! Shared LLM state: providers, routing, tool dispatch and storage

use std::sync::Arc;
use std::time::Instant;

use indexmap::IndexMap;
use switchyard_config::Config;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::audit::{ConversationLog, NdjsonConversationLog, NoopConversationLog};
use crate::discovery::CatalogRefresher;
use crate::error::LlmError;
use crate::format;
use crate::provider::{self, Provider};
use crate::routing::{ModelRouter, ResolvedModel};
use crate::store::{InMemoryResponseStore, ResponseStore};
use crate::stream::{self, FrameStream};
use crate::tools::{StaticRegistry, ToolDispatcher, ToolRegistry};
use crate::types::{CompletionRequest, CompletionResponse, FinishReason};

/// Shared state for LLM route handlers
#[derive(Clone)]
pub struct LlmState {
    inner: Arc<LlmStateInner>,
}

struct LlmStateInner {
    router: Arc<ModelRouter>,
    providers: IndexMap<String, Arc<dyn Provider>>,
    refresher: Arc<CatalogRefresher>,
    dispatcher: Option<ToolDispatcher>,
    store: Option<Arc<dyn ResponseStore>>,
    conversation_log: Arc<dyn ConversationLog>,
}

/// One `(model, provider)` catalog entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListedModel {
    pub id: String,
    pub provider: String,
}

impl LlmState {
    /// Build state from configuration with the built-in tools
    ///
    /// # Errors
    ///
    /// Returns `LlmError::Configuration` if a provider cannot be built or
    /// the default provider is missing.
    pub async fn from_config(config: &Config) -> Result<Self, LlmError> {
        Self::with_registry(config, Arc::new(StaticRegistry::builtin())).await
    }

    /// Build state from configuration with a custom tool registry
    ///
    /// Provider catalogs are fetched once before returning.
    ///
    /// # Errors
    ///
    /// Returns `LlmError::Configuration` if a provider cannot be built or
    /// the default provider is missing.
    pub async fn with_registry(config: &Config, registry: Arc<dyn ToolRegistry>) -> Result<Self, LlmError> {
        let llm = &config.llm;

        let default_provider = llm
            .default_provider
            .clone()
            .ok_or_else(|| LlmError::Configuration("llm.default_provider must be set".to_owned()))?;

        if !llm.providers.contains_key(&default_provider) {
            return Err(LlmError::Configuration(format!(
                "llm.default_provider '{default_provider}' does not name a configured provider"
            )));
        }

        let timeout = llm
            .request_timeout()
            .map_err(|e| LlmError::Configuration(format!("{e:#}")))?;
        let interval = llm
            .discovery_interval()
            .map_err(|e| LlmError::Configuration(format!("{e:#}")))?;

        let router = Arc::new(ModelRouter::new(default_provider));
        let mut refresher = CatalogRefresher::new(Arc::clone(&router), interval);
        let mut providers = IndexMap::with_capacity(llm.providers.len());

        for (name, provider_config) in &llm.providers {
            let provider = provider::build_provider(name, provider_config, timeout)?;
            refresher.add_source(Arc::clone(&provider), provider_config)?;
            providers.insert(name.clone(), provider);
        }

        refresher.refresh().await;

        let dispatcher = config
            .tools
            .enabled
            .then(|| ToolDispatcher::new(registry, config.tools.max_iterations));

        let store = config
            .responses
            .store
            .then(|| Arc::new(InMemoryResponseStore::default()) as Arc<dyn ResponseStore>);

        let conversation_log: Arc<dyn ConversationLog> = if config.conversation_log.enabled {
            let log = NdjsonConversationLog::new(&config.conversation_log.directory);
            tracing::info!(path = %log.path().display(), "conversation log enabled");
            Arc::new(log)
        } else {
            Arc::new(NoopConversationLog)
        };

        tracing::info!(
            providers = providers.len(),
            default_provider = %router.default_provider(),
            tools = dispatcher.is_some(),
            "LLM state initialized"
        );

        Ok(Self {
            inner: Arc::new(LlmStateInner {
                router,
                providers,
                refresher: Arc::new(refresher),
                dispatcher,
                store,
                conversation_log,
            }),
        })
    }

    /// Keep provider catalogs fresh until `shutdown` fires
    pub fn start_discovery(&self, shutdown: CancellationToken) -> JoinHandle<()> {
        Arc::clone(&self.inner.refresher).spawn(shutdown)
    }

    async fn resolve(&self, model: &str) -> Result<(ResolvedModel, Arc<dyn Provider>), LlmError> {
        let resolved = self.inner.router.resolve(model).await;
        let provider = self.provider(&resolved.provider_name)?;

        tracing::debug!(
            model = %model,
            provider = %resolved.provider_name,
            matched = resolved.match_kind.as_str(),
            "model resolved"
        );

        Ok((resolved, provider))
    }

    fn provider(&self, name: &str) -> Result<Arc<dyn Provider>, LlmError> {
        self.inner
            .providers
            .get(name)
            .cloned()
            .ok_or_else(|| LlmError::ProviderNotFound {
                provider: name.to_owned(),
            })
    }

    /// Execute a non-streaming completion, running requested tools locally
    ///
    /// # Errors
    ///
    /// Returns an error if the request is invalid or the backend fails
    pub async fn complete(&self, mut request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let started = Instant::now();
        let descriptors = request.validate()?;
        let (resolved, provider) = self.resolve(&request.model).await?;

        request.model.clone_from(&resolved.model_id);
        request.stream = false;

        let response = match &self.inner.dispatcher {
            Some(dispatcher) => dispatcher.run(provider.as_ref(), &request, &descriptors).await?,
            None => provider.complete(&request).await?,
        };

        let response = format::finalize(response, &request.model);

        if let Some(store) = &self.inner.store
            && !store.insert(response.clone())
        {
            tracing::warn!(id = %response.id, "response id already stored");
        }

        tracing::info!(
            provider = %resolved.provider_name,
            model = %response.model,
            id = %response.id,
            finish_reason = response.choices.first().and_then(|c| c.finish_reason).map_or("none", FinishReason::as_str),
            latency = ?started.elapsed(),
            "completion finished"
        );

        Ok(response)
    }

    /// Execute a streaming completion
    ///
    /// Tool calls emitted by the backend are forwarded to the caller.
    ///
    /// # Errors
    ///
    /// Returns an error if the request is invalid or the backend rejects
    /// the call before streaming starts
    pub async fn complete_stream(&self, mut request: CompletionRequest) -> Result<FrameStream, LlmError> {
        let started = Instant::now();
        request.validate()?;
        let (resolved, provider) = self.resolve(&request.model).await?;

        request.model.clone_from(&resolved.model_id);
        request.stream = true;

        let events = provider.complete_stream(&request).await?;

        tracing::info!(
            provider = %resolved.provider_name,
            model = %request.model,
            latency = ?started.elapsed(),
            "stream started"
        );

        Ok(stream::translate(events, request.model))
    }

    /// Catalog entries, optionally restricted to one provider
    ///
    /// # Errors
    ///
    /// Returns `LlmError::ProviderNotFound` for an unknown provider filter
    pub async fn list_models(&self, provider: Option<&str>) -> Result<Vec<ListedModel>, LlmError> {
        if let Some(name) = provider {
            self.provider(name)?;
        }

        let table = self.inner.router.snapshot().await;
        Ok(table
            .entries()
            .filter(|(_, owner)| provider.is_none_or(|p| p == *owner))
            .map(|(id, owner)| ListedModel {
                id: id.to_owned(),
                provider: owner.to_owned(),
            })
            .collect())
    }

    /// Stored response by id
    ///
    /// # Errors
    ///
    /// Returns `LlmError::ResponseNotFound` if nothing is stored under `id`
    pub fn stored_response(&self, id: &str) -> Result<CompletionResponse, LlmError> {
        self.inner
            .store
            .as_ref()
            .and_then(|store| store.get(id))
            .ok_or_else(|| LlmError::ResponseNotFound { id: id.to_owned() })
    }

    /// Every stored response, oldest first
    pub fn stored_responses(&self) -> Vec<CompletionResponse> {
        self.inner.store.as_ref().map(|store| store.list()).unwrap_or_default()
    }

    /// Configured provider names in declaration order
    pub fn provider_names(&self) -> Vec<String> {
        self.inner.providers.keys().cloned().collect()
    }

    pub fn default_provider(&self) -> &str {
        self.inner.router.default_provider()
    }

    pub fn conversation_log(&self) -> &dyn ConversationLog {
        self.inner.conversation_log.as_ref()
    }
}
