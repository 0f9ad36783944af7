//! Background model catalog discovery and refresh
//!
//! Fetches the model list of every configured provider, applies the
//! include/exclude filters and swaps the resulting table into the router.

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use regex::Regex;
use switchyard_config::{LlmProviderConfig, ModelConfig};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::LlmError;
use crate::provider::Provider;
use crate::routing::{ModelRouter, ModelTable};

/// Include/exclude regex filter over model ids
#[derive(Debug, Clone, Default)]
pub struct ModelFilter {
    include: Vec<Regex>,
    exclude: Vec<Regex>,
}

impl ModelFilter {
    /// Compile the patterns of a provider's `models` table
    pub fn from_config(config: &ModelConfig) -> Result<Self, LlmError> {
        let compile = |patterns: &[String]| {
            patterns
                .iter()
                .map(|p| Regex::new(p).map_err(|e| LlmError::Configuration(format!("invalid model pattern '{p}': {e}"))))
                .collect::<Result<Vec<_>, _>>()
        };

        Ok(Self {
            include: compile(&config.include)?,
            exclude: compile(&config.exclude)?,
        })
    }

    /// Whether a model id passes the filter
    ///
    /// No include patterns means every model is included.
    pub fn allows(&self, model: &str) -> bool {
        let included = self.include.is_empty() || self.include.iter().any(|re| re.is_match(model));
        included && !self.exclude.iter().any(|re| re.is_match(model))
    }
}

struct CatalogSource {
    provider: Arc<dyn Provider>,
    filter: ModelFilter,
    fallback: Vec<String>,
}

impl CatalogSource {
    /// Fetch the filtered catalog, `None` when nothing could be obtained
    async fn fetch(&self) -> Option<Vec<String>> {
        let name = self.provider.name();

        let models = match self.provider.list_models().await {
            Ok(models) => {
                tracing::debug!(provider = %name, count = models.len(), "discovered models");
                models
            }
            Err(e) if !self.fallback.is_empty() => {
                tracing::warn!(provider = %name, error = %e, "model listing failed, using fallback models");
                self.fallback.clone()
            }
            Err(e) => {
                tracing::warn!(provider = %name, error = %e, "failed to discover models");
                return None;
            }
        };

        Some(models.into_iter().filter(|m| self.filter.allows(m)).collect())
    }
}

/// Periodically rebuilds the router's model table
pub struct CatalogRefresher {
    sources: Vec<CatalogSource>,
    router: Arc<ModelRouter>,
    interval: Duration,
}

impl CatalogRefresher {
    pub fn new(router: Arc<ModelRouter>, interval: Duration) -> Self {
        Self {
            sources: Vec::new(),
            router,
            interval,
        }
    }

    /// Register a provider; catalogs are kept in registration order
    pub fn add_source(&mut self, provider: Arc<dyn Provider>, config: &LlmProviderConfig) -> Result<(), LlmError> {
        self.sources.push(CatalogSource {
            provider,
            filter: ModelFilter::from_config(&config.models)?,
            fallback: config.fallback_models.clone(),
        });
        Ok(())
    }

    /// Fetch every catalog and swap in the new table
    ///
    /// A provider whose listing fails without fallback models keeps its
    /// previous catalog.
    pub async fn refresh(&self) {
        let fetched = join_all(self.sources.iter().map(CatalogSource::fetch)).await;
        let previous = self.router.snapshot().await;

        let catalogs: Vec<(String, Vec<String>)> = self
            .sources
            .iter()
            .zip(fetched)
            .map(|(source, models)| {
                let name = source.provider.name();
                let models = models.unwrap_or_else(|| previous.catalog(name).map(<[String]>::to_vec).unwrap_or_default());
                (name.to_owned(), models)
            })
            .collect();

        let total: usize = catalogs.iter().map(|(_, models)| models.len()).sum();
        self.router.replace(ModelTable::new(catalogs)).await;

        tracing::info!(models = total, "model catalog refreshed");
    }

    /// Refresh on the configured interval until `shutdown` fires
    ///
    /// The first tick is one interval from now; callers run the initial
    /// refresh themselves before serving traffic.
    pub fn spawn(self: Arc<Self>, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            let start = tokio::time::Instant::now() + self.interval;
            let mut interval = tokio::time::interval_at(start, self.interval);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    () = shutdown.cancelled() => {
                        tracing::debug!("catalog refresher stopped");
                        break;
                    }
                    _ = interval.tick() => self.refresh().await,
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::provider::ProviderCapabilities;
    use crate::stream::EventStream;
    use crate::types::{CompletionRequest, CompletionResponse};

    /// Provider whose listing results are scripted per call
    struct ScriptedCatalog {
        name: String,
        listings: Mutex<Vec<Result<Vec<String>, LlmError>>>,
    }

    impl ScriptedCatalog {
        fn new(name: &str, listings: Vec<Result<Vec<String>, LlmError>>) -> Arc<Self> {
            Arc::new(Self {
                name: name.to_owned(),
                listings: Mutex::new(listings),
            })
        }
    }

    #[async_trait]
    impl Provider for ScriptedCatalog {
        fn name(&self) -> &str {
            &self.name
        }

        fn capabilities(&self) -> ProviderCapabilities {
            ProviderCapabilities {
                streaming: false,
                native_tools: false,
            }
        }

        async fn list_models(&self) -> Result<Vec<String>, LlmError> {
            self.listings.lock().unwrap().remove(0)
        }

        async fn complete(&self, _request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
            unreachable!("catalog tests never complete")
        }

        async fn complete_stream(&self, _request: &CompletionRequest) -> Result<EventStream, LlmError> {
            unreachable!("catalog tests never stream")
        }
    }

    fn models(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| (*n).to_owned()).collect()
    }

    fn provider_config(toml: &str) -> LlmProviderConfig {
        toml::from_str(toml).unwrap()
    }

    #[test]
    fn include_and_exclude_patterns() {
        let filter = ModelFilter::from_config(&ModelConfig {
            include: vec!["gpt".to_owned()],
            exclude: vec!["instruct$".to_owned()],
        })
        .unwrap();

        assert!(filter.allows("gpt-4o"));
        assert!(!filter.allows("gpt-3.5-turbo-instruct"));
        assert!(!filter.allows("whisper-1"));
        assert!(ModelFilter::default().allows("anything"));
    }

    #[tokio::test]
    async fn refresh_filters_and_orders_catalogs() {
        let router = Arc::new(ModelRouter::new("local"));
        let mut refresher = CatalogRefresher::new(Arc::clone(&router), Duration::from_secs(60));

        let local = ScriptedCatalog::new("local", vec![Ok(models(&["llama3", "mistral"]))]);
        let cloud = ScriptedCatalog::new("cloud", vec![Ok(models(&["gpt-4o", "dall-e-3"]))]);

        refresher.add_source(local, &provider_config(r#"type = "ollama""#)).unwrap();
        refresher
            .add_source(
                cloud,
                &provider_config("type = \"openai\"\nmodels.include = [\"^gpt\"]"),
            )
            .unwrap();

        refresher.refresh().await;

        let table = router.snapshot().await;
        let entries: Vec<_> = table.entries().collect();
        assert_eq!(entries, [("llama3", "local"), ("mistral", "local"), ("gpt-4o", "cloud")]);
    }

    #[tokio::test]
    async fn failed_listing_uses_fallback_models() {
        let router = Arc::new(ModelRouter::new("deepseek"));
        let mut refresher = CatalogRefresher::new(Arc::clone(&router), Duration::from_secs(60));

        let provider = ScriptedCatalog::new("deepseek", vec![Err(LlmError::transport("refused"))]);
        refresher
            .add_source(
                provider,
                &provider_config("type = \"openai\"\nfallback_models = [\"deepseek-chat\", \"deepseek-coder\"]"),
            )
            .unwrap();

        refresher.refresh().await;

        let table = router.snapshot().await;
        assert_eq!(table.catalog("deepseek").unwrap(), ["deepseek-chat", "deepseek-coder"]);
    }

    #[tokio::test]
    async fn failed_listing_keeps_previous_catalog() {
        let router = Arc::new(ModelRouter::new("local"));
        let mut refresher = CatalogRefresher::new(Arc::clone(&router), Duration::from_secs(60));

        let provider = ScriptedCatalog::new(
            "local",
            vec![Ok(models(&["llama3"])), Err(LlmError::transport("refused"))],
        );
        refresher.add_source(provider, &provider_config(r#"type = "ollama""#)).unwrap();

        refresher.refresh().await;
        refresher.refresh().await;

        let table = router.snapshot().await;
        assert_eq!(table.catalog("local").unwrap(), ["llama3"]);
    }

    #[tokio::test(start_paused = true)]
    async fn spawned_refresher_stops_on_shutdown() {
        let router = Arc::new(ModelRouter::new("local"));
        let mut refresher = CatalogRefresher::new(Arc::clone(&router), Duration::from_secs(60));
        let provider = ScriptedCatalog::new("local", vec![Ok(models(&["llama3"]))]);
        refresher.add_source(provider, &provider_config(r#"type = "ollama""#)).unwrap();

        let shutdown = CancellationToken::new();
        let handle = Arc::new(refresher).spawn(shutdown.clone());

        tokio::time::sleep(Duration::from_secs(61)).await;
        assert_eq!(router.snapshot().await.catalog("local").unwrap(), ["llama3"]);

        shutdown.cancel();
        handle.await.unwrap();
    }
}
