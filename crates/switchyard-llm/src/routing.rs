//! Model resolution and routing logic
//!
//! Resolves requested model names to a configured provider using the
//! catalogs discovered from each backend.

use std::collections::HashMap;

use tokio::sync::RwLock;

/// How a model name was matched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    /// Name is in a provider's catalog
    Exact,
    /// Name starts with a catalog entry
    Prefix,
    /// Nothing matched; the default provider serves it
    Default,
}

impl MatchKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::Prefix => "prefix",
            Self::Default => "default",
        }
    }
}

/// Resolved target for a model request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedModel {
    /// Provider name (key in config)
    pub provider_name: String,
    /// Model identifier sent to the provider
    pub model_id: String,
    pub match_kind: MatchKind,
}

/// Snapshot of every provider's catalog
///
/// Built in full by the catalog refresher and swapped in at once.
#[derive(Debug, Clone, Default)]
pub struct ModelTable {
    /// Catalogs in provider declaration order
    catalogs: Vec<(String, Vec<String>)>,
    /// Model id to owning provider; the first provider to list a model owns it
    exact: HashMap<String, String>,
}

impl ModelTable {
    /// Build from per-provider catalogs given in declaration order
    pub fn new(catalogs: Vec<(String, Vec<String>)>) -> Self {
        let mut exact = HashMap::new();
        for (provider, models) in &catalogs {
            for model in models {
                exact.entry(model.clone()).or_insert_with(|| provider.clone());
            }
        }

        Self { catalogs, exact }
    }

    /// Provider serving `model`, by exact or longest-prefix match
    ///
    /// Among prefixes of equal length the earlier provider wins.
    pub fn lookup(&self, model: &str) -> Option<(&str, MatchKind)> {
        if let Some(provider) = self.exact.get(model) {
            return Some((provider.as_str(), MatchKind::Exact));
        }

        let mut best: Option<(&str, usize)> = None;
        for (provider, models) in &self.catalogs {
            for entry in models {
                if entry.is_empty() || !model.starts_with(entry.as_str()) {
                    continue;
                }
                if best.is_none_or(|(_, len)| entry.len() > len) {
                    best = Some((provider.as_str(), entry.len()));
                }
            }
        }

        best.map(|(provider, _)| (provider, MatchKind::Prefix))
    }

    /// Catalog of one provider, `None` if the provider is unknown
    pub fn catalog(&self, provider: &str) -> Option<&[String]> {
        self.catalogs
            .iter()
            .find(|(name, _)| name == provider)
            .map(|(_, models)| models.as_slice())
    }

    /// Every `(model, provider)` pair in provider order
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.catalogs
            .iter()
            .flat_map(|(provider, models)| models.iter().map(move |m| (m.as_str(), provider.as_str())))
    }
}

/// Model routing table shared across requests
pub struct ModelRouter {
    default_provider: String,
    table: RwLock<ModelTable>,
}

impl ModelRouter {
    /// Create a router that falls back to `default_provider`
    pub fn new(default_provider: impl Into<String>) -> Self {
        Self {
            default_provider: default_provider.into(),
            table: RwLock::new(ModelTable::default()),
        }
    }

    /// Resolve a requested model to a provider
    ///
    /// Unknown models are routed to the default provider rather than
    /// rejected.
    pub async fn resolve(&self, model: &str) -> ResolvedModel {
        let table = self.table.read().await;

        let (provider_name, match_kind) = match table.lookup(model) {
            Some((provider, kind)) => (provider.to_owned(), kind),
            None => (self.default_provider.clone(), MatchKind::Default),
        };
        drop(table);

        ResolvedModel {
            provider_name,
            model_id: model.to_owned(),
            match_kind,
        }
    }

    /// Swap in a freshly built table
    pub async fn replace(&self, table: ModelTable) {
        *self.table.write().await = table;
    }

    /// Current table contents
    pub async fn snapshot(&self) -> ModelTable {
        self.table.read().await.clone()
    }

    pub fn default_provider(&self) -> &str {
        &self.default_provider
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> ModelTable {
        ModelTable::new(vec![
            ("local".to_owned(), vec!["llama3".to_owned(), "llama3:8b".to_owned(), "shared".to_owned()]),
            ("cloud".to_owned(), vec!["gpt-4o".to_owned(), "gpt-4".to_owned(), "shared".to_owned(), "llama3:8b".to_owned()]),
        ])
    }

    async fn router() -> ModelRouter {
        let router = ModelRouter::new("local");
        router.replace(table()).await;
        router
    }

    #[tokio::test]
    async fn exact_match_wins() {
        let resolved = router().await.resolve("gpt-4o").await;
        assert_eq!(resolved.provider_name, "cloud");
        assert_eq!(resolved.model_id, "gpt-4o");
        assert_eq!(resolved.match_kind, MatchKind::Exact);
    }

    #[tokio::test]
    async fn first_provider_owns_duplicates() {
        let resolved = router().await.resolve("shared").await;
        assert_eq!(resolved.provider_name, "local");
    }

    #[tokio::test]
    async fn longest_prefix_wins() {
        let resolved = router().await.resolve("gpt-4o-mini").await;
        assert_eq!(resolved.provider_name, "cloud");
        assert_eq!(resolved.match_kind, MatchKind::Prefix);
        assert_eq!(resolved.model_id, "gpt-4o-mini");
    }

    #[tokio::test]
    async fn equal_prefixes_go_to_earlier_provider() {
        let resolved = router().await.resolve("llama3:8b-instruct").await;
        assert_eq!(resolved.provider_name, "local");
        assert_eq!(resolved.match_kind, MatchKind::Prefix);
    }

    #[tokio::test]
    async fn unknown_model_falls_back_to_default() {
        let router = ModelRouter::new("cloud");
        router.replace(table()).await;

        let resolved = router.resolve("mistral").await;
        assert_eq!(resolved.provider_name, "cloud");
        assert_eq!(resolved.match_kind, MatchKind::Default);
    }

    #[tokio::test]
    async fn empty_table_routes_everything_to_default() {
        let resolved = ModelRouter::new("local").resolve("llama3").await;
        assert_eq!(resolved.provider_name, "local");
        assert_eq!(resolved.match_kind, MatchKind::Default);
    }

    #[test]
    fn entries_follow_provider_order() {
        let table = table();
        let first = table.entries().next().unwrap();
        assert_eq!(first, ("llama3", "local"));
        assert_eq!(table.catalog("cloud").unwrap().len(), 4);
        assert!(table.catalog("missing").is_none());
    }
}
