//! Completed responses kept for `GET /v1/responses`

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use crate::types::CompletionResponse;

/// Write-once store of completed responses keyed by id
pub trait ResponseStore: Send + Sync {
    /// Store `response`; returns `false` if its id is already taken
    fn insert(&self, response: CompletionResponse) -> bool;

    fn get(&self, id: &str) -> Option<CompletionResponse>;

    /// Every stored response, oldest first
    fn list(&self) -> Vec<CompletionResponse>;
}

/// Unbounded in-process store
///
/// Entries are never evicted, so memory grows with traffic.
#[derive(Debug, Default)]
pub struct InMemoryResponseStore {
    responses: DashMap<String, CompletionResponse>,
}

impl ResponseStore for InMemoryResponseStore {
    fn insert(&self, response: CompletionResponse) -> bool {
        match self.responses.entry(response.id.clone()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(response);
                true
            }
        }
    }

    fn get(&self, id: &str) -> Option<CompletionResponse> {
        self.responses.get(id).map(|entry| entry.value().clone())
    }

    fn list(&self) -> Vec<CompletionResponse> {
        let mut responses: Vec<_> = self.responses.iter().map(|entry| entry.value().clone()).collect();
        responses.sort_by(|a, b| a.created.cmp(&b.created).then_with(|| a.id.cmp(&b.id)));
        responses
    }
}
