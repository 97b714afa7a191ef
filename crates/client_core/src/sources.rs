use std::sync::Arc;

use anyhow::Result;
use shared::protocol::SourceSuggestion;

use crate::PostsApi;

/// Shortest typed prefix that triggers a backend lookup.
pub const MIN_PREFIX_CHARS: usize = 2;

/// Autocomplete for the post source field.
pub struct SourceLookup {
    api: Arc<dyn PostsApi>,
}

impl SourceLookup {
    pub fn new(api: Arc<dyn PostsApi>) -> Self {
        Self { api }
    }

    pub async fn suggest(&self, prefix: &str) -> Result<Vec<SourceSuggestion>> {
        if prefix.chars().count() < MIN_PREFIX_CHARS {
            return Ok(Vec::new());
        }
        self.api.search_sources(prefix).await
    }
}

#[cfg(test)]
#[path = "tests/sources_tests.rs"]
mod tests;
