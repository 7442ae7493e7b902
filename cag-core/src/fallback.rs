//! Web-search fallback used when local retrieval comes up empty

use crate::error::CagError;
use crate::providers::WebSearch;
use crate::validator::Outcome;
use tracing::{info, warn};

/// Last-resort context source
#[derive(Clone, Copy, Default)]
pub struct WebFallback<'a> {
    search: Option<&'a dyn WebSearch>,
}

impl<'a> WebFallback<'a> {
    pub fn new(search: Option<&'a dyn WebSearch>) -> Self {
        Self { search }
    }

    /// Snippets for `query`
    ///
    /// A failing search degrades to no snippets; with no search configured
    /// the result is simply empty.
    pub fn search(&self, query: &str) -> Outcome<Vec<String>> {
        let Some(search) = self.search else {
            info!("No web search configured, fallback yields no context");
            return Outcome::Complete(Vec::new());
        };

        info!("Performing web search for: {}", query);
        match search.search(query) {
            Ok(results) => {
                info!("Web search returned {} results", results.len());
                Outcome::Complete(results)
            }
            Err(e) => {
                let cause = CagError::external("web_search", e);
                warn!("Web search failed: {}", cause);
                Outcome::Degraded {
                    value: Vec::new(),
                    cause,
                }
            }
        }
    }
}
