//! Search endpoint parameters.

use serde::Deserialize;
use utoipa::IntoParams;

pub const DEFAULT_SEARCH_SIZE: u32 = 10;
pub const MAX_SEARCH_SIZE: u32 = 100;

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SearchQuery {
    /// Query string syntax. Matches every document when absent.
    pub q: Option<String>,
    /// Number of hits, default 10, capped at 100.
    pub size: Option<u32>,
}

impl SearchQuery {
    pub fn size(&self) -> u32 {
        self.size.unwrap_or(DEFAULT_SEARCH_SIZE).min(MAX_SEARCH_SIZE)
    }

    pub fn query(&self) -> Option<&str> {
        self.q.as_deref().map(str::trim).filter(|q| !q.is_empty())
    }
}
