//! Error types for the search pipeline.

use common::search_query::InvalidBlockConfig;
use thiserror::Error;

/// Failures talking to the search engine. Always fatal for the call.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("Search engine unavailable: {0}")]
    Unavailable(String),

    #[error("Search engine timed out after {0} ms")]
    Timeout(u64),

    #[error("Malformed search query: {0}")]
    MalformedQuery(String),

    #[error("Search index missing: {0}")]
    IndexMissing(String),

    #[error("Search engine returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid search engine response: {0}")]
    InvalidResponse(String),
}

impl EngineError {
    /// Transient failures may be retried; query and index errors never are.
    pub fn is_transient(&self) -> bool {
        match self {
            EngineError::Unavailable(_) | EngineError::Timeout(_) => true,
            EngineError::Status { status, .. } => matches!(status, 502 | 503 | 504),
            _ => false,
        }
    }
}

#[derive(Error, Debug)]
pub enum SearchError {
    #[error(transparent)]
    InvalidBlockConfig(#[from] InvalidBlockConfig),

    #[error("Invalid facet overrides: {0}")]
    InvalidFacetOverrides(String),

    #[error("Invalid facet operator '{operator}' for facet {facet}")]
    InvalidFacetOperator { facet: String, operator: String },

    #[error("Unknown taxonomy: {0}")]
    UnknownTaxonomy(String),

    #[error("Search engine failed: {0}")]
    Engine(#[from] EngineError),

    #[error("Collaborator lookup failed: {0}")]
    Collaborator(#[from] anyhow::Error),
}

impl SearchError {
    /// Misconfiguration the caller should see as a rejected request.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            SearchError::InvalidBlockConfig(_)
                | SearchError::InvalidFacetOverrides(_)
                | SearchError::InvalidFacetOperator { .. }
                | SearchError::UnknownTaxonomy(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, SearchError>;
