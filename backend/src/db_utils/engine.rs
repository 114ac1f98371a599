//! Engine-agnostic query and response shapes, and the engine client seam.

use std::collections::BTreeMap;

use async_trait::async_trait;
use common::search_query::SortDirection;
use serde_json::{Map, Value};

use crate::{
    api::search::{filter_expr::FilterExpr, localization::WeightedField},
    error::EngineError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexTarget {
    Content,
    Dam,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FacetAggregation {
    Terms { size: u32, exclude: Vec<String> },
    /// Open-ended ranges keyed by their lower bound.
    DateRanges { from: Vec<String> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct FacetSpec {
    pub name: String,
    pub field: String,
    /// Restricts the documents this facet counts; `None` counts every match.
    pub filter: Option<FilterExpr>,
    pub aggregation: FacetAggregation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SortSpec {
    pub field: String,
    pub direction: SortDirection,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HighlightSpec {
    pub pre_tag: String,
    pub post_tag: String,
    pub fields: Vec<String>,
    pub fragment_size: u32,
    pub number_of_fragments: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EngineQuery {
    pub query_string: String,
    pub fields: Vec<WeightedField>,
    /// Applied after aggregation so facets see the unfiltered match set.
    pub filter: Option<FilterExpr>,
    pub facets: Vec<FacetSpec>,
    pub from: u64,
    pub size: u64,
    pub sort: SortSpec,
    pub highlight: Option<HighlightSpec>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct EngineHit {
    pub id: String,
    pub index: String,
    pub doc_type: Option<String>,
    pub score: Option<f64>,
    pub source: Map<String, Value>,
    pub highlights: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EngineBucket {
    pub key: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct EngineResponse {
    pub total: u64,
    pub hits: Vec<EngineHit>,
    pub aggregations: BTreeMap<String, Vec<EngineBucket>>,
}

/// One round trip against one or more indices.
#[async_trait]
pub trait SearchEngine: Send + Sync {
    async fn execute(&self, targets: &[IndexTarget], query: &EngineQuery) -> Result<EngineResponse, EngineError>;
}
