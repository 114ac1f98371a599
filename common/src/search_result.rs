use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};


/// What a search call hands back: a result envelope, or plain suggestion
/// strings for the autocomplete scopes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SearchOutcome {
    Results(SearchResult),
    Suggestions(Vec<String>),
}


#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub data: Vec<Hit>,
    pub total: u64,
    pub query: String,
    pub facets: Vec<LabeledFacet>,
    pub active_facets: Vec<LabeledFilter>,
}


/// One engine document plus the fields derived for display.
///
/// `fields` carries the raw document; keys that are overwritten by the
/// derived fields below are removed from it before serialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hit {
    pub id: String,
    pub type_id: String,
    pub score: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_name: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_label: Option<String>,
    pub read_only: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub available_languages: Option<Vec<String>>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}


#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabeledFacet {
    pub id: String,
    pub label: String,
    #[serde(flatten)]
    pub buckets: FacetBuckets,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FacetBuckets {
    Terms(Vec<TermBucket>),
    Ranges(Vec<RangeBucket>),
}

impl FacetBuckets {
    pub fn len(&self) -> usize {
        match self {
            FacetBuckets::Terms(t) => t.len(),
            FacetBuckets::Ranges(r) => r.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TermBucket {
    pub term: String,
    pub count: u64,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeBucket {
    pub from: String,
    pub count: u64,
    pub label: String,
}


/// An active filter echoed back with labels, rendered as a "current filter" chip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabeledFilter {
    pub id: String,
    pub label: String,
    pub terms: Vec<FilterTerm>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterTerm {
    pub term: String,
    pub label: String,
}
