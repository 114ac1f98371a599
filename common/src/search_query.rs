//! Shared search request models and parameter coercion.

use std::{collections::BTreeMap, fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    search_const::{DEFAULT_ORDER_BY, DEFAULT_PAGE_SIZE, DEFAULT_PAGER},
    text_highlight::strip_tags,
};


/// A raw request parameter: one value or a list of values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Single(String),
    List(Vec<String>),
}

impl ParamValue {
    /// Scalars become single-element lists.
    pub fn to_vec(&self) -> Vec<String> {
        match self {
            ParamValue::Single(s) => vec![s.clone()],
            ParamValue::List(l) => l.clone(),
        }
    }

    pub fn first(&self) -> Option<&str> {
        match self {
            ParamValue::Single(s) => Some(s.as_str()),
            ParamValue::List(l) => l.first().map(|s| s.as_str()),
        }
    }

    fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Array(items) => Some(ParamValue::List(items.iter().filter_map(scalar_to_string).collect())),
            other => scalar_to_string(other).map(ParamValue::Single),
        }
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}


#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FacetOperator {
    #[default]
    And,
    Or,
}

impl FromStr for FacetOperator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "and" => Ok(FacetOperator::And),
            "or" => Ok(FacetOperator::Or),
            other => Err(format!("unknown facet operator '{other}'")),
        }
    }
}


#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DisplayMode {
    Checkbox,
    #[default]
    #[serde(other)]
    Standard,
}


#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    /// Anything other than `asc` (case-insensitive) sorts descending.
    pub fn parse_lenient(s: &str) -> Self {
        if s.trim().eq_ignore_ascii_case("asc") { SortDirection::Asc } else { SortDirection::Desc }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}


/// Which indices a search runs against, and whether it returns suggestions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchScope {
    Content,
    Dam,
    All,
    Geo,
    Suggest,
    Geosuggest,
}

impl SearchScope {
    pub fn is_suggest(&self) -> bool {
        matches!(self, SearchScope::Suggest | SearchScope::Geosuggest)
    }

    pub fn is_geo(&self) -> bool {
        matches!(self, SearchScope::Geo | SearchScope::Geosuggest)
    }
}

impl FromStr for SearchScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "content" => Ok(SearchScope::Content),
            "dam" => Ok(SearchScope::Dam),
            "all" => Ok(SearchScope::All),
            "geo" => Ok(SearchScope::Geo),
            "suggest" => Ok(SearchScope::Suggest),
            "geosuggest" => Ok(SearchScope::Geosuggest),
            other => Err(format!("unknown search scope '{other}'")),
        }
    }
}


/// Per-block display settings sent along with the search parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct BlockConfig {
    pub display_mode: DisplayMode,
    pub displayed_facets: Vec<String>,
    /// Either a JSON-encoded string or an inline array of `{id, facetOperator}`.
    pub facet_overrides: Option<Value>,
}


#[derive(Debug, Clone, PartialEq)]
pub struct InvalidBlockConfig(pub String);

impl fmt::Display for InvalidBlockConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid block-config: {}", self.0)
    }
}

impl std::error::Error for InvalidBlockConfig {}


const RESERVED_KEYS: [&str; 6] = ["query", "pager", "pagesize", "orderby", "orderbyDirection", "block-config"];

/// Normalized search parameters.
///
/// `values` holds every key that is not one of the reserved keys above, so
/// filters (`type`, `author`, taxonomy ids, geo bounds...) are looked up there.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "serde_json::Map<String, Value>")]
pub struct SearchParameters {
    pub query: String,
    pub pager: u64,
    pub pagesize: u64,
    pub orderby: String,
    pub orderby_direction: SortDirection,
    /// Raw `block-config`, validated by [`SearchParameters::block_config`].
    pub raw_block_config: Option<Value>,
    pub values: BTreeMap<String, ParamValue>,
}

impl Default for SearchParameters {
    fn default() -> Self {
        Self {
            query: String::new(),
            pager: DEFAULT_PAGER,
            pagesize: DEFAULT_PAGE_SIZE,
            orderby: DEFAULT_ORDER_BY.to_string(),
            orderby_direction: SortDirection::Desc,
            raw_block_config: None,
            values: BTreeMap::new(),
        }
    }
}

impl SearchParameters {
    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.values.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Parses `key` as a float, `None` when absent or non-numeric.
    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.get(key)?.first()?.trim().parse::<f64>().ok().filter(|v| v.is_finite())
    }

    /// Display settings of the calling block; defaults when absent.
    pub fn block_config(&self) -> Result<BlockConfig, InvalidBlockConfig> {
        match &self.raw_block_config {
            None => Ok(BlockConfig::default()),
            Some(raw) => serde_json::from_value(raw.clone()).map_err(|e| InvalidBlockConfig(e.to_string())),
        }
    }

    pub fn with_value(mut self, key: impl Into<String>, value: ParamValue) -> Self {
        self.values.insert(key.into(), value);
        self
    }
}

impl From<serde_json::Map<String, Value>> for SearchParameters {
    fn from(raw: serde_json::Map<String, Value>) -> Self {
        let mut params = SearchParameters::default();

        if let Some(query) = raw.get("query").and_then(scalar_to_string) {
            params.query = strip_tags(&query).trim().to_string();
        }
        params.pager = raw.get("pager").and_then(coerce_u64).unwrap_or(DEFAULT_PAGER);
        params.pagesize = raw.get("pagesize").and_then(coerce_u64).unwrap_or(DEFAULT_PAGE_SIZE);
        if let Some(orderby) = raw.get("orderby").and_then(scalar_to_string).filter(|s| !s.trim().is_empty()) {
            params.orderby = orderby.trim().to_string();
        }
        if let Some(direction) = raw.get("orderbyDirection").and_then(scalar_to_string) {
            params.orderby_direction = SortDirection::parse_lenient(&direction);
        }
        params.raw_block_config = raw.get("block-config").filter(|v| !v.is_null()).cloned();

        for (key, value) in raw.iter() {
            if RESERVED_KEYS.contains(&key.as_str()) {
                continue;
            }
            if let Some(value) = ParamValue::from_json(value) {
                params.values.insert(key.clone(), value);
            }
        }
        params
    }
}

/// Accepts non-negative integers given as numbers or numeric strings.
fn coerce_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64().or_else(|| n.as_f64().filter(|f| *f >= 0.0 && f.fract() == 0.0).map(|f| f as u64)),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    }
}
