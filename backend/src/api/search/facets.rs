//! Facet planning: which facets are computed, with which operator, and how
//! each facet's counts are filtered.

use std::collections::HashMap;

use common::{
    search_const::ALL_FACETS,
    search_query::{DisplayMode, FacetOperator, SearchParameters, SearchScope},
};
use serde::Deserialize;
use serde_json::Value;

use crate::{
    api::search::{
        date_ranges::DateRanges,
        filter_expr::FilterExpr,
        filters::{ActiveFilters, GlobalFilterList},
    },
    context::SearchMode,
    db_utils::engine::{FacetAggregation, FacetSpec},
    error::{Result, SearchError},
    services::{Taxonomy, TaxonomyService},
};

/// Facet name to operator. Facets without an entry use `and`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FacetOperatorMap(HashMap<String, FacetOperator>);

impl FacetOperatorMap {
    pub fn from_pairs<K: Into<String>>(pairs: impl IntoIterator<Item = (K, FacetOperator)>) -> Self {
        Self(pairs.into_iter().map(|(k, op)| (k.into(), op)).collect())
    }

    pub fn insert(&mut self, name: impl Into<String>, operator: FacetOperator) {
        self.0.insert(name.into(), operator);
    }

    pub fn get(&self, name: &str) -> Option<FacetOperator> {
        self.0.get(name).copied()
    }

    pub fn operator(&self, name: &str) -> FacetOperator {
        self.get(name).unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FacetKind {
    ContentType,
    DamType,
    Author,
    Date,
    Navigation,
    Taxonomy(String),
}

impl FacetKind {
    /// Parses a facet id from block configuration. `contentType` and `type`
    /// both name the content type facet.
    pub fn from_id(id: &str) -> Self {
        match id {
            "contentType" | "type" => FacetKind::ContentType,
            "damType" => FacetKind::DamType,
            "author" => FacetKind::Author,
            "date" => FacetKind::Date,
            "navigation" => FacetKind::Navigation,
            other => FacetKind::Taxonomy(other.to_string()),
        }
    }

    /// Id used in `displayedFacets`.
    pub fn display_id(&self) -> &str {
        match self {
            FacetKind::ContentType => "contentType",
            FacetKind::DamType => "damType",
            FacetKind::Author => "author",
            FacetKind::Date => "date",
            FacetKind::Navigation => "navigation",
            FacetKind::Taxonomy(id) => id,
        }
    }

    /// Name shared by the facet, its request parameter and its filter fragment.
    pub fn name(&self) -> &str {
        match self {
            FacetKind::ContentType => "type",
            other => other.display_id(),
        }
    }

    pub fn field(&self) -> String {
        match self {
            FacetKind::ContentType => "contentType".to_string(),
            FacetKind::DamType => "damType".to_string(),
            FacetKind::Author => "createUser.id".to_string(),
            FacetKind::Date => "lastUpdateTime".to_string(),
            FacetKind::Navigation => "taxonomy.navigation".to_string(),
            FacetKind::Taxonomy(id) => format!("taxonomy.{id}"),
        }
    }

    fn bucket_size(&self) -> u32 {
        match self {
            FacetKind::ContentType | FacetKind::DamType => 1000,
            FacetKind::Author => 5,
            FacetKind::Date | FacetKind::Navigation | FacetKind::Taxonomy(_) => 20,
        }
    }

    /// Translation key and default for facets with a fixed label.
    /// Taxonomy facets are labeled with the taxonomy name instead.
    pub fn fixed_label(&self) -> Option<(&'static str, &'static str)> {
        match self {
            FacetKind::Navigation => Some(("Search.Facets.Label.Navigation", "Navigation")),
            FacetKind::DamType => Some(("Search.Facets.Label.MediaType", "Media type")),
            FacetKind::ContentType => Some(("Search.Facets.Label.ContentType", "Content type")),
            FacetKind::Author => Some(("Search.Facets.Label.Author", "Author")),
            FacetKind::Date => Some(("Search.Facets.Label.ModificationDate", "Modification date")),
            FacetKind::Taxonomy(_) => None,
        }
    }
}

/// Taxonomy ids are 24 lowercase hex characters.
pub fn looks_like_taxonomy_id(id: &str) -> bool {
    id.len() == 24 && id.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}

#[derive(Debug, Deserialize)]
struct FacetOverride {
    id: String,
    #[serde(rename = "facetOperator")]
    facet_operator: String,
}

/// Parses `facetOverrides`, given either as a JSON-encoded string or inline.
/// Empty payloads yield no overrides.
pub fn parse_facet_overrides(raw: &Value) -> Result<Vec<(FacetKind, FacetOperator)>> {
    let overrides: Vec<FacetOverride> = match raw {
        Value::Null => vec![],
        Value::String(s) if s.trim().is_empty() => vec![],
        Value::String(s) => serde_json::from_str(s).map_err(|e| SearchError::InvalidFacetOverrides(e.to_string()))?,
        Value::Array(_) => {
            serde_json::from_value(raw.clone()).map_err(|e| SearchError::InvalidFacetOverrides(e.to_string()))?
        }
        other => return Err(SearchError::InvalidFacetOverrides(format!("expected a list, got {other}"))),
    };
    overrides
        .into_iter()
        .map(|o| {
            let operator = o.facet_operator.parse::<FacetOperator>().map_err(|_| SearchError::InvalidFacetOperator {
                facet: o.id.clone(),
                operator: o.facet_operator.clone(),
            })?;
            Ok((FacetKind::from_id(&o.id), operator))
        })
        .collect()
}

/// Filter restricting the documents a facet counts.
///
/// Every other active fragment applies. The facet's own fragment applies
/// only in `and` mode, so an `or` facet keeps showing counts for sibling
/// terms of the current selection.
pub fn facet_sub_filter(filters: &GlobalFilterList, name: &str, operator: FacetOperator) -> Option<FilterExpr> {
    let parts: Vec<FilterExpr> = filters
        .iter()
        .filter(|(key, _)| key.as_str() != name || operator == FacetOperator::And)
        .map(|(_, f)| f.clone())
        .collect();
    if parts.is_empty() { None } else { Some(FilterExpr::And(parts)) }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FacetPlan {
    mode: SearchMode,
    pub display_mode: DisplayMode,
    displayed: Vec<String>,
    pub operators: FacetOperatorMap,
}

impl FacetPlan {
    /// Back office computes every facet, all in `and` mode.
    pub fn back_office(display_mode: DisplayMode) -> Self {
        Self {
            mode: SearchMode::BackOffice,
            display_mode,
            displayed: vec![],
            operators: FacetOperatorMap::default(),
        }
    }

    pub async fn resolve(
        mode: SearchMode,
        params: &SearchParameters,
        scope: SearchScope,
        taxonomy_service: &dyn TaxonomyService,
        taxonomies: &[Taxonomy],
    ) -> Result<Self> {
        let config = params.block_config()?;
        if mode == SearchMode::BackOffice {
            return Ok(Self::back_office(config.display_mode));
        }

        let displayed = if scope.is_suggest() { vec![] } else { config.displayed_facets.clone() };
        let mut plan = Self {
            mode,
            display_mode: config.display_mode,
            displayed,
            operators: FacetOperatorMap::default(),
        };
        if plan.displayed.is_empty() {
            return Ok(plan);
        }

        let overrides = match &config.facet_overrides {
            Some(raw) => parse_facet_overrides(raw)?,
            None => vec![],
        };

        if !overrides.is_empty() {
            for (kind, operator) in overrides {
                if plan.is_facet_displayed(kind.display_id()) {
                    plan.operators.insert(kind.name(), operator);
                }
            }
        } else if plan.shows_all() {
            for taxonomy in taxonomies {
                plan.operators.insert(taxonomy.id.clone(), taxonomy.facet_operator.unwrap_or_default());
            }
        } else {
            for facet_id in plan.displayed.clone() {
                if !looks_like_taxonomy_id(&facet_id) && facet_id != "navigation" {
                    continue;
                }
                let known = taxonomies.iter().find(|t| t.id == facet_id).cloned();
                let taxonomy = match known {
                    Some(t) => t,
                    None => taxonomy_service
                        .find_by_id(&facet_id)
                        .await?
                        .ok_or_else(|| SearchError::UnknownTaxonomy(facet_id.clone()))?,
                };
                plan.operators.insert(facet_id, taxonomy.facet_operator.unwrap_or_default());
            }
        }
        Ok(plan)
    }

    fn shows_all(&self) -> bool {
        self.displayed.len() == 1 && self.displayed[0] == ALL_FACETS
    }

    pub fn is_facet_displayed(&self, display_id: &str) -> bool {
        self.mode == SearchMode::BackOffice || self.shows_all() || self.displayed.iter().any(|d| d == display_id)
    }

    pub fn operator(&self, name: &str) -> FacetOperator {
        self.operators.operator(name)
    }

    /// Facets to compute, in output order: the fixed facets, then one per
    /// taxonomy.
    pub fn displayed_kinds(&self, taxonomies: &[Taxonomy]) -> Vec<FacetKind> {
        let fixed = [FacetKind::ContentType, FacetKind::DamType, FacetKind::Author, FacetKind::Date];
        let vocabularies = taxonomies
            .iter()
            .map(|t| FacetKind::from_id(&t.id))
            .filter(|kind| matches!(kind, FacetKind::Navigation | FacetKind::Taxonomy(_)));
        fixed
            .into_iter()
            .chain(vocabularies)
            .filter(|kind| self.is_facet_displayed(kind.display_id()))
            .collect()
    }

    pub fn facet_specs(
        &self,
        kinds: &[FacetKind],
        filters: &GlobalFilterList,
        active: &ActiveFilters,
        date_ranges: &DateRanges,
    ) -> Vec<FacetSpec> {
        kinds
            .iter()
            .map(|kind| {
                let name = kind.name();
                let aggregation = match kind {
                    FacetKind::Date => FacetAggregation::DateRanges { from: date_ranges.lower_bounds() },
                    _ => {
                        let exclude = match (self.display_mode, active.get(name)) {
                            (DisplayMode::Checkbox, _) | (_, None) => vec![],
                            (DisplayMode::Standard, Some(values)) => values.to_vec(),
                        };
                        FacetAggregation::Terms { size: kind.bucket_size(), exclude }
                    }
                };
                FacetSpec {
                    name: name.to_string(),
                    field: kind.field(),
                    filter: facet_sub_filter(filters, name, self.operator(name)),
                    aggregation,
                }
            })
            .collect()
    }
}
