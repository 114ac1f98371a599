//! Builds the named filter fragments for a search from its parameters.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use common::search_query::{FacetOperator, SearchParameters};
use serde_json::Value;

use crate::{
    api::search::{
        facets::FacetOperatorMap,
        filter_expr::{FilterExpr, GeoPoint},
    },
    context::ReadWorkspaces,
    services::Taxonomy,
};

pub const GEO_FIELD: &str = "fields.position.location.coordinates";

/// Active filter fragments keyed by filter name. Names are unique; the order
/// of fragments has no meaning.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GlobalFilterList {
    fragments: BTreeMap<String, FilterExpr>,
}

impl GlobalFilterList {
    pub fn insert(&mut self, name: impl Into<String>, filter: FilterExpr) {
        self.fragments.insert(name.into(), filter);
    }

    pub fn get(&self, name: &str) -> Option<&FilterExpr> {
        self.fragments.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fragments.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FilterExpr)> {
        self.fragments.iter()
    }

    /// Conjunction of every fragment, `None` when nothing is active.
    pub fn conjunction(&self) -> Option<FilterExpr> {
        if self.fragments.is_empty() {
            return None;
        }
        Some(FilterExpr::And(self.fragments.values().cloned().collect()))
    }
}

/// Raw values of the parameters that produced a fragment, in activation order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActiveFilters {
    entries: Vec<(String, Vec<String>)>,
}

impl ActiveFilters {
    pub fn insert(&mut self, name: impl Into<String>, values: Vec<String>) {
        let name = name.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => *existing = values,
            None => self.entries.push((name, values)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&[String]> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, v)| v.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_slice()))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

pub struct FilterBuilder<'a> {
    params: &'a SearchParameters,
    operators: &'a FacetOperatorMap,
    filters: GlobalFilterList,
    active: ActiveFilters,
    any_filter: bool,
}

pub struct BuiltFilters {
    pub filters: GlobalFilterList,
    pub active: ActiveFilters,
    pub any_filter: bool,
}

impl<'a> FilterBuilder<'a> {
    pub fn new(params: &'a SearchParameters, operators: &'a FacetOperatorMap) -> Self {
        Self {
            params,
            operators,
            filters: GlobalFilterList::default(),
            active: ActiveFilters::default(),
            any_filter: false,
        }
    }

    fn push(&mut self, name: &str, filter: FilterExpr) {
        self.filters.insert(name, filter);
        self.any_filter = true;
    }

    /// Term filter on `field` from parameter `name`. `or` facets match any of
    /// the values, `and` facets require every value. Returns whether a
    /// fragment was added.
    pub fn add_filter(&mut self, name: &str, field: &str) -> bool {
        let Some(raw) = self.params.get(name) else {
            return false;
        };
        let values = raw.to_vec();
        if values.is_empty() {
            return false;
        }
        let filter = match self.operators.operator(name) {
            FacetOperator::Or => FilterExpr::terms(field, values.iter().cloned()),
            FacetOperator::And => {
                FilterExpr::And(values.iter().map(|v| FilterExpr::term(field, v.clone())).collect())
            }
        };
        self.push(name, filter);
        self.active.insert(name, values);
        true
    }

    pub fn add_locale_filter(&mut self, locales: &[String]) {
        if locales.is_empty() {
            return;
        }
        self.push("availableLanguages", FilterExpr::terms("availableLanguages", locales.iter().cloned()));
    }

    /// Restricts to readable workspaces; no-op for universal read access.
    pub fn add_workspace_filter(&mut self, read: &ReadWorkspaces) {
        let ReadWorkspaces::Only(workspaces) = read else {
            return;
        };
        if workspaces.is_empty() {
            return;
        }
        let any_of = workspaces.iter().map(|ws| FilterExpr::term("target", ws.clone())).collect();
        self.push("target", FilterExpr::Or(any_of));
    }

    /// Front office only: started (or no start date) and not ended (no end
    /// date, end date 0, or end date in the future).
    pub fn add_publication_window(&mut self, now: DateTime<Utc>) {
        let now = Value::from(now.timestamp());
        let started = FilterExpr::Or(vec![
            FilterExpr::negate(FilterExpr::exists("startPublicationDate")),
            FilterExpr::range("startPublicationDate", None, Some(now.clone())),
        ]);
        let not_ended = FilterExpr::Or(vec![
            FilterExpr::negate(FilterExpr::exists("endPublicationDate")),
            FilterExpr::term("endPublicationDate", 0),
            FilterExpr::range("endPublicationDate", Some(now), None),
        ]);
        self.push("frontend", FilterExpr::And(vec![started, not_ended]));
    }

    pub fn add_geolocated_types(&mut self, content_type_ids: &[String]) {
        if content_type_ids.is_empty() {
            return;
        }
        let any_of = content_type_ids.iter().map(|id| FilterExpr::term("contentType", id.clone())).collect();
        self.push("geoTypes", FilterExpr::Or(any_of));
    }

    pub fn add_last_update_filter(&mut self) {
        let Some(from) = self.params.get("lastupdatetime").and_then(|v| v.first()).map(|s| s.to_string()) else {
            return;
        };
        let bound = from.parse::<i64>().map(Value::from).unwrap_or_else(|_| Value::from(from.clone()));
        self.push("lastupdatetime", FilterExpr::range("lastUpdateTime", Some(bound), None));
        self.active.insert("lastupdatetime", vec![from]);
    }

    /// Needs all four of `inflat`, `suplat`, `inflon`, `suplon`.
    pub fn add_geo_box_filter(&mut self) {
        let bounds = (
            self.params.get_f64("inflat"),
            self.params.get_f64("suplat"),
            self.params.get_f64("inflon"),
            self.params.get_f64("suplon"),
        );
        let (Some(inflat), Some(suplat), Some(inflon), Some(suplon)) = bounds else {
            return;
        };
        self.push(
            "geo",
            FilterExpr::GeoBox {
                field: GEO_FIELD.to_string(),
                top_left: GeoPoint { lon: inflon, lat: suplat },
                bottom_right: GeoPoint { lon: suplon, lat: inflat },
            },
        );
    }

    pub fn add_taxonomy_filters(&mut self, taxonomies: &[Taxonomy]) {
        for taxonomy in taxonomies {
            if self.params.contains(&taxonomy.id) {
                self.add_filter(&taxonomy.id, &format!("taxonomy.{}", taxonomy.id));
            }
        }
    }

    /// Echoes the free-text query among active filters.
    pub fn record_query(&mut self) {
        if !self.params.query.is_empty() {
            self.active.insert("query", vec![self.params.query.clone()]);
        }
    }

    pub fn finish(self) -> BuiltFilters {
        BuiltFilters { filters: self.filters, active: self.active, any_filter: self.any_filter }
    }
}
