//! Turns the raw engine response into the UI envelope: display fields and
//! ACL flags on hits, labels on facet buckets and on active filters.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate};
use common::{
    search_query::DisplayMode,
    search_result::{FacetBuckets, FilterTerm, Hit, LabeledFacet, LabeledFilter, RangeBucket, SearchResult, TermBucket},
};
use serde_json::{Map, Value};

use crate::{
    api::search::{
        date_ranges::DateRanges,
        facets::FacetKind,
        filter_expr::lookup_path,
        filters::ActiveFilters,
    },
    context::SearchContext,
    db_utils::engine::{EngineBucket, EngineHit, EngineResponse},
    error::Result,
    services::{Collaborators, MetadataCache, Taxonomy, TypeInfo},
};

/// Keys of the raw document replaced by derived hit fields.
const DERIVED_KEYS: [&str; 10] =
    ["id", "typeId", "score", "title", "summary", "author", "authorName", "type", "readOnly", "availableLanguages"];

/// Raw scores outside `[0, 1]`, or missing, display as 100.
pub fn display_score(raw: Option<f64>) -> u32 {
    let score = raw.filter(|s| (0.0..=1.0).contains(s)).unwrap_or(1.0);
    (score * 100.0).round() as u32
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ObjectKind {
    Content,
    Dam,
}

impl ObjectKind {
    fn of(source: &Map<String, Value>) -> Option<Self> {
        match source.get("objectType").and_then(Value::as_str) {
            Some("content") => Some(ObjectKind::Content),
            Some("dam") => Some(ObjectKind::Dam),
            _ => None,
        }
    }
}

pub struct ResultShaper<'a> {
    services: &'a Collaborators,
    ctx: &'a SearchContext,
    /// Locale of titles and summaries: the working language in back office.
    locale: &'a str,
    taxonomies: &'a [Taxonomy],
    date_ranges: &'a DateRanges,
    display_mode: DisplayMode,
    cache: MetadataCache<'a>,
}

impl<'a> ResultShaper<'a> {
    pub fn new(
        services: &'a Collaborators,
        ctx: &'a SearchContext,
        locale: &'a str,
        taxonomies: &'a [Taxonomy],
        date_ranges: &'a DateRanges,
        display_mode: DisplayMode,
    ) -> Self {
        Self { services, ctx, locale, taxonomies, date_ranges, display_mode, cache: MetadataCache::new(services) }
    }

    pub async fn shape(
        mut self,
        response: EngineResponse,
        query: &str,
        kinds: &[FacetKind],
        active: &ActiveFilters,
        with_summary: bool,
    ) -> Result<SearchResult> {
        let total = response.total;
        let mut data = Vec::with_capacity(response.hits.len());
        for hit in response.hits {
            data.push(self.shape_hit(hit, with_summary).await?);
        }
        let facets = self.label_facets(kinds, &response.aggregations, total).await?;
        let active_facets = self.label_active_filters(active).await?;
        Ok(SearchResult { data, total, query: query.to_string(), facets, active_facets })
    }

    pub async fn shape_hit(&mut self, hit: EngineHit, with_summary: bool) -> Result<Hit> {
        let EngineHit { id, index, doc_type, score, source, .. } = hit;
        let locale = self.locale;
        let kind = ObjectKind::of(&source);
        let type_id = type_id_of(kind, &source, doc_type, index);

        let text = |key: &str| source.get(key).and_then(Value::as_str).map(str::to_string);
        let (title, summary) = match kind {
            Some(ObjectKind::Content) => match text(&format!("text_{locale}")) {
                Some(localized) => {
                    let summary = with_summary
                        .then(|| text(&format!("summary_{locale}")).unwrap_or_else(|| localized.clone()));
                    (Some(localized), summary)
                }
                None => (text("text"), None),
            },
            Some(ObjectKind::Dam) => (text(&format!("title_{locale}")).or_else(|| text("text")), None),
            None => (text("text"), None),
        };

        let author = lookup_path(&source, "createUser.id").and_then(scalar_string);
        let author_name = lookup_path(&source, "createUser.fullName").and_then(scalar_string);
        let available_languages = source.get("availableLanguages").and_then(|v| match v {
            Value::Array(items) => Some(items.iter().filter_map(scalar_string).collect()),
            Value::Null => None,
            other => scalar_string(other).map(|s| vec![s]),
        });

        let type_info = match kind {
            Some(ObjectKind::Content) => match source.get("contentType").and_then(scalar_string) {
                Some(id) => self.cache.content_type(&id).await?,
                None => None,
            },
            Some(ObjectKind::Dam) => match source.get("damType").and_then(scalar_string) {
                Some(id) => self.cache.dam_type(&id).await?,
                None => None,
            },
            None => None,
        };

        let write_workspace = source.get("writeWorkspace").and_then(scalar_string);
        let read_only = !self.is_writable(kind, type_info.as_ref(), write_workspace.as_deref());

        let mut fields = source;
        for key in DERIVED_KEYS {
            fields.remove(key);
        }
        if let Some(Value::String(raw)) = fields.get("lastUpdateTime") {
            if let Some(seconds) = parse_timestamp(raw) {
                fields.insert("lastUpdateTime".to_string(), Value::from(seconds));
            }
        }

        Ok(Hit {
            id,
            type_id,
            score: display_score(score),
            title,
            summary,
            author,
            author_name,
            type_label: type_info.as_ref().map(|t| t.label.clone()),
            read_only,
            available_languages,
            fields,
        })
    }

    fn is_writable(&self, kind: Option<ObjectKind>, type_info: Option<&TypeInfo>, write_workspace: Option<&str>) -> bool {
        let user = &self.ctx.user;
        let kind_allowed = match kind {
            Some(ObjectKind::Content) => user.can_write_contents,
            Some(ObjectKind::Dam) => user.can_write_dam,
            None => false,
        };
        let type_writable = type_info.is_some_and(|t| !t.read_only);
        let workspace_writable = write_workspace.is_some_and(|ws| user.can_write_workspace(ws));
        kind_allowed && type_writable && workspace_writable
    }

    pub async fn label_facets(
        &mut self,
        kinds: &[FacetKind],
        aggregations: &BTreeMap<String, Vec<EngineBucket>>,
        total: u64,
    ) -> Result<Vec<LabeledFacet>> {
        let mut facets = Vec::new();
        for kind in kinds {
            let Some(raw) = aggregations.get(kind.name()) else {
                continue;
            };
            if raw.is_empty() {
                continue;
            }
            let checkbox = self.display_mode == DisplayMode::Checkbox;

            let buckets = match kind {
                FacetKind::Date => {
                    let mut ranges = Vec::new();
                    for bucket in raw {
                        if !checkbox && !(bucket.count > 0 && bucket.count < total) {
                            continue;
                        }
                        let Some(label) = self.date_ranges.label_for(&bucket.key, self.services.translator.as_ref())
                        else {
                            continue;
                        };
                        ranges.push(RangeBucket { from: bucket.key.clone(), count: bucket.count, label });
                    }
                    FacetBuckets::Ranges(ranges)
                }
                FacetKind::Author if !checkbox && raw.len() <= 1 => continue,
                _ => {
                    let mut terms = Vec::new();
                    for bucket in raw {
                        if let Some(label) = self.term_label(kind, &bucket.key).await? {
                            terms.push(TermBucket { term: bucket.key.clone(), count: bucket.count, label });
                        }
                    }
                    FacetBuckets::Terms(terms)
                }
            };
            if buckets.is_empty() {
                continue;
            }
            let label = self.facet_label(kind).await?;
            facets.push(LabeledFacet { id: kind.name().to_string(), label, buckets });
        }
        Ok(facets)
    }

    pub async fn label_active_filters(&mut self, active: &ActiveFilters) -> Result<Vec<LabeledFilter>> {
        let mut labeled = Vec::new();
        for (name, values) in active.iter() {
            let (label, terms) = match name {
                "query" => {
                    let terms = values.iter().map(|v| FilterTerm { term: v.clone(), label: v.clone() }).collect();
                    ("Query".to_string(), terms)
                }
                "lastupdatetime" => {
                    let translator = self.services.translator.as_ref();
                    let terms = values
                        .iter()
                        .map(|v| {
                            let label = self.date_ranges.label_for(v, translator).unwrap_or_else(|| v.clone());
                            FilterTerm { term: v.clone(), label }
                        })
                        .collect();
                    ("Date".to_string(), terms)
                }
                _ => {
                    let kind = FacetKind::from_id(name);
                    let mut terms = Vec::new();
                    for value in values {
                        if let Some(label) = self.term_label(&kind, value).await? {
                            terms.push(FilterTerm { term: value.clone(), label });
                        }
                    }
                    (self.facet_label(&kind).await?, terms)
                }
            };
            if terms.is_empty() {
                continue;
            }
            labeled.push(LabeledFilter { id: name.to_string(), label, terms });
        }
        Ok(labeled)
    }

    async fn facet_label(&self, kind: &FacetKind) -> Result<String> {
        if let Some((key, default)) = kind.fixed_label() {
            return Ok(self.services.translator.translate(key, default));
        }
        let id = kind.name();
        if let Some(taxonomy) = self.taxonomies.iter().find(|t| t.id == id) {
            return Ok(taxonomy.name.clone());
        }
        let found = self.services.taxonomies.find_by_id(id).await?;
        Ok(found.map(|t| t.name).unwrap_or_else(|| id.to_string()))
    }

    async fn term_label(&mut self, kind: &FacetKind, term: &str) -> Result<Option<String>> {
        let label = match kind {
            FacetKind::ContentType => self.cache.content_type(term).await?.map(|t| t.label),
            FacetKind::DamType => self.cache.dam_type(term).await?.map(|t| t.label),
            FacetKind::Author => self.services.users.find_by_id(term).await?.map(|u| u.name),
            FacetKind::Navigation => self.services.terms.navigation_label(term).await?,
            FacetKind::Taxonomy(_) => self.services.terms.find_by_id(term).await?.map(|t| t.text),
            FacetKind::Date => self.date_ranges.label_for(term, self.services.translator.as_ref()),
        };
        Ok(label)
    }
}

/// Engine mapping type used before single-type indices.
const DEFAULT_DOC_TYPE: &str = "_doc";

/// The content or dam type id, then a custom engine mapping type, then the
/// object kind, then the index name.
fn type_id_of(kind: Option<ObjectKind>, source: &Map<String, Value>, doc_type: Option<String>, index: String) -> String {
    let type_field = match kind {
        Some(ObjectKind::Content) => "contentType",
        Some(ObjectKind::Dam) => "damType",
        None => "objectType",
    };
    source
        .get(type_field)
        .and_then(scalar_string)
        .or_else(|| doc_type.filter(|t| t != DEFAULT_DOC_TYPE))
        .or_else(|| source.get("objectType").and_then(scalar_string))
        .unwrap_or(index)
}

fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Epoch seconds from an RFC 3339 timestamp or a bare `YYYY-MM-DD` date.
fn parse_timestamp(raw: &str) -> Option<i64> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.timestamp());
    }
    let day = NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()?;
    Some(day.and_hms_opt(0, 0, 0)?.and_utc().timestamp())
}
