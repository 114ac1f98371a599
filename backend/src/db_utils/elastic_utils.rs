//! Elasticsearch client: engine queries rendered to the JSON query DSL, one
//! `_search` round trip over HTTP, and the response parsed back.

use std::{collections::BTreeMap, time::Duration};

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value, json};
use tracing::{debug, info, warn};

use crate::{
    api::search::filter_expr::FilterExpr,
    config::EngineConfig,
    db_utils::engine::{
        EngineBucket, EngineHit, EngineQuery, EngineResponse, FacetAggregation, FacetSpec, IndexTarget, SearchEngine,
    },
    error::EngineError,
};

const BACKOFF_BASE_MS: u64 = 100;
/// Every facet aggregation nests its buckets under this name.
const BUCKETS_AGG: &str = "buckets";

/// `{ key: value }`
fn keyed(key: &str, value: Value) -> Value {
    let mut object = Map::new();
    object.insert(key.to_string(), value);
    Value::Object(object)
}

pub fn filter_to_dsl(filter: &FilterExpr) -> Value {
    match filter {
        FilterExpr::Term { field, value } => json!({ "term": keyed(field, value.clone()) }),
        FilterExpr::Terms { field, values } => json!({ "terms": keyed(field, json!(values)) }),
        FilterExpr::Range { field, from, to } => {
            let mut bounds = Map::new();
            if let Some(from) = from {
                bounds.insert("gte".to_string(), from.clone());
            }
            if let Some(to) = to {
                bounds.insert("lte".to_string(), to.clone());
            }
            json!({ "range": keyed(field, Value::Object(bounds)) })
        }
        FilterExpr::GeoBox { field, top_left, bottom_right } => {
            let corners = json!({
                "top_left": { "lat": top_left.lat, "lon": top_left.lon },
                "bottom_right": { "lat": bottom_right.lat, "lon": bottom_right.lon },
            });
            json!({ "geo_bounding_box": keyed(field, corners) })
        }
        FilterExpr::Exists { field } => json!({ "exists": { "field": field } }),
        FilterExpr::Not(inner) => json!({ "bool": { "must_not": [filter_to_dsl(inner)] } }),
        FilterExpr::And(all) => json!({ "bool": { "filter": all.iter().map(filter_to_dsl).collect::<Vec<_>>() } }),
        FilterExpr::Or(any) => json!({
            "bool": {
                "should": any.iter().map(filter_to_dsl).collect::<Vec<_>>(),
                "minimum_should_match": 1,
            }
        }),
    }
}

fn facet_to_dsl(facet: &FacetSpec) -> Value {
    let buckets = match &facet.aggregation {
        FacetAggregation::Terms { size, exclude } => {
            let mut terms = json!({ "field": facet.field, "size": size, "order": { "_count": "desc" } });
            if !exclude.is_empty() {
                terms["exclude"] = json!(exclude);
            }
            json!({ "terms": terms })
        }
        FacetAggregation::DateRanges { from } => {
            let ranges: Vec<Value> = from.iter().map(|f| json!({ "key": f, "from": f })).collect();
            json!({ "range": { "field": facet.field, "ranges": ranges } })
        }
    };
    let filter = facet.filter.as_ref().map(filter_to_dsl).unwrap_or_else(|| json!({ "match_all": {} }));
    json!({ "filter": filter, "aggs": keyed(BUCKETS_AGG, buckets) })
}

/// Renders the whole `_search` request body.
pub fn to_elastic_dsl(query: &EngineQuery) -> Value {
    let fields: Vec<String> = query.fields.iter().map(|f| f.to_string()).collect();
    let mut body = json!({
        "query": {
            "query_string": {
                "query": query.query_string,
                "fields": fields,
                "default_operator": "AND",
            }
        },
        "from": query.from,
        "size": query.size,
        "sort": [keyed(&query.sort.field, json!({ "order": query.sort.direction.as_str() }))],
        "track_total_hits": true,
    });

    if let Some(filter) = &query.filter {
        body["post_filter"] = filter_to_dsl(filter);
    }
    if !query.facets.is_empty() {
        let aggs: Map<String, Value> = query.facets.iter().map(|f| (f.name.clone(), facet_to_dsl(f))).collect();
        body["aggs"] = Value::Object(aggs);
    }
    if let Some(highlight) = &query.highlight {
        let per_field = json!({
            "fragment_size": highlight.fragment_size,
            "number_of_fragments": highlight.number_of_fragments,
        });
        let fields: Map<String, Value> = highlight.fields.iter().map(|f| (f.clone(), per_field.clone())).collect();
        body["highlight"] = json!({
            "pre_tags": [highlight.pre_tag],
            "post_tags": [highlight.post_tag],
            "fields": fields,
        });
    }
    body
}

#[derive(Debug, Deserialize)]
pub struct RawSearchResult {
    pub hits: RawSearchResultHits,
    #[serde(default)]
    pub aggregations: BTreeMap<String, RawFacetAggregation>,
}

#[derive(Debug, Deserialize)]
pub struct RawSearchResultHits {
    #[serde(default)]
    pub total: RawTotal,
    #[serde(default)]
    pub hits: Vec<RawSearchResultHit>,
}

/// Older engines send a bare count, newer ones `{ "value", "relation" }`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum RawTotal {
    Count(u64),
    Tracked { value: u64 },
}

impl Default for RawTotal {
    fn default() -> Self {
        RawTotal::Count(0)
    }
}

impl RawTotal {
    fn value(&self) -> u64 {
        match self {
            RawTotal::Count(n) | RawTotal::Tracked { value: n } => *n,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RawSearchResultHit {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_index", default)]
    pub index: String,
    #[serde(rename = "_type", default)]
    pub doc_type: Option<String>,
    #[serde(rename = "_score", default)]
    pub score: Option<f64>,
    #[serde(rename = "_source", default)]
    pub source: Map<String, Value>,
    #[serde(default)]
    pub highlight: BTreeMap<String, Vec<String>>,
}

/// Filter aggregation wrapping the nested bucket aggregation.
#[derive(Debug, Deserialize)]
pub struct RawFacetAggregation {
    #[serde(rename = "buckets", default)]
    pub inner: RawSearchResultAggregation,
}

#[derive(Debug, Deserialize, Default)]
pub struct RawSearchResultAggregation {
    #[serde(default)]
    pub buckets: Vec<RawSearchResultAggregationBucket>,
}

#[derive(Debug, Deserialize)]
pub struct RawSearchResultAggregationBucket {
    pub key: Value,
    #[serde(default)]
    pub doc_count: u64,
}

fn key_to_string(key: &Value) -> Option<String> {
    match key {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

impl From<RawSearchResultHit> for EngineHit {
    fn from(raw: RawSearchResultHit) -> Self {
        EngineHit {
            id: raw.id,
            index: raw.index,
            doc_type: raw.doc_type,
            score: raw.score,
            source: raw.source,
            highlights: raw.highlight,
        }
    }
}

impl From<RawSearchResult> for EngineResponse {
    fn from(raw: RawSearchResult) -> Self {
        let aggregations = raw
            .aggregations
            .into_iter()
            .map(|(name, agg)| {
                let buckets = agg
                    .inner
                    .buckets
                    .into_iter()
                    .filter_map(|b| Some(EngineBucket { key: key_to_string(&b.key)?, count: b.doc_count }))
                    .collect();
                (name, buckets)
            })
            .collect();
        EngineResponse {
            total: raw.hits.total.value(),
            hits: raw.hits.hits.into_iter().map(EngineHit::from).collect(),
            aggregations,
        }
    }
}

pub fn parse_response(response_txt: &str) -> Result<EngineResponse, EngineError> {
    let response: RawSearchResult =
        serde_json::from_str(response_txt).map_err(|e| EngineError::InvalidResponse(e.to_string()))?;
    Ok(response.into())
}


pub struct ElasticEngine {
    config: EngineConfig,
    client: reqwest::Client,
}

impl ElasticEngine {
    pub fn new(config: EngineConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self { config, client })
    }

    pub fn from_env() -> anyhow::Result<Self> {
        Self::new(EngineConfig::from_env())
    }

    fn index_names(&self, targets: &[IndexTarget]) -> String {
        targets
            .iter()
            .map(|t| match t {
                IndexTarget::Content => self.config.content_index.as_str(),
                IndexTarget::Dam => self.config.dam_index.as_str(),
            })
            .collect::<Vec<_>>()
            .join(",")
    }

    async fn send_once(&self, url: &str, body: &Value) -> Result<EngineResponse, EngineError> {
        let response = self.client.post(url).json(body).send().await.map_err(|e| self.transport_error(e))?;
        let status = response.status();
        let response_txt = response.text().await.map_err(|e| self.transport_error(e))?;
        if !status.is_success() {
            return Err(match status.as_u16() {
                400 => EngineError::MalformedQuery(response_txt),
                404 => EngineError::IndexMissing(response_txt),
                code => EngineError::Status { status: code, body: response_txt },
            });
        }
        debug!("SEARCH RESPONSE: len = {}", response_txt.len());
        parse_response(&response_txt)
    }

    fn transport_error(&self, e: reqwest::Error) -> EngineError {
        if e.is_timeout() {
            EngineError::Timeout(self.config.timeout.as_millis() as u64)
        } else if e.is_decode() {
            EngineError::InvalidResponse(e.to_string())
        } else {
            EngineError::Unavailable(e.to_string())
        }
    }
}

#[async_trait]
impl SearchEngine for ElasticEngine {
    async fn execute(&self, targets: &[IndexTarget], query: &EngineQuery) -> Result<EngineResponse, EngineError> {
        let indices = self.index_names(targets);
        let url = format!("{}/{}/_search", self.config.url.trim_end_matches('/'), indices);
        let body = to_elastic_dsl(query);
        let t0 = std::time::Instant::now();

        let mut attempt = 0;
        loop {
            match self.send_once(&url, &body).await {
                Ok(response) => {
                    info!(
                        indices = %indices,
                        total = response.total,
                        elapsed_ms = t0.elapsed().as_millis() as u64,
                        "search engine round trip"
                    );
                    return Ok(response);
                }
                Err(e) if e.is_transient() && attempt < self.config.max_retries => {
                    attempt += 1;
                    let backoff = BACKOFF_BASE_MS * 2u64.pow(attempt - 1);
                    warn!(attempt, wait_ms = backoff, error = %e, "search engine call failed, retrying");
                    tokio::time::sleep(Duration::from_millis(backoff)).await;
                }
                Err(e) => {
                    warn!(indices = %indices, error = %e, "search engine call failed");
                    return Err(e);
                }
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        api::search::{filter_expr::GeoPoint, localization::WeightedField},
        db_utils::engine::{HighlightSpec, SortSpec},
    };
    use common::search_query::SortDirection;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn query() -> EngineQuery {
        EngineQuery {
            query_string: "tour".to_string(),
            fields: vec![
                WeightedField { name: "all_fr".to_string(), boost: 1.0 },
                WeightedField { name: "all_nonlocalized".to_string(), boost: 0.1 },
            ],
            filter: None,
            facets: vec![],
            from: 20,
            size: 10,
            sort: SortSpec { field: "_score".to_string(), direction: SortDirection::Desc },
            highlight: None,
        }
    }

    fn engine(url: String, max_retries: u32) -> ElasticEngine {
        let config = EngineConfig { max_retries, ..EngineConfig::default().with_url(url) };
        ElasticEngine::new(config).unwrap()
    }

    fn ok_body() -> Value {
        json!({
            "hits": {
                "total": { "value": 2, "relation": "eq" },
                "hits": [
                    { "_id": "a1", "_index": "contents", "_score": 0.5, "_source": { "objectType": "content" } },
                    { "_id": "d1", "_index": "dam", "_score": null, "_source": { "objectType": "dam" },
                      "highlight": { "autocomplete_fr": ["<term>tou</term>r"] } }
                ]
            },
            "aggregations": {
                "type": { "doc_count": 2, "buckets": { "buckets": [ { "key": "article", "doc_count": 2 } ] } },
                "date": { "doc_count": 2, "buckets": { "buckets": [ { "key": "1710374400000", "from": 1710374400000.0, "doc_count": 1 } ] } }
            }
        })
    }

    #[test]
    fn filters_render_to_bool_dsl() {
        let filter = FilterExpr::And(vec![
            FilterExpr::terms("contentType", ["a", "b"]),
            FilterExpr::Or(vec![
                FilterExpr::negate(FilterExpr::exists("endPublicationDate")),
                FilterExpr::range("endPublicationDate", Some(json!(100)), None),
            ]),
        ]);
        assert_eq!(
            filter_to_dsl(&filter),
            json!({ "bool": { "filter": [
                { "terms": { "contentType": ["a", "b"] } },
                { "bool": {
                    "should": [
                        { "bool": { "must_not": [ { "exists": { "field": "endPublicationDate" } } ] } },
                        { "range": { "endPublicationDate": { "gte": 100 } } }
                    ],
                    "minimum_should_match": 1
                } }
            ] } })
        );
    }

    #[test]
    fn geo_box_renders_corners() {
        let filter = FilterExpr::GeoBox {
            field: "pos".to_string(),
            top_left: GeoPoint { lon: 1.0, lat: 50.0 },
            bottom_right: GeoPoint { lon: 3.0, lat: 48.0 },
        };
        assert_eq!(
            filter_to_dsl(&filter),
            json!({ "geo_bounding_box": { "pos": {
                "top_left": { "lat": 50.0, "lon": 1.0 },
                "bottom_right": { "lat": 48.0, "lon": 3.0 }
            } } })
        );
    }

    #[test]
    fn request_body_carries_paging_sort_post_filter_and_facets() {
        let mut q = query();
        q.filter = Some(FilterExpr::And(vec![FilterExpr::term("target", "global")]));
        q.facets = vec![
            FacetSpec {
                name: "type".to_string(),
                field: "contentType".to_string(),
                filter: None,
                aggregation: FacetAggregation::Terms { size: 1000, exclude: vec!["article".to_string()] },
            },
            FacetSpec {
                name: "date".to_string(),
                field: "lastUpdateTime".to_string(),
                filter: Some(FilterExpr::term("target", "global")),
                aggregation: FacetAggregation::DateRanges { from: vec!["1000".to_string()] },
            },
        ];
        let body = to_elastic_dsl(&q);
        assert_eq!(body["query"]["query_string"]["fields"], json!(["all_fr", "all_nonlocalized^0.1"]));
        assert_eq!(body["from"], json!(20));
        assert_eq!(body["size"], json!(10));
        assert_eq!(body["sort"], json!([{ "_score": { "order": "desc" } }]));
        assert_eq!(body["post_filter"], json!({ "bool": { "filter": [ { "term": { "target": "global" } } ] } }));
        assert_eq!(body["aggs"]["type"]["filter"], json!({ "match_all": {} }));
        assert_eq!(
            body["aggs"]["type"]["aggs"]["buckets"]["terms"],
            json!({ "field": "contentType", "size": 1000, "order": { "_count": "desc" }, "exclude": ["article"] })
        );
        assert_eq!(
            body["aggs"]["date"]["aggs"]["buckets"]["range"],
            json!({ "field": "lastUpdateTime", "ranges": [ { "key": "1000", "from": "1000" } ] })
        );
        assert!(body.get("highlight").is_none());
    }

    #[test]
    fn highlight_block_for_suggestions() {
        let mut q = query();
        q.highlight = Some(HighlightSpec {
            pre_tag: "<term>".to_string(),
            post_tag: "</term>".to_string(),
            fields: vec!["autocomplete_fr".to_string()],
            fragment_size: 18,
            number_of_fragments: 1,
        });
        assert_eq!(
            to_elastic_dsl(&q)["highlight"],
            json!({
                "pre_tags": ["<term>"],
                "post_tags": ["</term>"],
                "fields": { "autocomplete_fr": { "fragment_size": 18, "number_of_fragments": 1 } }
            })
        );
    }

    #[test]
    fn response_parses_hits_totals_and_buckets() {
        let parsed = parse_response(&ok_body().to_string()).unwrap();
        assert_eq!(parsed.total, 2);
        assert_eq!(parsed.hits.len(), 2);
        assert_eq!(parsed.hits[0].score, Some(0.5));
        assert_eq!(parsed.hits[1].score, None);
        assert_eq!(parsed.hits[1].highlights["autocomplete_fr"], vec!["<term>tou</term>r"]);
        assert_eq!(parsed.aggregations["type"], vec![EngineBucket { key: "article".to_string(), count: 2 }]);
        assert_eq!(parsed.aggregations["date"][0].key, "1710374400000");
    }

    #[test]
    fn legacy_numeric_total_is_accepted() {
        let parsed = parse_response(r#"{ "hits": { "total": 7, "hits": [] } }"#).unwrap();
        assert_eq!(parsed.total, 7);
        assert!(matches!(parse_response(r#"{ "took": 1 }"#), Err(EngineError::InvalidResponse(_))));
    }

    #[test]
    fn hits_without_source_or_aggregations_still_parse() {
        let body = r#"{
            "hits": {
                "total": { "value": 1, "relation": "eq" },
                "hits": [ { "_id": "a1", "_index": "contents", "_type": "_doc" } ]
            }
        }"#;
        let parsed = parse_response(body).unwrap();
        assert_eq!(parsed.hits[0].doc_type.as_deref(), Some("_doc"));
        assert_eq!(parsed.hits[0].score, None);
        assert!(parsed.hits[0].source.is_empty());
        assert!(parsed.aggregations.is_empty());
    }

    #[tokio::test]
    async fn posts_to_every_target_index() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/dam,contents/_search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(ok_body()))
            .expect(1)
            .mount(&server)
            .await;

        let engine = engine(server.uri(), 0);
        let response = engine.execute(&[IndexTarget::Dam, IndexTarget::Content], &query()).await.unwrap();
        assert_eq!(response.total, 2);
    }

    #[tokio::test]
    async fn unavailable_engine_is_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(ok_body()))
            .mount(&server)
            .await;

        let engine = engine(server.uri(), 1);
        let response = engine.execute(&[IndexTarget::Content], &query()).await.unwrap();
        assert_eq!(response.hits.len(), 2);
    }

    #[tokio::test]
    async fn client_errors_are_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/contents/_search"))
            .respond_with(ResponseTemplate::new(400).set_body_string("parse error"))
            .expect(1)
            .mount(&server)
            .await;

        let engine = engine(server.uri(), 3);
        let err = engine.execute(&[IndexTarget::Content], &query()).await.unwrap_err();
        assert_eq!(err, EngineError::MalformedQuery("parse error".to_string()));
    }

    #[tokio::test]
    async fn missing_index_maps_to_index_missing() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(404).set_body_string("no such index"))
            .mount(&server)
            .await;

        let engine = engine(server.uri(), 1);
        let err = engine.execute(&[IndexTarget::Dam], &query()).await.unwrap_err();
        assert!(matches!(err, EngineError::IndexMissing(_)));
    }

    #[tokio::test]
    async fn slow_engine_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(ok_body()).set_delay(Duration::from_millis(500)))
            .mount(&server)
            .await;

        let config = EngineConfig { timeout: Duration::from_millis(50), max_retries: 0, ..EngineConfig::default().with_url(server.uri()) };
        let engine = ElasticEngine::new(config).unwrap();
        let err = engine.execute(&[IndexTarget::Content], &query()).await.unwrap_err();
        assert_eq!(err, EngineError::Timeout(50));
    }
}
