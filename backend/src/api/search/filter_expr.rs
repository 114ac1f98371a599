//! Engine-agnostic boolean filter tree.
//!
//! Built by the filter builder and translated to the engine's DSL only at the
//! engine boundary. [`FilterExpr::matches`] evaluates a tree against a plain
//! JSON document with the same semantics the engine applies.

use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    pub lon: f64,
    pub lat: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FilterExpr {
    /// Field contains exactly this value.
    Term { field: String, value: Value },
    /// Field contains any of the values.
    Terms { field: String, values: Vec<Value> },
    /// Inclusive numeric/date range, either bound optional.
    Range { field: String, from: Option<Value>, to: Option<Value> },
    GeoBox { field: String, top_left: GeoPoint, bottom_right: GeoPoint },
    Exists { field: String },
    Not(Box<FilterExpr>),
    And(Vec<FilterExpr>),
    Or(Vec<FilterExpr>),
}

impl FilterExpr {
    pub fn term(field: impl Into<String>, value: impl Into<Value>) -> Self {
        FilterExpr::Term { field: field.into(), value: value.into() }
    }

    pub fn terms<V: Into<Value>>(field: impl Into<String>, values: impl IntoIterator<Item = V>) -> Self {
        FilterExpr::Terms { field: field.into(), values: values.into_iter().map(Into::into).collect() }
    }

    pub fn range(field: impl Into<String>, from: Option<Value>, to: Option<Value>) -> Self {
        FilterExpr::Range { field: field.into(), from, to }
    }

    pub fn exists(field: impl Into<String>) -> Self {
        FilterExpr::Exists { field: field.into() }
    }

    pub fn negate(inner: FilterExpr) -> Self {
        FilterExpr::Not(Box::new(inner))
    }

    pub fn matches(&self, doc: &Map<String, Value>) -> bool {
        match self {
            FilterExpr::Term { field, value } => field_values(doc, field).iter().any(|v| loosely_equal(v, value)),
            FilterExpr::Terms { field, values } => {
                let present = field_values(doc, field);
                present.iter().any(|v| values.iter().any(|wanted| loosely_equal(v, wanted)))
            }
            FilterExpr::Range { field, from, to } => {
                let lower = from.as_ref().and_then(as_number);
                let upper = to.as_ref().and_then(as_number);
                field_values(doc, field).iter().filter_map(|v| as_number(v)).any(|n| {
                    lower.is_none_or(|l| n >= l) && upper.is_none_or(|u| n <= u)
                })
            }
            FilterExpr::GeoBox { field, top_left, bottom_right } => {
                lookup_path(doc, field).and_then(as_geo_point).is_some_and(|p| {
                    p.lat <= top_left.lat && p.lat >= bottom_right.lat && p.lon >= top_left.lon && p.lon <= bottom_right.lon
                })
            }
            FilterExpr::Exists { field } => !field_values(doc, field).is_empty(),
            FilterExpr::Not(inner) => !inner.matches(doc),
            FilterExpr::And(all) => all.iter().all(|f| f.matches(doc)),
            FilterExpr::Or(any) => any.iter().any(|f| f.matches(doc)),
        }
    }
}

/// Resolves `path` either as a literal (dotted) key or by walking nested objects.
pub fn lookup_path<'v>(doc: &'v Map<String, Value>, path: &str) -> Option<&'v Value> {
    if let Some(v) = doc.get(path) {
        return Some(v);
    }
    let (head, tail) = path.split_once('.')?;
    match doc.get(head)? {
        Value::Object(inner) => lookup_path(inner, tail),
        _ => None,
    }
}

fn field_values<'v>(doc: &'v Map<String, Value>, field: &str) -> Vec<&'v Value> {
    match lookup_path(doc, field) {
        None | Some(Value::Null) => vec![],
        Some(Value::Array(items)) => items.iter().filter(|v| !v.is_null()).collect(),
        Some(v) => vec![v],
    }
}

fn loosely_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::String(x), Value::String(y)) => x == y,
        _ => match (as_number(a), as_number(b)) {
            (Some(x), Some(y)) => x == y,
            _ => a == b,
        },
    }
}

fn as_number(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn as_geo_point(v: &Value) -> Option<GeoPoint> {
    match v {
        Value::Array(pair) if pair.len() == 2 => Some(GeoPoint { lon: as_number(&pair[0])?, lat: as_number(&pair[1])? }),
        Value::Object(obj) => Some(GeoPoint { lon: as_number(obj.get("lon")?)?, lat: as_number(obj.get("lat")?)? }),
        _ => None,
    }
}
