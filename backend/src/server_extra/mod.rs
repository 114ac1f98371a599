//! HTTP surface: `POST /search/{scope}` over the search pipeline.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
};
use common::search_query::{SearchParameters, SearchScope};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use crate::{
    api::search::search,
    context::SearchContext,
    db_utils::engine::SearchEngine,
    error::SearchError,
    services::Collaborators,
};

/// Builds the caller's context (mode, locale, ACL view) from request headers.
pub trait RequestContextProvider: Send + Sync {
    fn context(&self, headers: &HeaderMap) -> anyhow::Result<SearchContext>;
}

#[derive(Clone)]
pub struct SearchState {
    pub services: Collaborators,
    pub engine: Arc<dyn SearchEngine>,
    pub contexts: Arc<dyn RequestContextProvider>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequestBody {
    #[serde(default)]
    pub params: SearchParameters,
    #[serde(default = "default_with_summary")]
    pub with_summary: bool,
}

fn default_with_summary() -> bool {
    true
}

impl IntoResponse for SearchError {
    fn into_response(self) -> Response {
        let status = match &self {
            e if e.is_configuration() => StatusCode::BAD_REQUEST,
            SearchError::Engine(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        warn!(status = status.as_u16(), error = %self, "search request failed");
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

pub async fn search_handler(
    State(state): State<SearchState>,
    Path(scope): Path<String>,
    headers: HeaderMap,
    Json(body): Json<SearchRequestBody>,
) -> Response {
    let scope: SearchScope = match scope.parse() {
        Ok(scope) => scope,
        Err(message) => return (StatusCode::NOT_FOUND, Json(json!({ "error": message }))).into_response(),
    };
    info!("Search request: scope = {:?}", scope);

    let ctx = match state.contexts.context(&headers) {
        Ok(ctx) => ctx,
        Err(e) => return SearchError::Collaborator(e).into_response(),
    };
    match search(&state.services, state.engine.as_ref(), &ctx, &body.params, scope, body.with_summary).await {
        Ok(outcome) => Json(outcome).into_response(),
        Err(e) => e.into_response(),
    }
}

pub fn router(state: SearchState) -> Router {
    Router::new().route("/search/{scope}", post(search_handler)).with_state(state)
}
