//! Final engine query assembly: query string, weighted fields, pagination,
//! sort, post filter, facets and suggestion highlights.

use common::{
    search_const::{SUGGEST_FRAGMENT_SIZE, SUGGEST_POST_TAG, SUGGEST_PRE_TAG},
    search_query::{SearchParameters, SearchScope},
};

use crate::{
    api::search::{filters::GlobalFilterList, localization::LocalizationPlan},
    db_utils::engine::{EngineQuery, FacetSpec, HighlightSpec, IndexTarget, SortSpec},
};

const MATCH_ALL: &str = "*";

pub fn index_targets(scope: SearchScope) -> Vec<IndexTarget> {
    match scope {
        SearchScope::Content | SearchScope::Geo => vec![IndexTarget::Content],
        SearchScope::Dam => vec![IndexTarget::Dam],
        SearchScope::All | SearchScope::Suggest | SearchScope::Geosuggest => {
            vec![IndexTarget::Dam, IndexTarget::Content]
        }
    }
}

pub fn assemble_query(
    params: &SearchParameters,
    localization: &LocalizationPlan,
    filters: &GlobalFilterList,
    facets: Vec<FacetSpec>,
    suggest: bool,
) -> EngineQuery {
    let query_string = if params.query.is_empty() {
        MATCH_ALL.to_string()
    } else {
        params.query.clone()
    };

    let highlight = suggest.then(|| HighlightSpec {
        pre_tag: SUGGEST_PRE_TAG.to_string(),
        post_tag: SUGGEST_POST_TAG.to_string(),
        fields: localization.highlight_fields(),
        fragment_size: SUGGEST_FRAGMENT_SIZE,
        number_of_fragments: 1,
    });

    EngineQuery {
        query_string,
        fields: localization.fields.clone(),
        filter: filters.conjunction(),
        facets,
        from: params.pager.saturating_mul(params.pagesize),
        size: params.pagesize,
        sort: SortSpec {
            field: params.orderby.clone(),
            direction: params.orderby_direction,
        },
        highlight,
    }
}
