//! Search entry point: plans filters and facets, runs one engine round trip
//! and shapes the response.

use common::{
    search_query::{SearchParameters, SearchScope},
    search_result::SearchOutcome,
};
use tracing::{debug, info};

use crate::{
    api::search::{
        date_ranges::DateRanges,
        facets::FacetPlan,
        filters::FilterBuilder,
        localization::{LocalizationPlan, LocalizationStrategy},
        query::{assemble_query, index_targets},
        results::ResultShaper,
        suggest::extract_suggestions,
    },
    context::{SearchContext, SearchMode},
    db_utils::engine::SearchEngine,
    error::Result,
    services::Collaborators,
};

pub async fn search(
    services: &Collaborators,
    engine: &dyn SearchEngine,
    ctx: &SearchContext,
    params: &SearchParameters,
    scope: SearchScope,
    with_summary: bool,
) -> Result<SearchOutcome> {
    let t0 = std::time::Instant::now();
    let suggest = scope.is_suggest();
    info!(?scope, mode = ?ctx.mode, query = %params.query, "search");

    let taxonomies = services.taxonomies.list().await?;
    let localization = resolve_localization(services, ctx, suggest).await?;
    let plan = FacetPlan::resolve(ctx.mode, params, scope, services.taxonomies.as_ref(), &taxonomies).await?;

    let mut builder = FilterBuilder::new(params, &plan.operators);
    builder.add_workspace_filter(&ctx.user.read_workspaces);
    if ctx.is_front_office() {
        builder.add_publication_window(ctx.now);
    }
    builder.record_query();
    builder.add_filter("type", "contentType");
    if scope.is_geo() {
        let geolocated = services.content_types.geolocated_content_types().await?;
        builder.add_geolocated_types(&geolocated);
    }
    builder.add_filter("damType", "damType");
    builder.add_filter("author", "createUser.id");
    builder.add_last_update_filter();
    builder.add_geo_box_filter();
    builder.add_taxonomy_filters(&taxonomies);
    builder.add_locale_filter(&localization.locale_filter);
    let built = builder.finish();
    debug!(fragments = built.filters.len(), any_filter = built.any_filter, "filters built");

    let date_ranges = DateRanges::from_now(ctx.now);
    let kinds = if suggest { vec![] } else { plan.displayed_kinds(&taxonomies) };
    let facet_specs = plan.facet_specs(&kinds, &built.filters, &built.active, &date_ranges);
    let query = assemble_query(params, &localization, &built.filters, facet_specs, suggest);

    let response = engine.execute(&index_targets(scope), &query).await?;
    debug!(total = response.total, hits = response.hits.len(), "engine responded");

    if suggest {
        let suggestions = extract_suggestions(&response.hits, &localization.highlight_fields());
        info!(count = suggestions.len(), elapsed_ms = t0.elapsed().as_millis() as u64, "suggest done");
        return Ok(SearchOutcome::Suggestions(suggestions));
    }

    let shaper = ResultShaper::new(services, ctx, &localization.locale, &taxonomies, &date_ranges, plan.display_mode);
    let result = shaper.shape(response, &params.query, &kinds, &built.active, with_summary).await?;
    info!(
        total = result.total,
        facets = result.facets.len(),
        elapsed_ms = t0.elapsed().as_millis() as u64,
        "search done"
    );
    Ok(SearchOutcome::Results(result))
}

async fn resolve_localization(services: &Collaborators, ctx: &SearchContext, suggest: bool) -> Result<LocalizationPlan> {
    match ctx.mode {
        SearchMode::BackOffice => {
            let active = services.languages.active_locales().await?;
            Ok(LocalizationPlan::resolve(
                LocalizationStrategy::BackOffice,
                &ctx.user.working_language,
                None,
                &active,
                suggest,
            ))
        }
        SearchMode::FrontOffice => {
            let strategy = services.taxonomies.localization_strategy().await?;
            let fallback = services.taxonomies.fallback_locale().await?;
            let active = match strategy {
                LocalizationStrategy::BackOffice => services.languages.active_locales().await?,
                _ => vec![],
            };
            Ok(LocalizationPlan::resolve(strategy, &ctx.locale, Some(&fallback), &active, suggest))
        }
    }
}
