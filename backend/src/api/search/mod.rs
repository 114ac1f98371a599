//! Search API: request planning, engine query assembly and result shaping.

pub mod date_ranges;
pub mod facets;
pub mod filter_expr;
pub mod filters;
pub mod localization;
pub mod query;
pub mod results;
pub mod suggest;

mod search;
pub use search::search;
