//! Defaults and fixed markers shared by search requests and responses.

pub const DEFAULT_PAGE_SIZE: u64 = 25;
pub const DEFAULT_PAGER: u64 = 0;
pub const DEFAULT_ORDER_BY: &str = "_score";

/// Sentinel in `displayedFacets` meaning every facet is shown.
pub const ALL_FACETS: &str = "all";
/// Sentinel in the readable workspace list meaning no workspace restriction.
pub const UNIVERSAL_READ: &str = "all";

pub const SUGGEST_PRE_TAG: &str = "<term>";
pub const SUGGEST_POST_TAG: &str = "</term>";
pub const SUGGEST_FRAGMENT_SIZE: u32 = 18;
