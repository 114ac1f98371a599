//! Faceted search backend: filter and facet planning, the Elasticsearch
//! client, result shaping and the HTTP handler.

pub mod api;
pub mod config;
pub mod context;
pub mod db_utils;
pub mod error;
pub mod server_extra;
pub mod services;
