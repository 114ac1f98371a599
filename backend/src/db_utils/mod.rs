pub mod elastic_utils;
pub mod engine;
