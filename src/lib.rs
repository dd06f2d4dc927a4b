//! Client-side core of the job-market dashboard: loads offers page by page,
//! clusters them for the map, ranks them by place and reduces analytics counts
//! into display-ready view models.

pub mod accumulator;
pub mod analytics;
pub mod api;
pub mod config;
pub mod error;
pub mod facets;
pub mod format;
pub mod geo;
pub mod models;
pub mod ranking;
