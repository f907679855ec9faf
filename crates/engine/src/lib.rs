//! Engine layer: job lifecycle, stores, queries.

pub mod jobs;
