//! HTTP boundary to the upstream reporting service.
//!
//! Nothing outside this module knows about transport details: `response`
//! flattens the feed's assorted envelope shapes into plain row arrays, and
//! `client` implements the `DataApi` seam over reqwest.

mod client;
mod response;

pub use client::{ApiConfig, ApiError, HttpDataApi};
pub use response::extract_rows;
