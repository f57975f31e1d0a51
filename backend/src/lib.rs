//! Aggregation engine for the restaurant-chain performance dashboard.
//!
//! The domain layer owns the fiscal calendar, the KPI reducers, and the
//! data-source reconciliation over the upstream reporting API. The `api`
//! module is the only place that knows about HTTP; the `rest` module is the
//! thin surface the dashboard frontend talks to.

pub mod api;
pub mod domain;
pub mod rest;
