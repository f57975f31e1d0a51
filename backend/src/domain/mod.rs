//! Domain layer: all business logic, no I/O beyond the `DataApi` seam.

pub mod charts;
pub mod dashboard_service;
pub mod fiscal_calendar;
pub mod metrics;
pub mod normalizer;
pub mod reconciler;
pub mod snapshot_cache;
pub mod store_directory;

pub use dashboard_service::DashboardService;
pub use reconciler::Reconciler;
pub use store_directory::{StoreDirectory, StoreFilter};
