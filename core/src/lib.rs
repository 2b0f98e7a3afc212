//! Synchronization engine for the cyclone impact dashboard.
//!
//! The engine joins fishing-activity statistics with cyclone tracks and keeps
//! the dashboard's map layers, charts, tables and summary cards consistent
//! with the selected storm, year and date across asynchronous bridge loads.

pub mod analysis;
pub mod catalog;
pub mod config;
pub mod context;
pub mod derived;
pub mod draft;
pub mod engine;
pub mod gateway;
pub mod math;
pub mod model;
pub mod navigation;
pub mod prelude;
pub mod selector;
pub mod telemetry;
pub mod upload;
pub mod views;
pub mod wire;

pub use config::EngineConfig;
pub use engine::{DashboardEngine, DashboardFrame};
pub use prelude::{EngineError, EngineResult, Mode, Scope, ViewSynchronizer};
