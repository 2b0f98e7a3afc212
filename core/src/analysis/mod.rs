//! Backend analysis runs: request validation, job start and status polling.

pub mod cancel;
pub mod monitor;
pub mod request;

pub use cancel::CancellationToken;
pub use monitor::{AnalysisJob, AnalysisMonitor, AnalysisOutcome};
pub use request::{country_code, historical_request, nowcast_request, TrackSource, COUNTRIES};
