pub mod bundle;
pub mod detection;
pub mod ground;
pub mod storm;

pub use bundle::DashboardBundle;
pub use detection::BoatDetectionPoint;
pub use ground::{FishingGround, GroundGeometry};
pub use storm::{PeriodMetrics, StormRecord, TrackPoint};
