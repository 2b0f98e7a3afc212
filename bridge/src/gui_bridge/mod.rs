pub mod bridge;
pub mod state;
