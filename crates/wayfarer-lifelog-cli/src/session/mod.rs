//! Session management for a lifelog store file.

pub mod manager;

pub use manager::{LifeLogSessionManager, StoreReport, SummaryRow};
