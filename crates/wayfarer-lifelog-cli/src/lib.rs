//! Wayfarer LifeLog command line: watch intercepted responses and query the
//! resulting store.

pub mod chart;
pub mod config;
pub mod session;
pub mod transport;
pub mod types;

pub use chart::TextChart;
pub use config::{resolve_store_path, resolve_zone, Settings, ZoneSetting};
pub use session::LifeLogSessionManager;
pub use transport::StdioWatcher;
