//! Reading intercepted responses from a line stream.

pub mod framing;
pub mod stdio;

pub use stdio::{StdioWatcher, WatchStats};
