//! Data types shared by the command-line front end.

pub mod error;
pub mod message;

pub use error::*;
pub use message::*;
