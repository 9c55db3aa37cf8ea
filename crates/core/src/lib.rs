#![forbid(unsafe_code)]

pub mod error;
pub mod filter;
pub mod import;
pub mod model;
pub mod stats;
pub mod time;

pub use error::Error;
pub use time::Clock;
