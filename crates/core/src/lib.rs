pub mod config;
pub mod error;
pub mod labels;
pub mod meta;

pub use config::{Config, ReleaseConfig, StoreConfig, WatchConfig};
pub use error::*;
pub use meta::*;
