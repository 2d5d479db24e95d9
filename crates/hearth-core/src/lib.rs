pub mod config;
pub mod types;

pub use config::HearthConfig;
pub use types::*;
