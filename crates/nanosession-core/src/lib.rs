pub mod error;
pub mod config;
pub mod codec;
pub mod session;
pub mod service;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
