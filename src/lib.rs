pub mod chain;
pub mod config;
pub mod errors;
pub mod executor;
pub mod models;
pub mod protocol;
pub mod session;
pub mod stream;
pub mod transcript;
