pub mod config;
pub mod error;
pub mod models;
pub mod normalize;
pub mod pipeline;
pub mod scraper;
pub mod server;
pub mod sources;
pub mod storage;
pub mod utils;
