pub mod cli;
pub mod config;
pub mod crawler;
pub mod export;
pub mod extractor;
pub mod logging;
pub mod models;
pub mod network;
pub mod pagerank;
pub mod report;
pub mod robots;
pub mod url_utils;

// Re-export main types for library usage
pub use config::{ConfigError, CrawlerConfig};
pub use crawler::{CrawlError, Crawler};
pub use models::{Contacts, CrawlResult, Link, Page};
pub use network::{FetchError, FetchedPage, HttpClient};
pub use robots::RobotsGate;
