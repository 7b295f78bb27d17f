pub mod assign;
pub mod cache;
pub mod crawler;
pub mod dates;
pub mod parser;
pub mod scraper;
pub mod store;
pub mod terms;
pub mod types;

pub use crawler::{CrawlError, CrawlStats, Crawler};
pub use scraper::{ScraperError, WebScraper};
pub use store::SqliteStore;
pub use terms::TermIndex;

pub(crate) const BASE_URL: &str = "http://www.assemblee-nationale.fr/sycomore";

pub const DEFAULT_CACHE_DIR: &str = ".cache";
pub const DEFAULT_DATABASE: &str = "data.sqlite";
