pub mod newsapi;
pub mod rss;

pub use newsapi::NewsApiSource;
pub use rss::RssSource;
