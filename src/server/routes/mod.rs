pub mod assets;
pub mod games;
pub mod scrape;
