pub mod config_cmd;
pub mod output;
pub mod scrape_cmd;
pub mod serve_cmd;
