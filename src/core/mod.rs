pub mod catalog;
pub mod client;
pub mod collector;
pub mod config;
pub mod models;
pub mod server;
