pub mod accuracy;
pub mod aggregate;
pub mod browser;
pub mod config;
pub mod console;
pub mod dashboard_fetch;
pub mod display;
pub mod feed;
pub mod http_client;
pub mod pagination;
pub mod refresh;
pub mod state;
