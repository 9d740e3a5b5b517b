pub mod api;
pub mod app;
pub mod config;
pub mod demo;
pub mod errors;
pub mod flex_id;
pub mod handlers;
pub mod lineup;
pub mod logging;
pub mod ui;
