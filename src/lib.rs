pub mod analytics;
pub mod cli;
pub mod config;
pub mod dashboard;
pub mod logging;
pub mod proxy;
pub mod web;
