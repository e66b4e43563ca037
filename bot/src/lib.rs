pub mod aggregate;
pub mod api;
pub mod config;
pub mod report;
