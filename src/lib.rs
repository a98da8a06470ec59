pub mod api;
pub mod config;
pub mod errors;
pub mod fetch;
pub mod models;
pub mod pipeline;
pub mod scan;
pub mod webhook;
