pub mod app;
pub mod auth;
pub mod cli;
pub mod client;
pub mod config;
pub mod csv_exchange;
pub mod database;
pub mod error;
pub mod filter;
pub mod handlers;
pub mod middleware;
pub mod oai;
pub mod services;
pub mod types;

pub use app::{app, AppState};

#[cfg(test)]
pub mod testing;
