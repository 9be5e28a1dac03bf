//! Backend for a community organization's website: a public content API and
//! the admin dashboard behind it, over SQLite.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod file;
pub mod models;
pub mod routes;
pub mod util;

pub use config::AppConfig;
pub use routes::{app, AppState};
