pub mod args;
pub mod cache;
pub mod config;
pub mod database;
pub mod error;
pub mod index;
pub mod keys;
pub mod model;
pub mod utils;
