pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod fetch;
pub mod normalize;
pub mod records;
pub mod service;
pub mod utils;

pub use error::{AppError, Result};
