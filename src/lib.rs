pub mod config;
pub mod export;
pub mod freestyle;

pub use freestyle::{FreestyleError, Result};
