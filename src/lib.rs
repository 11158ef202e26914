pub mod components;
pub mod config;
pub mod error;
pub mod markup;
pub mod utils;
