pub mod core;
pub mod db;
pub mod error;
pub mod logging;
pub mod models;
pub mod output;
