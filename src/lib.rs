pub mod api;
mod config;
pub mod db;

pub use self::config::Config;
