pub mod config;
pub mod daemon;
pub mod logger;
pub mod output_log;
