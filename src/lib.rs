pub mod agent;
pub mod comms;
pub mod error;
pub mod monitoring;
pub mod transport;
pub mod utils;

pub use agent::logger::MessageLogger;
pub use agent::output_log::OutputLog;
pub use error::LoggerError;
pub use transport::{ConnectionState, Payload};

// Crate version exposed for runtime queries
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
