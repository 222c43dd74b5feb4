pub mod args;
pub mod core;
pub mod dns;
pub mod error;
pub mod logger;
pub mod output;
pub mod utils;
