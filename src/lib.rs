pub mod config;
pub mod fetch;
pub mod gradebook;
pub mod output;
pub mod session;
pub mod source;
