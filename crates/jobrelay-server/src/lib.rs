pub mod config;
pub mod http;
pub mod reaper;
pub mod worker;
