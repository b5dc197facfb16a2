pub mod cli;
pub mod config;
pub mod cycle;
pub mod extract;
pub mod notify;
pub mod report;
pub mod snapshot;
pub mod store;
