pub mod agent;
pub mod config;
pub mod error;
pub mod platform;
pub mod poller;
pub mod server;
pub mod shutdown;
pub mod store;
pub mod workflow;
pub mod workspace;

#[cfg(test)]
mod test_support;
