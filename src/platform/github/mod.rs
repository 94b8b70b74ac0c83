pub mod client;
pub mod mapper;
pub mod remote;

pub use client::GitHubPlatform;
pub use remote::parse_remote_url;
