//! Hosting provider REST clients.

pub mod client;
pub mod factory;
pub mod github;

pub use client::{CreateProjectOptions, ProviderClient};
pub use factory::{ProviderFactory, RestProviderFactory};
pub use github::GitHubClient;
