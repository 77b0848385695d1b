//! stackscout - resource discovery for infrastructure providers
//!
//! Enumerates the live resources of a provider service (AWS CloudFormation,
//! AWS WAF Regional, Octopus Deploy) and normalizes each one into a
//! [`resource::Resource`] descriptor that an import or drift tool can key on.
//!
//! # Module Structure
//!
//! - [`resource`] - descriptors, pagination, enumeration steps and generators
//! - [`client`] - provider wire clients behind the [`client::ServiceClient`] trait
//! - [`inventory`] - runs generators and merges their output
//! - [`config`] - persistent configuration and precedence rules
//! - [`error`] - the crate error type

pub mod client;
pub mod config;
pub mod error;
pub mod inventory;
pub mod resource;

pub use error::{DiscoveryError, Result};

/// Version injected at compile time via STACKSCOUT_VERSION env var (set by CI/CD),
/// or "dev" for local builds.
pub const VERSION: &str = match option_env!("STACKSCOUT_VERSION") {
    Some(v) => v,
    None => "dev",
};
