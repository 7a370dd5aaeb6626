//! The `common` crate provides the shared plumbing for the attack range tooling: command line
//! argument groups, tracing set up, and thin clients for the Azure Resource Manager REST API
//! such as [`ComputeClient`] and [`NetworkClient`].
//!
//! [`ComputeClient`]: azure::ComputeClient
//! [`NetworkClient`]: azure::NetworkClient

pub mod azure;
pub mod clap;
pub mod clients;
mod error;
pub mod tracing;

pub use error::Error;
