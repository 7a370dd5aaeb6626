//! Read-only clients for the parts of the Azure Resource Manager REST API the attack range
//! needs: listing virtual machines and resolving their network interfaces and public IPs.
//!
//! The SDKs for Azure are not stable in Rust so we talk to ARM directly with `reqwest`.
//! See https://learn.microsoft.com/en-us/rest/api/azure/ for the shape of the responses.

mod client;
mod compute;
mod credential;
pub mod models;
mod network;

pub use client::ArmClient;
pub use compute::{ComputeApi, ComputeClient};
pub use credential::AzureCredential;
pub use network::{NetworkApi, NetworkClient};

/// The last path segment of an ARM resource id is the resource name, e.g.
/// `/subscriptions/../networkInterfaces/dc01-nic` is `dc01-nic`.
pub fn resource_name_from_id(id: &str) -> Result<&str, crate::Error> {
    id.trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|name| !name.is_empty())
        .ok_or_else(|| crate::Error::InvalidResourceId(id.to_string()))
}
