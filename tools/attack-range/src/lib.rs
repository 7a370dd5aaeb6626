//! Provisioning lifecycle for the Azure attack range.
//!
//! The heavy lifting is done by Terraform (infrastructure) and Ansible (host onboarding). This
//! crate sequences the two, keeps the firewall allow-list pointed at the operator's current IP
//! and builds the Ansible inventory from whatever virtual machines currently exist.

pub mod allow_list;
pub mod ansible;
pub mod config;
pub mod controller;
pub mod external_dependencies;
pub mod public_ip;
pub mod range_dir;
pub mod subprocess;
pub mod terraform;
pub mod tfvars;

pub use config::RangeConfig;
pub use controller::{OnboardingOutcome, Operation, RangeController};
pub use range_dir::RangeDir;
