use clap::{Parser, Subcommand};
use common::clap::AzureConfig;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(version, about = "Build, update and tear down the Azure attack range")]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Command,
    /// Path to the range configuration file
    #[clap(
        long,
        env = "ATTACK_RANGE_CONFIG",
        default_value = "attack-range.yml",
        global = true
    )]
    pub config: PathBuf,
    /// Directory containing the `terraform` and `playbooks` directories
    #[clap(long, env = "ATTACK_RANGE_DIR", default_value = ".", global = true)]
    pub range_dir: PathBuf,
    #[command(flatten)]
    pub azure_config: AzureConfig,
    #[clap(long)]
    pub skip_preflight_checks: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Provision the range with Terraform, then generate the Ansible inventory and run
    /// Defender for Endpoint onboarding
    Build,
    /// Re-apply the Terraform configuration, e.g. after your public IP changed
    Update,
    /// Destroy all range infrastructure
    Destroy,
    /// Regenerate playbooks/inventory.yml from the VMs currently running
    Inventory,
    /// Regenerate the inventory and re-run Defender for Endpoint onboarding
    Onboard,
    /// Write your current public IP into the Terraform allow-list without applying it
    AllowIp,
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::{Cli, Command};

    #[test]
    fn parses_subcommand_and_global_flags() {
        let cli = Cli::parse_from([
            "attack-range",
            "build",
            "--config",
            "ranges/lab.yml",
            "--range-dir",
            "/opt/range",
        ]);

        assert!(matches!(cli.command, Command::Build));
        assert_eq!(cli.config.to_str(), Some("ranges/lab.yml"));
        assert_eq!(cli.range_dir.to_str(), Some("/opt/range"));
        assert!(!cli.skip_preflight_checks);
    }

    #[test]
    fn allow_ip_is_kebab_case() {
        let cli = Cli::parse_from(["attack-range", "allow-ip"]);

        assert!(matches!(cli.command, Command::AllowIp));
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;

        Cli::command().debug_assert();
    }
}
