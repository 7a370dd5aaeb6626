use std::process::ExitCode;

use attack_range::allow_list::sync_allow_list;
use attack_range::external_dependencies::{
    external_dependency_preflight_check, REQUIRED_DEPENDENCIES,
};
use attack_range::public_ip::IpifyLookup;
use attack_range::subprocess::SystemProcessRunner;
use attack_range::{RangeConfig, RangeController, RangeDir};
use clap::Parser;
use cli::{Cli, Command};
use common::azure::{ArmClient, AzureCredential, ComputeClient, NetworkClient};
use common::tracing::init_tracing;

mod cli;

/// Everything a controller backed operation needs before it can start: Terraform on the
/// path, the range configuration and ARM clients. The clients only log in to Azure once
/// inventory generation first talks to ARM, so Terraform never waits on Azure credentials.
async fn connect(cli: &Cli, range_dir: RangeDir) -> anyhow::Result<RangeController> {
    if !cli.skip_preflight_checks {
        external_dependency_preflight_check(&SystemProcessRunner, &REQUIRED_DEPENDENCIES).await?;
    }

    let config = RangeConfig::from_file(&cli.config)?
        .with_subscription_id(cli.azure_config.subscription_id.clone());
    tracing::debug!("Range config: {:?}", config);

    let arm_client = ArmClient::new(
        &cli.azure_config,
        &config.subscription_id,
        AzureCredential::from_env(),
    );

    Ok(RangeController::new(
        config,
        range_dir,
        ComputeClient::new(arm_client.clone()),
        NetworkClient::new(arm_client),
    ))
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    init_tracing("info");
    tracing::debug!("Cli args: {:?}", cli);

    let range_dir = RangeDir::new(&cli.range_dir);

    let success = match cli.command {
        Command::Build => connect(&cli, range_dir).await?.build().await,
        Command::Update => connect(&cli, range_dir).await?.update().await,
        Command::Destroy => connect(&cli, range_dir).await?.destroy().await,
        Command::Inventory => connect(&cli, range_dir).await?.create_inventory().await,
        Command::Onboard => connect(&cli, range_dir).await?.onboard().await,
        // Only touches local files, no need for Terraform or Azure credentials
        Command::AllowIp => match sync_allow_list(&range_dir, &IpifyLookup::new()).await {
            Ok(_) => true,
            Err(e) => {
                tracing::error!("Could not update IP configuration: {:#}", e);
                false
            }
        },
    };

    Ok(if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
