use common::azure::{models::VirtualMachine, resource_name_from_id, ComputeApi, NetworkApi};
use strum::Display;

use crate::{
    allow_list::sync_allow_list,
    ansible::{self, AnsibleInventory, HostClass, ANSIBLE_PLAYBOOK},
    public_ip::{IpifyLookup, PublicIpLookup},
    subprocess::{ProcessRunner, SystemProcessRunner},
    terraform::TerraformCommand,
    RangeConfig, RangeDir,
};

/// The long running operations the controller performs. Only one runs at a time and none of
/// them can be resumed part way through.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq)]
#[strum(serialize_all = "lowercase")]
pub enum Operation {
    Build,
    Update,
    Destroy,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OnboardingOutcome {
    Completed,
    /// A prerequisite was missing, the reason has already been logged
    Skipped(String),
    /// The playbook ran but exited unsuccessfully
    Failed(String),
}

/// Drives Terraform and Ansible against one range checkout and one Azure resource group.
///
/// Every public operation logs its own failures and reports a plain success flag, nothing
/// here returns an error to the caller.
pub struct RangeController {
    config: RangeConfig,
    range_dir: RangeDir,
    compute: Box<dyn ComputeApi>,
    network: Box<dyn NetworkApi>,
    runner: Box<dyn ProcessRunner>,
    ip_lookup: Box<dyn PublicIpLookup>,
}

impl RangeController {
    pub fn new(
        config: RangeConfig,
        range_dir: RangeDir,
        compute: impl ComputeApi + 'static,
        network: impl NetworkApi + 'static,
    ) -> Self {
        Self {
            config,
            range_dir,
            compute: Box::new(compute),
            network: Box::new(network),
            runner: Box::new(SystemProcessRunner),
            ip_lookup: Box::new(IpifyLookup::new()),
        }
    }

    pub fn with_process_runner(mut self, runner: impl ProcessRunner + 'static) -> Self {
        self.runner = Box::new(runner);
        self
    }

    pub fn with_ip_lookup(mut self, ip_lookup: impl PublicIpLookup + 'static) -> Self {
        self.ip_lookup = Box::new(ip_lookup);
        self
    }

    /// Provisions the range, then refreshes the inventory and onboards the Windows hosts.
    ///
    /// Only the Terraform steps decide the outcome, inventory and onboarding are best effort.
    pub async fn build(&self) -> bool {
        tracing::info!("Building Azure Attack Range infrastructure...");

        self.sync_allow_list().await;

        for command in [TerraformCommand::Init, TerraformCommand::Apply] {
            if let Err(e) = self.run_terraform(command).await {
                tracing::error!("Error building infrastructure: {:#}", e);
                return self.finish(Operation::Build, false);
            }
        }

        tracing::info!("Infrastructure built successfully");

        if !self.create_inventory().await {
            tracing::warn!(
                "Could not generate Ansible inventory; skipping Defender onboarding playbook."
            );
            return self.finish(Operation::Build, true);
        }

        self.run_defender_onboarding().await;

        self.finish(Operation::Build, true)
    }

    /// Re-applies the Terraform configuration after refreshing the allow-list.
    pub async fn update(&self) -> bool {
        tracing::info!("Updating Azure Attack Range infrastructure...");

        self.sync_allow_list().await;

        if let Err(e) = self.run_terraform(TerraformCommand::Apply).await {
            tracing::error!("Error updating infrastructure: {:#}", e);
            return self.finish(Operation::Update, false);
        }

        tracing::info!("Infrastructure updated successfully");
        self.finish(Operation::Update, true)
    }

    pub async fn destroy(&self) -> bool {
        tracing::info!("Destroying Azure Attack Range infrastructure...");

        if let Err(e) = self.run_terraform(TerraformCommand::Destroy).await {
            tracing::error!("Error destroying infrastructure: {:#}", e);
            return self.finish(Operation::Destroy, false);
        }

        tracing::info!("Infrastructure destroyed successfully");
        self.finish(Operation::Destroy, true)
    }

    /// Points the Terraform `allowed_ip` at our current public IP.
    ///
    /// Never fails: if anything goes wrong Terraform runs with whatever is already on disk.
    /// Returns the CIDR written, if any.
    pub async fn sync_allow_list(&self) -> Option<String> {
        match sync_allow_list(&self.range_dir, self.ip_lookup.as_ref()).await {
            Ok(cidr) => Some(cidr),
            Err(e) => {
                tracing::warn!("Could not update IP configuration: {:#}", e);
                tracing::warn!("Continuing with existing configuration...");
                None
            }
        }
    }

    /// Rebuilds `playbooks/inventory.yml` from the VMs currently in the resource group.
    pub async fn create_inventory(&self) -> bool {
        tracing::info!("Creating Ansible inventory file...");

        match self.build_inventory().await {
            Ok(inventory) => {
                tracing::info!(
                    "Generated inventory at {} with windows hosts {:?} and linux hosts {:?}",
                    self.range_dir.inventory_path().display(),
                    inventory.windows_hosts().collect::<Vec<_>>(),
                    inventory.linux_hosts().collect::<Vec<_>>()
                );
                true
            }
            Err(e) => {
                tracing::error!("Error creating Ansible inventory: {:#}", e);
                false
            }
        }
    }

    /// Runs the Defender for Endpoint playbook against the Windows hosts in the inventory.
    ///
    /// Missing prerequisites and playbook failures are warnings, never errors.
    pub async fn run_defender_onboarding(&self) -> OnboardingOutcome {
        let Some(script_path) = &self.config.defender_onboarding_script else {
            return skipped(
                "'defender_onboarding_script' is not set in the range configuration".to_string(),
            );
        };

        let script_path = match self.range_dir.absolute(script_path) {
            Ok(path) => path,
            Err(e) => {
                return skipped(format!(
                    "could not resolve onboarding script {}: {e}",
                    script_path.display()
                ))
            }
        };

        if !script_path.exists() {
            return skipped(format!(
                "Defender onboarding script not found at {}",
                script_path.display()
            ));
        }

        if !self.runner.is_available(ANSIBLE_PLAYBOOK).await {
            return skipped(format!("{ANSIBLE_PLAYBOOK} is not available on PATH"));
        }

        let invocation = ansible::defender_onboarding_invocation(
            &self.range_dir,
            &script_path.to_string_lossy(),
        );

        tracing::info!("Running {}", invocation.command_line());

        match self.runner.run(&invocation).await {
            Ok(exit) if exit.success() => {
                tracing::info!("Microsoft Defender for Endpoint onboarding playbook completed.");
                OnboardingOutcome::Completed
            }
            Ok(exit) => {
                let reason = format!("Ansible playbook exited with {}", exit.describe());
                tracing::warn!("{reason}; Defender onboarding may be incomplete.");
                OnboardingOutcome::Failed(reason)
            }
            Err(e) => {
                let reason = format!("Ansible playbook could not be run: {e:#}");
                tracing::warn!("{reason}; Defender onboarding may be incomplete.");
                OnboardingOutcome::Failed(reason)
            }
        }
    }

    /// Fresh inventory followed by onboarding, for re-running onboarding without touching
    /// the infrastructure. Succeeds only when the playbook itself succeeds.
    pub async fn onboard(&self) -> bool {
        if !self.create_inventory().await {
            return false;
        }

        self.run_defender_onboarding().await == OnboardingOutcome::Completed
    }

    async fn run_terraform(&self, command: TerraformCommand) -> anyhow::Result<()> {
        let invocation = command.invocation(&self.range_dir);

        tracing::info!("Running {}", invocation.command_line());

        let exit = self.runner.run(&invocation).await?;
        if !exit.success() {
            anyhow::bail!("Terraform {} exited with {}", command, exit.describe());
        }

        Ok(())
    }

    async fn build_inventory(&self) -> anyhow::Result<AnsibleInventory> {
        let Some(admin_password) = self.config.admin_password() else {
            anyhow::bail!("admin_password not found in configuration");
        };

        let resource_group = &self.config.resource_group;
        let mut inventory = AnsibleInventory::new(&self.config.admin_username, admin_password);

        let vms = self.compute.list_virtual_machines(resource_group).await?;

        for vm in vms {
            tracing::info!("Processing VM: {}", vm.name);

            let public_ip = match self.resolve_public_ip(&vm).await {
                Ok(Some(public_ip)) => public_ip,
                Ok(None) => continue,
                Err(e) => {
                    tracing::warn!("Error processing VM {}: {:#}", vm.name, e);
                    continue;
                }
            };

            tracing::info!("Found IP {} for VM {}", public_ip, vm.name);

            match inventory.add_host(&vm.name, &public_ip) {
                Some(HostClass::Windows) => tracing::debug!("{} added as windows host", vm.name),
                Some(HostClass::Linux) => tracing::debug!("{} added as linux host", vm.name),
                None => tracing::debug!("{} matches no host group, ignoring", vm.name),
            }
        }

        inventory.write_to(&self.range_dir.inventory_path())?;

        Ok(inventory)
    }

    /// Follows VM -> primary NIC -> primary public IP. `Ok(None)` when a link in the chain
    /// doesn't exist, which is normal for VMs that aren't exposed.
    async fn resolve_public_ip(&self, vm: &VirtualMachine) -> anyhow::Result<Option<String>> {
        let resource_group = &self.config.resource_group;

        let Some(nic_reference) = vm.primary_network_interface() else {
            tracing::debug!("VM {} has no network interface", vm.name);
            return Ok(None);
        };

        let nic_name = resource_name_from_id(&nic_reference.id)?;
        let nic = self
            .network
            .get_network_interface(resource_group, nic_name)
            .await?;

        let Some(public_ip_reference) = nic.primary_public_ip() else {
            tracing::debug!("Network interface {} has no public IP", nic.name);
            return Ok(None);
        };

        let public_ip_name = resource_name_from_id(&public_ip_reference.id)?;
        let public_ip = self
            .network
            .get_public_ip_address(resource_group, public_ip_name)
            .await?;

        if public_ip.properties.ip_address.is_none() {
            tracing::debug!("Public IP {} has no address allocated", public_ip.name);
        }

        Ok(public_ip.properties.ip_address)
    }

    fn finish(&self, operation: Operation, success: bool) -> bool {
        if success {
            tracing::info!(%operation, "Operation succeeded");
        } else {
            tracing::error!(%operation, "Operation failed");
        }

        success
    }
}

fn skipped(reason: String) -> OnboardingOutcome {
    tracing::warn!("{reason}; skipping Defender onboarding.");
    OnboardingOutcome::Skipped(reason)
}
