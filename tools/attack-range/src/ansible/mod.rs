mod inventory;

pub use inventory::{
    classify, AnsibleInventory, HostClass, InventoryAll, InventoryChildren, InventoryGroup,
    LinuxGroupVars, LinuxHostVars, WindowsGroupVars, WindowsHostVars, LINUX_NAME_MARKERS,
    WINDOWS_NAME_MARKERS,
};

use crate::{subprocess::Invocation, RangeDir};

pub const ANSIBLE_PLAYBOOK: &str = crate::external_dependencies::ANSIBLE_PLAYBOOK.binary;
pub const DEFENDER_SCRIPT_ENV: &str = "DEFENDER_ONBOARDING_SCRIPT";

/// `ansible-playbook -i playbooks/inventory.yml playbooks/windows_defender_endpoint.yml` with
/// the onboarding script handed over through the environment.
pub fn defender_onboarding_invocation(range_dir: &RangeDir, script_path: &str) -> Invocation {
    Invocation::new(ANSIBLE_PLAYBOOK, range_dir.root())
        .arg("-i")
        .arg(RangeDir::relative_inventory_path())
        .arg(RangeDir::relative_defender_playbook_path())
        .env(DEFENDER_SCRIPT_ENV, script_path)
}
