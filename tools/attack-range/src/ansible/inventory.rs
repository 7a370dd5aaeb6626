// all:
//     children:
//         windows:
//             hosts:
//                 DC01:
//                     ansible_host: 20.1.2.3
//                     ansible_winrm_operation_timeout_sec: 60
//                     ansible_winrm_read_timeout_sec: 70
//                     roles: [defender_for_endpoint]
//             vars:
//                 ansible_user: azureuser
//                 ansible_password: ...
//                 ansible_connection: winrm
//                 ...
//         linux:
//             hosts:
//                 kali-attacker:
//                     ansible_host: 20.1.2.4
//             vars:
//                 ansible_user: kali
//                 ansible_ssh_private_key_file: ~/.ssh/id_rsa
//                 ansible_connection: ssh

use std::{collections::BTreeMap, fs, path::Path};

use common::clap::{CliSecret, PlainRedactor};
use serde::Serialize;

/// Name fragments that mark a VM as a Windows host: domain controllers, workstations and
/// the Windows versions the range deploys.
pub const WINDOWS_NAME_MARKERS: [&str; 4] = ["dc", "workstation", "win11", "server2025"];

/// Name fragments that mark a VM as a Linux attacker box.
pub const LINUX_NAME_MARKERS: [&str; 1] = ["kali"];

pub const DEFENDER_ROLE: &str = "defender_for_endpoint";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HostClass {
    Windows,
    Linux,
}

/// Case-insensitive substring match on the VM name. Windows markers win when a name
/// matches both groups. `None` means the VM isn't managed by ansible.
pub fn classify(vm_name: &str) -> Option<HostClass> {
    let vm_name = vm_name.to_lowercase();

    if WINDOWS_NAME_MARKERS
        .iter()
        .any(|marker| vm_name.contains(marker))
    {
        Some(HostClass::Windows)
    } else if LINUX_NAME_MARKERS
        .iter()
        .any(|marker| vm_name.contains(marker))
    {
        Some(HostClass::Linux)
    } else {
        None
    }
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct WindowsHostVars {
    pub ansible_host: String,
    pub ansible_winrm_operation_timeout_sec: u32,
    pub ansible_winrm_read_timeout_sec: u32,
    pub roles: Vec<String>,
}

impl WindowsHostVars {
    fn new(ansible_host: String) -> Self {
        Self {
            ansible_host,
            ansible_winrm_operation_timeout_sec: 60,
            ansible_winrm_read_timeout_sec: 70,
            roles: vec![DEFENDER_ROLE.to_string()],
        }
    }
}

#[derive(Debug, Serialize)]
pub struct WindowsGroupVars {
    pub ansible_user: String,
    pub ansible_password: CliSecret<String, PlainRedactor>,
    pub ansible_connection: &'static str,
    pub ansible_winrm_server_cert_validation: &'static str,
    // Quoted in the inventory, ansible doesn't care either way
    pub ansible_port: &'static str,
    pub ansible_winrm_scheme: &'static str,
    pub ansible_winrm_transport: &'static str,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct LinuxHostVars {
    pub ansible_host: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct LinuxGroupVars {
    pub ansible_user: &'static str,
    pub ansible_ssh_private_key_file: &'static str,
    pub ansible_connection: &'static str,
}

#[derive(Debug, Serialize)]
pub struct InventoryGroup<H, V> {
    // Sorted so that regenerating the inventory for an unchanged range gives an identical file
    pub hosts: BTreeMap<String, H>,
    pub vars: V,
}

#[derive(Debug, Serialize)]
pub struct InventoryChildren {
    pub windows: InventoryGroup<WindowsHostVars, WindowsGroupVars>,
    pub linux: InventoryGroup<LinuxHostVars, LinuxGroupVars>,
}

#[derive(Debug, Serialize)]
pub struct InventoryAll {
    pub children: InventoryChildren,
}

#[derive(Debug, Serialize)]
pub struct AnsibleInventory {
    pub all: InventoryAll,
}

impl AnsibleInventory {
    /// An inventory with no hosts, just the group wide connection settings.
    pub fn new(admin_username: &str, admin_password: &str) -> Self {
        Self {
            all: InventoryAll {
                children: InventoryChildren {
                    windows: InventoryGroup {
                        hosts: BTreeMap::new(),
                        vars: WindowsGroupVars {
                            ansible_user: admin_username.to_string(),
                            ansible_password: CliSecret::new(admin_password.to_string()),
                            ansible_connection: "winrm",
                            ansible_winrm_server_cert_validation: "ignore",
                            ansible_port: "5985",
                            ansible_winrm_scheme: "http",
                            ansible_winrm_transport: "ntlm",
                        },
                    },
                    linux: InventoryGroup {
                        hosts: BTreeMap::new(),
                        vars: LinuxGroupVars {
                            ansible_user: "kali",
                            ansible_ssh_private_key_file: "~/.ssh/id_rsa",
                            ansible_connection: "ssh",
                        },
                    },
                },
            },
        }
    }

    /// Classifies the VM by name and files it under the matching group.
    ///
    /// Returns the group it went into, or `None` if the VM was ignored.
    pub fn add_host(&mut self, vm_name: &str, public_ip: &str) -> Option<HostClass> {
        let class = classify(vm_name)?;
        let children = &mut self.all.children;

        match class {
            HostClass::Windows => {
                children.windows.hosts.insert(
                    vm_name.to_string(),
                    WindowsHostVars::new(public_ip.to_string()),
                );
            }
            HostClass::Linux => {
                children.linux.hosts.insert(
                    vm_name.to_string(),
                    LinuxHostVars {
                        ansible_host: public_ip.to_string(),
                    },
                );
            }
        }

        Some(class)
    }

    pub fn windows_hosts(&self) -> impl Iterator<Item = &str> {
        self.all.children.windows.hosts.keys().map(String::as_str)
    }

    pub fn linux_hosts(&self) -> impl Iterator<Item = &str> {
        self.all.children.linux.hosts.keys().map(String::as_str)
    }

    pub fn to_yaml(&self) -> anyhow::Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Overwrites the inventory at `path`, creating its directory if needed.
    pub fn write_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(path, self.to_yaml()?)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_yaml::Value;

    use super::{classify, AnsibleInventory, HostClass};

    #[test]
    fn classification_by_name() {
        assert_eq!(classify("DC01"), Some(HostClass::Windows));
        assert_eq!(classify("workstation-1"), Some(HostClass::Windows));
        assert_eq!(classify("ar-WIN11-02"), Some(HostClass::Windows));
        assert_eq!(classify("Server2025-fs"), Some(HostClass::Windows));
        assert_eq!(classify("kali-attacker"), Some(HostClass::Linux));
        assert_eq!(classify("KALI"), Some(HostClass::Linux));
        assert_eq!(classify("random-box"), None);
    }

    #[test]
    fn windows_markers_take_precedence() {
        assert_eq!(classify("kali-dc"), Some(HostClass::Windows));
    }

    #[test]
    fn hosts_land_in_their_groups() {
        let mut inventory = AnsibleInventory::new("azureuser", "P@ssw0rd!");

        assert_eq!(
            inventory.add_host("DC01", "20.0.0.1"),
            Some(HostClass::Windows)
        );
        assert_eq!(
            inventory.add_host("workstation-1", "20.0.0.2"),
            Some(HostClass::Windows)
        );
        assert_eq!(
            inventory.add_host("kali-attacker", "20.0.0.3"),
            Some(HostClass::Linux)
        );
        assert_eq!(inventory.add_host("random-box", "20.0.0.4"), None);

        assert_eq!(
            inventory.windows_hosts().collect::<Vec<_>>(),
            vec!["DC01", "workstation-1"]
        );
        assert_eq!(
            inventory.linux_hosts().collect::<Vec<_>>(),
            vec!["kali-attacker"]
        );
    }

    #[test]
    fn yaml_layout_matches_what_ansible_expects() {
        let mut inventory = AnsibleInventory::new("azureuser", "P@ssw0rd!");
        inventory.add_host("DC01", "20.0.0.1");
        inventory.add_host("kali-attacker", "20.0.0.3");

        let yaml: Value = serde_yaml::from_str(&inventory.to_yaml().unwrap()).unwrap();
        let children = &yaml["all"]["children"];

        let dc = &children["windows"]["hosts"]["DC01"];
        assert_eq!(dc["ansible_host"], Value::from("20.0.0.1"));
        assert_eq!(dc["ansible_winrm_operation_timeout_sec"], Value::from(60));
        assert_eq!(dc["ansible_winrm_read_timeout_sec"], Value::from(70));
        assert_eq!(
            dc["roles"],
            Value::Sequence(vec![Value::from("defender_for_endpoint")])
        );

        let windows_vars = &children["windows"]["vars"];
        assert_eq!(windows_vars["ansible_user"], Value::from("azureuser"));
        assert_eq!(windows_vars["ansible_password"], Value::from("P@ssw0rd!"));
        assert_eq!(windows_vars["ansible_connection"], Value::from("winrm"));
        assert_eq!(windows_vars["ansible_port"], Value::from("5985"));
        assert_eq!(windows_vars["ansible_winrm_transport"], Value::from("ntlm"));

        assert_eq!(
            children["linux"]["hosts"]["kali-attacker"]["ansible_host"],
            Value::from("20.0.0.3")
        );
        assert_eq!(children["linux"]["vars"]["ansible_user"], Value::from("kali"));
        assert_eq!(
            children["linux"]["vars"]["ansible_connection"],
            Value::from("ssh")
        );
    }

    #[test]
    fn debug_output_hides_password() {
        let inventory = AnsibleInventory::new("azureuser", "P@ssw0rd!");

        assert!(!format!("{inventory:?}").contains("P@ssw0rd!"));
    }

    #[test]
    fn write_creates_playbooks_directory() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("playbooks").join("inventory.yml");

        let mut inventory = AnsibleInventory::new("azureuser", "P@ssw0rd!");
        inventory.add_host("DC01", "20.0.0.1");
        inventory.write_to(&path).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("DC01"));
    }
}
