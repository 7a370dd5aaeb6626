use std::path::{Path, PathBuf};

pub const TERRAFORM_DIR: &str = "terraform";
pub const PLAYBOOKS_DIR: &str = "playbooks";

const TFVARS_FILE: &str = "terraform.tfvars";
const VARIABLES_FILE: &str = "variables.tf";
const INVENTORY_FILE: &str = "inventory.yml";
const DEFENDER_PLAYBOOK_FILE: &str = "windows_defender_endpoint.yml";

/// The checkout of the range, laid out as
///
/// ```text
/// <root>/terraform/terraform.tfvars
/// <root>/terraform/variables.tf
/// <root>/playbooks/inventory.yml
/// <root>/playbooks/windows_defender_endpoint.yml
/// ```
///
/// Every external tool is started from `root` and given paths relative to it.
#[derive(Clone, Debug)]
pub struct RangeDir {
    root: PathBuf,
}

impl RangeDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn tfvars_path(&self) -> PathBuf {
        self.root.join(TERRAFORM_DIR).join(TFVARS_FILE)
    }

    pub fn variables_path(&self) -> PathBuf {
        self.root.join(TERRAFORM_DIR).join(VARIABLES_FILE)
    }

    pub fn playbooks_dir(&self) -> PathBuf {
        self.root.join(PLAYBOOKS_DIR)
    }

    pub fn inventory_path(&self) -> PathBuf {
        self.playbooks_dir().join(INVENTORY_FILE)
    }

    /// Inventory path as handed to `ansible-playbook`, relative to `root`.
    pub fn relative_inventory_path() -> String {
        format!("{PLAYBOOKS_DIR}/{INVENTORY_FILE}")
    }

    /// Defender onboarding playbook as handed to `ansible-playbook`, relative to `root`.
    pub fn relative_defender_playbook_path() -> String {
        format!("{PLAYBOOKS_DIR}/{DEFENDER_PLAYBOOK_FILE}")
    }

    /// Resolves a user supplied path against the range root and makes it absolute.
    pub fn absolute(&self, path: &Path) -> std::io::Result<PathBuf> {
        std::path::absolute(self.root.join(path))
    }
}
