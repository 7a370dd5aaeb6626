use strum::Display;

use crate::{range_dir::TERRAFORM_DIR, subprocess::Invocation, RangeDir};

pub const TERRAFORM: &str = crate::external_dependencies::TERRAFORM.binary;

#[derive(Clone, Copy, Debug, Display, PartialEq, Eq)]
#[strum(serialize_all = "lowercase")]
pub enum TerraformCommand {
    Init,
    Apply,
    Destroy,
}

impl TerraformCommand {
    fn args(&self) -> &'static [&'static str] {
        match self {
            TerraformCommand::Init => &["init"],
            TerraformCommand::Apply => &["apply", "-auto-approve"],
            TerraformCommand::Destroy => &["destroy", "-auto-approve"],
        }
    }

    /// `terraform -chdir=terraform <command>` started from the range root.
    pub fn invocation(&self, range_dir: &RangeDir) -> Invocation {
        Invocation::new(TERRAFORM, range_dir.root())
            .arg(format!("-chdir={TERRAFORM_DIR}"))
            .args(self.args().iter().copied())
    }
}
