use crate::subprocess::ProcessRunner;

#[derive(Debug, PartialEq, Eq)]
pub struct ExternalDependency {
    pub binary: &'static str,
    pub install_advice: &'static str,
}

impl ExternalDependency {
    pub const fn new(binary: &'static str, install_advice: &'static str) -> Self {
        Self {
            binary,
            install_advice,
        }
    }
}

pub const TERRAFORM: ExternalDependency = ExternalDependency::new(
    "terraform",
    "Follow instructions on: https://developer.hashicorp.com/terraform/install",
);

pub const ANSIBLE_PLAYBOOK: ExternalDependency = ExternalDependency::new(
    "ansible-playbook",
    "Follow instructions on: https://docs.ansible.com/ansible/latest/installation_guide/",
);

// Ansible is optional, onboarding is skipped with a warning when it's missing
pub const REQUIRED_DEPENDENCIES: [ExternalDependency; 1] = [TERRAFORM];

pub async fn external_dependency_preflight_check(
    runner: &dyn ProcessRunner,
    dependencies: &[ExternalDependency],
) -> anyhow::Result<()> {
    let mut missing_dependency = false;
    for dep in dependencies {
        if !runner.is_available(dep.binary).await {
            eprintln!(
                "Binary '{}' not found or not executable. {}",
                dep.binary, dep.install_advice
            );
            missing_dependency = true;
        }
    }

    if missing_dependency {
        anyhow::bail!("One or more missing dependencies found.")
    }

    Ok(())
}
