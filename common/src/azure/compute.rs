use async_trait::async_trait;

use super::{models::VirtualMachine, ArmClient};

const COMPUTE_API_VERSION: &str = "2024-07-01";

#[async_trait]
pub trait ComputeApi: Send + Sync {
    async fn list_virtual_machines(
        &self,
        resource_group: &str,
    ) -> anyhow::Result<Vec<VirtualMachine>>;
}

#[derive(Clone)]
pub struct ComputeClient {
    inner: ArmClient,
}

impl ComputeClient {
    pub fn new(inner: ArmClient) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl ComputeApi for ComputeClient {
    async fn list_virtual_machines(
        &self,
        resource_group: &str,
    ) -> anyhow::Result<Vec<VirtualMachine>> {
        let url = self
            .inner
            .resource_group_url(resource_group, "Microsoft.Compute/virtualMachines");

        tracing::debug!(
            "Listing virtual machines in {} (subscription {})",
            resource_group,
            self.inner.subscription_id()
        );

        self.inner.list(&url, COMPUTE_API_VERSION).await
    }
}
