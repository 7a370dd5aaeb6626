use async_trait::async_trait;

use super::{
    models::{NetworkInterface, PublicIpAddress},
    ArmClient,
};

const NETWORK_API_VERSION: &str = "2024-05-01";

#[async_trait]
pub trait NetworkApi: Send + Sync {
    async fn get_network_interface(
        &self,
        resource_group: &str,
        name: &str,
    ) -> anyhow::Result<NetworkInterface>;

    async fn get_public_ip_address(
        &self,
        resource_group: &str,
        name: &str,
    ) -> anyhow::Result<PublicIpAddress>;
}

#[derive(Clone)]
pub struct NetworkClient {
    inner: ArmClient,
}

impl NetworkClient {
    pub fn new(inner: ArmClient) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl NetworkApi for NetworkClient {
    async fn get_network_interface(
        &self,
        resource_group: &str,
        name: &str,
    ) -> anyhow::Result<NetworkInterface> {
        let url = self.inner.resource_group_url(
            resource_group,
            &format!("Microsoft.Network/networkInterfaces/{name}"),
        );

        self.inner.get(&url, NETWORK_API_VERSION).await
    }

    async fn get_public_ip_address(
        &self,
        resource_group: &str,
        name: &str,
    ) -> anyhow::Result<PublicIpAddress> {
        let url = self.inner.resource_group_url(
            resource_group,
            &format!("Microsoft.Network/publicIPAddresses/{name}"),
        );

        self.inner.get(&url, NETWORK_API_VERSION).await
    }
}
