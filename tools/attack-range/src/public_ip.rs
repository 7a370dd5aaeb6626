use std::net::IpAddr;

use async_trait::async_trait;
use serde::Deserialize;

const IPIFY_URL: &str = "https://api.ipify.org?format=json";

/// Finds the address the operator's traffic appears to come from.
#[async_trait]
pub trait PublicIpLookup: Send + Sync {
    async fn current_ip(&self) -> anyhow::Result<IpAddr>;
}

#[derive(Debug, Deserialize)]
struct IpifyResponse {
    ip: IpAddr,
}

/// Asks https://www.ipify.org which is free and doesn't need an API key.
pub struct IpifyLookup {
    http: reqwest::Client,
    url: String,
}

impl IpifyLookup {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
            url: IPIFY_URL.to_string(),
        }
    }
}

impl Default for IpifyLookup {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PublicIpLookup for IpifyLookup {
    async fn current_ip(&self) -> anyhow::Result<IpAddr> {
        let response = self
            .http
            .get(&self.url)
            .send()
            .await?
            .error_for_status()?
            .json::<IpifyResponse>()
            .await?;

        Ok(response.ip)
    }
}
