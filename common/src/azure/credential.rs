use std::env;

use anyhow::Context;
use serde::Deserialize;
use tokio::process;

use crate::clap::{AzureConfig, CliSecret, PlainRedactor};
use crate::clients::handle_response_json;
use crate::Error;

/// Where ARM bearer tokens come from, checked in this order:
///
/// 1. `AZURE_ACCESS_TOKEN`, a token fetched out of band for the management audience
/// 2. A service principal when `AZURE_TENANT_ID`, `AZURE_CLIENT_ID` and `AZURE_CLIENT_SECRET`
///    are all present, which is how CI runs the tool
/// 3. The session of whoever ran `az login` on this machine
#[derive(Debug)]
pub enum AzureCredential {
    AccessToken(CliSecret<String, PlainRedactor>),
    ClientSecret {
        tenant_id: String,
        client_id: String,
        client_secret: CliSecret<String, PlainRedactor>,
    },
    AzureCli,
}

#[derive(Deserialize)]
struct OAuthTokenResponse {
    access_token: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AzureCliTokenResponse {
    access_token: String,
}

impl AzureCredential {
    pub fn from_env() -> Self {
        if let Ok(token) = env::var("AZURE_ACCESS_TOKEN") {
            tracing::debug!("Using access token from environment for Azure");
            return AzureCredential::AccessToken(CliSecret::new(token));
        }

        match (
            env::var("AZURE_TENANT_ID"),
            env::var("AZURE_CLIENT_ID"),
            env::var("AZURE_CLIENT_SECRET"),
        ) {
            (Ok(tenant_id), Ok(client_id), Ok(client_secret)) => {
                tracing::debug!("Using service principal {} for Azure", client_id);
                AzureCredential::ClientSecret {
                    tenant_id,
                    client_id,
                    client_secret: CliSecret::new(client_secret),
                }
            }
            _ => {
                tracing::debug!("No service principal in environment, using Azure CLI session");
                AzureCredential::AzureCli
            }
        }
    }

    /// A bearer token for the management endpoint in `azure_config`.
    pub async fn access_token(
        &self,
        http: &reqwest::Client,
        azure_config: &AzureConfig,
    ) -> anyhow::Result<String> {
        match self {
            AzureCredential::AccessToken(token) => Ok(token.as_str().to_string()),
            AzureCredential::ClientSecret {
                tenant_id,
                client_id,
                client_secret,
            } => {
                let scope = azure_config.management_scope();
                let params = [
                    ("grant_type", "client_credentials"),
                    ("client_id", client_id.as_str()),
                    ("client_secret", client_secret.as_str()),
                    ("scope", scope.as_str()),
                ];

                let response = http
                    .post(azure_config.token_url(tenant_id))
                    .form(&params)
                    .send()
                    .await
                    .context("acquiring Azure token for service principal")?;

                let token = handle_response_json::<OAuthTokenResponse>(response)
                    .await
                    .with_context(|| {
                        format!("acquiring Azure token for service principal {client_id}")
                    })?;

                Ok(token.access_token)
            }
            AzureCredential::AzureCli => azure_cli_token(azure_config)
                .await
                .context("acquiring Azure token via az CLI"),
        }
    }
}

async fn azure_cli_token(azure_config: &AzureConfig) -> anyhow::Result<String> {
    let output = process::Command::new("az")
        .arg("account")
        .arg("get-access-token")
        .arg("--resource")
        .arg(azure_config.management_resource())
        .arg("--output")
        .arg("json")
        .output()
        .await
        .context("running `az`, is the Azure CLI installed?")?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        return Err(Error::AzureCli(output.status.code().unwrap_or(-1), stderr).into());
    }

    let token = serde_json::from_slice::<AzureCliTokenResponse>(&output.stdout)?;
    Ok(token.access_token)
}
