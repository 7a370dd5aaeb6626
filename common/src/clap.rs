use std::{
    fmt::{self, Display},
    marker::PhantomData,
    ops::Deref,
    str::FromStr,
};

use clap::Args;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub const AZURE_MANAGEMENT_ENDPOINT: &str = "https://management.azure.com";
pub const AZURE_LOGIN_ENDPOINT: &str = "https://login.microsoftonline.com";

/// Common Azure configuration parameters such as the subscription.
#[derive(Args, Clone, Debug)]
pub struct AzureConfig {
    /// Azure subscription id, overrides the one in the range configuration file
    #[clap(
        name = "azure-subscription-id",
        long,
        env = "AZURE_SUBSCRIPTION_ID",
        global = true
    )]
    pub subscription_id: Option<String>,
    /// Azure Resource Manager endpoint. Tokens are requested for this audience, so for
    /// sovereign clouds change it together with `--azure-login-endpoint`
    #[clap(
        name = "azure-management-endpoint",
        long,
        env = "AZURE_MANAGEMENT_ENDPOINT",
        global = true,
        default_value = AZURE_MANAGEMENT_ENDPOINT
    )]
    pub management_endpoint: String,
    /// Microsoft Entra ID authority that issues tokens for service principals
    #[clap(
        name = "azure-login-endpoint",
        long,
        env = "AZURE_AUTHORITY_HOST",
        global = true,
        default_value = AZURE_LOGIN_ENDPOINT
    )]
    pub login_endpoint: String,
}

impl AzureConfig {
    /// Base URL for ARM requests, without a trailing slash.
    pub fn management_url(&self) -> &str {
        self.management_endpoint.trim_end_matches('/')
    }

    /// Token audience in the `--resource` form the Azure CLI expects, e.g.
    /// `https://management.azure.com/`
    pub fn management_resource(&self) -> String {
        format!("{}/", self.management_url())
    }

    /// Token audience in the OAuth 2.0 v2 scope form, e.g. `https://management.azure.com/.default`
    pub fn management_scope(&self) -> String {
        format!("{}.default", self.management_resource())
    }

    pub fn token_url(&self, tenant_id: &str) -> String {
        format!(
            "{}/{}/oauth2/v2.0/token",
            self.login_endpoint.trim_end_matches('/'),
            tenant_id
        )
    }
}

//
// Secrets redaction
// It is nice to be able to debug print our configuration on startup as this can save a lot of
// time when investigating an issue. Some of the values are secrets though, so we want a way
// of hiding those values from `Debug` calls without introducing overheads in the developer experience.
//
// For this we have `CliSecret` and `RedactionFunction` which you can wrap around values which will modify
// debug print output.
//

pub trait RedactionFunction<T> {
    fn redact(s: &T) -> String;
}

const REDACTED_VALUE: &str = "<REDACTED>";

#[derive(Clone)]
pub struct PlainRedactor {}

impl<T> RedactionFunction<T> for PlainRedactor {
    fn redact(_: &T) -> String {
        REDACTED_VALUE.to_string()
    }
}

#[derive(Clone)]
pub struct CliSecret<T, R>
where
    R: RedactionFunction<T>,
{
    value: T,
    redaction_function: PhantomData<R>,
}

impl<T, R> CliSecret<T, R>
where
    R: RedactionFunction<T>,
{
    pub fn new(value: T) -> Self {
        Self {
            value,
            redaction_function: PhantomData,
        }
    }
}

impl<T, R> Deref for CliSecret<T, R>
where
    R: RedactionFunction<T>,
{
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.value
    }
}

impl<T, R> fmt::Debug for CliSecret<T, R>
where
    T: Display,
    R: RedactionFunction<T>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = R::redact(&self.value);
        f.write_str(&text)
    }
}

impl<T, R> FromStr for CliSecret<T, R>
where
    T: FromStr,
    R: RedactionFunction<T>,
{
    type Err = T::Err;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let t = T::from_str(s)?;
        Ok(CliSecret::new(t))
    }
}

// Secrets are also read from configuration files, not just the command line
impl<'de, T, R> Deserialize<'de> for CliSecret<T, R>
where
    T: Deserialize<'de>,
    R: RedactionFunction<T>,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        T::deserialize(deserializer).map(CliSecret::new)
    }
}

// ...and written back out to files consumed by other tools, such as ansible inventories
impl<T, R> Serialize for CliSecret<T, R>
where
    T: Serialize,
    R: RedactionFunction<T>,
{
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.value.serialize(serializer)
    }
}
