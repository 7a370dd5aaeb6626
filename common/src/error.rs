use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("API error {0}: {1}")]
    Api(reqwest::StatusCode, String),
    #[error("Azure CLI exited with status {0}: {1}")]
    AzureCli(i32, String),
    #[error("Resource id '{0}' has no name segment")]
    InvalidResourceId(String),
}
