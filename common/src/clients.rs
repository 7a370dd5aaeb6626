//! Helpers for turning `reqwest` responses from Azure into values or [`Error::Api`]

use reqwest::Response;
use serde::de::DeserializeOwned;

use crate::Error;

async fn handle_error<T>(resp: Response) -> anyhow::Result<T> {
    let status = resp.status();
    let error_text = resp.text().await?;
    tracing::debug!("Error {}: {}", status, error_text);
    Err(Error::Api(status, error_text))?
}

/// Turns the response to Json and captures errors
pub async fn handle_response_json<T>(resp: Response) -> anyhow::Result<T>
where
    T: DeserializeOwned,
{
    if resp.status().is_success() {
        let json = resp.json().await?;
        Ok(json)
    } else {
        handle_error(resp).await
    }
}
