use std::sync::Arc;

use serde::de::DeserializeOwned;
use tokio::sync::OnceCell;

use super::{models::Page, AzureCredential};
use crate::{clap::AzureConfig, clients::handle_response_json};

/// An authenticated handle on Azure Resource Manager scoped to a single subscription.
///
/// Building a client does no I/O. The bearer token is acquired on the first request and
/// shared by every clone, so commands that never talk to ARM never need to log in.
#[derive(Clone)]
pub struct ArmClient {
    http: reqwest::Client,
    azure_config: AzureConfig,
    subscription_id: String,
    credential: Arc<AzureCredential>,
    token: Arc<OnceCell<String>>,
}

impl ArmClient {
    pub fn new(
        azure_config: &AzureConfig,
        subscription_id: impl Into<String>,
        credential: AzureCredential,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            azure_config: azure_config.clone(),
            subscription_id: subscription_id.into(),
            credential: Arc::new(credential),
            token: Arc::new(OnceCell::new()),
        }
    }

    pub fn subscription_id(&self) -> &str {
        &self.subscription_id
    }

    /// URL for a resource (or collection) within a resource group, e.g.
    /// `resource_group_url("rg", "Microsoft.Compute/virtualMachines")`
    pub fn resource_group_url(&self, resource_group: &str, resource_path: &str) -> String {
        format!(
            "{}/subscriptions/{}/resourceGroups/{}/providers/{}",
            self.azure_config.management_url(),
            self.subscription_id,
            resource_group,
            resource_path
        )
    }

    async fn token(&self) -> anyhow::Result<&str> {
        let token = self
            .token
            .get_or_try_init(|| self.credential.access_token(&self.http, &self.azure_config))
            .await?;

        Ok(token.as_str())
    }

    pub async fn get<T>(&self, url: &str, api_version: &str) -> anyhow::Result<T>
    where
        T: DeserializeOwned,
    {
        let response = self
            .http
            .get(url)
            .query(&[("api-version", api_version)])
            .bearer_auth(self.token().await?)
            .send()
            .await?;

        handle_response_json(response).await
    }

    /// Follows `nextLink` until ARM stops returning one. The links already carry the
    /// `api-version` query parameter so we don't add it again.
    pub async fn list<T>(&self, url: &str, api_version: &str) -> anyhow::Result<Vec<T>>
    where
        T: DeserializeOwned,
    {
        let mut page: Page<T> = self.get(url, api_version).await?;
        let mut items = std::mem::take(&mut page.value);

        while let Some(next_link) = page.next_link.take() {
            tracing::debug!("Fetching next page {}", next_link);

            let response = self
                .http
                .get(&next_link)
                .bearer_auth(self.token().await?)
                .send()
                .await?;

            page = handle_response_json(response).await?;
            items.append(&mut page.value);
        }

        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use std::{
        collections::HashMap,
        net::Ipv4Addr,
        sync::{
            atomic::{AtomicUsize, Ordering},
            Arc,
        },
    };

    use axum::{
        extract::{Query, State},
        http::{HeaderMap, StatusCode},
        routing::{get, post},
        Form, Json, Router,
    };
    use serde_json::{json, Value};
    use tokio::net::TcpListener;

    use super::ArmClient;
    use crate::{
        azure::{models::VirtualMachine, AzureCredential, ComputeApi, ComputeClient},
        clap::{AzureConfig, CliSecret},
        Error,
    };

    const VM_PATH: &str =
        "/subscriptions/sub/resourceGroups/rg/providers/Microsoft.Compute/virtualMachines";

    #[derive(Clone)]
    struct FakeArm {
        base_url: String,
        token_requests: Arc<AtomicUsize>,
    }

    fn authorized(headers: &HeaderMap, token: &str) -> bool {
        headers
            .get("authorization")
            .and_then(|value| value.to_str().ok())
            == Some(format!("Bearer {token}").as_str())
    }

    async fn first_page(
        State(arm): State<FakeArm>,
        headers: HeaderMap,
        Query(query): Query<HashMap<String, String>>,
    ) -> (StatusCode, Json<Value>) {
        if !authorized(&headers, "test-token") || !query.contains_key("api-version") {
            return (StatusCode::UNAUTHORIZED, Json(json!({})));
        }

        (
            StatusCode::OK,
            Json(json!({
                "value": [ { "name": "DC01", "properties": {} } ],
                "nextLink": format!("{}/page-2?api-version=2024-07-01&$skiptoken=abc", arm.base_url)
            })),
        )
    }

    async fn second_page(headers: HeaderMap) -> (StatusCode, Json<Value>) {
        if !authorized(&headers, "test-token") {
            return (StatusCode::UNAUTHORIZED, Json(json!({})));
        }

        (
            StatusCode::OK,
            Json(json!({ "value": [ { "name": "kali-attacker", "properties": {} } ] })),
        )
    }

    async fn forbidden() -> (StatusCode, &'static str) {
        (StatusCode::FORBIDDEN, "AuthorizationFailed")
    }

    async fn issue_token(
        State(arm): State<FakeArm>,
        Form(form): Form<HashMap<String, String>>,
    ) -> (StatusCode, Json<Value>) {
        arm.token_requests.fetch_add(1, Ordering::SeqCst);

        let expected_scope = format!("{}/.default", arm.base_url);
        if form.get("scope") != Some(&expected_scope)
            || form.get("grant_type").map(String::as_str) != Some("client_credentials")
        {
            return (StatusCode::BAD_REQUEST, Json(json!({})));
        }

        (
            StatusCode::OK,
            Json(json!({ "token_type": "Bearer", "expires_in": 3599, "access_token": "test-token" })),
        )
    }

    async fn serve_fake_arm() -> FakeArm {
        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
        let arm = FakeArm {
            base_url: format!("http://{}", listener.local_addr().unwrap()),
            token_requests: Arc::new(AtomicUsize::new(0)),
        };

        let app = Router::new()
            .route(VM_PATH, get(first_page))
            .route("/page-2", get(second_page))
            .route(
                "/subscriptions/sub/resourceGroups/locked/providers/Microsoft.Compute/virtualMachines",
                get(forbidden),
            )
            .route("/tenant/oauth2/v2.0/token", post(issue_token))
            .with_state(arm.clone());

        tokio::spawn(async move { axum::serve(listener, app).await });

        arm
    }

    fn azure_config(arm: &FakeArm) -> AzureConfig {
        AzureConfig {
            subscription_id: None,
            management_endpoint: arm.base_url.clone(),
            login_endpoint: arm.base_url.clone(),
        }
    }

    fn static_token() -> AzureCredential {
        AzureCredential::AccessToken(CliSecret::new("test-token".to_string()))
    }

    fn service_principal() -> AzureCredential {
        AzureCredential::ClientSecret {
            tenant_id: "tenant".to_string(),
            client_id: "client".to_string(),
            client_secret: CliSecret::new("secret".to_string()),
        }
    }

    #[tokio::test]
    async fn list_follows_next_link() {
        let arm = serve_fake_arm().await;
        let client = ArmClient::new(&azure_config(&arm), "sub", static_token());

        let url = client.resource_group_url("rg", "Microsoft.Compute/virtualMachines");
        let vms: Vec<VirtualMachine> = client.list(&url, "2024-07-01").await.unwrap();

        let names: Vec<&str> = vms.iter().map(|vm| vm.name.as_str()).collect();
        assert_eq!(names, vec!["DC01", "kali-attacker"]);
    }

    #[tokio::test]
    async fn non_success_status_is_an_api_error() {
        let arm = serve_fake_arm().await;
        let client = ArmClient::new(&azure_config(&arm), "sub", static_token());

        let error = ComputeClient::new(client)
            .list_virtual_machines("locked")
            .await
            .unwrap_err();

        match error.downcast_ref::<Error>() {
            Some(Error::Api(status, body)) => {
                assert_eq!(*status, StatusCode::FORBIDDEN);
                assert_eq!(body, "AuthorizationFailed");
            }
            other => panic!("Expected API error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn token_is_acquired_once_on_first_request() {
        let arm = serve_fake_arm().await;
        let client = ArmClient::new(&azure_config(&arm), "sub", service_principal());

        // Building clients must not log in
        let compute = ComputeClient::new(client.clone());
        assert_eq!(arm.token_requests.load(Ordering::SeqCst), 0);

        assert_eq!(compute.list_virtual_machines("rg").await.unwrap().len(), 2);
        assert_eq!(
            ComputeClient::new(client)
                .list_virtual_machines("rg")
                .await
                .unwrap()
                .len(),
            2
        );
        assert_eq!(arm.token_requests.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn login_failure_surfaces_on_first_request() {
        let arm = serve_fake_arm().await;
        let config = AzureConfig {
            // Tokens for the wrong audience are refused by the fake authority
            management_endpoint: format!("{}/elsewhere", arm.base_url),
            ..azure_config(&arm)
        };
        let client = ArmClient::new(&config, "sub", service_principal());

        let error = ComputeClient::new(client)
            .list_virtual_machines("rg")
            .await
            .unwrap_err();

        assert!(format!("{error:#}").contains("acquiring Azure token for service principal"));
        assert!(matches!(
            error.downcast_ref::<Error>(),
            Some(Error::Api(status, _)) if *status == StatusCode::BAD_REQUEST
        ));
    }
}
