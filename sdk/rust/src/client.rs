use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;

const API_KEY_HEADER: &str = "X-API-Key";

#[derive(Debug)]
pub enum ClientError {
    Http(reqwest::Error),
    /// The service answered with a non-success status and a `detail` message.
    Api { status: StatusCode, detail: String },
    MissingApiKey,
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientError::Http(e) => write!(f, "HTTP error: {}", e),
            ClientError::Api { status, detail } => write!(f, "API error {}: {}", status, detail),
            ClientError::MissingApiKey => write!(f, "No API key set; register or call with_api_key first"),
        }
    }
}

impl std::error::Error for ClientError {}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        ClientError::Http(e)
    }
}

impl ClientError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: u64,
    pub username: String,
    pub email: String,
    pub api_key: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credential {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocatedProxy {
    pub pool_entry_id: u64,
    pub gateway_address: String,
    pub gateway_virtual_port: u16,
    pub gateway_listen_port: u16,
    pub credential: Credential,
    pub allocated_at: String,
    pub original_proxy_type: String,
    pub original_proxy_country: Option<String>,
    pub connection_string: String,
}

#[derive(Deserialize)]
struct ErrorBody {
    detail: String,
}

pub struct ProxyFlowClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl ProxyFlowClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: None,
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }

    /// Register a new user and keep its API key for later calls.
    pub async fn register(&mut self, username: &str, email: &str) -> Result<UserProfile, ClientError> {
        let req = self
            .client
            .post(format!("{}/auth/register", self.base_url))
            .json(&serde_json::json!({ "username": username, "email": email }));
        let profile: UserProfile = send(req).await?;
        self.api_key = Some(profile.api_key.clone());
        Ok(profile)
    }

    pub async fn me(&self) -> Result<UserProfile, ClientError> {
        send(self.authed(self.client.get(format!("{}/user/me", self.base_url)))?).await
    }

    pub async fn subscription(&self) -> Result<serde_json::Value, ClientError> {
        send(self.authed(self.client.get(format!("{}/user/subscription", self.base_url)))?).await
    }

    pub async fn change_plan(&self, plan: &str) -> Result<serde_json::Value, ClientError> {
        let req = self
            .client
            .put(format!("{}/user/subscription", self.base_url))
            .json(&serde_json::json!({ "plan": plan }));
        send(self.authed(req)?).await
    }

    pub async fn stats(&self) -> Result<serde_json::Value, ClientError> {
        send(self.authed(self.client.get(format!("{}/user/stats", self.base_url)))?).await
    }

    /// Allocate the full plan quota in one batch.
    pub async fn allocate(&self) -> Result<Vec<AllocatedProxy>, ClientError> {
        send(self.authed(self.client.post(format!("{}/proxy/allocate", self.base_url)))?).await
    }

    pub async fn allocated(&self) -> Result<Vec<AllocatedProxy>, ClientError> {
        send(self.authed(self.client.get(format!("{}/proxy/allocated", self.base_url)))?).await
    }

    pub async fn release(&self) -> Result<(), ClientError> {
        let resp = self
            .authed(self.client.post(format!("{}/proxy/release", self.base_url)))?
            .send()
            .await?;
        check(resp).await.map(|_| ())
    }

    fn authed(&self, req: RequestBuilder) -> Result<RequestBuilder, ClientError> {
        let key = self.api_key.as_deref().ok_or(ClientError::MissingApiKey)?;
        Ok(req.header(API_KEY_HEADER, key))
    }
}

async fn send<T: DeserializeOwned>(req: RequestBuilder) -> Result<T, ClientError> {
    let resp = check(req.send().await?).await?;
    Ok(resp.json::<T>().await?)
}

async fn check(resp: reqwest::Response) -> Result<reqwest::Response, ClientError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let text = resp.text().await.unwrap_or_default();
    let detail = serde_json::from_str::<ErrorBody>(&text)
        .map(|b| b.detail)
        .unwrap_or(text);
    Err(ClientError::Api { status, detail })
}
