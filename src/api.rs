use std::fmt::{Display, Formatter};

use serde::de::DeserializeOwned;

use crate::model::{Customer, CustomerDraft, StoreAck};

#[derive(Clone, Debug, PartialEq)]
pub enum ApiError {
    /// The request never produced a response.
    Network(String),
    /// The gateway answered with a non-2xx status.
    Status(u16),
    /// The body was not the JSON we expected.
    Decode(String),
}

impl Display for ApiError {
    fn fmt(&self, f: &mut Formatter) -> Result<(), std::fmt::Error> {
        match self {
            Self::Network(message) => write!(f, "{}", message),
            Self::Status(status) => write!(f, "HTTP error! status: {}", status),
            Self::Decode(message) => write!(f, "Invalid response body: {}", message),
        }
    }
}

impl std::error::Error for ApiError {}

impl From<reqwest::Error> for ApiError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_decode() {
            Self::Decode(error.to_string())
        } else if let Some(status) = error.status() {
            Self::Status(status.as_u16())
        } else {
            Self::Network(error.to_string())
        }
    }
}

/// Thin client for the gateway's five routes. No timeouts and no retries.
#[derive(Clone, Debug)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn list(&self) -> Result<Vec<Customer>, ApiError> {
        let request = self.client.get(format!("{}/", self.base_url));
        Self::send(request).await
    }

    pub async fn get(&self, id: i64) -> Result<Option<Customer>, ApiError> {
        let request = self.client.get(format!("{}/clientes/{}", self.base_url, id));
        Self::send(request).await
    }

    pub async fn create(&self, draft: &CustomerDraft) -> Result<StoreAck, ApiError> {
        let request = self
            .client
            .post(format!("{}/clientes/", self.base_url))
            .json(draft);
        Self::send(request).await
    }

    pub async fn update(&self, id: i64, draft: &CustomerDraft) -> Result<StoreAck, ApiError> {
        let request = self
            .client
            .put(format!("{}/clientes/{}", self.base_url, id))
            .json(draft);
        Self::send(request).await
    }

    pub async fn delete(&self, id: i64) -> Result<StoreAck, ApiError> {
        let request = self
            .client
            .delete(format!("{}/clientes/{}", self.base_url, id));
        Self::send(request).await
    }

    async fn send<T: DeserializeOwned>(request: reqwest::RequestBuilder) -> Result<T, ApiError> {
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status(status.as_u16()));
        }
        Ok(response.json::<T>().await?)
    }
}
