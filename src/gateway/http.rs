//! HTTP implementation of the gateway client
//!
//! Talks to the IoT gateway REST server:
//! - `GET  /iotgateway/read?ids=..&ids=..`
//! - `POST /iotgateway/write` with a JSON array body

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, RequestBuilder, Response};

use crate::config::GatewayConfig;
use crate::error::GatewayError;
use crate::gateway::client::Gateway;
use crate::gateway::types::{ReadResponse, WriteRequest, WriteResponse};

const READ_PATH: &str = "/iotgateway/read";
const WRITE_PATH: &str = "/iotgateway/write";

/// Longest error body kept in a protocol error
const MAX_ERROR_BODY_CHARS: usize = 200;

/// Gateway client backed by reqwest
pub struct HttpGateway {
    client: Client,
    base_url: String,
    username: Option<String>,
    password: Option<String>,
}

impl HttpGateway {
    pub fn new(config: &GatewayConfig) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| GatewayError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url(),
            username: config.username.clone(),
            password: config.password.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn read_url(&self) -> String {
        format!("{}{}", self.base_url, READ_PATH)
    }

    fn write_url(&self) -> String {
        format!("{}{}", self.base_url, WRITE_PATH)
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.username {
            Some(user) => builder.basic_auth(user, self.password.as_deref()),
            None => builder,
        }
    }

    async fn send(builder: RequestBuilder) -> Result<String, GatewayError> {
        let response = builder
            .send()
            .await
            .map_err(|e| GatewayError::Transport(format!("Request failed: {}", e)))?;

        let response = Self::ensure_success(response).await?;

        response
            .text()
            .await
            .map_err(|e| GatewayError::Transport(format!("Failed to read response body: {}", e)))
    }

    async fn ensure_success(response: Response) -> Result<Response, GatewayError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        Err(GatewayError::Protocol {
            status: status.as_u16(),
            body: body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
        })
    }
}

#[async_trait]
impl Gateway for HttpGateway {
    async fn read(&self, ids: &[&str]) -> Result<ReadResponse, GatewayError> {
        let query: Vec<(&str, &str)> = ids.iter().map(|id| ("ids", *id)).collect();
        let builder = self
            .authorize(self.client.get(self.read_url()))
            .header(CONTENT_TYPE, "application/json")
            .query(&query);

        let body = Self::send(builder).await?;
        log::trace!("Read response: {}", body);

        serde_json::from_str(&body)
            .map_err(|e| GatewayError::MalformedResponse(format!("Failed to parse read response: {}", e)))
    }

    async fn write(&self, request: &WriteRequest) -> Result<WriteResponse, GatewayError> {
        let builder = self
            .authorize(self.client.post(self.write_url()))
            .header(CONTENT_TYPE, "application/json")
            .json(request);

        let body = Self::send(builder).await?;
        log::trace!("Write response: {}", body);

        // The write outcome is decided by the status code; the body is informational
        if body.trim().is_empty() {
            return Ok(WriteResponse::default());
        }
        match serde_json::from_str(&body) {
            Ok(parsed) => Ok(parsed),
            Err(e) => {
                log::debug!("Ignoring unparsable write response: {}", e);
                Ok(WriteResponse::default())
            }
        }
    }
}

impl std::fmt::Debug for HttpGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpGateway")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .finish()
    }
}
