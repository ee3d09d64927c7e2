use crate::utils::error::Result;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::time::Duration;

pub const TRACK_PATH: &str = "/users/track";

/// 單次請求的結果；除 `Accepted` 外一律視為失敗
#[derive(Debug)]
pub enum Delivery {
    Accepted,
    Rejected { status: StatusCode, body: String },
    Unreachable(reqwest::Error),
}

impl Delivery {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Delivery::Accepted)
    }
}

impl std::fmt::Display for Delivery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Delivery::Accepted => write!(f, "accepted"),
            Delivery::Rejected { status, body } => write!(f, "{} - {}", status.as_u16(), body),
            Delivery::Unreachable(e) => write!(f, "request error: {}", e),
        }
    }
}

/// 送出一批使用者屬性的管道
#[async_trait]
pub trait TrackTransport: Send + Sync {
    async fn send(&self, payload: &Value) -> Delivery;
}

/// `/users/track` 批次匯入端點的 HTTP 客戶端
#[derive(Clone)]
pub struct TrackClient {
    client: Client,
    endpoint: String,
    api_key: String,
}

impl TrackClient {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            endpoint: format!("{}{}", base_url.trim_end_matches('/'), TRACK_PATH),
            api_key: api_key.to_string(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl TrackTransport for TrackClient {
    /// 送出一個 `{"attributes": [...]}` 請求；只有 201 算成功
    async fn send(&self, payload: &Value) -> Delivery {
        tracing::debug!("POST {}", self.endpoint);

        let response = match self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(payload)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => return Delivery::Unreachable(e),
        };

        let status = response.status();
        if status == StatusCode::CREATED {
            return Delivery::Accepted;
        }

        let body = response.text().await.unwrap_or_default();
        Delivery::Rejected { status, body }
    }
}
