//! Daily engagement reward API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::auth::AuthSession;
use crate::error::RewardError;
use crate::storage::ApiConfig;

/// Successful reward response: the user's updated point total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardPayload {
    pub points: u64,
    #[serde(default)]
    pub message: Option<String>,
}

/// "Issue daily engagement reward for the current user."
///
/// Identity is implicit: implementations resolve the current user themselves.
#[async_trait]
pub trait RewardService: Send + Sync {
    async fn issue_daily_reward(&self) -> Result<RewardPayload, RewardError>;
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default = "default_true")]
    success: bool,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    data: Option<EnvelopeData>,
}

#[derive(Debug, Deserialize)]
struct EnvelopeData {
    #[serde(default)]
    points: Option<u64>,
}

fn default_true() -> bool {
    true
}

/// Reward client for the Kissan Growth REST API.
pub struct HttpRewardClient {
    endpoint: Url,
    session: AuthSession,
    http_client: Client,
}

impl HttpRewardClient {
    pub fn new(api: &ApiConfig, session: AuthSession) -> Result<Self, RewardError> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(api.timeout_secs))
            .build()?;
        Ok(Self {
            endpoint: endpoint_url(&api.base_url, &api.reward_path)?,
            session,
            http_client,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl RewardService for HttpRewardClient {
    async fn issue_daily_reward(&self) -> Result<RewardPayload, RewardError> {
        let token = self
            .session
            .access_token()
            .ok_or(RewardError::NotAuthenticated)?;

        let resp = self
            .http_client
            .post(self.endpoint.clone())
            .bearer_auth(&token)
            .json(&serde_json::json!({}))
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;
        let envelope = serde_json::from_str::<Envelope>(&body);

        if !status.is_success() {
            let message = envelope
                .ok()
                .and_then(|e| e.message)
                .unwrap_or_else(|| body.trim().to_string());
            return Err(RewardError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let envelope = envelope.map_err(|e| RewardError::InvalidResponse(e.to_string()))?;
        if !envelope.success {
            return Err(RewardError::Rejected(
                envelope.message.unwrap_or_else(|| "reward not granted".into()),
            ));
        }
        let points = envelope
            .data
            .and_then(|d| d.points)
            .ok_or_else(|| RewardError::InvalidResponse("missing data.points".into()))?;

        Ok(RewardPayload {
            points,
            message: envelope.message,
        })
    }
}

/// Join `path` onto `base`, treating `base` as a directory.
pub(crate) fn endpoint_url(base: &str, path: &str) -> Result<Url, url::ParseError> {
    let mut base = Url::parse(base)?;
    if !base.path().ends_with('/') {
        let dir = format!("{}/", base.path());
        base.set_path(&dir);
    }
    base.join(path.trim_start_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_keeps_base_path_segments() {
        let url = endpoint_url("https://api.example.com/api/v1", "users/stay-reward").unwrap();
        assert_eq!(url.as_str(), "https://api.example.com/api/v1/users/stay-reward");

        let url = endpoint_url("https://api.example.com/api/v1/", "/users/stay-reward").unwrap();
        assert_eq!(url.as_str(), "https://api.example.com/api/v1/users/stay-reward");
    }

    #[test]
    fn endpoint_rejects_relative_base() {
        assert!(endpoint_url("api/v1", "x").is_err());
    }
}
