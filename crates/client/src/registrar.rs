//! Server boundary for subscription bookkeeping.
//!
//! [`SubscriptionApi`] is the trait seam; [`HttpSubscriptionApi`] is the
//! production binding over the REST surface.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{ClientError, ClientResult};
use crate::platform::PushSubscriptionData;

/// Registration request body.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    /// Platform-issued subscription.
    pub subscription: PushSubscriptionData,
    /// Stable device identifier.
    pub device_id: String,
    /// Optional farm scope.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub farm_id: Option<String>,
}

/// Registration outcome. `created` distinguishes a fresh subscription from a
/// resubscribe so the caller can message the user accordingly.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    /// True for an insert, false for an endpoint/key refresh.
    pub created: bool,
}

/// Summary returned by a server-side cleanup pass.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanupOutcome {
    /// Rows removed.
    pub cleaned_count: u64,
    /// Rows confirmed healthy.
    pub valid_count: u64,
    /// Rows examined.
    pub total_checked: u64,
    /// Mode the pass ran in.
    pub check_type: String,
}

/// What the orchestrator needs from the server.
#[async_trait]
pub trait SubscriptionApi: Send + Sync {
    /// Fetch the current VAPID public key (base64url).
    async fn vapid_public_key(&self) -> ClientResult<String>;

    /// Persist or refresh a subscription row.
    async fn register(&self, request: &RegisterRequest) -> ClientResult<RegisterResponse>;

    /// Hard-delete the subscription row for an endpoint.
    async fn unsubscribe(&self, endpoint: &str, farm_id: Option<&str>) -> ClientResult<()>;

    /// Trigger a server-side cleanup pass.
    async fn cleanup(&self, real_time_check: bool) -> ClientResult<CleanupOutcome>;
}

#[derive(Debug, Deserialize)]
struct VapidKeyBody {
    #[serde(rename = "publicKey")]
    public_key: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    code: String,
    message: String,
}

/// REST binding of [`SubscriptionApi`].
#[derive(Debug, Clone)]
pub struct HttpSubscriptionApi {
    client: reqwest::Client,
    base_url: Url,
    token: String,
}

impl HttpSubscriptionApi {
    /// Create a client against `base_url`, authenticating with `token`.
    #[must_use]
    pub fn new(mut base_url: Url, token: impl Into<String>) -> Self {
        // Url::join treats a slashless last segment as a file and drops it,
        // so anchor the base as a directory.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Self {
            client: reqwest::Client::new(),
            base_url,
            token: token.into(),
        }
    }

    fn endpoint(&self, path: &str) -> ClientResult<Url> {
        self.base_url
            .join(path)
            .map_err(|e| ClientError::Api(format!("invalid api url: {e}")))
    }

    async fn decode<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> ClientResult<T> {
        let status = response.status();
        if status.is_success() {
            return response
                .json::<T>()
                .await
                .map_err(|e| ClientError::Api(format!("invalid response body: {e}")));
        }

        // Error responses carry a JSON envelope with a stable code.
        let envelope = response.json::<ErrorEnvelope>().await.ok();
        match envelope {
            Some(envelope) if envelope.error.code == "VAPID_KEY_NOT_CONFIGURED" => {
                Err(ClientError::VapidKeyMissing)
            }
            Some(envelope) => Err(ClientError::Api(format!(
                "{} ({})",
                envelope.error.message, envelope.error.code
            ))),
            None => Err(ClientError::Api(format!("http status {status}"))),
        }
    }
}

#[async_trait]
impl SubscriptionApi for HttpSubscriptionApi {
    async fn vapid_public_key(&self) -> ClientResult<String> {
        let response = self
            .client
            .get(self.endpoint("push/vapid")?)
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| ClientError::Api(e.to_string()))?;
        let body: VapidKeyBody = Self::decode(response).await?;
        Ok(body.public_key)
    }

    async fn register(&self, request: &RegisterRequest) -> ClientResult<RegisterResponse> {
        let response = self
            .client
            .post(self.endpoint("push/subscription")?)
            .bearer_auth(&self.token)
            .json(request)
            .send()
            .await
            .map_err(|e| ClientError::Api(e.to_string()))?;
        Self::decode(response).await
    }

    async fn unsubscribe(&self, endpoint: &str, farm_id: Option<&str>) -> ClientResult<()> {
        let body = serde_json::json!({ "endpoint": endpoint, "farmId": farm_id });
        let response = self
            .client
            .delete(self.endpoint("push/subscription")?)
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await
            .map_err(|e| ClientError::Api(e.to_string()))?;
        Self::decode::<serde_json::Value>(response).await?;
        Ok(())
    }

    async fn cleanup(&self, real_time_check: bool) -> ClientResult<CleanupOutcome> {
        let body = serde_json::json!({ "realTimeCheck": real_time_check });
        let response = self
            .client
            .post(self.endpoint("push/subscription/cleanup")?)
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await
            .map_err(|e| ClientError::Api(e.to_string()))?;
        Self::decode(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::SubscriptionKeys;

    #[test]
    fn register_request_uses_camel_case_wire_names() {
        let request = RegisterRequest {
            subscription: PushSubscriptionData {
                endpoint: "https://push.example.com/send/abc".to_string(),
                keys: SubscriptionKeys {
                    p256dh: "BKey".to_string(),
                    auth: "Auth".to_string(),
                },
            },
            device_id: "Chrome_Windows_desktop".to_string(),
            farm_id: None,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["deviceId"], "Chrome_Windows_desktop");
        assert_eq!(json["subscription"]["keys"]["p256dh"], "BKey");
        assert!(json.get("farmId").is_none());
    }

    #[test]
    fn endpoint_keeps_base_path_without_trailing_slash() {
        let api = HttpSubscriptionApi::new(
            Url::parse("https://farm.example.com/api").unwrap(),
            "token",
        );
        assert_eq!(
            api.endpoint("push/vapid").unwrap().as_str(),
            "https://farm.example.com/api/push/vapid"
        );

        let api = HttpSubscriptionApi::new(
            Url::parse("https://farm.example.com/api/").unwrap(),
            "token",
        );
        assert_eq!(
            api.endpoint("push/subscription").unwrap().as_str(),
            "https://farm.example.com/api/push/subscription"
        );
    }

    #[test]
    fn cleanup_outcome_parses_server_summary() {
        let outcome: CleanupOutcome = serde_json::from_str(
            r#"{"cleanedCount":2,"validCount":5,"totalChecked":7,"checkType":"realTime"}"#,
        )
        .unwrap();
        assert_eq!(outcome.cleaned_count, 2);
        assert_eq!(outcome.check_type, "realTime");
    }
}
