// FCM HTTP v1 send client.
//
// Builds a notification message (title/body plus a string data payload)
// routed either to a topic or to a single device token, and returns the
// message name FCM assigns as the delivery identifier.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use gcp_auth::TokenProvider;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

const FCM_BASE: &str = "https://fcm.googleapis.com/v1";

#[derive(Debug, Serialize)]
pub struct Notification {
    pub title: String,
    pub body: String,
}

/// One FCM message. Exactly one of `topic` / `token` is set.
#[derive(Debug, Serialize)]
pub struct Message {
    pub notification: Notification,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub data: HashMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl Message {
    pub fn to_topic(topic: &str, title: &str, body: &str, data: HashMap<String, String>) -> Self {
        Self {
            notification: Notification {
                title: title.to_string(),
                body: body.to_string(),
            },
            data,
            topic: Some(topic.to_string()),
            token: None,
        }
    }

    pub fn to_token(token: &str, title: &str, body: &str, data: HashMap<String, String>) -> Self {
        Self {
            notification: Notification {
                title: title.to_string(),
                body: body.to_string(),
            },
            data,
            topic: None,
            token: Some(token.to_string()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SendResponse {
    /// `projects/{project}/messages/{message_id}`
    name: String,
}

pub struct FcmClient {
    http: Client,
    auth: Arc<TokenProvider>,
}

impl FcmClient {
    pub fn new(auth: Arc<TokenProvider>) -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { http, auth })
    }

    /// Send one message and return the delivery identifier.
    pub async fn send(&self, message: Message) -> Result<String> {
        let token = self.auth.access_token().await?;
        let url = format!(
            "{}/projects/{}/messages:send",
            FCM_BASE,
            self.auth.project_id()
        );

        let response = self
            .http
            .post(url)
            .bearer_auth(token)
            .json(&serde_json::json!({ "message": message }))
            .send()
            .await
            .context("FCM send request failed")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!("FCM send failed {}: {}", status, body);
            anyhow::bail!("FCM API error {}: {}", status, body);
        }

        let sent: SendResponse = response
            .json()
            .await
            .context("Failed to parse FCM send response")?;

        info!(message = %sent.name, "FCM notification sent");
        Ok(sent.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn data() -> HashMap<String, String> {
        HashMap::from([
            ("targetScreen".to_string(), "Home".to_string()),
            ("propertyId".to_string(), "".to_string()),
        ])
    }

    #[test]
    fn topic_message_carries_no_token_key() {
        let message = Message::to_topic("all_users", "Hi", "There", data());
        let encoded = serde_json::to_value(&message).unwrap();

        assert_eq!(encoded["topic"], json!("all_users"));
        assert!(encoded.get("token").is_none());
        assert_eq!(encoded["notification"]["title"], json!("Hi"));
        assert_eq!(encoded["data"]["targetScreen"], json!("Home"));
    }

    #[test]
    fn token_message_carries_no_topic_key() {
        let message = Message::to_token("device-token-1", "Hi", "There", data());
        let encoded = serde_json::to_value(&message).unwrap();

        assert_eq!(encoded["token"], json!("device-token-1"));
        assert!(encoded.get("topic").is_none());
    }

    #[test]
    fn empty_data_payload_is_omitted() {
        let message = Message::to_topic("all_users", "Hi", "There", HashMap::new());
        let encoded = serde_json::to_value(&message).unwrap();

        assert!(encoded.get("data").is_none());
    }
}
