//! Push notification endpoints.
//!
//! Both endpoints validate required fields, build the data payload the
//! mobile app uses for deep linking (`targetScreen`, `propertyId`) and
//! forward through the push service. Send failures map to a generic 500
//! so delivery problems never take the process down with them.

use std::collections::HashMap;

use axum::{
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::server::app::AppState;

/// Screen the app opens when a notification names no other target.
const DEFAULT_TARGET_SCREEN: &str = "Home";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendToAllRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub target_screen: Option<String>,
    #[serde(default)]
    pub property_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendToUserRequest {
    #[serde(default)]
    pub fcm_token: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub target_screen: Option<String>,
    #[serde(default)]
    pub property_id: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SendResponse {
    success: bool,
    message_id: String,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

/// An absent and an empty required field are the same thing.
fn require(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|s| !s.is_empty())
}

fn push_data(target_screen: Option<String>, property_id: Option<String>) -> HashMap<String, String> {
    HashMap::from([
        (
            "targetScreen".to_string(),
            target_screen
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| DEFAULT_TARGET_SCREEN.to_string()),
        ),
        ("propertyId".to_string(), property_id.unwrap_or_default()),
    ])
}

fn bad_request(message: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
        .into_response()
}

fn send_failed() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: "Failed to send notification".to_string(),
        }),
    )
        .into_response()
}

/// POST /send-to-all - broadcast a notification to the shared topic.
pub async fn send_to_all_handler(
    Extension(state): Extension<AppState>,
    Json(request): Json<SendToAllRequest>,
) -> Response {
    let (Some(title), Some(body)) = (require(&request.title), require(&request.body)) else {
        return bad_request("title and body are required");
    };

    let data = push_data(request.target_screen, request.property_id);
    match state
        .deps
        .push_service
        .send_to_topic(&state.deps.broadcast_topic, title, body, data)
        .await
    {
        Ok(message_id) => (
            StatusCode::OK,
            Json(SendResponse {
                success: true,
                message_id,
            }),
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "Failed to send broadcast notification");
            send_failed()
        }
    }
}

/// POST /send-to-user - send a notification to a single device token.
pub async fn send_to_user_handler(
    Extension(state): Extension<AppState>,
    Json(request): Json<SendToUserRequest>,
) -> Response {
    let (Some(token), Some(title), Some(body)) = (
        require(&request.fcm_token),
        require(&request.title),
        require(&request.body),
    ) else {
        return bad_request("fcmToken, title and body are required");
    };

    let data = push_data(request.target_screen, request.property_id);
    match state
        .deps
        .push_service
        .send_to_token(token, title, body, data)
        .await
    {
        Ok(message_id) => (
            StatusCode::OK,
            Json(SendResponse {
                success: true,
                message_id,
            }),
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "Failed to send notification to user");
            send_failed()
        }
    }
}
