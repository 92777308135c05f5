//! Notification handlers and the live stream
//!
//! `GET /notifications/stream` upgrades to a WebSocket and pushes each new
//! notification for the signed-in user as a JSON text frame. Browsers pass
//! the token as `?access_token=`.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    response::IntoResponse,
    Json,
};
use fo_core::traits::Id;
use fo_notifications::RecipientStream;
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::ApiResult;
use crate::extractors::{ApiQuery, AppState, AuthenticatedUser, Paging};
use crate::representers::collection;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationQuery {
    #[serde(default)]
    pub unread_only: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnreadCount {
    pub unread: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkedRead {
    pub updated: u64,
}

/// GET /api/v1/notifications
pub async fn list_notifications(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    paging: Paging,
    ApiQuery(query): ApiQuery<NotificationQuery>,
) -> ApiResult<impl IntoResponse> {
    let result = state
        .services
        .notifications
        .list(user.id, query.unread_only, *paging)
        .await?;
    Ok(collection(result, "/notifications"))
}

/// GET /api/v1/notifications/unread-count
pub async fn unread_count(State(state): State<AppState>, user: AuthenticatedUser) -> ApiResult<impl IntoResponse> {
    let unread = state.services.notifications.unread_count(user.id).await?;
    Ok(Json(UnreadCount { unread }))
}

/// POST /api/v1/notifications/:id/read
pub async fn mark_read(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Id>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.services.notifications.mark_read(user.id, id).await?))
}

/// POST /api/v1/notifications/read-all
pub async fn mark_all_read(State(state): State<AppState>, user: AuthenticatedUser) -> ApiResult<impl IntoResponse> {
    let updated = state.services.notifications.mark_all_read(user.id).await?;
    Ok(Json(MarkedRead { updated }))
}

/// GET /api/v1/notifications/stream
pub async fn stream(State(state): State<AppState>, user: AuthenticatedUser, ws: WebSocketUpgrade) -> impl IntoResponse {
    let subscription = state.hub.subscribe(user.id);
    let shutdown = state.shutdown.clone();
    ws.on_upgrade(move |socket| forward(socket, subscription, shutdown))
}

/// Runs until the client goes away, the hub closes or the server stops
async fn forward(socket: WebSocket, mut subscription: RecipientStream, shutdown: CancellationToken) {
    let recipient = subscription.recipient_id();
    let (mut sink, mut incoming) = socket.split();
    debug!(recipient, "Notification stream opened");

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                let _ = sink.send(Message::Close(None)).await;
                break;
            }
            next = subscription.next() => {
                let Some(notification) = next else { break };
                let payload = match serde_json::to_string(&notification) {
                    Ok(payload) => payload,
                    Err(e) => {
                        warn!(recipient, error = %e, "Could not encode notification");
                        continue;
                    }
                };
                if sink.send(Message::Text(payload)).await.is_err() {
                    break;
                }
            }
            message = incoming.next() => match message {
                Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                Some(Ok(_)) => {}
            },
        }
    }

    debug!(recipient, "Notification stream closed");
}
