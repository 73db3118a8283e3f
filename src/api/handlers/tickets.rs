//! Ticket thread broadcasts and SLA alerts.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use chrono::Utc;

use crate::api::dto::{PublishedResponse, SlaAlertRequest, TicketMessageRequest};
use crate::app_state::AppState;
use crate::domain::Channel;
use crate::error::{ErrorResponse, GatewayError};

/// `POST /tickets/{ticket_id}/messages`: fans a thread message out to the
/// ticket room.
///
/// # Errors
///
/// Returns [`GatewayError::Bus`] if the publish fails.
#[utoipa::path(
    post,
    path = "/api/v1/tickets/{ticket_id}/messages",
    tag = "Tickets",
    summary = "Broadcast a ticket thread message",
    params(("ticket_id" = i64, Path, description = "Ticket id")),
    request_body = TicketMessageRequest,
    responses(
        (status = 202, description = "Accepted; `published` is false for empty messages", body = PublishedResponse),
        (status = 503, description = "Bus unavailable", body = ErrorResponse),
    )
)]
pub async fn post_ticket_message(
    State(state): State<AppState>,
    Path(ticket_id): Path<i64>,
    Json(req): Json<TicketMessageRequest>,
) -> Result<impl IntoResponse, GatewayError> {
    let created_at = req.created_at.unwrap_or_else(Utc::now);
    let published = state
        .tickets
        .broadcast_message(ticket_id, &req.user, &req.message, created_at)
        .await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(PublishedResponse {
            published,
            channel: Channel::TicketMessage.to_string(),
        }),
    ))
}

/// `POST /sla-alerts`: delivers an alert to each receiver's personal room.
///
/// # Errors
///
/// Returns [`GatewayError::Bus`] if the publish fails.
#[utoipa::path(
    post,
    path = "/api/v1/sla-alerts",
    tag = "Tickets",
    summary = "Send a ticket SLA alert",
    request_body = SlaAlertRequest,
    responses(
        (status = 202, description = "Accepted; `published` is false without receivers or message", body = PublishedResponse),
        (status = 503, description = "Bus unavailable", body = ErrorResponse),
    )
)]
pub async fn post_sla_alert(
    State(state): State<AppState>,
    Json(req): Json<SlaAlertRequest>,
) -> Result<impl IntoResponse, GatewayError> {
    let published = state.tickets.send_sla_alert(req.into()).await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(PublishedResponse {
            published,
            channel: Channel::TicketSlaAlert.to_string(),
        }),
    ))
}

/// Ticket routes (nested under `/api/v1`).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/tickets/{ticket_id}/messages", post(post_ticket_message))
        .route("/sla-alerts", post(post_sla_alert))
}
