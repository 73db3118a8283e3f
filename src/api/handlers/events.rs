//! Bus publish endpoint for business services.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};

use crate::api::dto::{PublishEventRequest, PublishedResponse};
use crate::app_state::AppState;
use crate::domain::{BusEvent, Channel, Envelope};
use crate::error::{ErrorResponse, GatewayError};

/// `POST /events/{channel}`: validates an envelope and publishes it.
///
/// # Errors
///
/// - [`GatewayError::UnknownChannel`] (404) if `channel` is not in the
///   taxonomy.
/// - [`GatewayError::MalformedEnvelope`] (400) if a required routing field
///   is missing.
/// - [`GatewayError::Bus`] (503) if the bus rejects the publish.
#[utoipa::path(
    post,
    path = "/api/v1/events/{channel}",
    tag = "Events",
    summary = "Publish an event envelope",
    description = "Validates the envelope against the channel's required routing fields and publishes it on the bus. Every gateway process fans it out according to the broadcast policy.",
    params(("channel" = String, Path, description = "Channel name, e.g. `message`")),
    request_body = PublishEventRequest,
    responses(
        (status = 202, description = "Envelope accepted", body = PublishedResponse),
        (status = 400, description = "Envelope misses a routing field", body = ErrorResponse),
        (status = 404, description = "Unknown channel", body = ErrorResponse),
    )
)]
pub async fn publish_event(
    State(state): State<AppState>,
    Path(channel): Path<String>,
    Json(req): Json<PublishEventRequest>,
) -> Result<impl IntoResponse, GatewayError> {
    let channel: Channel = channel.parse()?;
    let event = BusEvent::new(channel, Envelope::from(req))?;
    state.bridge.try_publish(&event).await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(PublishedResponse {
            published: true,
            channel: channel.to_string(),
        }),
    ))
}

/// Event routes (nested under `/api/v1`).
pub fn routes() -> Router<AppState> {
    Router::new().route("/events/{channel}", post(publish_event))
}
