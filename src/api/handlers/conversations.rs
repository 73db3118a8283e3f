//! Server-driven conversation joins and membership queries.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::api::dto::{JoinResponse, MembersResponse};
use crate::app_state::AppState;
use crate::error::{ErrorResponse, GatewayError};

/// `POST /conversations/{conversation_id}/customers/{customer_id}/join`
///
/// # Errors
///
/// Returns [`GatewayError::NotFound`] if the customer has no live
/// connection or the customer/conversation does not exist.
#[utoipa::path(
    post,
    path = "/api/v1/conversations/{conversation_id}/customers/{customer_id}/join",
    tag = "Conversations",
    summary = "Attach a customer to a conversation",
    params(
        ("conversation_id" = i64, Path, description = "Conversation id"),
        ("customer_id" = i64, Path, description = "Customer id"),
    ),
    responses(
        (status = 200, description = "Customer joined", body = JoinResponse),
        (status = 404, description = "No live connection or unknown entity", body = ErrorResponse),
    )
)]
pub async fn join_customer(
    State(state): State<AppState>,
    Path((conversation_id, customer_id)): Path<(i64, i64)>,
) -> Result<impl IntoResponse, GatewayError> {
    let handle = state
        .conversations
        .customer_join(customer_id, conversation_id)
        .await?;
    Ok((
        StatusCode::OK,
        Json(JoinResponse {
            conversation_id,
            handle: handle.to_string(),
        }),
    ))
}

/// `POST /conversations/{conversation_id}/agents/{user_id}/join`
///
/// # Errors
///
/// Returns [`GatewayError::NotFound`] if the agent has no live connection
/// or the user/conversation does not exist.
#[utoipa::path(
    post,
    path = "/api/v1/conversations/{conversation_id}/agents/{user_id}/join",
    tag = "Conversations",
    summary = "Attach an agent to a conversation",
    params(
        ("conversation_id" = i64, Path, description = "Conversation id"),
        ("user_id" = i64, Path, description = "Agent user id"),
    ),
    responses(
        (status = 200, description = "Agent joined", body = JoinResponse),
        (status = 404, description = "No live connection or unknown entity", body = ErrorResponse),
    )
)]
pub async fn join_agent(
    State(state): State<AppState>,
    Path((conversation_id, user_id)): Path<(i64, i64)>,
) -> Result<impl IntoResponse, GatewayError> {
    let handle = state
        .conversations
        .agent_join(user_id, conversation_id)
        .await?;
    Ok((
        StatusCode::OK,
        Json(JoinResponse {
            conversation_id,
            handle: handle.to_string(),
        }),
    ))
}

/// `GET /conversations/{conversation_id}/members`
///
/// # Errors
///
/// Returns [`GatewayError::RegistryUnavailable`] if the store is down.
#[utoipa::path(
    get,
    path = "/api/v1/conversations/{conversation_id}/members",
    tag = "Conversations",
    summary = "List handles attached to a conversation",
    params(("conversation_id" = i64, Path, description = "Conversation id")),
    responses(
        (status = 200, description = "Current members across all processes", body = MembersResponse),
        (status = 503, description = "Store unavailable", body = ErrorResponse),
    )
)]
pub async fn list_members(
    State(state): State<AppState>,
    Path(conversation_id): Path<i64>,
) -> Result<impl IntoResponse, GatewayError> {
    let mut members: Vec<String> = state
        .conversations
        .members(conversation_id)
        .await?
        .into_iter()
        .map(|h| h.to_string())
        .collect();
    members.sort_unstable();
    Ok(Json(MembersResponse {
        conversation_id,
        members,
    }))
}

/// Conversation routes (nested under `/api/v1`).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/conversations/{conversation_id}/customers/{customer_id}/join",
            post(join_customer),
        )
        .route(
            "/conversations/{conversation_id}/agents/{user_id}/join",
            post(join_agent),
        )
        .route(
            "/conversations/{conversation_id}/members",
            get(list_members),
        )
}
