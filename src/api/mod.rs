//! REST control surface: route handlers, DTOs, OpenAPI document and router
//! composition.
//!
//! Business services use it to publish envelopes, drive conversation joins
//! and push ticket events. Resource endpoints are mounted under `/api/v1`;
//! `/health` and `/stats` sit at the root.

pub mod dto;
pub mod handlers;

use axum::Router;
use utoipa::OpenApi;

use crate::app_state::AppState;

/// OpenAPI document of the REST surface.
#[derive(Debug, OpenApi)]
#[openapi(
    info(
        title = "parley-gateway",
        description = "Presence and conversation-routing gateway for agent/customer chat."
    ),
    paths(
        handlers::system::health_handler,
        handlers::system::stats_handler,
        handlers::events::publish_event,
        handlers::conversations::join_customer,
        handlers::conversations::join_agent,
        handlers::conversations::list_members,
        handlers::tickets::post_ticket_message,
        handlers::tickets::post_sla_alert,
    ),
    components(schemas(
        crate::error::ErrorResponse,
        crate::error::ErrorBody,
        dto::PublishedResponse,
        dto::PublishEventRequest,
        dto::JoinResponse,
        dto::MembersResponse,
        dto::TicketMessageRequest,
        dto::SlaAlertRequest,
        handlers::system::HealthResponse,
        handlers::system::StatsResponse,
        handlers::system::NamespaceCount,
    )),
    tags(
        (name = "System", description = "Health and statistics"),
        (name = "Events", description = "Bus publish API"),
        (name = "Conversations", description = "Conversation room joins"),
        (name = "Tickets", description = "Ticket threads and SLA alerts"),
    )
)]
pub struct ApiDoc;

/// Builds the complete API router with all REST endpoints.
pub fn build_router() -> Router<AppState> {
    let router = Router::new()
        .nest("/api/v1", handlers::routes())
        .merge(handlers::system::routes());

    #[cfg(feature = "swagger-ui")]
    let router = router.merge(
        utoipa_swagger_ui::SwaggerUi::new("/swagger-ui")
            .url("/api-docs/openapi.json", ApiDoc::openapi()),
    );

    router
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_lists_every_rest_path() {
        let doc = ApiDoc::openapi();
        for path in [
            "/health",
            "/stats",
            "/api/v1/events/{channel}",
            "/api/v1/conversations/{conversation_id}/members",
            "/api/v1/sla-alerts",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }
}
