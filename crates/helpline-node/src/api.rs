//! HTTP API for the Helpline node.
//!
//! ## Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | GET | `/health` | Health check |
//! | GET | `/api/tickets` | List the caller's tickets (admins see all) |
//! | POST | `/api/tickets` | Open a ticket |
//! | GET | `/api/tickets/{id}` | Ticket details with message log |
//! | POST | `/api/tickets/{id}/message` | Append a chat message |
//! | POST | `/api/tickets/{id}/status` | Change status (admin) |
//! | POST | `/api/tickets/{id}/assign` | Assign to an admin (admin) |
//! | GET | `/api/realtime/stats` | Broker statistics |
//! | GET | `/ws` | WebSocket for live updates |
//!
//! Every `/api` route requires the identity headers described in
//! [`crate::identity`].
//!
//! `POST /api/tickets/{id}/message` serves two kinds of clients from one
//! code path: when the request prefers JSON (`Accept: application/json`)
//! it gets `{"ok": true, "message": {...}}`, otherwise it gets a 303
//! redirect back to the ticket page. Both reflect the same persisted
//! message.

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
    Json, Router,
};
use helpline_realtime::Broker;
use helpline_tickets::{TicketError, TicketService, TicketSummary};
use helpline_types::{Ticket, TicketMessage, TicketStatus};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::identity::Caller;
use crate::realtime_api::realtime_routes;

/// Application state shared across handlers.
///
/// The store is owned by the service; handlers never touch it directly.
#[derive(Clone)]
pub struct AppState {
    /// Real-time broker.
    pub broker: Arc<Broker>,
    /// Ticket orchestration.
    pub service: Arc<TicketService>,
}

/// API error type.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Ticket(#[from] TicketError),
    #[error("authentication required")]
    Unauthorized,
    #[error("admin privileges required")]
    AdminRequired,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::Ticket(TicketError::NotFound { .. }) => {
                (StatusCode::NOT_FOUND, self.to_string())
            }
            ApiError::Ticket(TicketError::Validation(_)) => {
                (StatusCode::BAD_REQUEST, self.to_string())
            }
            ApiError::Ticket(TicketError::Forbidden(_)) => {
                (StatusCode::FORBIDDEN, self.to_string())
            }
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, self.to_string()),
            ApiError::AdminRequired => (StatusCode::FORBIDDEN, self.to_string()),
        };

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

// ==================== Request/Response Types ====================

/// Request to open a ticket.
#[derive(Debug, Deserialize)]
pub struct CreateTicketRequest {
    pub title: String,
    pub category: Option<String>,
    pub initial_message: Option<String>,
}

/// Request to append a chat message.
#[derive(Debug, Deserialize)]
pub struct PostMessageRequest {
    pub content: String,
}

/// Request to change a ticket's status.
#[derive(Debug, Deserialize)]
pub struct ChangeStatusRequest {
    pub status: String,
}

/// Request to assign a ticket.
#[derive(Debug, Deserialize)]
pub struct AssignRequest {
    pub admin_id: String,
}

/// Response for a ticket.
#[derive(Debug, Serialize)]
pub struct TicketResponse {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub category: Option<String>,
    pub status: String,
    pub assigned_to: Option<String>,
    pub created_at: u64,
    pub updated_at: u64,
}

impl From<Ticket> for TicketResponse {
    fn from(ticket: Ticket) -> Self {
        Self {
            id: ticket.id,
            user_id: ticket.user_id,
            title: ticket.title,
            category: ticket.category,
            status: ticket.status.to_string(),
            assigned_to: ticket.assigned_to,
            created_at: ticket.created_at,
            updated_at: ticket.updated_at,
        }
    }
}

/// Response for a ticket in a listing, with computed metadata.
#[derive(Debug, Serialize)]
pub struct TicketSummaryResponse {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub category: Option<String>,
    pub status: String,
    pub assigned_to: Option<String>,
    pub created_at: u64,
    pub updated_at: u64,
    pub message_count: usize,
    pub last_activity: u64,
}

impl From<TicketSummary> for TicketSummaryResponse {
    fn from(summary: TicketSummary) -> Self {
        let ticket = summary.ticket;
        Self {
            id: ticket.id,
            user_id: ticket.user_id,
            title: ticket.title,
            category: ticket.category,
            status: ticket.status.to_string(),
            assigned_to: ticket.assigned_to,
            created_at: ticket.created_at,
            updated_at: ticket.updated_at,
            message_count: summary.message_count,
            last_activity: summary.last_activity,
        }
    }
}

/// Response for a chat message.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub id: String,
    pub ticket_id: String,
    pub user_id: String,
    pub content: String,
    pub created_at: u64,
    pub seq: u64,
}

impl From<TicketMessage> for MessageResponse {
    fn from(message: TicketMessage) -> Self {
        Self {
            id: message.id,
            ticket_id: message.ticket_id,
            user_id: message.user_id,
            content: message.content,
            created_at: message.created_at,
            seq: message.seq,
        }
    }
}

/// Response for a ticket with its full message log.
#[derive(Debug, Serialize)]
pub struct TicketDetailResponse {
    pub ticket: TicketResponse,
    pub messages: Vec<MessageResponse>,
}

/// JSON acknowledgement for a posted message.
#[derive(Debug, Serialize)]
pub struct MessageAck {
    pub ok: bool,
    pub message: MessageResponse,
}

/// Creates the API router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/tickets", get(list_tickets).post(create_ticket))
        .route("/api/tickets/{id}", get(get_ticket))
        .route("/api/tickets/{id}/message", post(post_message))
        .route("/api/tickets/{id}/status", post(change_status))
        .route("/api/tickets/{id}/assign", post(assign_ticket))
        .merge(realtime_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Lists the caller's tickets; admins see every ticket.
async fn list_tickets(State(state): State<AppState>, caller: Caller) -> impl IntoResponse {
    let summaries = if caller.0.is_admin {
        state.service.all_tickets()
    } else {
        state.service.tickets_for_user(&caller.0.user_id)
    };
    let responses: Vec<TicketSummaryResponse> = summaries.into_iter().map(Into::into).collect();
    Json(responses)
}

/// Opens a new ticket.
async fn create_ticket(
    State(state): State<AppState>,
    caller: Caller,
    Json(req): Json<CreateTicketRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let ticket = state.service.open_ticket(
        &caller.0.user_id,
        &req.title,
        req.category.as_deref(),
        req.initial_message.as_deref(),
    )?;

    Ok((StatusCode::CREATED, Json(TicketResponse::from(ticket))))
}

/// Gets a ticket with its ordered message log.
async fn get_ticket(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let (ticket, messages) = state.service.ticket_view(&id, &caller.0)?;

    Ok(Json(TicketDetailResponse {
        ticket: ticket.into(),
        messages: messages.into_iter().map(Into::into).collect(),
    }))
}

/// Appends a chat message to a ticket.
///
/// Responds with a JSON acknowledgement or a redirect back to the ticket
/// page, depending on the Accept header. Persistence and fan-out are
/// identical either way.
async fn post_message(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(req): Json<PostMessageRequest>,
) -> Result<Response, ApiError> {
    let message = state.service.post_message(&id, &caller.0, &req.content)?;

    if prefers_json(&headers) {
        let ack = MessageAck {
            ok: true,
            message: message.into(),
        };
        Ok(Json(ack).into_response())
    } else {
        Ok(Redirect::to(&format!("/tickets/{id}")).into_response())
    }
}

/// Changes a ticket's status. Admin only.
async fn change_status(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
    Json(req): Json<ChangeStatusRequest>,
) -> Result<impl IntoResponse, ApiError> {
    caller.require_admin()?;

    let status = TicketStatus::parse(&req.status).ok_or_else(|| {
        TicketError::Validation(format!("invalid status: {}", req.status))
    })?;

    let ticket = state
        .service
        .change_status(&id, status, &caller.0.display_name)?;

    Ok(Json(TicketResponse::from(ticket)))
}

/// Assigns a ticket to an admin. Admin only.
async fn assign_ticket(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
    Json(req): Json<AssignRequest>,
) -> Result<impl IntoResponse, ApiError> {
    caller.require_admin()?;

    let ticket = state.service.assign_ticket(&id, &req.admin_id)?;

    Ok(Json(TicketResponse::from(ticket)))
}

fn prefers_json(headers: &HeaderMap) -> bool {
    headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|accept| accept.contains("application/json"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use helpline_tickets::{MemoryTicketStore, TicketStore};
    use helpline_types::Identity;

    fn app_state() -> AppState {
        let store: Arc<dyn TicketStore> = Arc::new(MemoryTicketStore::new());
        let broker = Arc::new(Broker::new());
        let service = Arc::new(TicketService::new(store, broker.clone()));
        AppState { broker, service }
    }

    fn user() -> Caller {
        Caller(Identity::new("u1", "Alice"))
    }

    fn admin() -> Caller {
        Caller(Identity::new("a1", "Root").with_admin(true))
    }

    fn json_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
        headers
    }

    #[tokio::test]
    async fn test_create_ticket_returns_created() {
        let state = app_state();
        let response = create_ticket(
            State(state),
            user(),
            Json(CreateTicketRequest {
                title: "Printer broken".to_string(),
                category: None,
                initial_message: None,
            }),
        )
        .await
        .unwrap()
        .into_response();

        assert_eq!(response.status(), StatusCode::CREATED);
    }

    #[tokio::test]
    async fn test_post_message_json_vs_redirect() {
        let state = app_state();
        let ticket = state
            .service
            .open_ticket("u1", "Printer broken", None, None)
            .unwrap();

        let response = post_message(
            State(state.clone()),
            user(),
            Path(ticket.id.clone()),
            json_headers(),
            Json(PostMessageRequest {
                content: "hello".to_string(),
            }),
        )
        .await
        .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = post_message(
            State(state),
            user(),
            Path(ticket.id),
            HeaderMap::new(),
            Json(PostMessageRequest {
                content: "again".to_string(),
            }),
        )
        .await
        .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
    }

    #[tokio::test]
    async fn test_change_status_requires_admin() {
        let state = app_state();
        let ticket = state
            .service
            .open_ticket("u1", "Printer broken", None, None)
            .unwrap();

        let result = change_status(
            State(state.clone()),
            user(),
            Path(ticket.id.clone()),
            Json(ChangeStatusRequest {
                status: "closed".to_string(),
            }),
        )
        .await;
        assert!(matches!(result, Err(ApiError::AdminRequired)));

        let result = change_status(
            State(state),
            admin(),
            Path(ticket.id),
            Json(ChangeStatusRequest {
                status: "closed".to_string(),
            }),
        )
        .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_change_status_rejects_unknown_value() {
        let state = app_state();
        let ticket = state
            .service
            .open_ticket("u1", "Printer broken", None, None)
            .unwrap();

        let result = change_status(
            State(state),
            admin(),
            Path(ticket.id),
            Json(ChangeStatusRequest {
                status: "solved".to_string(),
            }),
        )
        .await;
        assert!(matches!(
            result,
            Err(ApiError::Ticket(TicketError::Validation(_)))
        ));
    }

    #[tokio::test]
    async fn test_admin_listing_sees_all() {
        let state = app_state();
        state
            .service
            .open_ticket("u1", "Printer broken", None, None)
            .unwrap();
        state
            .service
            .open_ticket("u2", "Monitor flickers", None, None)
            .unwrap();

        let response = list_tickets(State(state.clone()), user()).await.into_response();
        assert_eq!(response.status(), StatusCode::OK);

        // Admin summaries span both users.
        assert_eq!(state.service.all_tickets().len(), 2);
        assert_eq!(state.service.tickets_for_user("u1").len(), 1);
    }

    #[test]
    fn test_error_status_codes() {
        let cases: Vec<(ApiError, StatusCode)> = vec![
            (
                ApiError::Ticket(TicketError::NotFound {
                    ticket_id: "t1".to_string(),
                }),
                StatusCode::NOT_FOUND,
            ),
            (
                ApiError::Ticket(TicketError::Validation("bad".to_string())),
                StatusCode::BAD_REQUEST,
            ),
            (
                ApiError::Ticket(TicketError::Forbidden("nope".to_string())),
                StatusCode::FORBIDDEN,
            ),
            (ApiError::Unauthorized, StatusCode::UNAUTHORIZED),
            (ApiError::AdminRequired, StatusCode::FORBIDDEN),
        ];

        for (error, expected) in cases {
            assert_eq!(error.into_response().status(), expected);
        }
    }
}
