use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::auth::require_staff;
use crate::config::{create_cors_layer, create_security_headers_layer};
use crate::handlers;
use crate::state::AppState;

pub fn create_routes(state: AppState) -> Router {
    let staff_routes = Router::new()
        .route("/attendees", get(handlers::list_attendees))
        .route("/attendees/import", post(handlers::import_attendees))
        .route("/checkin/:id", get(handlers::resolve_scan))
        .route("/checkin/:id/entry", post(handlers::mark_entry))
        .route("/checkin/:id/food", post(handlers::mark_food_collected))
        .route("/checkin/:id/parking", post(handlers::mark_parking_validated))
        .route("/credentials/issue-all", post(handlers::issue_all_credentials))
        .route("/credentials/:id/issue", post(handlers::issue_credential))
        .route(
            "/notifications/send-pending",
            post(handlers::send_pending_notifications),
        )
        .route("/notifications/:id/send", post(handlers::send_notification))
        .route(
            "/notifications/:id/resend",
            post(handlers::resend_notification),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), require_staff));

    Router::new()
        .route("/health", get(handlers::health_check))
        .merge(staff_routes)
        .layer(create_security_headers_layer())
        .layer(create_cors_layer())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
