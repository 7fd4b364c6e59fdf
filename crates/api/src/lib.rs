pub mod error;
pub mod extractors;
pub mod routes;
pub mod state;

use axum::{
    Router,
    http::HeaderValue,
    routing::{delete, get, patch, post},
};
use state::AppState;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect();
    if allowed.is_empty() {
        layer.allow_origin(Any)
    } else {
        layer.allow_origin(allowed)
    }
}

pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.settings.app.cors_origins);

    // Auth routes
    let auth_routes = Router::new()
        .route("/register", post(routes::auth::register))
        .route("/login", post(routes::auth::login))
        .route("/logout", post(routes::auth::logout))
        .route("/refresh", post(routes::auth::refresh))
        .route("/verify-email", post(routes::auth::verify_email))
        .route("/resend-verification", post(routes::auth::resend_verification))
        .route("/me", get(routes::auth::me));

    // Workspace routes
    let workspace_routes = Router::new()
        .route(
            "/",
            get(routes::workspace::list).post(routes::workspace::create),
        )
        .route(
            "/{workspace_id}",
            get(routes::workspace::get)
                .patch(routes::workspace::update)
                .delete(routes::workspace::delete),
        )
        .route("/{workspace_id}/member", get(routes::workspace::members))
        .route(
            "/{workspace_id}/invite",
            get(routes::invite::list_for_workspace).post(routes::invite::send),
        )
        .route("/{workspace_id}/invite/accept", post(routes::invite::accept));

    // Project routes (under workspace)
    let project_routes = Router::new()
        .route("/", get(routes::project::list).post(routes::project::create))
        .route(
            "/{project_id}",
            get(routes::project::get)
                .patch(routes::project::update)
                .delete(routes::project::delete),
        )
        .route(
            "/{project_id}/status",
            patch(routes::project::update_status),
        )
        .route(
            "/{project_id}/member",
            get(routes::project::members).post(routes::project::add_member),
        )
        .route(
            "/{project_id}/member/{user_id}",
            delete(routes::project::remove_member),
        );

    // Task routes (under workspace/project)
    let task_routes = Router::new()
        .route("/", get(routes::task::list).post(routes::task::create))
        .route(
            "/{task_id}",
            get(routes::task::get)
                .patch(routes::task::update)
                .delete(routes::task::delete),
        )
        .route("/{task_id}/status", post(routes::task::update_status))
        .route("/{task_id}/assign", post(routes::task::assign))
        .route(
            "/{task_id}/assign/{user_id}",
            delete(routes::task::unassign),
        );

    // Invites addressed to the caller
    let invite_routes = Router::new()
        .route("/", get(routes::invite::list_mine))
        .route("/{invite_id}/decline", post(routes::invite::decline));

    let api = Router::new()
        .nest("/auth", auth_routes)
        .nest("/workspace", workspace_routes)
        .nest("/workspace/{workspace_id}/project", project_routes)
        .nest(
            "/workspace/{workspace_id}/project/{project_id}/task",
            task_routes,
        )
        .nest("/invite", invite_routes);

    // Health check
    let health = Router::new().route("/health", get(health_check));

    Router::new()
        .nest("/api", api)
        .merge(health)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn health_check() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
