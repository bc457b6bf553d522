use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{StatusCode, header},
    response::IntoResponse,
    routing::{get, post},
};

use crate::{
    modules,
    web::{AppState, auth, storage},
};

const ROBOTS_TXT_BODY: &str = "User-agent: *\nDisallow: /\n";

pub fn build_router(state: AppState) -> Router {
    let body_limit = state.config().max_upload_bytes;

    let mut router = Router::new()
        .route("/sign-in", get(auth::sign_in_page))
        .route("/auth/google", get(auth::start_oauth))
        .route("/api/auth/callback", get(auth::oauth_callback))
        .route("/sign-out", post(auth::sign_out))
        .route("/unauthorized", get(auth::unauthorized_page))
        .route("/healthz", get(healthz))
        .route("/robots.txt", get(robots_txt))
        .merge(modules::newsletter::router());

    if state.storage().local().is_some() {
        router = router.route("/storage/*path", get(storage::serve_stored_object));
    }

    router
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

async fn robots_txt() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        ROBOTS_TXT_BODY,
    )
}

async fn healthz() -> impl IntoResponse {
    StatusCode::OK
}
