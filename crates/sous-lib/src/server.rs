//! HTTP API for the recipe walker.
//!
//! Every endpoint answers with the current [`ViewSnapshot`]. CORS-permissive
//! so a browser page on another localhost port can drive it.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use tower_http::cors::CorsLayer;

use sous_core::error::SubmitError;
use sous_core::types::ViewSnapshot;

use crate::app::RecipeApp;

/// Build the axum router around a shared [`RecipeApp`].
pub fn router(app: RecipeApp) -> Router {
    Router::new()
        .route("/view", get(view))
        .route("/recipe", post(submit))
        .route("/next", post(next))
        .route("/previous", post(previous))
        .route("/repeat", post(repeat))
        .route("/start-over", post(start_over))
        .route("/dismiss", post(dismiss))
        .layer(CorsLayer::permissive())
        .with_state(app)
}

#[derive(serde::Deserialize)]
struct SubmitRequest {
    dish: String,
}

#[derive(serde::Serialize)]
struct Rejection {
    error: String,
    view: ViewSnapshot,
}

async fn view(State(app): State<RecipeApp>) -> Json<ViewSnapshot> {
    Json(app.snapshot())
}

async fn submit(
    State(app): State<RecipeApp>,
    Json(req): Json<SubmitRequest>,
) -> Result<Json<ViewSnapshot>, (StatusCode, Json<Rejection>)> {
    app.submit(&req.dish).await.map(Json).map_err(|e| {
        let status = match e {
            SubmitError::BlankDish => StatusCode::UNPROCESSABLE_ENTITY,
            SubmitError::Busy => StatusCode::CONFLICT,
        };
        (
            status,
            Json(Rejection {
                error: e.to_string(),
                view: app.snapshot(),
            }),
        )
    })
}

async fn next(State(app): State<RecipeApp>) -> Json<ViewSnapshot> {
    Json(app.next())
}

async fn previous(State(app): State<RecipeApp>) -> Json<ViewSnapshot> {
    Json(app.previous())
}

async fn repeat(State(app): State<RecipeApp>) -> Json<ViewSnapshot> {
    Json(app.repeat())
}

async fn start_over(State(app): State<RecipeApp>) -> Json<ViewSnapshot> {
    Json(app.start_over())
}

async fn dismiss(State(app): State<RecipeApp>) -> Json<ViewSnapshot> {
    Json(app.dismiss_error())
}
