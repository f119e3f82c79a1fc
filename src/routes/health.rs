use crate::server::Server;
use axum::{Router, response::Json, routing::get};
use serde_json::{Value, json};

pub fn create_health_routes() -> Router<Server> {
    Router::new()
        .route("/health", get(health_check))
        .route("/health/", get(health_check))
}

async fn health_check() -> Json<Value> {
    Json(json!({"ok": true}))
}
