use actix_web::{HttpResponse, Responder, get, web};
use serde_json::json;

use crate::state::AppState;

macros_utils::routes! {
    route health_route,
}

/// Health check route, also tells which region answered
#[get("")]
pub async fn health_route(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(json!({ "message": "pong", "region": state.region }))
}
