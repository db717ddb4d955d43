use actix_web::{HttpRequest, HttpResponse, post, web};
use vantage::{PingRequest, Prober, Region};

use super::replay;
use crate::error::AppError;
use crate::state::AppState;

macros_utils::routes! {
    route ping_route,
}

/// Probe a target from this checker's region.
///
/// A request for another region is handed back to the edge proxy for replay
/// in that region instead of being probed here.
#[post("/{region}")]
pub async fn ping_route(
    state: web::Data<AppState>,
    request: HttpRequest,
    region: web::Path<String>,
    body: web::Json<PingRequest>,
) -> Result<HttpResponse, AppError> {
    state.authorize(&request)?;

    let region: Region = region.parse().map_err(|e: vantage::region::UnknownRegion| AppError::BadRequest(e.to_string()))?;
    if region != state.region {
        return Ok(replay(region, state.region));
    }

    let result = state.prober.probe(&body).await?;
    Ok(HttpResponse::Ok().json(result.to_response()))
}
