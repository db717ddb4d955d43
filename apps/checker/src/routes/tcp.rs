use actix_web::{HttpRequest, HttpResponse, post, web};
use vantage::{Region, TcpRequest};

use super::replay;
use crate::error::AppError;
use crate::state::AppState;

macros_utils::routes! {
    route tcp_route,
}

/// Open a TCP connection to a target from this checker's region
#[post("/{region}")]
pub async fn tcp_route(
    state: web::Data<AppState>,
    request: HttpRequest,
    region: web::Path<String>,
    body: web::Json<TcpRequest>,
) -> Result<HttpResponse, AppError> {
    state.authorize(&request)?;

    let region: Region = region.parse().map_err(|e: vantage::region::UnknownRegion| AppError::BadRequest(e.to_string()))?;
    if region != state.region {
        return Ok(replay(region, state.region));
    }

    let response = state.prober.check_tcp(&body).await?;
    Ok(HttpResponse::Ok().json(response))
}
