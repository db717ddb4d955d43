use actix_web::{HttpRequest, HttpResponse, post, web};
use serde::Deserialize;
use serde_json::json;
use tracing::info;
use vantage::handlers::validate_ping_request;
use vantage::{Assertion, Header, HttpMethod, MonitorSpec, MonitorStatus, Region, RunContext};

use super::replay;
use crate::error::AppError;
use crate::state::AppState;

macros_utils::routes! {
    route checker_route,
}

const PREFER_REGION_HEADER: &str = "fly-prefer-region";

/// A scheduled check of one monitor, run from this checker's region
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckerRequest {
    pub monitor_id: String,
    #[serde(default)]
    pub workspace_id: String,
    pub url: String,
    #[serde(default)]
    pub method: HttpMethod,
    #[serde(default)]
    pub headers: Vec<Header>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub timeout: Option<u64>,
    #[serde(default)]
    pub degraded_after: Option<u64>,
    #[serde(default)]
    pub assertions: Vec<Assertion>,
    #[serde(default)]
    pub status: MonitorStatus,
    pub cron_timestamp: i64,
}

impl CheckerRequest {
    fn into_spec(self, state: &AppState) -> (MonitorSpec, RunContext) {
        let mut spec = MonitorSpec::new(self.monitor_id, self.url, vec![state.region]);
        spec.workspace_id = self.workspace_id;
        spec.method = self.method;
        spec.headers = self.headers;
        spec.body = self.body;
        spec.timeout = self.timeout.unwrap_or(spec.timeout);
        spec.degraded_after = self.degraded_after;
        spec.assertions = self.assertions;
        spec.status = self.status;

        (spec, RunContext::at(self.cron_timestamp))
    }
}

/// Region the edge proxy was asked to run the request in, if any
fn preferred_region(request: &HttpRequest) -> Result<Option<Region>, AppError> {
    let Some(value) = request.headers().get(PREFER_REGION_HEADER) else {
        return Ok(None);
    };
    let value = value.to_str().map_err(|e| AppError::BadRequest(e.to_string()))?.trim();
    if value.is_empty() {
        return Ok(None);
    }

    value.parse().map(Some).map_err(|e: vantage::region::UnknownRegion| AppError::BadRequest(e.to_string()))
}

#[post("")]
pub async fn checker_route(
    state: web::Data<AppState>,
    request: HttpRequest,
    body: web::Json<CheckerRequest>,
) -> Result<HttpResponse, AppError> {
    state.authorize(&request)?;

    match preferred_region(&request)? {
        Some(region) if region != state.region => return Ok(replay(region, state.region)),
        _ => {}
    }

    let (spec, ctx) = body.into_inner().into_spec(&state);
    validate_ping_request(&spec.ping_request()).map_err(|e| AppError::BadRequest(e.to_string()))?;

    let report = state.runner().run(&spec, ctx).await?;
    info!(monitor_id = %spec.id, outcome = ?report.outcome, "Scheduled check handled");

    Ok(HttpResponse::Ok().json(json!({
        "message": "ok",
        "outcome": report.outcome,
        "transition": report.transition,
    })))
}
