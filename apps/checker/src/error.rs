use std::io::Error as IoError;

use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde_json::json;
use thiserror::Error;
use vantage::handlers::build_error_body;
use vantage::{ProbeError, ProbeErrorKind};

use crate::config::ConfigError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0:#}")]
    Io(#[from] IoError),
    #[error("Address parsing error: {0}")]
    AddrParse(#[from] std::net::AddrParseError),
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Missing or invalid bearer token")]
    Unauthorized,
    #[error("Invalid request: {0}")]
    BadRequest(String),
    #[error(transparent)]
    Probe(#[from] ProbeError),
    #[error("{0:#}")]
    Internal(#[from] anyhow::Error),
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Probe(error) if error.kind == ProbeErrorKind::InvalidRequest => StatusCode::BAD_REQUEST,
            AppError::Probe(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            AppError::Probe(error) => HttpResponse::build(self.status_code()).json(build_error_body(error.clone())),
            _ => HttpResponse::build(self.status_code()).json(json!({ "error": self.to_string() })),
        }
    }
}
