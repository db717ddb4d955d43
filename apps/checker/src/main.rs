#![warn(clippy::all, clippy::pedantic)]

use std::net::SocketAddr;
use std::path::PathBuf;

use actix_web::{App, HttpServer, web};
use tracing::info;

mod config;
mod error;
mod routes;
mod state;

use config::CheckerConfig;
use error::AppError;
use logger::init_tracing;
use state::AppState;

#[actix_web::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config_path = std::env::var("CHECKER_CONFIG").ok().map(PathBuf::from);
    let config = CheckerConfig::load(config_path)?;
    info!("\n{config}");

    let state = web::Data::new(AppState::new(&config)?);
    let addr: SocketAddr = format!("{}:{}", config.server.bind, config.server.port).parse()?;
    run_server(addr, state).await
}

async fn run_server(addr: SocketAddr, state: web::Data<AppState>) -> Result<(), AppError> {
    info!(%addr, region = %state.region, "Starting checker");

    HttpServer::new(move || App::new().app_data(state.clone()).configure(routes::routes))
        .bind(addr)?
        .run()
        .await?;

    Ok(())
}
