use actix_web::{HttpResponse, web};
use tracing::debug;
use vantage::Region;

mod checker;
mod health;
mod ping;
mod tcp;

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::scope("/health").configure(health::routes))
        .service(web::scope("/ping").configure(ping::routes))
        .service(web::scope("/tcp").configure(tcp::routes))
        .service(web::scope("/checker").configure(checker::routes));
}

/// Hand the request back to the edge proxy so it runs again in `region`
pub(crate) fn replay(region: Region, local: Region) -> HttpResponse {
    debug!(requested = %region, %local, "Replaying request in another region");
    HttpResponse::Accepted().insert_header(("fly-replay", format!("region={region}"))).finish()
}

#[cfg(test)]
pub(crate) mod testing {
    use actix_web::web;

    use crate::config::CheckerConfig;
    use crate::state::AppState;

    pub fn state(secret: Option<&str>) -> web::Data<AppState> {
        let mut config = CheckerConfig::default();
        config.checker.secret = secret.map(str::to_string);
        web::Data::new(AppState::new(&config).unwrap())
    }

    pub const SECRET: &str = "s3cret";

    pub fn bearer() -> (&'static str, String) {
        ("Authorization", format!("Bearer {SECRET}"))
    }
}
