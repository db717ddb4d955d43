//! Small declarative helpers shared by the HTTP apps.

#[cfg(feature = "actix")]
#[doc(hidden)]
pub use actix_web;

/// Generate a `routes` function registering the listed actix services.
///
/// ```ignore
/// macros_utils::routes! {
///     route health_route,
/// }
/// ```
#[cfg(feature = "actix")]
#[macro_export]
macro_rules! routes {
    ($(route $route:ident),* $(,)?) => {
        pub fn routes(cfg: &mut $crate::actix_web::web::ServiceConfig) {
            $( cfg.service($route); )*
        }
    };
}
