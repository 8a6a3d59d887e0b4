//! Small declarative helpers shared by the HTTP apps.

#[cfg(feature = "actix")]
#[doc(hidden)]
pub mod __private {
    pub use actix_web;
}

/// Declare a `routes` function registering handlers on an actix-web
/// `ServiceConfig`, in the order listed.
///
/// `route` entries are handler services (the structs generated by the
/// `#[get]`/`#[post]`/... attributes); `configure` entries are functions
/// taking `&mut ServiceConfig`, typically another module's `routes`.
///
/// ```ignore
/// macros_utils::routes! {
///     route health_route,
///     configure domains::routes,
/// }
/// ```
#[cfg(feature = "actix")]
#[macro_export]
macro_rules! routes {
    ($($kind:ident $item:path),* $(,)?) => {
        pub fn routes(cfg: &mut $crate::__private::actix_web::web::ServiceConfig) {
            $( $crate::routes!(@register cfg, $kind $item); )*
        }
    };
    (@register $cfg:ident, route $item:path) => {
        $cfg.service($item);
    };
    (@register $cfg:ident, configure $item:path) => {
        $cfg.configure($item);
    };
}
