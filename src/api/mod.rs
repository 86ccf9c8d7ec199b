//! API endpoint modules.

pub mod auth;
pub mod children;
pub mod health;
pub mod media;
pub mod openapi;
pub mod profiles;
pub mod reports;

pub use auth::configure_routes as configure_auth_routes;
pub use children::configure_routes as configure_child_routes;
pub use health::configure_health_routes;
pub use media::configure_routes as configure_media_routes;
pub use openapi::ApiDoc;
pub use profiles::configure_routes as configure_profile_routes;
pub use reports::configure_routes as configure_report_routes;
