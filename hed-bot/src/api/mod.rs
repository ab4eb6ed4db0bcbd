//! HTTP API handlers for hed-bot

pub mod health;
pub mod schema;
pub mod tagging;
pub mod ui;

pub use health::health_routes;
pub use schema::schema_routes;
pub use tagging::tagging_routes;
pub use ui::ui_routes;
