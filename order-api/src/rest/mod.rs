//! REST surface for orders.

mod handlers;
mod routes;

pub use handlers::{ApiConfig, ApiError, AppState};
pub use routes::{ApiDoc, create_router};
