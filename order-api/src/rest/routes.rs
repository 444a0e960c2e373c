use axum::{
    Router,
    routing::{delete, get, post, put},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use super::handlers::{self, AppState};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Order API",
        version = "0.1.0",
        description = "REST API for order management. Orders are persisted in a key-value store with a set index for paginated listing.",
        license(name = "MIT")
    ),
    tags(
        (name = "system", description = "System information"),
        (name = "orders", description = "Order CRUD operations")
    ),
    paths(
        handlers::get_version,
        handlers::create_order,
        handlers::list_orders,
        handlers::get_order,
        handlers::update_order,
        handlers::delete_order,
    ),
    components(schemas(
        handlers::VersionInfo,
        handlers::ApiError,
        handlers::LineItem,
        handlers::Order,
        handlers::CreateOrderRequest,
        handlers::ListOrdersQuery,
        handlers::OrderPage,
        handlers::UpdateOrderRequest,
    ))
)]
pub struct ApiDoc;

pub fn create_router(state: Arc<AppState>) -> Router {
    let api_routes = Router::new()
        // System
        .route("/version", get(handlers::get_version))
        // Orders
        .route("/orders", get(handlers::list_orders))
        .route("/orders", post(handlers::create_order))
        .route("/orders/{id}", get(handlers::get_order))
        .route("/orders/{id}", put(handlers::update_order))
        .route("/orders/{id}", delete(handlers::delete_order));

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(api_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
