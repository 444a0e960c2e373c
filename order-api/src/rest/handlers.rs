use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::audit::OrderAuditLogger;
use crate::ids::IdGenerator;
use crate::model;
use crate::store::{Deadline, FindAllPage, OrderStore, StoreError};

/// Tunables for the REST layer
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Deadline applied to every store call made for a request
    pub request_timeout: Duration,
    /// Page size used when the client sends none
    pub default_page_size: u64,
    /// Largest page size a client may ask for
    pub max_page_size: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(5),
            default_page_size: 50,
            max_page_size: 500,
        }
    }
}

/// Shared application state
pub struct AppState {
    pub store: Arc<dyn OrderStore>,
    pub ids: Arc<dyn IdGenerator>,
    pub audit: Arc<OrderAuditLogger>,
    pub config: ApiConfig,
}

impl AppState {
    fn deadline(&self) -> Deadline {
        Deadline::after(self.config.request_timeout)
    }
}

/// API error response
#[derive(Debug, Serialize, ToSchema)]
pub struct ApiError {
    pub error: String,
    pub code: u32,
}

impl ApiError {
    fn bad_request(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: 400,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.code {
            404 => StatusCode::NOT_FOUND,
            409 => StatusCode::CONFLICT,
            400 => StatusCode::BAD_REQUEST,
            503 => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        let code = match &e {
            StoreError::NotFound { .. } => 404,
            StoreError::AlreadyExists { .. } => 409,
            StoreError::Cancelled { .. } => 503,
            StoreError::Encoding { .. }
            | StoreError::CorruptRecord { .. }
            | StoreError::Unavailable { .. } => 500,
        };
        if code >= 500 {
            warn!("Order store failure: {}", e);
        }
        ApiError {
            error: e.to_string(),
            code,
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(e: JsonRejection) -> Self {
        ApiError::bad_request(e.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(e: PathRejection) -> Self {
        ApiError::bad_request(e.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(e: QueryRejection) -> Self {
        ApiError::bad_request(e.body_text())
    }
}

// === Version ===

/// Version information
#[derive(Serialize, ToSchema)]
pub struct VersionInfo {
    pub version: String,
}

/// Get service version
#[utoipa::path(
    get,
    path = "/version",
    responses(
        (status = 200, description = "Service version", body = VersionInfo)
    ),
    tag = "system"
)]
pub async fn get_version() -> Json<VersionInfo> {
    Json(VersionInfo {
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// === Orders ===

/// Line item of an order
#[derive(Serialize, Deserialize, ToSchema)]
pub struct LineItem {
    pub item_id: String,
    pub quantity: u32,
    /// Unit price in minor currency units (default: 0)
    #[serde(default)]
    pub price: u64,
}

impl From<LineItem> for model::LineItem {
    fn from(item: LineItem) -> Self {
        Self {
            item_id: item.item_id,
            quantity: item.quantity,
            price: item.price,
        }
    }
}

impl From<model::LineItem> for LineItem {
    fn from(item: model::LineItem) -> Self {
        Self {
            item_id: item.item_id,
            quantity: item.quantity,
            price: item.price,
        }
    }
}

/// Order resource
#[derive(Serialize, ToSchema)]
pub struct Order {
    pub order_id: u64,
    pub customer_id: Uuid,
    pub line_items: Vec<LineItem>,
    pub created_at: Option<DateTime<Utc>>,
}

impl From<model::Order> for Order {
    fn from(order: model::Order) -> Self {
        Self {
            order_id: order.order_id,
            customer_id: order.customer_id,
            line_items: order.line_items.into_iter().map(Into::into).collect(),
            created_at: order.created_at,
        }
    }
}

/// Request to create an order
#[derive(Deserialize, ToSchema)]
pub struct CreateOrderRequest {
    pub customer_id: Uuid,
    pub line_items: Vec<LineItem>,
}

/// Create a new order
#[utoipa::path(
    post,
    path = "/orders",
    request_body = CreateOrderRequest,
    responses(
        (status = 201, description = "Order created", body = Order),
        (status = 400, description = "Malformed request body", body = ApiError),
        (status = 409, description = "Order ID already taken", body = ApiError)
    ),
    tag = "orders"
)]
pub async fn create_order(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CreateOrderRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Order>), ApiError> {
    let Json(req) = payload?;

    let order = model::Order {
        order_id: state.ids.next_id(),
        customer_id: req.customer_id,
        line_items: req.line_items.into_iter().map(Into::into).collect(),
        created_at: Some(Utc::now()),
    };

    let deadline = state.deadline();
    state.store.insert(&order, deadline.token()).await?;
    state.audit.order_created(
        order.order_id,
        &order.customer_id.to_string(),
        order.line_items.len(),
    );
    Ok((StatusCode::CREATED, Json(order.into())))
}

/// Query parameters for list orders
#[derive(Deserialize, ToSchema)]
pub struct ListOrdersQuery {
    /// Cursor from the previous page (default: 0, start of the listing)
    pub cursor: Option<u64>,
    /// Number of index entries to visit (default: server configured)
    pub size: Option<u64>,
}

/// One page of orders
#[derive(Serialize, ToSchema)]
pub struct OrderPage {
    pub items: Vec<Order>,
    /// Cursor for the next page, 0 once the listing is complete
    pub next: u64,
}

/// List orders page by page
#[utoipa::path(
    get,
    path = "/orders",
    params(
        ("cursor" = Option<u64>, Query, description = "Cursor from the previous page"),
        ("size" = Option<u64>, Query, description = "Number of index entries to visit")
    ),
    responses(
        (status = 200, description = "One page of orders", body = OrderPage),
        (status = 400, description = "Invalid page size or cursor", body = ApiError)
    ),
    tag = "orders"
)]
pub async fn list_orders(
    State(state): State<Arc<AppState>>,
    query: Result<Query<ListOrdersQuery>, QueryRejection>,
) -> Result<Json<OrderPage>, ApiError> {
    let Query(query) = query?;

    let size = query.size.unwrap_or(state.config.default_page_size);
    if size == 0 || size > state.config.max_page_size {
        return Err(ApiError::bad_request(format!(
            "size must be between 1 and {}",
            state.config.max_page_size
        )));
    }

    let page = FindAllPage {
        size,
        offset: query.cursor.unwrap_or(0),
    };
    let deadline = state.deadline();
    let results = state.store.find_all(page, deadline.token()).await?;

    Ok(Json(OrderPage {
        items: results.orders.into_iter().map(Into::into).collect(),
        next: results.cursor,
    }))
}

/// Get an order by ID
#[utoipa::path(
    get,
    path = "/orders/{id}",
    params(
        ("id" = u64, Path, description = "Order ID")
    ),
    responses(
        (status = 200, description = "Order found", body = Order),
        (status = 400, description = "Invalid order ID", body = ApiError),
        (status = 404, description = "Order not found", body = ApiError)
    ),
    tag = "orders"
)]
pub async fn get_order(
    State(state): State<Arc<AppState>>,
    id: Result<Path<u64>, PathRejection>,
) -> Result<Json<Order>, ApiError> {
    let Path(id) = id?;
    let deadline = state.deadline();
    let order = state.store.find_by_id(id, deadline.token()).await?;
    Ok(Json(order.into()))
}

/// Request to replace an order
#[derive(Deserialize, ToSchema)]
pub struct UpdateOrderRequest {
    pub customer_id: Uuid,
    /// Line items (replaces existing)
    pub line_items: Vec<LineItem>,
}

/// Replace an order
///
/// The creation timestamp is kept from the stored order.
#[utoipa::path(
    put,
    path = "/orders/{id}",
    params(
        ("id" = u64, Path, description = "Order ID")
    ),
    request_body = UpdateOrderRequest,
    responses(
        (status = 200, description = "Order updated", body = Order),
        (status = 400, description = "Invalid order ID or body", body = ApiError),
        (status = 404, description = "Order not found", body = ApiError)
    ),
    tag = "orders"
)]
pub async fn update_order(
    State(state): State<Arc<AppState>>,
    id: Result<Path<u64>, PathRejection>,
    payload: Result<Json<UpdateOrderRequest>, JsonRejection>,
) -> Result<Json<Order>, ApiError> {
    let Path(id) = id?;
    let Json(req) = payload?;

    let deadline = state.deadline();
    let existing = state.store.find_by_id(id, deadline.token()).await?;
    let order = model::Order {
        order_id: id,
        customer_id: req.customer_id,
        line_items: req.line_items.into_iter().map(Into::into).collect(),
        created_at: existing.created_at,
    };

    state.store.update(&order, deadline.token()).await?;
    state.audit.order_updated(id);
    Ok(Json(order.into()))
}

/// Delete an order
#[utoipa::path(
    delete,
    path = "/orders/{id}",
    params(
        ("id" = u64, Path, description = "Order ID")
    ),
    responses(
        (status = 204, description = "Order deleted"),
        (status = 400, description = "Invalid order ID", body = ApiError),
        (status = 404, description = "Order not found", body = ApiError)
    ),
    tag = "orders"
)]
pub async fn delete_order(
    State(state): State<Arc<AppState>>,
    id: Result<Path<u64>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(id) = id?;
    let deadline = state.deadline();
    state.store.delete_by_id(id, deadline.token()).await?;
    state.audit.order_deleted(id);
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::KvError;

    #[test]
    fn store_errors_map_to_status_codes() {
        let cases = [
            (
                StoreError::AlreadyExists {
                    op: "insert",
                    key: "order:1".to_string(),
                },
                409,
            ),
            (
                StoreError::NotFound {
                    op: "find_by_id",
                    key: "order:1".to_string(),
                },
                404,
            ),
            (
                StoreError::CorruptRecord {
                    op: "find_all",
                    key: "order:1".to_string(),
                    reason: "indexed record is missing".to_string(),
                },
                500,
            ),
            (
                StoreError::Unavailable {
                    op: "update",
                    source: KvError::Backend("down".to_string()),
                },
                500,
            ),
            (StoreError::Cancelled { op: "delete_by_id" }, 503),
        ];

        for (err, code) in cases {
            let api: ApiError = err.into();
            assert_eq!(api.code, code, "{}", api.error);
        }
    }

    #[test]
    fn api_error_status() {
        let resp = ApiError::bad_request("nope").into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp = ApiError {
            error: "gone".to_string(),
            code: 404,
        }
        .into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
