//! Administrative order endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use checkout::{CheckoutError, OrderPage};
use domain::{OrderStatus, OrderView, PageRequest, pagination::DEFAULT_PAGE_SIZE};
use serde::Deserialize;
use store::{OrderFilter, Storage};

use super::orders::parse_order_id;
use crate::auth::AdminUser;
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ListOrdersQuery {
    pub status: Option<String>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

/// GET /admin/orders?status=&page=&limit=
#[tracing::instrument(skip(state, _admin))]
pub async fn list<S: Storage>(
    State(state): State<Arc<AppState<S>>>,
    _admin: AdminUser,
    Query(query): Query<ListOrdersQuery>,
) -> Result<Json<OrderPage>, ApiError> {
    let mut filter = OrderFilter::new();
    if let Some(status) = query.status.as_deref().filter(|s| !s.is_empty()) {
        let status: OrderStatus = status.parse().map_err(CheckoutError::from)?;
        filter = filter.status(status);
    }

    let page = PageRequest::new(
        query.page.unwrap_or(1),
        query.limit.unwrap_or(DEFAULT_PAGE_SIZE),
    )
    .map_err(CheckoutError::from)?;

    let page = state.queries.list_all_orders(filter, page).await?;
    Ok(Json(page))
}

/// PATCH /admin/orders/{id}/status
#[tracing::instrument(skip(state, admin, req), fields(admin_id = %admin.0.user_id))]
pub async fn set_status<S: Storage>(
    State(state): State<Arc<AppState<S>>>,
    admin: AdminUser,
    Path(id): Path<String>,
    Json(req): Json<UpdateStatusRequest>,
) -> Result<Json<OrderView>, ApiError> {
    let order_id = parse_order_id(&id)?;
    let order = state.queries.set_order_status(order_id, &req.status).await?;
    Ok(Json(order))
}
