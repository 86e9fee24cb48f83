//! Checkout and the caller's own orders.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::OrderId;
use domain::OrderView;
use store::Storage;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;

/// POST /orders: check out the caller's cart.
///
/// The orchestrator enforces the request deadline and answers 504 only after
/// any applied effects have been compensated.
#[tracing::instrument(skip(state), fields(user_id = %user.user_id))]
pub async fn checkout<S: Storage>(
    State(state): State<Arc<AppState<S>>>,
    user: AuthUser,
) -> Result<(StatusCode, Json<OrderView>), ApiError> {
    let order = state.checkout.checkout(user.user_id).await?;

    Ok((StatusCode::CREATED, Json(order)))
}

/// GET /orders: the caller's orders, newest first.
#[tracing::instrument(skip(state), fields(user_id = %user.user_id))]
pub async fn list<S: Storage>(
    State(state): State<Arc<AppState<S>>>,
    user: AuthUser,
) -> Result<Json<Vec<OrderView>>, ApiError> {
    let orders = state.queries.list_user_orders(user.user_id).await?;
    Ok(Json(orders))
}

/// GET /orders/{id}
#[tracing::instrument(skip(state), fields(user_id = %user.user_id))]
pub async fn get<S: Storage>(
    State(state): State<Arc<AppState<S>>>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<OrderView>, ApiError> {
    let order_id = parse_order_id(&id)?;
    let order = state.queries.get_order(user.user_id, order_id).await?;
    Ok(Json(order))
}

pub(crate) fn parse_order_id(id: &str) -> Result<OrderId, ApiError> {
    id.parse()
        .map_err(|e: common::IdError| ApiError::BadRequest(e.to_string()))
}
