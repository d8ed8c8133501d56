//! Cart routes.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::api::{ApiError, ApiResult, AppJson, AppPath, AppState};
use crate::domain::aggregates::{Cart, CartItem, Coupon, CouponValidation};
use crate::domain::value_objects::{ProductId, UserId};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/carrito/:user_id", get(get_cart).post(add_item).put(replace_cart))
        .route("/carrito/:user_id/aplicar-cupon", post(apply_coupon))
        .route("/carrito/:user_id/:product_id", put(set_quantity).delete(remove_item))
}

#[derive(Debug, Deserialize)]
pub struct ReplaceCartRequest {
    #[serde(rename = "productos", default)]
    pub items: Vec<CartItem>,
    #[serde(rename = "cupon_aplicado", default)]
    pub coupon: Option<Coupon>,
}

#[derive(Debug, Deserialize)]
pub struct QuantityRequest {
    #[serde(rename = "cantidad")]
    pub quantity: u32,
}

#[derive(Debug, Deserialize)]
pub struct ApplyCouponRequest {
    #[serde(rename = "codigo")]
    pub code: String,
}

#[derive(Debug, Serialize)]
pub struct ApplyCouponResponse {
    #[serde(rename = "cupon")]
    pub coupon: Coupon,
}

async fn get_cart(State(s): State<AppState>, AppPath(user_id): AppPath<String>) -> ApiResult<Json<Cart>> {
    Ok(Json(s.carts.get_or_create(&UserId::new(user_id)).await?))
}

async fn add_item(State(s): State<AppState>, AppPath(user_id): AppPath<String>, AppJson(item): AppJson<CartItem>) -> ApiResult<Json<Vec<CartItem>>> {
    Ok(Json(s.carts.add_item(&UserId::new(user_id), item).await?))
}

async fn replace_cart(State(s): State<AppState>, AppPath(user_id): AppPath<String>, AppJson(r): AppJson<ReplaceCartRequest>) -> ApiResult<Json<Cart>> {
    Ok(Json(s.carts.replace(&UserId::new(user_id), r.items, r.coupon).await?))
}

async fn remove_item(State(s): State<AppState>, AppPath((user_id, product_id)): AppPath<(String, String)>) -> ApiResult<Json<Vec<CartItem>>> {
    Ok(Json(s.carts.remove_item(&UserId::new(user_id), &ProductId::new(product_id)).await?))
}

async fn set_quantity(
    State(s): State<AppState>,
    AppPath((user_id, product_id)): AppPath<(String, String)>,
    AppJson(r): AppJson<QuantityRequest>,
) -> ApiResult<Json<Vec<CartItem>>> {
    Ok(Json(s.carts.set_quantity(&UserId::new(user_id), &ProductId::new(product_id), r.quantity).await?))
}

async fn apply_coupon(State(s): State<AppState>, AppPath(user_id): AppPath<String>, AppJson(r): AppJson<ApplyCouponRequest>) -> ApiResult<Json<ApplyCouponResponse>> {
    match s.carts.apply_coupon(&UserId::new(user_id), &r.code).await? {
        CouponValidation::Valid(coupon) => Ok(Json(ApplyCouponResponse { coupon })),
        invalid => Err(ApiError::new(StatusCode::NOT_FOUND, "invalid_coupon", invalid.user_message())),
    }
}
