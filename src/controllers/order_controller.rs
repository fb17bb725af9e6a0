use axum::{extract::Extension, http::StatusCode, response::Json};

use crate::{
    auth::CurrentUser,
    booking::OrderManager,
    error::BookingError,
    models::order_model::{OrderCreate, OrderResponse},
    SharedStore,
};

pub async fn load_orders(
    CurrentUser(user_id): CurrentUser,
    Extension(store): Extension<SharedStore>,
) -> Result<Json<Vec<OrderResponse>>, BookingError> {
    let orders = store.orders_for_user(user_id).await?;
    Ok(Json(orders.iter().map(OrderResponse::from).collect()))
}

pub async fn add_order(
    CurrentUser(user_id): CurrentUser,
    Extension(orders): Extension<OrderManager>,
    Json(order_data): Json<OrderCreate>,
) -> Result<(StatusCode, Json<OrderResponse>), BookingError> {
    let order = orders.create_order(user_id, &order_data.tickets).await?;
    Ok((StatusCode::CREATED, Json(OrderResponse::from(&order))))
}
