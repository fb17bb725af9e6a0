use axum::{extract::Extension, http::StatusCode, response::Json};

use crate::{
    auth::{require_staff, CurrentUser},
    error::BookingError,
    models::hall_model::{CinemaHall, HallCreate, HallResponse},
    SharedStore,
};

pub async fn load_halls(
    _user: CurrentUser,
    Extension(store): Extension<SharedStore>,
) -> Result<Json<Vec<HallResponse>>, BookingError> {
    let halls = store.halls().await?;
    Ok(Json(halls.iter().map(HallResponse::from).collect()))
}

pub async fn add_hall(
    user: CurrentUser,
    Extension(store): Extension<SharedStore>,
    Json(hall_data): Json<HallCreate>,
) -> Result<(StatusCode, Json<HallResponse>), BookingError> {
    require_staff(store.as_ref(), user).await?;

    let name = hall_data.name.trim();
    if name.is_empty() {
        return Err(BookingError::InvalidInput("hall name must not be empty".to_owned()));
    }
    if hall_data.rows == 0 || hall_data.seats_in_row == 0 {
        return Err(BookingError::InvalidInput(
            "rows and seats_in_row must be at least 1".to_owned(),
        ));
    }

    let hall = CinemaHall::new(name, hall_data.rows, hall_data.seats_in_row);
    store.insert_hall(&hall).await?;
    tracing::info!(hall = %hall.id, capacity = hall.capacity(), "cinema hall created");

    Ok((StatusCode::CREATED, Json(HallResponse::from(&hall))))
}
