use axum::{extract::Extension, http::StatusCode, response::Json};
use mongodb::bson::oid::ObjectId;

use crate::{
    auth::{require_staff, CurrentUser},
    error::BookingError,
    models::catalog_model::{Actor, ActorCreate, ActorResponse, Genre, GenreCreate, GenreResponse},
    SharedStore,
};

fn required(value: &str, field: &str) -> Result<String, BookingError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(BookingError::InvalidInput(format!("{field} must not be empty")));
    }
    Ok(value.to_owned())
}

pub async fn load_genres(
    _user: CurrentUser,
    Extension(store): Extension<SharedStore>,
) -> Result<Json<Vec<GenreResponse>>, BookingError> {
    let genres = store.genres().await?;
    Ok(Json(genres.iter().map(GenreResponse::from).collect()))
}

pub async fn add_genre(
    user: CurrentUser,
    Extension(store): Extension<SharedStore>,
    Json(genre_data): Json<GenreCreate>,
) -> Result<(StatusCode, Json<GenreResponse>), BookingError> {
    require_staff(store.as_ref(), user).await?;

    let genre = Genre {
        id: ObjectId::new(),
        name: required(&genre_data.name, "name")?,
    };
    store.insert_genre(&genre).await?;

    Ok((StatusCode::CREATED, Json(GenreResponse::from(&genre))))
}

pub async fn load_actors(
    _user: CurrentUser,
    Extension(store): Extension<SharedStore>,
) -> Result<Json<Vec<ActorResponse>>, BookingError> {
    let actors = store.actors().await?;
    Ok(Json(actors.iter().map(ActorResponse::from).collect()))
}

pub async fn add_actor(
    user: CurrentUser,
    Extension(store): Extension<SharedStore>,
    Json(actor_data): Json<ActorCreate>,
) -> Result<(StatusCode, Json<ActorResponse>), BookingError> {
    require_staff(store.as_ref(), user).await?;

    let actor = Actor {
        id: ObjectId::new(),
        first_name: required(&actor_data.first_name, "first_name")?,
        last_name: required(&actor_data.last_name, "last_name")?,
    };
    store.insert_actor(&actor).await?;

    Ok((StatusCode::CREATED, Json(ActorResponse::from(&actor))))
}
