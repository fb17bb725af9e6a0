use std::collections::HashSet;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::Json,
};
use mongodb::bson::oid::ObjectId;

use crate::{
    auth::{require_staff, CurrentUser},
    error::BookingError,
    models::{
        catalog_model::{ActorResponse, GenreResponse},
        movie_model::{Movie, MovieCreate, MovieDetail, MovieResponse},
    },
    utils::{dedup_ids, parse_id},
    SharedStore,
};

/// First id of `wanted` missing from `found`, if any.
fn first_missing(wanted: &[ObjectId], found: impl Iterator<Item = ObjectId>) -> Option<ObjectId> {
    let found: HashSet<ObjectId> = found.collect();
    wanted.iter().find(|id| !found.contains(id)).copied()
}

pub async fn load_movies(
    _user: CurrentUser,
    Extension(store): Extension<SharedStore>,
) -> Result<Json<Vec<MovieResponse>>, BookingError> {
    let movies = store.movies().await?;
    Ok(Json(movies.iter().map(MovieResponse::from).collect()))
}

pub async fn load_movie_with_details(
    _user: CurrentUser,
    Path(id_str): Path<String>,
    Extension(store): Extension<SharedStore>,
) -> Result<Json<MovieDetail>, BookingError> {
    let movie_id = parse_id(&id_str)?;
    let movie = store
        .movie(movie_id)
        .await?
        .ok_or_else(|| BookingError::not_found("movie", movie_id))?;

    let genres = store.genres_by_ids(&movie.genres).await?;
    let actors = store.actors_by_ids(&movie.actors).await?;

    Ok(Json(MovieDetail {
        id: movie.id,
        title: movie.title,
        description: movie.description,
        duration: movie.duration,
        genres: genres.iter().map(GenreResponse::from).collect(),
        actors: actors.iter().map(ActorResponse::from).collect(),
    }))
}

pub async fn add_movie(
    user: CurrentUser,
    Extension(store): Extension<SharedStore>,
    Json(movie_data): Json<MovieCreate>,
) -> Result<(StatusCode, Json<MovieResponse>), BookingError> {
    require_staff(store.as_ref(), user).await?;

    let title = movie_data.title.trim();
    if title.is_empty() {
        return Err(BookingError::InvalidInput("title must not be empty".to_owned()));
    }

    let genres = dedup_ids(movie_data.genres);
    let actors = dedup_ids(movie_data.actors);

    let known_genres = store.genres_by_ids(&genres).await?;
    if let Some(missing) = first_missing(&genres, known_genres.iter().map(|g| g.id)) {
        return Err(BookingError::not_found("genre", missing));
    }
    let known_actors = store.actors_by_ids(&actors).await?;
    if let Some(missing) = first_missing(&actors, known_actors.iter().map(|a| a.id)) {
        return Err(BookingError::not_found("actor", missing));
    }

    let movie = Movie {
        id: ObjectId::new(),
        title: title.to_owned(),
        description: movie_data.description,
        duration: movie_data.duration,
        genres,
        actors,
    };
    store.insert_movie(&movie).await?;
    tracing::info!(movie = %movie.id, "movie created");

    Ok((StatusCode::CREATED, Json(MovieResponse::from(&movie))))
}
