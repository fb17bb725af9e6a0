use std::collections::HashMap;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::Json,
};
use mongodb::bson::oid::ObjectId;

use crate::{
    auth::{require_staff, CurrentUser},
    availability::{annotate, seats_left},
    error::BookingError,
    models::{
        hall_model::HallResponse,
        movie_model::MovieResponse,
        session_model::{
            MovieSession, SessionCreate, SessionDetail, SessionListItem, SessionResponse,
            SessionUpdate, TakenPlace,
        },
    },
    store::{CinemaStore, SessionWrite},
    utils::{dedup_ids, parse_id},
    SharedStore,
};

async fn ensure_movie(store: &dyn CinemaStore, movie_id: ObjectId) -> Result<(), BookingError> {
    match store.movie(movie_id).await? {
        Some(_) => Ok(()),
        None => Err(BookingError::not_found("movie", movie_id)),
    }
}

async fn ensure_hall(store: &dyn CinemaStore, hall_id: ObjectId) -> Result<(), BookingError> {
    match store.hall(hall_id).await? {
        Some(_) => Ok(()),
        None => Err(BookingError::not_found("cinema hall", hall_id)),
    }
}

pub async fn load_sessions(
    _user: CurrentUser,
    Extension(store): Extension<SharedStore>,
) -> Result<Json<Vec<SessionListItem>>, BookingError> {
    let sessions = store.sessions().await?;
    let movie_ids = dedup_ids(sessions.iter().map(|s| s.movie_id).collect());
    let titles: HashMap<ObjectId, String> = store
        .movies_by_ids(&movie_ids)
        .await?
        .into_iter()
        .map(|movie| (movie.id, movie.title))
        .collect();

    let items = annotate(store.as_ref(), sessions)
        .await?
        .into_iter()
        .map(|entry| SessionListItem {
            id: entry.session.id,
            show_time: entry.session.show_time,
            movie_title: titles.get(&entry.session.movie_id).cloned(),
            cinema_hall_name: entry.hall.name.clone(),
            cinema_hall_capacity: entry.hall.capacity(),
            tickets_available: entry.tickets_available,
        })
        .collect();

    Ok(Json(items))
}

pub async fn fetch_session_by_id(
    _user: CurrentUser,
    Path(id_str): Path<String>,
    Extension(store): Extension<SharedStore>,
) -> Result<Json<SessionDetail>, BookingError> {
    let session_id = parse_id(&id_str)?;
    let session = store
        .session(session_id)
        .await?
        .ok_or_else(|| BookingError::not_found("movie session", session_id))?;
    let hall = store
        .hall(session.cinema_hall_id)
        .await?
        .ok_or_else(|| BookingError::not_found("cinema hall", session.cinema_hall_id))?;
    let movie = store.movie(session.movie_id).await?;

    let mut taken_places: Vec<TakenPlace> = store
        .session_tickets(session_id)
        .await?
        .iter()
        .map(|ticket| TakenPlace {
            row: ticket.row,
            seat: ticket.seat,
        })
        .collect();
    taken_places.sort();

    // One consistent snapshot: availability derives from the same tickets.
    let tickets_available = seats_left(&hall, taken_places.len() as u64)?;

    Ok(Json(SessionDetail {
        id: session.id,
        show_time: session.show_time,
        movie: movie.as_ref().map(MovieResponse::from),
        cinema_hall: HallResponse::from(&hall),
        tickets_available,
        taken_places,
    }))
}

pub async fn add_session(
    user: CurrentUser,
    Extension(store): Extension<SharedStore>,
    Json(session_data): Json<SessionCreate>,
) -> Result<(StatusCode, Json<SessionResponse>), BookingError> {
    require_staff(store.as_ref(), user).await?;
    ensure_movie(store.as_ref(), session_data.movie).await?;
    ensure_hall(store.as_ref(), session_data.cinema_hall).await?;

    let session = MovieSession {
        id: ObjectId::new(),
        movie_id: session_data.movie,
        cinema_hall_id: session_data.cinema_hall,
        show_time: session_data.show_time,
    };
    store.insert_session(&session).await?;
    tracing::info!(session = %session.id, hall = %session.cinema_hall_id, "movie session created");

    Ok((StatusCode::CREATED, Json(SessionResponse::from(&session))))
}

pub async fn update_session(
    user: CurrentUser,
    Path(id_str): Path<String>,
    Extension(store): Extension<SharedStore>,
    Json(session_data): Json<SessionUpdate>,
) -> Result<Json<SessionResponse>, BookingError> {
    require_staff(store.as_ref(), user).await?;
    let session_id = parse_id(&id_str)?;
    let mut session = store
        .session(session_id)
        .await?
        .ok_or_else(|| BookingError::not_found("movie session", session_id))?;

    if let Some(movie_id) = session_data.movie {
        ensure_movie(store.as_ref(), movie_id).await?;
        session.movie_id = movie_id;
    }

    if let Some(hall_id) = session_data.cinema_hall {
        if hall_id != session.cinema_hall_id {
            ensure_hall(store.as_ref(), hall_id).await?;
            session.cinema_hall_id = hall_id;
        }
    }

    if let Some(show_time) = session_data.show_time {
        session.show_time = show_time;
    }

    // Sold tickets were validated against the current hall; the store refuses
    // the move once any exist.
    match store.replace_session(&session).await? {
        SessionWrite::Applied => Ok(Json(SessionResponse::from(&session))),
        SessionWrite::HasTickets => Err(BookingError::SessionHasTickets(session_id)),
        SessionWrite::Missing => Err(BookingError::not_found("movie session", session_id)),
    }
}

pub async fn delete_session(
    user: CurrentUser,
    Path(id_str): Path<String>,
    Extension(store): Extension<SharedStore>,
) -> Result<StatusCode, BookingError> {
    require_staff(store.as_ref(), user).await?;
    let session_id = parse_id(&id_str)?;

    match store.delete_session(session_id).await? {
        SessionWrite::Applied => {
            tracing::info!(session = %session_id, "movie session deleted");
            Ok(StatusCode::NO_CONTENT)
        }
        SessionWrite::HasTickets => Err(BookingError::SessionHasTickets(session_id)),
        SessionWrite::Missing => Err(BookingError::not_found("movie session", session_id)),
    }
}
