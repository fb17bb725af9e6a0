//! Remaining capacity of movie sessions.
//!
//! A session's availability is its hall capacity minus the tickets sold for
//! it. The numbers here are a snapshot: booking on the strength of them
//! without going through [`crate::booking::OrderManager`] is racy.

use std::collections::HashMap;

use mongodb::bson::oid::ObjectId;

use crate::{
    error::BookingError,
    models::{hall_model::CinemaHall, session_model::MovieSession},
    store::CinemaStore,
};

/// A session together with its hall and the seats still for sale.
#[derive(Debug, Clone)]
pub struct SessionAvailability {
    pub session: MovieSession,
    pub hall: CinemaHall,
    pub tickets_available: u64,
}

/// Capacity left in `hall` once `sold` tickets are accounted for.
///
/// More tickets than seats means the seat constraint was bypassed somewhere,
/// which is reported as an internal error rather than clamped to zero.
pub fn seats_left(hall: &CinemaHall, sold: u64) -> Result<u64, BookingError> {
    hall.capacity().checked_sub(sold).ok_or_else(|| {
        tracing::error!(
            hall = %hall.id,
            capacity = hall.capacity(),
            sold,
            "more tickets sold than seats in hall"
        );
        BookingError::Internal(format!(
            "hall `{}` has {} seats but {sold} tickets were sold",
            hall.id,
            hall.capacity()
        ))
    })
}

#[tracing::instrument(skip(store))]
pub async fn available_seats(
    store: &dyn CinemaStore,
    session_id: ObjectId,
) -> Result<u64, BookingError> {
    let session = store
        .session(session_id)
        .await?
        .ok_or_else(|| BookingError::not_found("movie session", session_id))?;
    let hall = store
        .hall(session.cinema_hall_id)
        .await?
        .ok_or_else(|| BookingError::not_found("cinema hall", session.cinema_hall_id))?;

    let sold = store
        .sold_counts(&[session_id])
        .await?
        .get(&session_id)
        .copied()
        .unwrap_or(0);

    seats_left(&hall, sold)
}

/// Availability for many sessions at once, preserving their order.
///
/// Uses one sold-count query and one hall lookup for the whole batch.
pub async fn annotate(
    store: &dyn CinemaStore,
    sessions: Vec<MovieSession>,
) -> Result<Vec<SessionAvailability>, BookingError> {
    if sessions.is_empty() {
        return Ok(Vec::new());
    }

    let session_ids: Vec<ObjectId> = sessions.iter().map(|s| s.id).collect();
    let hall_ids = crate::utils::dedup_ids(sessions.iter().map(|s| s.cinema_hall_id).collect());

    let sold = store.sold_counts(&session_ids).await?;
    let halls: HashMap<ObjectId, CinemaHall> = store
        .halls_by_ids(&hall_ids)
        .await?
        .into_iter()
        .map(|hall| (hall.id, hall))
        .collect();

    sessions
        .into_iter()
        .map(|session| {
            let hall = halls
                .get(&session.cinema_hall_id)
                .cloned()
                .ok_or_else(|| BookingError::not_found("cinema hall", session.cinema_hall_id))?;
            let tickets_available = seats_left(&hall, sold.get(&session.id).copied().unwrap_or(0))?;
            Ok(SessionAvailability {
                session,
                hall,
                tickets_available,
            })
        })
        .collect()
}
