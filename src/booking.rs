//! Atomic order creation.
//!
//! [`OrderManager::create_order`] validates every requested ticket and writes
//! the order inside one [`StoreTransaction`]. Its own checks only reject bad
//! requests early: two racing orders for the same place are separated by the
//! store's seat uniqueness constraint at write or commit time.

use std::{
    collections::{hash_map::Entry, HashMap, HashSet},
    sync::Arc,
};

use chrono::Utc;
use mongodb::bson::oid::ObjectId;

use crate::{
    error::BookingError,
    models::{
        hall_model::CinemaHall,
        order_model::{Order, SeatKey, Ticket, TicketRequest},
    },
    store::{CinemaStore, StoreTransaction},
};

#[derive(Clone)]
pub struct OrderManager {
    store: Arc<dyn CinemaStore>,
}

impl OrderManager {
    pub fn new(store: Arc<dyn CinemaStore>) -> Self {
        Self { store }
    }

    /// Books every requested place for `user_id` as a single order, or
    /// nothing at all.
    ///
    /// Tickets of the returned order follow the order of `requests`.
    #[tracing::instrument(skip(self, requests), fields(user = %user_id, tickets = requests.len()))]
    pub async fn create_order(
        &self,
        user_id: ObjectId,
        requests: &[TicketRequest],
    ) -> Result<Order, BookingError> {
        if requests.is_empty() {
            return Err(BookingError::EmptyOrder);
        }

        let mut txn = self.store.begin().await?;

        match stage_order(txn.as_mut(), user_id, requests).await {
            Ok(order) => {
                txn.commit().await.map_err(|err| {
                    tracing::warn!(error = %err, "order commit rejected");
                    BookingError::from(err)
                })?;
                tracing::info!(order = %order.id, "order created");
                Ok(order)
            }
            Err(err) => {
                if let Err(rollback_err) = txn.rollback().await {
                    tracing::warn!(error = %rollback_err, "failed to roll back order transaction");
                }
                tracing::debug!(error = %err, "order rejected");
                Err(err)
            }
        }
    }
}

async fn stage_order(
    txn: &mut dyn StoreTransaction,
    user_id: ObjectId,
    requests: &[TicketRequest],
) -> Result<Order, BookingError> {
    if txn.user(user_id).await?.is_none() {
        return Err(BookingError::not_found("user", user_id));
    }

    let mut halls: HashMap<ObjectId, CinemaHall> = HashMap::new();
    let mut requested = HashSet::with_capacity(requests.len());
    let mut seats = Vec::with_capacity(requests.len());

    for request in requests {
        let hall = match halls.entry(request.movie_session) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let hall = session_hall(txn, request.movie_session).await?;
                entry.insert(hall)
            }
        };

        if !hall.contains_seat(request.row, request.seat) {
            return Err(BookingError::SeatOutOfRange {
                row: request.row,
                seat: request.seat,
                rows: hall.rows,
                seats_in_row: hall.seats_in_row,
            });
        }

        let key = request.seat_key();
        if !requested.insert(key) {
            return Err(BookingError::DuplicateSeatInRequest {
                movie_session: key.movie_session_id,
                row: key.row,
                seat: key.seat,
            });
        }
        seats.push(key);
    }

    if let Some(taken) = txn.occupied(&seats).await?.first() {
        return Err(BookingError::SeatTaken {
            movie_session: taken.movie_session_id,
            row: taken.row,
            seat: taken.seat,
        });
    }

    let order = build_order(user_id, &seats);
    txn.insert_order(&order).await?;
    Ok(order)
}

async fn session_hall(
    txn: &mut dyn StoreTransaction,
    session_id: ObjectId,
) -> Result<CinemaHall, BookingError> {
    let session = txn
        .session(session_id)
        .await?
        .ok_or_else(|| BookingError::not_found("movie session", session_id))?;
    txn.hall(session.cinema_hall_id)
        .await?
        .ok_or_else(|| BookingError::not_found("cinema hall", session.cinema_hall_id))
}

fn build_order(user_id: ObjectId, seats: &[SeatKey]) -> Order {
    let id = ObjectId::new();
    Order {
        id,
        user_id,
        created_at: Utc::now(),
        tickets: seats
            .iter()
            .map(|key| Ticket {
                id: ObjectId::new(),
                movie_session_id: key.movie_session_id,
                order_id: id,
                row: key.row,
                seat: key.seat,
            })
            .collect(),
    }
}
