//! Persistence seam of the booking service.
//!
//! [`CinemaStore`] covers plain keyed catalog storage and the read queries the
//! availability engine needs. Order creation goes through a
//! [`StoreTransaction`] obtained from [`CinemaStore::begin`], which is where
//! the one-ticket-per-seat constraint is enforced.

use std::collections::HashMap;

use async_trait::async_trait;
use mongodb::bson::oid::ObjectId;

use crate::models::{
    catalog_model::{Actor, Genre},
    hall_model::CinemaHall,
    movie_model::Movie,
    order_model::{Order, SeatKey, Ticket},
    session_model::MovieSession,
    user_model::User,
};

mod memory;
mod mongo;

pub use memory::MemoryStore;
pub use mongo::MongoStore;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error(transparent)]
    Mongo(#[from] mongodb::error::Error),
    #[error(transparent)]
    Decode(#[from] mongodb::bson::de::Error),
    #[error(transparent)]
    Encode(#[from] mongodb::bson::ser::Error),
    /// The seat uniqueness constraint rejected a ticket. `key` is the
    /// offending place when the backend can tell which one it was.
    #[error("a ticket already exists for {key:?}")]
    UniqueViolation { key: Option<SeatKey> },
    /// The transaction lost a write race and was aborted.
    #[error("transaction aborted by a concurrent write")]
    WriteConflict,
}

/// Outcome of a guarded session write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionWrite {
    Applied,
    Missing,
    HasTickets,
}

#[async_trait]
pub trait CinemaStore: Send + Sync {
    async fn insert_genre(&self, genre: &Genre) -> StoreResult<()>;

    async fn genres(&self) -> StoreResult<Vec<Genre>>;

    async fn genres_by_ids(&self, ids: &[ObjectId]) -> StoreResult<Vec<Genre>>;

    async fn insert_actor(&self, actor: &Actor) -> StoreResult<()>;

    async fn actors(&self) -> StoreResult<Vec<Actor>>;

    async fn actors_by_ids(&self, ids: &[ObjectId]) -> StoreResult<Vec<Actor>>;

    async fn insert_hall(&self, hall: &CinemaHall) -> StoreResult<()>;

    async fn halls(&self) -> StoreResult<Vec<CinemaHall>>;

    async fn halls_by_ids(&self, ids: &[ObjectId]) -> StoreResult<Vec<CinemaHall>>;

    async fn hall(&self, id: ObjectId) -> StoreResult<Option<CinemaHall>>;

    async fn insert_movie(&self, movie: &Movie) -> StoreResult<()>;

    async fn movies(&self) -> StoreResult<Vec<Movie>>;

    async fn movies_by_ids(&self, ids: &[ObjectId]) -> StoreResult<Vec<Movie>>;

    async fn movie(&self, id: ObjectId) -> StoreResult<Option<Movie>>;

    async fn insert_session(&self, session: &MovieSession) -> StoreResult<()>;

    /// Sessions ordered by show time.
    async fn sessions(&self) -> StoreResult<Vec<MovieSession>>;

    async fn session(&self, id: ObjectId) -> StoreResult<Option<MovieSession>>;

    /// Overwrites the session's fields. Moving it to another hall only
    /// applies while no ticket has been sold for it; the check and the write
    /// are one atomic step with respect to order commits.
    async fn replace_session(&self, session: &MovieSession) -> StoreResult<SessionWrite>;

    /// Deletes the session unless tickets were sold for it.
    async fn delete_session(&self, id: ObjectId) -> StoreResult<SessionWrite>;

    async fn insert_user(&self, user: &User) -> StoreResult<()>;

    async fn user(&self, id: ObjectId) -> StoreResult<Option<User>>;

    /// Number of tickets sold per session. Sessions without tickets are absent.
    async fn sold_counts(&self, session_ids: &[ObjectId]) -> StoreResult<HashMap<ObjectId, u64>>;

    async fn session_tickets(&self, session_id: ObjectId) -> StoreResult<Vec<Ticket>>;

    /// The user's orders with their tickets, newest first.
    async fn orders_for_user(&self, user_id: ObjectId) -> StoreResult<Vec<Order>>;

    async fn begin(&self) -> StoreResult<Box<dyn StoreTransaction>>;
}

/// A unit of work that either commits entirely or leaves no trace.
///
/// Dropping a transaction without committing discards its writes.
#[async_trait]
pub trait StoreTransaction: Send {
    async fn session(&mut self, id: ObjectId) -> StoreResult<Option<MovieSession>>;

    async fn hall(&mut self, id: ObjectId) -> StoreResult<Option<CinemaHall>>;

    async fn user(&mut self, id: ObjectId) -> StoreResult<Option<User>>;

    /// The subset of `seats` already held by committed tickets.
    async fn occupied(&mut self, seats: &[SeatKey]) -> StoreResult<Vec<SeatKey>>;

    /// Stages the order and all of its tickets.
    ///
    /// Every session the tickets point at joins the transaction's write set,
    /// so a concurrent hall change or delete of that session makes the commit
    /// fail with [`StoreError::WriteConflict`].
    async fn insert_order(&mut self, order: &Order) -> StoreResult<()>;

    async fn commit(self: Box<Self>) -> StoreResult<()>;

    async fn rollback(self: Box<Self>) -> StoreResult<()>;
}
