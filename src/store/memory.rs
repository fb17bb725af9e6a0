use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use async_trait::async_trait;
use mongodb::bson::oid::ObjectId;
use tokio::sync::RwLock;

use crate::models::{
    catalog_model::{Actor, Genre},
    hall_model::CinemaHall,
    movie_model::Movie,
    order_model::{Order, SeatKey, Ticket},
    session_model::MovieSession,
    user_model::User,
};

use super::{CinemaStore, SessionWrite, StoreError, StoreResult, StoreTransaction};

#[derive(Default)]
struct Tables {
    genres: Vec<Genre>,
    actors: Vec<Actor>,
    halls: Vec<CinemaHall>,
    movies: Vec<Movie>,
    sessions: Vec<MovieSession>,
    users: HashMap<ObjectId, User>,
    orders: Vec<Order>,
    tickets: Vec<Ticket>,
    /// Unique index over every committed ticket.
    seats: HashSet<SeatKey>,
}

impl Tables {
    fn sold_for(&self, session_id: ObjectId) -> bool {
        self.tickets.iter().any(|t| t.movie_session_id == session_id)
    }
}

fn by_ids<T: Clone>(items: &[T], ids: &[ObjectId], id_of: impl Fn(&T) -> ObjectId) -> Vec<T> {
    items
        .iter()
        .filter(|item| ids.contains(&id_of(item)))
        .cloned()
        .collect()
}

/// Process-local store used by the tests and for running without MongoDB.
///
/// Transactions read the shared tables and stage their writes; commit applies
/// them under a single write lock after checking the seat index, so a losing
/// writer fails with [`StoreError::UniqueViolation`]. Sessions read by a
/// transaction are compared again at commit and any change since the read
/// aborts it with [`StoreError::WriteConflict`].
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CinemaStore for MemoryStore {
    async fn insert_genre(&self, genre: &Genre) -> StoreResult<()> {
        self.tables.write().await.genres.push(genre.clone());
        Ok(())
    }

    async fn genres(&self) -> StoreResult<Vec<Genre>> {
        Ok(self.tables.read().await.genres.clone())
    }

    async fn genres_by_ids(&self, ids: &[ObjectId]) -> StoreResult<Vec<Genre>> {
        Ok(by_ids(&self.tables.read().await.genres, ids, |g| g.id))
    }

    async fn insert_actor(&self, actor: &Actor) -> StoreResult<()> {
        self.tables.write().await.actors.push(actor.clone());
        Ok(())
    }

    async fn actors(&self) -> StoreResult<Vec<Actor>> {
        Ok(self.tables.read().await.actors.clone())
    }

    async fn actors_by_ids(&self, ids: &[ObjectId]) -> StoreResult<Vec<Actor>> {
        Ok(by_ids(&self.tables.read().await.actors, ids, |a| a.id))
    }

    async fn insert_hall(&self, hall: &CinemaHall) -> StoreResult<()> {
        self.tables.write().await.halls.push(hall.clone());
        Ok(())
    }

    async fn halls(&self) -> StoreResult<Vec<CinemaHall>> {
        Ok(self.tables.read().await.halls.clone())
    }

    async fn halls_by_ids(&self, ids: &[ObjectId]) -> StoreResult<Vec<CinemaHall>> {
        Ok(by_ids(&self.tables.read().await.halls, ids, |h| h.id))
    }

    async fn hall(&self, id: ObjectId) -> StoreResult<Option<CinemaHall>> {
        let tables = self.tables.read().await;
        Ok(tables.halls.iter().find(|h| h.id == id).cloned())
    }

    async fn insert_movie(&self, movie: &Movie) -> StoreResult<()> {
        self.tables.write().await.movies.push(movie.clone());
        Ok(())
    }

    async fn movies(&self) -> StoreResult<Vec<Movie>> {
        Ok(self.tables.read().await.movies.clone())
    }

    async fn movies_by_ids(&self, ids: &[ObjectId]) -> StoreResult<Vec<Movie>> {
        Ok(by_ids(&self.tables.read().await.movies, ids, |m| m.id))
    }

    async fn movie(&self, id: ObjectId) -> StoreResult<Option<Movie>> {
        let tables = self.tables.read().await;
        Ok(tables.movies.iter().find(|m| m.id == id).cloned())
    }

    async fn insert_session(&self, session: &MovieSession) -> StoreResult<()> {
        self.tables.write().await.sessions.push(session.clone());
        Ok(())
    }

    async fn sessions(&self) -> StoreResult<Vec<MovieSession>> {
        let mut sessions = self.tables.read().await.sessions.clone();
        sessions.sort_by_key(|s| s.show_time);
        Ok(sessions)
    }

    async fn session(&self, id: ObjectId) -> StoreResult<Option<MovieSession>> {
        let tables = self.tables.read().await;
        Ok(tables.sessions.iter().find(|s| s.id == id).cloned())
    }

    async fn replace_session(&self, session: &MovieSession) -> StoreResult<SessionWrite> {
        let mut tables = self.tables.write().await;
        let sold = tables.sold_for(session.id);
        match tables.sessions.iter_mut().find(|s| s.id == session.id) {
            None => Ok(SessionWrite::Missing),
            Some(existing) if existing.cinema_hall_id != session.cinema_hall_id && sold => {
                Ok(SessionWrite::HasTickets)
            }
            Some(existing) => {
                *existing = session.clone();
                Ok(SessionWrite::Applied)
            }
        }
    }

    async fn delete_session(&self, id: ObjectId) -> StoreResult<SessionWrite> {
        let mut tables = self.tables.write().await;
        if !tables.sessions.iter().any(|s| s.id == id) {
            return Ok(SessionWrite::Missing);
        }
        if tables.sold_for(id) {
            return Ok(SessionWrite::HasTickets);
        }
        tables.sessions.retain(|s| s.id != id);
        Ok(SessionWrite::Applied)
    }

    async fn insert_user(&self, user: &User) -> StoreResult<()> {
        self.tables.write().await.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn user(&self, id: ObjectId) -> StoreResult<Option<User>> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn sold_counts(&self, session_ids: &[ObjectId]) -> StoreResult<HashMap<ObjectId, u64>> {
        let tables = self.tables.read().await;
        let mut counts = HashMap::new();
        for ticket in tables
            .tickets
            .iter()
            .filter(|t| session_ids.contains(&t.movie_session_id))
        {
            *counts.entry(ticket.movie_session_id).or_insert(0) += 1;
        }
        Ok(counts)
    }

    async fn session_tickets(&self, session_id: ObjectId) -> StoreResult<Vec<Ticket>> {
        let tables = self.tables.read().await;
        Ok(tables
            .tickets
            .iter()
            .filter(|t| t.movie_session_id == session_id)
            .cloned()
            .collect())
    }

    async fn orders_for_user(&self, user_id: ObjectId) -> StoreResult<Vec<Order>> {
        let tables = self.tables.read().await;
        let mut orders: Vec<Order> = tables
            .orders
            .iter()
            .filter(|o| o.user_id == user_id)
            .map(|order| Order {
                tickets: tables
                    .tickets
                    .iter()
                    .filter(|t| t.order_id == order.id)
                    .cloned()
                    .collect(),
                ..order.clone()
            })
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }

    async fn begin(&self) -> StoreResult<Box<dyn StoreTransaction>> {
        Ok(Box::new(MemoryTransaction {
            tables: Arc::clone(&self.tables),
            seen: HashMap::new(),
            staged: Vec::new(),
        }))
    }
}

struct MemoryTransaction {
    tables: Arc<RwLock<Tables>>,
    /// Session versions as first read by this transaction.
    seen: HashMap<ObjectId, MovieSession>,
    staged: Vec<Order>,
}

#[async_trait]
impl StoreTransaction for MemoryTransaction {
    async fn session(&mut self, id: ObjectId) -> StoreResult<Option<MovieSession>> {
        if let Some(session) = self.seen.get(&id) {
            return Ok(Some(session.clone()));
        }
        let tables = self.tables.read().await;
        let session = tables.sessions.iter().find(|s| s.id == id).cloned();
        if let Some(session) = &session {
            self.seen.insert(id, session.clone());
        }
        Ok(session)
    }

    async fn hall(&mut self, id: ObjectId) -> StoreResult<Option<CinemaHall>> {
        let tables = self.tables.read().await;
        Ok(tables.halls.iter().find(|h| h.id == id).cloned())
    }

    async fn user(&mut self, id: ObjectId) -> StoreResult<Option<User>> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn occupied(&mut self, seats: &[SeatKey]) -> StoreResult<Vec<SeatKey>> {
        let tables = self.tables.read().await;
        Ok(seats
            .iter()
            .filter(|key| tables.seats.contains(key))
            .copied()
            .collect())
    }

    async fn insert_order(&mut self, order: &Order) -> StoreResult<()> {
        self.staged.push(order.clone());
        Ok(())
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        let MemoryTransaction {
            tables,
            seen,
            staged,
        } = *self;
        let mut tables = tables.write().await;

        // Check the whole batch before touching anything.
        for session_id in staged
            .iter()
            .flat_map(|o| o.tickets.iter().map(|t| t.movie_session_id))
        {
            let current = tables.sessions.iter().find(|s| s.id == session_id);
            let unchanged = match (current, seen.get(&session_id)) {
                (Some(current), Some(read)) => current == read,
                (Some(_), None) => true,
                (None, _) => false,
            };
            if !unchanged {
                return Err(StoreError::WriteConflict);
            }
        }

        let mut batch = HashSet::new();
        for key in staged.iter().flat_map(|o| o.tickets.iter().map(Ticket::seat_key)) {
            if tables.seats.contains(&key) || !batch.insert(key) {
                return Err(StoreError::UniqueViolation { key: Some(key) });
            }
        }

        tables.seats.extend(batch);
        for mut order in staged {
            tables.tickets.append(&mut order.tickets);
            tables.orders.push(order);
        }
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> StoreResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn order_for(session: ObjectId, places: &[(u32, u32)]) -> Order {
        let id = ObjectId::new();
        Order {
            id,
            user_id: ObjectId::new(),
            created_at: Utc::now(),
            tickets: places
                .iter()
                .map(|&(row, seat)| Ticket {
                    id: ObjectId::new(),
                    movie_session_id: session,
                    order_id: id,
                    row,
                    seat,
                })
                .collect(),
        }
    }

    async fn stored_session(store: &MemoryStore) -> ObjectId {
        let session = MovieSession {
            id: ObjectId::new(),
            movie_id: ObjectId::new(),
            cinema_hall_id: ObjectId::new(),
            show_time: Utc::now(),
        };
        store.insert_session(&session).await.unwrap();
        session.id
    }

    #[tokio::test]
    async fn second_commit_for_same_seat_is_rejected() {
        let store = MemoryStore::new();
        let session = stored_session(&store).await;

        let mut first = store.begin().await.unwrap();
        let mut second = store.begin().await.unwrap();
        first.insert_order(&order_for(session, &[(1, 1)])).await.unwrap();
        second.insert_order(&order_for(session, &[(2, 2), (1, 1)])).await.unwrap();

        first.commit().await.unwrap();
        let err = second.commit().await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::UniqueViolation { key: Some(SeatKey { row: 1, seat: 1, .. }) }
        ));

        // The losing batch left nothing behind, not even its free seat.
        let counts = store.sold_counts(&[session]).await.unwrap();
        assert_eq!(counts.get(&session), Some(&1));
    }

    #[tokio::test]
    async fn rollback_discards_staged_orders() {
        let store = MemoryStore::new();
        let session = stored_session(&store).await;

        let mut txn = store.begin().await.unwrap();
        txn.insert_order(&order_for(session, &[(1, 1)])).await.unwrap();
        txn.rollback().await.unwrap();

        assert!(store.session_tickets(session).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn commit_fails_when_a_read_session_changed() {
        let store = MemoryStore::new();
        let session_id = stored_session(&store).await;

        let mut txn = store.begin().await.unwrap();
        let mut session = txn.session(session_id).await.unwrap().unwrap();
        session.cinema_hall_id = ObjectId::new();
        assert_eq!(store.replace_session(&session).await.unwrap(), SessionWrite::Applied);

        txn.insert_order(&order_for(session_id, &[(1, 1)])).await.unwrap();
        assert!(matches!(txn.commit().await, Err(StoreError::WriteConflict)));
        assert!(store.session_tickets(session_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn sold_session_keeps_hall_and_cannot_be_deleted() {
        let store = MemoryStore::new();
        let session_id = stored_session(&store).await;
        let mut txn = store.begin().await.unwrap();
        txn.insert_order(&order_for(session_id, &[(1, 1)])).await.unwrap();
        txn.commit().await.unwrap();

        let mut session = store.session(session_id).await.unwrap().unwrap();
        session.show_time = Utc::now();
        assert_eq!(store.replace_session(&session).await.unwrap(), SessionWrite::Applied);
        session.cinema_hall_id = ObjectId::new();
        assert_eq!(store.replace_session(&session).await.unwrap(), SessionWrite::HasTickets);
        assert_eq!(store.delete_session(session_id).await.unwrap(), SessionWrite::HasTickets);
        assert_eq!(store.delete_session(ObjectId::new()).await.unwrap(), SessionWrite::Missing);
    }
}
