use std::collections::HashMap;

use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{
    bson::{doc, from_document, oid::ObjectId, DateTime as BsonDateTime, Document},
    error::{Error as MongoError, ErrorKind, WriteFailure, TRANSIENT_TRANSACTION_ERROR},
    options::{
        Acknowledgment, ClientOptions, FindOptions, IndexOptions, ReadConcern,
        TransactionOptions, WriteConcern,
    },
    Client, ClientSession, Collection, Database, IndexModel,
};
use serde::{de::DeserializeOwned, Deserialize};

use crate::models::{
    catalog_model::{Actor, Genre},
    hall_model::CinemaHall,
    movie_model::Movie,
    order_model::{Order, SeatKey, Ticket},
    session_model::MovieSession,
    user_model::User,
};

use super::{CinemaStore, SessionWrite, StoreError, StoreResult, StoreTransaction};

const DUPLICATE_KEY: i32 = 11000;

const GENRES: &str = "genres";
const ACTORS: &str = "actors";
const HALLS: &str = "halls";
const MOVIES: &str = "movies";
const SESSIONS: &str = "sessions";
const USERS: &str = "users";
const ORDERS: &str = "orders";
const TICKETS: &str = "tickets";

/// Counter kept on session documents. Orders bump it inside their
/// transaction, which puts the session in the order's write set.
const TICKETS_SOLD: &str = "tickets_sold";

#[derive(Clone)]
pub struct MongoStore {
    client: Client,
    db: Database,
}

impl MongoStore {
    /// Connects, pings the deployment and makes sure the indexes exist.
    pub async fn connect(uri: &str, database: &str) -> StoreResult<Self> {
        let client_options = ClientOptions::parse(uri).await?;
        let client = Client::with_options(client_options)?;
        let db = client.database(database);

        db.run_command(doc! {"ping": 1}, None).await?;
        tracing::info!(database, "connected to MongoDB");

        let store = Self { client, db };
        store.ensure_indexes().await?;
        Ok(store)
    }

    async fn ensure_indexes(&self) -> StoreResult<()> {
        let seat_index = IndexModel::builder()
            .keys(doc! {"movie_session_id": 1, "row": 1, "seat": 1})
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name("unique_seat_per_session".to_owned())
                    .build(),
            )
            .build();
        let tickets = self.db.collection::<Ticket>(TICKETS);
        tickets.create_index(seat_index, None).await?;
        tickets
            .create_index(IndexModel::builder().keys(doc! {"order_id": 1}).build(), None)
            .await?;
        self.db
            .collection::<Order>(ORDERS)
            .create_index(IndexModel::builder().keys(doc! {"user_id": 1}).build(), None)
            .await?;
        Ok(())
    }

    /// Tells apart why a guarded session write matched nothing.
    async fn guarded_miss(&self, id: ObjectId) -> StoreResult<SessionWrite> {
        let existing: Option<MovieSession> = self.find_by_id(SESSIONS, id).await?;
        Ok(match existing {
            Some(_) => SessionWrite::HasTickets,
            None => SessionWrite::Missing,
        })
    }

    fn collection<T: Send + Sync>(&self, name: &str) -> Collection<T> {
        self.db.collection(name)
    }

    async fn find_all<T>(&self, name: &str, filter: Document) -> StoreResult<Vec<T>>
    where
        T: DeserializeOwned + Unpin + Send + Sync,
    {
        let cursor = self.collection::<T>(name).find(filter, None).await?;
        Ok(cursor.try_collect().await?)
    }

    async fn find_by_id<T>(&self, name: &str, id: ObjectId) -> StoreResult<Option<T>>
    where
        T: DeserializeOwned + Unpin + Send + Sync,
    {
        Ok(self.collection::<T>(name).find_one(doc! {"_id": id}, None).await?)
    }

    async fn insert<T>(&self, name: &str, item: &T) -> StoreResult<()>
    where
        T: serde::Serialize + Send + Sync,
    {
        self.collection::<T>(name).insert_one(item, None).await?;
        Ok(())
    }
}

#[derive(Deserialize)]
struct SoldCount {
    #[serde(rename = "_id")]
    session_id: ObjectId,
    sold: i64,
}

#[async_trait]
impl CinemaStore for MongoStore {
    async fn insert_genre(&self, genre: &Genre) -> StoreResult<()> {
        self.insert(GENRES, genre).await
    }

    async fn genres(&self) -> StoreResult<Vec<Genre>> {
        self.find_all(GENRES, doc! {}).await
    }

    async fn genres_by_ids(&self, ids: &[ObjectId]) -> StoreResult<Vec<Genre>> {
        self.find_all(GENRES, doc! {"_id": {"$in": ids}}).await
    }

    async fn insert_actor(&self, actor: &Actor) -> StoreResult<()> {
        self.insert(ACTORS, actor).await
    }

    async fn actors(&self) -> StoreResult<Vec<Actor>> {
        self.find_all(ACTORS, doc! {}).await
    }

    async fn actors_by_ids(&self, ids: &[ObjectId]) -> StoreResult<Vec<Actor>> {
        self.find_all(ACTORS, doc! {"_id": {"$in": ids}}).await
    }

    async fn insert_hall(&self, hall: &CinemaHall) -> StoreResult<()> {
        self.insert(HALLS, hall).await
    }

    async fn halls(&self) -> StoreResult<Vec<CinemaHall>> {
        self.find_all(HALLS, doc! {}).await
    }

    async fn halls_by_ids(&self, ids: &[ObjectId]) -> StoreResult<Vec<CinemaHall>> {
        self.find_all(HALLS, doc! {"_id": {"$in": ids}}).await
    }

    async fn hall(&self, id: ObjectId) -> StoreResult<Option<CinemaHall>> {
        self.find_by_id(HALLS, id).await
    }

    async fn insert_movie(&self, movie: &Movie) -> StoreResult<()> {
        self.insert(MOVIES, movie).await
    }

    async fn movies(&self) -> StoreResult<Vec<Movie>> {
        self.find_all(MOVIES, doc! {}).await
    }

    async fn movies_by_ids(&self, ids: &[ObjectId]) -> StoreResult<Vec<Movie>> {
        self.find_all(MOVIES, doc! {"_id": {"$in": ids}}).await
    }

    async fn movie(&self, id: ObjectId) -> StoreResult<Option<Movie>> {
        self.find_by_id(MOVIES, id).await
    }

    async fn insert_session(&self, session: &MovieSession) -> StoreResult<()> {
        self.insert(SESSIONS, session).await
    }

    async fn sessions(&self) -> StoreResult<Vec<MovieSession>> {
        let options = FindOptions::builder().sort(doc! {"show_time": 1}).build();
        let cursor = self
            .collection::<MovieSession>(SESSIONS)
            .find(doc! {}, options)
            .await?;
        Ok(cursor.try_collect().await?)
    }

    async fn session(&self, id: ObjectId) -> StoreResult<Option<MovieSession>> {
        self.find_by_id(SESSIONS, id).await
    }

    async fn replace_session(&self, session: &MovieSession) -> StoreResult<SessionWrite> {
        let filter = doc! {
            "_id": session.id,
            "$or": [
                { "cinema_hall_id": session.cinema_hall_id },
                { TICKETS_SOLD: { "$in": [0, null] } },
            ],
        };
        let update = doc! {
            "$set": {
                "movie_id": session.movie_id,
                "cinema_hall_id": session.cinema_hall_id,
                "show_time": BsonDateTime::from_chrono(session.show_time),
            }
        };
        let result = self
            .collection::<MovieSession>(SESSIONS)
            .update_one(filter, update, None)
            .await?;
        if result.matched_count == 1 {
            return Ok(SessionWrite::Applied);
        }
        self.guarded_miss(session.id).await
    }

    async fn delete_session(&self, id: ObjectId) -> StoreResult<SessionWrite> {
        let result = self
            .collection::<MovieSession>(SESSIONS)
            .delete_one(doc! {"_id": id, TICKETS_SOLD: {"$in": [0, null]}}, None)
            .await?;
        if result.deleted_count == 1 {
            return Ok(SessionWrite::Applied);
        }
        self.guarded_miss(id).await
    }

    async fn insert_user(&self, user: &User) -> StoreResult<()> {
        self.insert(USERS, user).await
    }

    async fn user(&self, id: ObjectId) -> StoreResult<Option<User>> {
        self.find_by_id(USERS, id).await
    }

    async fn sold_counts(&self, session_ids: &[ObjectId]) -> StoreResult<HashMap<ObjectId, u64>> {
        let pipeline = vec![
            doc! {
                "$match": { "movie_session_id": { "$in": session_ids } }
            },
            doc! {
                "$group": { "_id": "$movie_session_id", "sold": { "$sum": 1 } }
            },
        ];

        let mut cursor = self
            .collection::<Ticket>(TICKETS)
            .aggregate(pipeline, None)
            .await?;

        let mut counts = HashMap::new();
        while let Some(doc) = cursor.try_next().await? {
            let row: SoldCount = from_document(doc)?;
            counts.insert(row.session_id, u64::try_from(row.sold).unwrap_or_default());
        }
        Ok(counts)
    }

    async fn session_tickets(&self, session_id: ObjectId) -> StoreResult<Vec<Ticket>> {
        self.find_all(TICKETS, doc! {"movie_session_id": session_id}).await
    }

    async fn orders_for_user(&self, user_id: ObjectId) -> StoreResult<Vec<Order>> {
        let options = FindOptions::builder().sort(doc! {"created_at": -1}).build();
        let cursor = self
            .collection::<Order>(ORDERS)
            .find(doc! {"user_id": user_id}, options)
            .await?;
        let mut orders: Vec<Order> = cursor.try_collect().await?;

        // Ticket ids are minted in request order.
        let order_ids: Vec<ObjectId> = orders.iter().map(|o| o.id).collect();
        let options = FindOptions::builder().sort(doc! {"_id": 1}).build();
        let cursor = self
            .collection::<Ticket>(TICKETS)
            .find(doc! {"order_id": {"$in": order_ids}}, options)
            .await?;
        let tickets: Vec<Ticket> = cursor.try_collect().await?;

        let mut by_order: HashMap<ObjectId, Vec<Ticket>> = HashMap::new();
        for ticket in tickets {
            by_order.entry(ticket.order_id).or_default().push(ticket);
        }
        for order in &mut orders {
            order.tickets = by_order.remove(&order.id).unwrap_or_default();
        }
        Ok(orders)
    }

    async fn begin(&self) -> StoreResult<Box<dyn StoreTransaction>> {
        let mut session = self.client.start_session(None).await?;
        let options = TransactionOptions::builder()
            .read_concern(ReadConcern::snapshot())
            .write_concern(WriteConcern::builder().w(Acknowledgment::Majority).build())
            .build();
        session.start_transaction(options).await?;

        Ok(Box::new(MongoTransaction {
            db: self.db.clone(),
            session,
        }))
    }
}

/// A multi-document transaction. The driver aborts it if the session is
/// dropped while still in progress.
struct MongoTransaction {
    db: Database,
    session: ClientSession,
}

impl MongoTransaction {
    async fn find_by_id<T>(&mut self, name: &str, id: ObjectId) -> StoreResult<Option<T>>
    where
        T: DeserializeOwned + Unpin + Send + Sync,
    {
        self.db
            .collection::<T>(name)
            .find_one_with_session(doc! {"_id": id}, None, &mut self.session)
            .await
            .map_err(|err| classify(err, &[]))
    }
}

/// Maps driver failures onto the outcomes the order manager distinguishes.
///
/// `seats` is the ticket batch of the failed write, in insertion order, so a
/// bulk duplicate key error can name the offending place.
fn classify(err: MongoError, seats: &[SeatKey]) -> StoreError {
    if err.contains_label(TRANSIENT_TRANSACTION_ERROR) {
        return StoreError::WriteConflict;
    }

    match err.kind.as_ref() {
        ErrorKind::BulkWrite(failure) => {
            let duplicate = failure
                .write_errors
                .as_ref()
                .and_then(|errors| errors.iter().find(|e| e.code == DUPLICATE_KEY));
            if let Some(duplicate) = duplicate {
                return StoreError::UniqueViolation {
                    key: seats.get(duplicate.index).copied(),
                };
            }
        }
        ErrorKind::Write(WriteFailure::WriteError(write_error))
            if write_error.code == DUPLICATE_KEY =>
        {
            return StoreError::UniqueViolation {
                key: seats.first().copied().filter(|_| seats.len() == 1),
            };
        }
        ErrorKind::Command(command_error) if command_error.code == DUPLICATE_KEY => {
            return StoreError::UniqueViolation { key: None };
        }
        _ => {}
    }

    StoreError::Mongo(err)
}

#[async_trait]
impl StoreTransaction for MongoTransaction {
    async fn session(&mut self, id: ObjectId) -> StoreResult<Option<MovieSession>> {
        self.find_by_id(SESSIONS, id).await
    }

    async fn hall(&mut self, id: ObjectId) -> StoreResult<Option<CinemaHall>> {
        self.find_by_id(HALLS, id).await
    }

    async fn user(&mut self, id: ObjectId) -> StoreResult<Option<User>> {
        self.find_by_id(USERS, id).await
    }

    async fn occupied(&mut self, seats: &[SeatKey]) -> StoreResult<Vec<SeatKey>> {
        if seats.is_empty() {
            return Ok(Vec::new());
        }

        let places: Vec<Document> = seats
            .iter()
            .map(|key| {
                doc! {
                    "movie_session_id": key.movie_session_id,
                    "row": i64::from(key.row),
                    "seat": i64::from(key.seat),
                }
            })
            .collect();

        let mut cursor = self
            .db
            .collection::<Ticket>(TICKETS)
            .find_with_session(doc! {"$or": places}, None, &mut self.session)
            .await
            .map_err(|err| classify(err, &[]))?;

        let mut taken = Vec::new();
        while let Some(ticket) = cursor.next(&mut self.session).await {
            let ticket = ticket.map_err(|err| classify(err, &[]))?;
            taken.push(ticket.seat_key());
        }
        Ok(taken)
    }

    async fn insert_order(&mut self, order: &Order) -> StoreResult<()> {
        let mut per_session: HashMap<ObjectId, i64> = HashMap::new();
        for ticket in &order.tickets {
            *per_session.entry(ticket.movie_session_id).or_insert(0) += 1;
        }
        for (session_id, sold) in per_session {
            let result = self
                .db
                .collection::<MovieSession>(SESSIONS)
                .update_one_with_session(
                    doc! {"_id": session_id},
                    doc! {"$inc": {TICKETS_SOLD: sold}},
                    None,
                    &mut self.session,
                )
                .await
                .map_err(|err| classify(err, &[]))?;
            if result.matched_count == 0 {
                // Deleted after this transaction read it.
                return Err(StoreError::WriteConflict);
            }
        }

        self.db
            .collection::<Order>(ORDERS)
            .insert_one_with_session(order, None, &mut self.session)
            .await
            .map_err(|err| classify(err, &[]))?;

        let seats: Vec<SeatKey> = order.tickets.iter().map(Ticket::seat_key).collect();
        self.db
            .collection::<Ticket>(TICKETS)
            .insert_many_with_session(&order.tickets, None, &mut self.session)
            .await
            .map_err(|err| classify(err, &seats))?;
        Ok(())
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        let mut txn = self;
        txn.session
            .commit_transaction()
            .await
            .map_err(|err| classify(err, &[]))
    }

    async fn rollback(self: Box<Self>) -> StoreResult<()> {
        let mut txn = self;
        txn.session.abort_transaction().await?;
        Ok(())
    }
}
