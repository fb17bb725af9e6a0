#![allow(dead_code)]

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use cinema_booking::{
    models::{
        hall_model::CinemaHall, movie_model::Movie, order_model::TicketRequest,
        session_model::MovieSession, user_model::User,
    },
    store::{CinemaStore, MemoryStore},
};
use mongodb::bson::oid::ObjectId;

pub struct Fixture {
    pub store: Arc<MemoryStore>,
    pub hall: CinemaHall,
    pub movie: Movie,
    pub session: MovieSession,
    pub staff: User,
    pub alice: User,
    pub bob: User,
}

pub fn user(name: &str, is_staff: bool) -> User {
    User {
        id: ObjectId::new(),
        username: name.to_owned(),
        email: format!("{name}@cinema.test"),
        is_staff,
    }
}

pub async fn session_in(store: &MemoryStore, hall: &CinemaHall, movie: &Movie) -> MovieSession {
    let session = MovieSession {
        id: ObjectId::new(),
        movie_id: movie.id,
        cinema_hall_id: hall.id,
        show_time: Utc.with_ymd_and_hms(2026, 11, 20, 19, 30, 0).unwrap(),
    };
    store.insert_session(&session).await.unwrap();
    session
}

/// A 5 x 8 hall with one session and three users.
pub async fn fixture() -> Fixture {
    let store = Arc::new(MemoryStore::new());

    let hall = CinemaHall::new("Blue", 5, 8);
    store.insert_hall(&hall).await.unwrap();

    let movie = Movie {
        id: ObjectId::new(),
        title: "Stalker".to_owned(),
        description: "A guide leads two men through the Zone.".to_owned(),
        duration: 161,
        genres: Vec::new(),
        actors: Vec::new(),
    };
    store.insert_movie(&movie).await.unwrap();

    let session = session_in(&store, &hall, &movie).await;

    let staff = user("admin", true);
    let alice = user("alice", false);
    let bob = user("bob", false);
    for u in [&staff, &alice, &bob] {
        store.insert_user(u).await.unwrap();
    }

    Fixture {
        store,
        hall,
        movie,
        session,
        staff,
        alice,
        bob,
    }
}

pub fn ticket(session: &MovieSession, row: u32, seat: u32) -> TicketRequest {
    TicketRequest {
        movie_session: session.id,
        row,
        seat,
    }
}
