mod common;

use std::sync::Arc;

use cinema_booking::{
    availability::available_seats,
    booking::OrderManager,
    error::BookingError,
    models::{
        hall_model::CinemaHall,
        order_model::{Order, Ticket},
    },
    store::{CinemaStore, SessionWrite, StoreError},
};
use common::{fixture, session_in, ticket};
use mongodb::bson::oid::ObjectId;

#[tokio::test]
async fn booking_a_seat_then_rebooking_it_fails() {
    let fx = fixture().await;
    let orders = OrderManager::new(fx.store.clone());

    let order = orders
        .create_order(fx.alice.id, &[ticket(&fx.session, 3, 4)])
        .await
        .unwrap();
    assert_eq!(order.user_id, fx.alice.id);
    assert_eq!(order.tickets.len(), 1);
    assert_eq!(order.tickets[0].order_id, order.id);
    assert_eq!(available_seats(fx.store.as_ref(), fx.session.id).await.unwrap(), 39);

    let err = orders
        .create_order(fx.bob.id, &[ticket(&fx.session, 3, 4)])
        .await
        .unwrap_err();
    match err {
        BookingError::SeatTaken { movie_session, row, seat } => {
            assert_eq!((movie_session, row, seat), (fx.session.id, 3, 4));
        }
        other => panic!("expected SeatTaken, got {other:?}"),
    }
    assert!(fx.store.orders_for_user(fx.bob.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn row_beyond_hall_is_out_of_range() {
    let fx = fixture().await;
    let orders = OrderManager::new(fx.store.clone());

    let err = orders
        .create_order(fx.alice.id, &[ticket(&fx.session, 6, 1)])
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        BookingError::SeatOutOfRange { row: 6, seat: 1, rows: 5, seats_in_row: 8 }
    ));
    assert_eq!(available_seats(fx.store.as_ref(), fx.session.id).await.unwrap(), 40);
}

#[tokio::test]
async fn seat_zero_and_last_seat_bounds() {
    let fx = fixture().await;
    let orders = OrderManager::new(fx.store.clone());

    for (row, seat) in [(0, 1), (1, 0), (1, 9)] {
        let err = orders
            .create_order(fx.alice.id, &[ticket(&fx.session, row, seat)])
            .await
            .unwrap_err();
        assert!(matches!(err, BookingError::SeatOutOfRange { .. }), "{row}/{seat}");
    }

    orders
        .create_order(fx.alice.id, &[ticket(&fx.session, 5, 8), ticket(&fx.session, 1, 1)])
        .await
        .unwrap();
}

#[tokio::test]
async fn duplicate_seat_in_one_request_is_rejected() {
    let fx = fixture().await;
    let orders = OrderManager::new(fx.store.clone());

    let err = orders
        .create_order(fx.alice.id, &[ticket(&fx.session, 1, 1), ticket(&fx.session, 1, 1)])
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::DuplicateSeatInRequest { row: 1, seat: 1, .. }));
    assert!(fx.store.session_tickets(fx.session.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn failing_ticket_leaves_no_partial_order() {
    let fx = fixture().await;
    let orders = OrderManager::new(fx.store.clone());

    let err = orders
        .create_order(
            fx.alice.id,
            &[ticket(&fx.session, 1, 1), ticket(&fx.session, 9, 9), ticket(&fx.session, 1, 2)],
        )
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::SeatOutOfRange { .. }));

    assert!(fx.store.session_tickets(fx.session.id).await.unwrap().is_empty());
    assert!(fx.store.orders_for_user(fx.alice.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn one_taken_seat_rejects_the_whole_order() {
    let fx = fixture().await;
    let orders = OrderManager::new(fx.store.clone());
    orders
        .create_order(fx.bob.id, &[ticket(&fx.session, 2, 2)])
        .await
        .unwrap();

    let err = orders
        .create_order(fx.alice.id, &[ticket(&fx.session, 2, 1), ticket(&fx.session, 2, 2)])
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::SeatTaken { row: 2, seat: 2, .. }));
    assert_eq!(available_seats(fx.store.as_ref(), fx.session.id).await.unwrap(), 39);
}

#[tokio::test]
async fn same_place_in_different_sessions_is_allowed() {
    let fx = fixture().await;
    let later = session_in(&fx.store, &fx.hall, &fx.movie).await;
    let orders = OrderManager::new(fx.store.clone());

    let order = orders
        .create_order(fx.alice.id, &[ticket(&fx.session, 4, 4), ticket(&later, 4, 4)])
        .await
        .unwrap();

    assert_eq!(order.tickets.len(), 2);
    assert_eq!(order.tickets[0].movie_session_id, fx.session.id);
    assert_eq!(order.tickets[1].movie_session_id, later.id);
}

#[tokio::test]
async fn each_session_is_checked_against_its_own_hall() {
    let fx = fixture().await;
    let small = CinemaHall::new("Small", 2, 3);
    fx.store.insert_hall(&small).await.unwrap();
    let small_session = session_in(&fx.store, &small, &fx.movie).await;
    let orders = OrderManager::new(fx.store.clone());

    let err = orders
        .create_order(fx.alice.id, &[ticket(&fx.session, 4, 4), ticket(&small_session, 4, 4)])
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::SeatOutOfRange { rows: 2, seats_in_row: 3, .. }));
}

#[tokio::test]
async fn empty_order_is_rejected() {
    let fx = fixture().await;
    let orders = OrderManager::new(fx.store.clone());
    let err = orders.create_order(fx.alice.id, &[]).await.unwrap_err();
    assert!(matches!(err, BookingError::EmptyOrder));
}

#[tokio::test]
async fn unknown_user_or_session_is_not_found() {
    let fx = fixture().await;
    let orders = OrderManager::new(fx.store.clone());

    let err = orders
        .create_order(ObjectId::new(), &[ticket(&fx.session, 1, 1)])
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::NotFound { resource: "user", .. }));

    let missing = cinema_booking::models::order_model::TicketRequest {
        movie_session: ObjectId::new(),
        row: 1,
        seat: 1,
    };
    let err = orders.create_order(fx.alice.id, &[missing]).await.unwrap_err();
    assert!(matches!(err, BookingError::NotFound { resource: "movie session", .. }));
}

#[tokio::test]
async fn orders_are_listed_per_user_with_tickets() {
    let fx = fixture().await;
    let orders = OrderManager::new(fx.store.clone());
    orders
        .create_order(fx.alice.id, &[ticket(&fx.session, 4, 7), ticket(&fx.session, 1, 2)])
        .await
        .unwrap();
    orders
        .create_order(fx.bob.id, &[ticket(&fx.session, 2, 1)])
        .await
        .unwrap();

    let alice_orders = fx.store.orders_for_user(fx.alice.id).await.unwrap();
    assert_eq!(alice_orders.len(), 1);
    let places: Vec<_> = alice_orders[0].tickets.iter().map(|t| (t.row, t.seat)).collect();
    assert_eq!(places, vec![(4, 7), (1, 2)]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_orders_for_one_seat_sell_it_once() {
    let fx = fixture().await;
    let orders = OrderManager::new(fx.store.clone());

    let mut handles = Vec::new();
    for i in 0..16 {
        let orders = orders.clone();
        let user = if i % 2 == 0 { fx.alice.id } else { fx.bob.id };
        let request = ticket(&fx.session, 3, 4);
        handles.push(tokio::spawn(async move {
            orders.create_order(user, &[request]).await
        }));
    }

    let mut succeeded = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => succeeded += 1,
            Err(BookingError::SeatTaken { row: 3, seat: 4, .. } | BookingError::TransactionConflict) => {}
            Err(other) => panic!("unexpected error {other:?}"),
        }
    }

    assert_eq!(succeeded, 1);
    assert_eq!(fx.store.session_tickets(fx.session.id).await.unwrap().len(), 1);
    assert_eq!(available_seats(fx.store.as_ref(), fx.session.id).await.unwrap(), 39);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn overlapping_multi_seat_orders_never_partially_apply() {
    let fx = fixture().await;
    let store: Arc<dyn CinemaStore> = fx.store.clone();
    let orders = OrderManager::new(store);

    // Every order shares (1, 1) and also asks for a seat of its own.
    let mut handles = Vec::new();
    for seat in 2..=8 {
        let orders = orders.clone();
        let requests = [ticket(&fx.session, 1, 1), ticket(&fx.session, 1, seat)];
        let user = fx.alice.id;
        handles.push(tokio::spawn(async move { orders.create_order(user, &requests).await }));
    }

    let mut succeeded = 0;
    for handle in handles {
        if handle.await.unwrap().is_ok() {
            succeeded += 1;
        }
    }

    assert_eq!(succeeded, 1);
    assert_eq!(fx.store.session_tickets(fx.session.id).await.unwrap().len(), 2);
}

fn order_at(session: ObjectId, user: ObjectId, places: &[(u32, u32)]) -> Order {
    let id = ObjectId::new();
    Order {
        id,
        user_id: user,
        created_at: chrono::Utc::now(),
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

#[tokio::test]
async fn hall_swap_during_an_order_aborts_the_order() {
    let fx = fixture().await;
    let closet = CinemaHall::new("Closet", 1, 1);
    fx.store.insert_hall(&closet).await.unwrap();

    let mut txn = fx.store.begin().await.unwrap();
    let session = txn.session(fx.session.id).await.unwrap().unwrap();
    let hall = txn.hall(session.cinema_hall_id).await.unwrap().unwrap();
    assert!(hall.contains_seat(5, 8));

    let mut moved = session.clone();
    moved.cinema_hall_id = closet.id;
    assert_eq!(fx.store.replace_session(&moved).await.unwrap(), SessionWrite::Applied);

    txn.insert_order(&order_at(session.id, fx.alice.id, &[(5, 8), (4, 8)]))
        .await
        .unwrap();
    assert!(matches!(txn.commit().await, Err(StoreError::WriteConflict)));

    // The session lives in the small hall now and nothing was sold in it.
    assert_eq!(available_seats(fx.store.as_ref(), fx.session.id).await.unwrap(), 1);
}

#[tokio::test]
async fn delete_during_an_order_leaves_no_orphan_tickets() {
    let fx = fixture().await;

    let mut txn = fx.store.begin().await.unwrap();
    txn.session(fx.session.id).await.unwrap().unwrap();
    assert_eq!(fx.store.delete_session(fx.session.id).await.unwrap(), SessionWrite::Applied);

    txn.insert_order(&order_at(fx.session.id, fx.alice.id, &[(1, 1)]))
        .await
        .unwrap();
    assert!(matches!(txn.commit().await, Err(StoreError::WriteConflict)));

    assert!(fx.store.session_tickets(fx.session.id).await.unwrap().is_empty());
    assert!(fx.store.orders_for_user(fx.alice.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn committed_order_blocks_a_later_hall_swap() {
    let fx = fixture().await;
    let orders = OrderManager::new(fx.store.clone());
    orders
        .create_order(fx.alice.id, &[ticket(&fx.session, 5, 8)])
        .await
        .unwrap();

    let mut moved = fx.session.clone();
    moved.cinema_hall_id = CinemaHall::new("Closet", 1, 1).id;
    assert_eq!(fx.store.replace_session(&moved).await.unwrap(), SessionWrite::HasTickets);
    assert_eq!(fx.store.delete_session(fx.session.id).await.unwrap(), SessionWrite::HasTickets);
    assert_eq!(available_seats(fx.store.as_ref(), fx.session.id).await.unwrap(), 39);
}
