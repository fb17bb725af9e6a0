use std::sync::Arc;

use axum::{
    extract::Extension,
    http::{header, HeaderName, HeaderValue, Method},
    routing::get,
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub mod auth;
pub mod availability;
pub mod booking;
pub mod config;
mod controllers;
pub mod error;
pub mod models;
pub mod store;
mod utils;

use booking::OrderManager;
use controllers::{
    catalog_controller::*, hall_controller::*, home_controller, movie_controller::*,
    order_controller::*, session_controller::*,
};
use store::CinemaStore;

pub type SharedStore = Arc<dyn CinemaStore>;

/// The full HTTP application over `store`. `allowed_origin` enables CORS for
/// that origin.
pub fn build_router(store: SharedStore, allowed_origin: Option<HeaderValue>) -> Router {
    let orders = OrderManager::new(Arc::clone(&store));

    let api = Router::new()
        .route("/genres", get(load_genres).post(add_genre))
        .route("/actors", get(load_actors).post(add_actor))
        .route("/cinema_halls", get(load_halls).post(add_hall))
        .route("/movies", get(load_movies).post(add_movie))
        .route("/movies/:id", get(load_movie_with_details))
        .route("/movie_sessions", get(load_sessions).post(add_session))
        .route(
            "/movie_sessions/:id",
            get(fetch_session_by_id)
                .patch(update_session)
                .delete(delete_session),
        )
        .route("/orders", get(load_orders).post(add_order));

    let mut app = Router::new()
        .route("/", get(home_controller::index))
        .nest("/api/cinema", api)
        .layer(Extension(orders))
        .layer(Extension(store))
        .layer(TraceLayer::new_for_http());

    if let Some(origin) = allowed_origin {
        app = app.layer(
            CorsLayer::new()
                .allow_methods([
                    Method::GET,
                    Method::POST,
                    Method::PATCH,
                    Method::DELETE,
                    Method::OPTIONS,
                ])
                .allow_origin(origin)
                .allow_headers([header::CONTENT_TYPE, HeaderName::from_static(auth::USER_HEADER)]),
        );
    }

    app
}
