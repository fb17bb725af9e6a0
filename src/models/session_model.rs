use chrono::{DateTime, Utc};
use mongodb::bson::{oid::ObjectId, serde_helpers::chrono_datetime_as_bson_datetime};
use serde::{Deserialize, Serialize};

use crate::utils::{deserialize_object_id, deserialize_optional_object_id, serialize_object_id};

use super::{hall_model::HallResponse, movie_model::MovieResponse};

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct MovieSession {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub movie_id: ObjectId,
    pub cinema_hall_id: ObjectId,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub show_time: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct SessionCreate {
    #[serde(deserialize_with = "deserialize_object_id")]
    pub movie: ObjectId,
    #[serde(deserialize_with = "deserialize_object_id")]
    pub cinema_hall: ObjectId,
    pub show_time: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Default)]
pub struct SessionUpdate {
    #[serde(default, deserialize_with = "deserialize_optional_object_id")]
    pub movie: Option<ObjectId>,
    #[serde(default, deserialize_with = "deserialize_optional_object_id")]
    pub cinema_hall: Option<ObjectId>,
    pub show_time: Option<DateTime<Utc>>,
}

/// A sold place inside a session's hall.
#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct TakenPlace {
    pub row: u32,
    pub seat: u32,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    #[serde(serialize_with = "serialize_object_id")]
    pub id: ObjectId,
    #[serde(serialize_with = "serialize_object_id")]
    pub movie: ObjectId,
    #[serde(serialize_with = "serialize_object_id")]
    pub cinema_hall: ObjectId,
    pub show_time: DateTime<Utc>,
}

impl From<&MovieSession> for SessionResponse {
    fn from(session: &MovieSession) -> Self {
        Self {
            id: session.id,
            movie: session.movie_id,
            cinema_hall: session.cinema_hall_id,
            show_time: session.show_time,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SessionListItem {
    #[serde(serialize_with = "serialize_object_id")]
    pub id: ObjectId,
    pub show_time: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub movie_title: Option<String>,
    pub cinema_hall_name: String,
    pub cinema_hall_capacity: u64,
    pub tickets_available: u64,
}

#[derive(Debug, Serialize)]
pub struct SessionDetail {
    #[serde(serialize_with = "serialize_object_id")]
    pub id: ObjectId,
    pub show_time: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub movie: Option<MovieResponse>,
    pub cinema_hall: HallResponse,
    pub tickets_available: u64,
    pub taken_places: Vec<TakenPlace>,
}
