use chrono::{DateTime, Utc};
use mongodb::bson::{oid::ObjectId, serde_helpers::chrono_datetime_as_bson_datetime};
use serde::{Deserialize, Serialize};

use crate::utils::{deserialize_object_id, serialize_object_id};

/// Identifies one bookable place: a seat in a row at one screening.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SeatKey {
    pub movie_session_id: ObjectId,
    pub row: u32,
    pub seat: u32,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Ticket {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub movie_session_id: ObjectId,
    pub order_id: ObjectId,
    pub row: u32,
    pub seat: u32,
}

impl Ticket {
    pub fn seat_key(&self) -> SeatKey {
        SeatKey {
            movie_session_id: self.movie_session_id,
            row: self.row,
            seat: self.seat,
        }
    }
}

/// Tickets live in their own collection; `tickets` is filled on load.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Order {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub user_id: ObjectId,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing)]
    pub tickets: Vec<Ticket>,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct TicketRequest {
    #[serde(deserialize_with = "deserialize_object_id")]
    pub movie_session: ObjectId,
    pub row: u32,
    pub seat: u32,
}

impl TicketRequest {
    pub fn seat_key(&self) -> SeatKey {
        SeatKey {
            movie_session_id: self.movie_session,
            row: self.row,
            seat: self.seat,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct OrderCreate {
    pub tickets: Vec<TicketRequest>,
}

#[derive(Debug, Serialize)]
pub struct TicketResponse {
    #[serde(serialize_with = "serialize_object_id")]
    pub id: ObjectId,
    #[serde(serialize_with = "serialize_object_id")]
    pub movie_session: ObjectId,
    pub row: u32,
    pub seat: u32,
}

#[derive(Debug, Serialize)]
pub struct OrderResponse {
    #[serde(serialize_with = "serialize_object_id")]
    pub id: ObjectId,
    pub created_at: DateTime<Utc>,
    pub tickets: Vec<TicketResponse>,
}

impl From<&Order> for OrderResponse {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id,
            created_at: order.created_at,
            tickets: order
                .tickets
                .iter()
                .map(|ticket| TicketResponse {
                    id: ticket.id,
                    movie_session: ticket.movie_session_id,
                    row: ticket.row,
                    seat: ticket.seat,
                })
                .collect(),
        }
    }
}
