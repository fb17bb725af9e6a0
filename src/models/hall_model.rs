use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use crate::utils::serialize_object_id;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct CinemaHall {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub name: String,
    pub rows: u32,
    pub seats_in_row: u32,
}

impl CinemaHall {
    pub fn new(name: impl Into<String>, rows: u32, seats_in_row: u32) -> Self {
        Self {
            id: ObjectId::new(),
            name: name.into(),
            rows,
            seats_in_row,
        }
    }

    pub fn capacity(&self) -> u64 {
        u64::from(self.rows) * u64::from(self.seats_in_row)
    }

    /// Rows and seats are numbered from 1.
    pub fn contains_seat(&self, row: u32, seat: u32) -> bool {
        (1..=self.rows).contains(&row) && (1..=self.seats_in_row).contains(&seat)
    }
}

#[derive(Deserialize, Debug)]
pub struct HallCreate {
    pub name: String,
    pub rows: u32,
    pub seats_in_row: u32,
}

#[derive(Serialize, Debug)]
pub struct HallResponse {
    #[serde(serialize_with = "serialize_object_id")]
    pub id: ObjectId,
    pub name: String,
    pub rows: u32,
    pub seats_in_row: u32,
    pub capacity: u64,
}

impl From<&CinemaHall> for HallResponse {
    fn from(hall: &CinemaHall) -> Self {
        Self {
            id: hall.id,
            name: hall.name.clone(),
            rows: hall.rows,
            seats_in_row: hall.seats_in_row,
            capacity: hall.capacity(),
        }
    }
}
