use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use crate::utils::serialize_object_id;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Genre {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub name: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub first_name: String,
    pub last_name: String,
}

impl Actor {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Deserialize, Debug)]
pub struct GenreCreate {
    pub name: String,
}

#[derive(Deserialize, Debug)]
pub struct ActorCreate {
    pub first_name: String,
    pub last_name: String,
}

#[derive(Serialize, Debug)]
pub struct GenreResponse {
    #[serde(serialize_with = "serialize_object_id")]
    pub id: ObjectId,
    pub name: String,
}

impl From<&Genre> for GenreResponse {
    fn from(genre: &Genre) -> Self {
        Self {
            id: genre.id,
            name: genre.name.clone(),
        }
    }
}

#[derive(Serialize, Debug)]
pub struct ActorResponse {
    #[serde(serialize_with = "serialize_object_id")]
    pub id: ObjectId,
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
}

impl From<&Actor> for ActorResponse {
    fn from(actor: &Actor) -> Self {
        Self {
            id: actor.id,
            first_name: actor.first_name.clone(),
            last_name: actor.last_name.clone(),
            full_name: actor.full_name(),
        }
    }
}
