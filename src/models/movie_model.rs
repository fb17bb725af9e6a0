use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use crate::utils::{deserialize_object_ids, serialize_object_id, serialize_object_ids};

use super::catalog_model::{ActorResponse, GenreResponse};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Movie {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Running time in minutes.
    pub duration: u32,
    #[serde(default)]
    pub genres: Vec<ObjectId>,
    #[serde(default)]
    pub actors: Vec<ObjectId>,
}

#[derive(Debug, Deserialize)]
pub struct MovieCreate {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub duration: u32,
    #[serde(default, deserialize_with = "deserialize_object_ids")]
    pub genres: Vec<ObjectId>,
    #[serde(default, deserialize_with = "deserialize_object_ids")]
    pub actors: Vec<ObjectId>,
}

#[derive(Debug, Serialize)]
pub struct MovieResponse {
    #[serde(serialize_with = "serialize_object_id")]
    pub id: ObjectId,
    pub title: String,
    pub description: String,
    pub duration: u32,
    #[serde(serialize_with = "serialize_object_ids")]
    pub genres: Vec<ObjectId>,
    #[serde(serialize_with = "serialize_object_ids")]
    pub actors: Vec<ObjectId>,
}

impl From<&Movie> for MovieResponse {
    fn from(movie: &Movie) -> Self {
        Self {
            id: movie.id,
            title: movie.title.clone(),
            description: movie.description.clone(),
            duration: movie.duration,
            genres: movie.genres.clone(),
            actors: movie.actors.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MovieDetail {
    #[serde(serialize_with = "serialize_object_id")]
    pub id: ObjectId,
    pub title: String,
    pub description: String,
    pub duration: u32,
    pub genres: Vec<GenreResponse>,
    pub actors: Vec<ActorResponse>,
}
