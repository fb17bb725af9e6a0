use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

/// Principal owned by the external auth service; read-only here.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub is_staff: bool,
}
