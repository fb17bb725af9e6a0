use mongodb::bson::oid::ObjectId;
use serde::{de, Deserialize, Deserializer, Serializer};

pub fn serialize_object_id<S>(id: &ObjectId, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&id.to_hex())
}

pub fn serialize_object_ids<S>(ids: &[ObjectId], serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.collect_seq(ids.iter().map(|id| id.to_hex()))
}

/// Accepts the 24 character hex form clients send for ids.
pub fn deserialize_object_id<'de, D>(deserializer: D) -> Result<ObjectId, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    ObjectId::parse_str(&raw).map_err(de::Error::custom)
}

pub fn deserialize_object_ids<'de, D>(deserializer: D) -> Result<Vec<ObjectId>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Vec::<String>::deserialize(deserializer)?;
    raw.iter()
        .map(|s| ObjectId::parse_str(s).map_err(de::Error::custom))
        .collect()
}

pub fn deserialize_optional_object_id<'de, D>(deserializer: D) -> Result<Option<ObjectId>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        Some(raw) => ObjectId::parse_str(&raw).map(Some).map_err(de::Error::custom),
        None => Ok(None),
    }
}

pub fn parse_id(raw: &str) -> Result<ObjectId, crate::error::BookingError> {
    ObjectId::parse_str(raw)
        .map_err(|_| crate::error::BookingError::InvalidInput(format!("`{raw}` is not a valid id")))
}

/// Collapses duplicated ids while keeping first-seen order.
pub fn dedup_ids(ids: Vec<ObjectId>) -> Vec<ObjectId> {
    let mut seen = std::collections::HashSet::new();
    ids.into_iter().filter(|id| seen.insert(*id)).collect()
}

#[cfg(test)]
mod tests {
    use serde::Serialize;

    use super::*;

    #[derive(Serialize)]
    struct Ids {
        #[serde(serialize_with = "serialize_object_ids")]
        ids: Vec<ObjectId>,
    }

    #[test]
    fn id_lists_serialize_as_hex_strings() {
        let first = ObjectId::new();
        let second = ObjectId::new();
        let value = serde_json::to_value(Ids { ids: vec![first, second] }).unwrap();
        assert_eq!(value, serde_json::json!({ "ids": [first.to_hex(), second.to_hex()] }));
    }

    #[test]
    fn dedup_keeps_first_seen_order() {
        let a = ObjectId::new();
        let b = ObjectId::new();
        assert_eq!(dedup_ids(vec![b, a, b, a]), vec![b, a]);
    }
}
