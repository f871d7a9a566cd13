//! Deserializers for fields the backend sends as either strings or numbers.

use serde::{Deserialize, Deserializer};

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    String(String),
    Integer(i64),
    Float(f64),
}

/// `"2025-I"`, `2025` and `null` all become an optional string.
pub fn opt_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<StringOrNumber>::deserialize(deserializer)?;
    Ok(value.map(|v| match v {
        StringOrNumber::String(s) => s,
        StringOrNumber::Integer(i) => i.to_string(),
        StringOrNumber::Float(f) => f.to_string(),
    }))
}

/// Document key sent as `_id`, `id`, or both at once. Flattened into the
/// owning struct; `_id` wins when the two disagree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct DocId {
    #[serde(default, rename = "_id", deserialize_with = "opt_string")]
    mongo: Option<String>,
    #[serde(default, rename = "id", deserialize_with = "opt_string")]
    plain: Option<String>,
}

impl DocId {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            mongo: Some(id.into()),
            plain: None,
        }
    }

    pub fn get(&self) -> Option<&str> {
        self.mongo
            .as_deref()
            .or(self.plain.as_deref())
            .filter(|id| !id.is_empty())
    }

    /// The key, or "" when the record carried none.
    pub fn as_str(&self) -> &str {
        self.get().unwrap_or("")
    }
}

/// Either a bare id string or an embedded object carrying `id`/`_id`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum IdRef {
    Id(String),
    Object {
        #[serde(flatten)]
        key: DocId,
    },
}

impl IdRef {
    pub fn id(&self) -> Option<&str> {
        match self {
            IdRef::Id(id) => Some(id.as_str()),
            IdRef::Object { key } => key.get(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize)]
    struct Record {
        #[serde(flatten)]
        key: DocId,
        #[serde(default, deserialize_with = "opt_string")]
        anio: Option<String>,
    }

    #[test]
    fn test_doc_id_accepts_either_or_both_keys() {
        let both: Record = serde_json::from_str(r#"{"_id": "a1", "id": "a1"}"#).unwrap();
        assert_eq!(both.key.get(), Some("a1"));

        let mongo: Record = serde_json::from_str(r#"{"_id": "a2"}"#).unwrap();
        assert_eq!(mongo.key.as_str(), "a2");

        let plain: Record = serde_json::from_str(r#"{"id": 7, "anio": 2025}"#).unwrap();
        assert_eq!(plain.key.as_str(), "7");
        assert_eq!(plain.anio.as_deref(), Some("2025"));

        let none: Record = serde_json::from_str("{}").unwrap();
        assert_eq!(none.key.get(), None);
        assert_eq!(none.key.as_str(), "");
    }

    #[test]
    fn test_underscore_id_wins_on_conflict() {
        let record: Record = serde_json::from_str(r#"{"id": "x", "_id": "y"}"#).unwrap();
        assert_eq!(record.key.as_str(), "y");
    }

    #[test]
    fn test_id_ref_forms() {
        let bare: IdRef = serde_json::from_str(r#""u1""#).unwrap();
        assert_eq!(bare.id(), Some("u1"));

        let both: IdRef = serde_json::from_str(r#"{"_id": "u1", "id": "u1", "email": "a@b.c"}"#).unwrap();
        assert_eq!(both.id(), Some("u1"));
    }
}
