//! Serde helpers shared by the model and its patches.

use serde::{Deserialize, Deserializer};

/// Free-form member metadata, any JSON object.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// Reads a patch field where an explicit `null` means "clear".
///
/// Use with `#[serde(default, deserialize_with = "nullable")]`: a missing
/// field stays `None`, `null` becomes `Some(None)` and a value becomes
/// `Some(Some(value))`.
pub fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Metadata as a JSON object for human-readable formats and as JSON text for
/// compact ones, since bincode cannot decode self-describing values.
pub(crate) mod metadata {
    use super::Metadata;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(value: &Metadata, serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            value.serialize(serializer)
        } else {
            let text = serde_json::to_string(value).map_err(<S::Error as serde::ser::Error>::custom)?;
            serializer.serialize_str(&text)
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Metadata, D::Error> {
        if deserializer.is_human_readable() {
            Metadata::deserialize(deserializer)
        } else {
            let text = String::deserialize(deserializer)?;
            serde_json::from_str(&text).map_err(<D::Error as serde::de::Error>::custom)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct Patch {
        #[serde(default, deserialize_with = "nullable")]
        note: Option<Option<String>>,
    }

    #[test]
    fn test_nullable_distinguishes_missing_and_null() {
        let missing: Patch = serde_json::from_value(json!({})).unwrap();
        assert_eq!(missing.note, None);

        let cleared: Patch = serde_json::from_value(json!({ "note": null })).unwrap();
        assert_eq!(cleared.note, Some(None));

        let set: Patch = serde_json::from_value(json!({ "note": "x" })).unwrap();
        assert_eq!(set.note, Some(Some("x".to_string())));
    }
}
