// src/common/patch.rs

use serde::{Deserialize, Deserializer};

/// Campo de PATCH que aceita `null`: ausente = `None`, `null` = `Some(None)`.
/// Usar com `#[serde(default, deserialize_with = "double_option")]`.
pub fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[derive(Deserialize)]
    struct Patch {
        #[serde(default, deserialize_with = "double_option")]
        group_id: Option<Option<Uuid>>,
    }

    #[test]
    fn distinguishes_absent_from_null() {
        let absent: Patch = serde_json::from_str("{}").unwrap();
        assert_eq!(absent.group_id, None);

        let null: Patch = serde_json::from_str(r#"{"group_id": null}"#).unwrap();
        assert_eq!(null.group_id, Some(None));

        let id = Uuid::new_v4();
        let set: Patch = serde_json::from_str(&format!(r#"{{"group_id": "{}"}}"#, id)).unwrap();
        assert_eq!(set.group_id, Some(Some(id)));
    }
}
