//! Infer which field identifies the records of a dataset.

use crate::record::Record;

/// Field name used when no identity-like field exists on a dataset.
pub const SYNTHESIZED_FIELD: &str = "guid";

/// The identity strategy resolved for one dataset.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct IdentitySpec {
    pub type_tag: String,

    /// Field within the inner mapping used to detect duplicates.
    pub field: String,

    /// True when `field` does not exist on the records and a fresh value must
    /// be generated for each one.
    pub synthesized: bool,
}

/// Resolve the identity strategy for `dataset` from one representative record.
///
/// Called once per dataset with its first record; fields that only appear on
/// later records are never considered.
///
/// Canonical identity-field names are tried first, in priority order,
/// case-insensitively. An exact-case key wins over a case-insensitive one for
/// the same pattern. If no canonical name matches, any field whose name
/// contains `id` is accepted; when several do, the last one in field order
/// wins. With no match at all the records get a generated identifier under
/// [`SYNTHESIZED_FIELD`].
pub fn resolve(dataset: &str, sample: &Record) -> IdentitySpec {
    let patterns = [
        "id".to_string(),
        "_id".to_string(),
        format!("{dataset}_id"),
        format!("{dataset}Id"),
        "uuid".to_string(),
        "guid".to_string(),
        "identifier".to_string(),
    ];

    for pattern in &patterns {
        if sample.fields.contains_key(pattern.as_str()) {
            return found(sample, pattern.clone());
        }

        let lower = pattern.to_lowercase();
        if let Some(key) = sample.fields.keys().find(|k| k.to_lowercase() == lower) {
            return found(sample, key.clone());
        }
    }

    // Substring fallback. The last matching field wins, not the first.
    let mut fallback = None;
    for key in sample.fields.keys() {
        if key.to_lowercase().contains("id") {
            fallback = Some(key.clone());
        }
    }
    if let Some(field) = fallback {
        return found(sample, field);
    }

    tracing::warn!(
        dataset,
        "no identity-like field found, generating '{SYNTHESIZED_FIELD}' values");

    IdentitySpec {
        type_tag: sample.type_tag.clone(),
        field: SYNTHESIZED_FIELD.to_string(),
        synthesized: true,
    }
}

/// Generate a fresh identity value: a random 128-bit identifier in canonical
/// hyphenated form.
pub fn new_identity() -> String {
    uuid::Uuid::new_v4().to_string()
}

fn found(sample: &Record, field: String) -> IdentitySpec {
    IdentitySpec {
        type_tag: sample.type_tag.clone(),
        field,
        synthesized: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::parse_dump;

    fn sample(json: &str) -> Record {
        parse_dump(json).unwrap().into_iter().next().unwrap()
    }

    #[test]
    fn exact_id_wins_over_uuid() {
        let rec = sample(r#"[{"tweet":{"uuid":"u","id":"1"}}]"#);
        let spec = resolve("tweet", &rec);
        assert_eq!(spec.field, "id");
        assert!(!spec.synthesized);
        assert_eq!(spec.type_tag, "tweet");
    }

    #[test]
    fn dataset_prefixed_patterns() {
        let rec = sample(r#"[{"user":{"name":"n","user_id":"7"}}]"#);
        assert_eq!(resolve("user", &rec).field, "user_id");

        let rec = sample(r#"[{"user":{"name":"n","userId":"7"}}]"#);
        assert_eq!(resolve("user", &rec).field, "userId");
    }

    #[test]
    fn case_insensitive_match_returns_actual_key() {
        let rec = sample(r#"[{"item":{"ID":"9","name":"n"}}]"#);
        let spec = resolve("item", &rec);
        assert_eq!(spec.field, "ID");
        assert!(!spec.synthesized);
    }

    #[test]
    fn pattern_order_dominates_field_order() {
        // `uuid` appears before `_id` in the record, but `_id` is the higher
        // priority pattern.
        let rec = sample(r#"[{"doc":{"uuid":"u","_id":"m"}}]"#);
        assert_eq!(resolve("doc", &rec).field, "_id");
    }

    #[test]
    fn substring_fallback_selects_id_containing_field() {
        let rec = sample(r#"[{"user":{"name":"n","userIdentifier":"x"}}]"#);
        let spec = resolve("user", &rec);
        assert_eq!(spec.field, "userIdentifier");
        assert!(!spec.synthesized);
    }

    #[test]
    fn substring_fallback_last_match_wins() {
        let rec = sample(r#"[{"post":{"authorIdent":"a","name":"n","threadIdent":"t"}}]"#);
        assert_eq!(resolve("post", &rec).field, "threadIdent");
    }

    #[test]
    fn no_match_synthesizes_guid() {
        let rec = sample(r#"[{"note":{"name":"n","text":"t"}}]"#);
        let spec = resolve("note", &rec);
        assert_eq!(spec.field, SYNTHESIZED_FIELD);
        assert!(spec.synthesized);
    }

    #[test]
    fn new_identities_are_distinct_and_canonical() {
        let a = new_identity();
        let b = new_identity();
        assert_ne!(a, b);
        assert_eq!(a.len(), 36);
        assert_eq!(a.matches('-').count(), 4);
    }
}
