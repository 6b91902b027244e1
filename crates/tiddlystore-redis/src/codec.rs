//! Entity serialization.
//!
//! Values are stored as a versioned JSON envelope:
//!
//! ```text
//! {"v":1,"kind":"bag","data":{"name":"alpha","desc":"","policy":{...}}}
//! ```
//!
//! Struct fields are written in declaration order and maps are sorted, so
//! the same entity always encodes to the same bytes. On decode, attribute
//! names this codec does not know, and tiddler field values that are not
//! strings, are reported as [`StoreError::UnsupportedFieldType`] instead of
//! being dropped.
//!
//! Recipe entries live in their own list key; each element is encoded on
//! its own as `["bag", "filter"]` or `["bag", null]`.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tiddlystore_types::{Bag, EntityKind, Policy, Recipe, RecipeEntry, Revision, User};

use crate::error::StoreError;

/// Current envelope version.
pub const ENCODING_VERSION: u32 = 1;

/// A value that can be stored under a single key.
pub trait Encodable: Serialize + DeserializeOwned {
    /// Kind written into the envelope.
    const KIND: EntityKind;

    /// Attribute names the codec knows for this kind.
    const ATTRIBUTES: &'static [&'static str];

    /// Extra shape checks on the raw attribute map before decoding.
    fn check_attributes(_data: &Map<String, Value>) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Recipe fields stored under the recipe's value key.
///
/// The entry list is kept in a separate list key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeRecord {
    /// Recipe name.
    pub name: String,
    /// Description.
    pub desc: String,
    /// Embedded policy.
    pub policy: Policy,
}

impl RecipeRecord {
    /// Header of `recipe`, without its entries.
    pub fn of(recipe: &Recipe) -> Self {
        Self {
            name: recipe.name.clone(),
            desc: recipe.desc.clone(),
            policy: recipe.policy.clone(),
        }
    }

    /// Reattach an entry list.
    pub fn into_recipe(self, entries: Vec<RecipeEntry>) -> Recipe {
        Recipe {
            name: self.name,
            desc: self.desc,
            policy: self.policy,
            entries,
        }
    }
}

const POLICY_ATTRIBUTES: &[&str] = &[
    "owner", "read", "write", "create", "delete", "manage", "accept",
];

impl Encodable for Policy {
    const KIND: EntityKind = EntityKind::Policy;
    const ATTRIBUTES: &'static [&'static str] = POLICY_ATTRIBUTES;
}

impl Encodable for Bag {
    const KIND: EntityKind = EntityKind::Bag;
    const ATTRIBUTES: &'static [&'static str] = &["name", "desc", "policy"];

    fn check_attributes(data: &Map<String, Value>) -> Result<(), StoreError> {
        check_embedded_policy(Self::KIND, data)
    }
}

impl Encodable for RecipeRecord {
    const KIND: EntityKind = EntityKind::Recipe;
    const ATTRIBUTES: &'static [&'static str] = &["name", "desc", "policy"];

    fn check_attributes(data: &Map<String, Value>) -> Result<(), StoreError> {
        check_embedded_policy(Self::KIND, data)
    }
}

impl Encodable for User {
    const KIND: EntityKind = EntityKind::User;
    const ATTRIBUTES: &'static [&'static str] =
        &["usersign", "credential", "roles", "note", "policy"];

    fn check_attributes(data: &Map<String, Value>) -> Result<(), StoreError> {
        check_embedded_policy(Self::KIND, data)
    }
}

impl Encodable for Revision {
    const KIND: EntityKind = EntityKind::Revision;
    const ATTRIBUTES: &'static [&'static str] = &[
        "text",
        "content_type",
        "tags",
        "fields",
        "modifier",
        "modified",
    ];

    fn check_attributes(data: &Map<String, Value>) -> Result<(), StoreError> {
        if let Some(Value::Object(fields)) = data.get("fields") {
            if let Some((name, _)) = fields.iter().find(|(_, value)| !value.is_string()) {
                return Err(StoreError::UnsupportedFieldType {
                    entity: Self::KIND,
                    field: format!("fields.{name}"),
                });
            }
        }
        Ok(())
    }
}

#[derive(Serialize)]
struct EnvelopeOut<'a, E> {
    v: u32,
    kind: EntityKind,
    data: &'a E,
}

/// Encode `entity` into its stored form.
///
/// # Errors
///
/// Returns [`StoreError::Decode`] if serialization fails.
pub fn encode<E: Encodable>(entity: &E) -> Result<String, StoreError> {
    let envelope = EnvelopeOut {
        v: ENCODING_VERSION,
        kind: E::KIND,
        data: entity,
    };
    Ok(serde_json::to_string(&envelope)?)
}

/// Decode a stored value as `E`.
///
/// # Errors
///
/// Returns [`StoreError::Decode`] if `raw` is not an envelope of the right
/// version and kind, or its data has the wrong shape.
/// Returns [`StoreError::UnsupportedFieldType`] if the data carries an
/// attribute this codec cannot represent.
pub fn decode<E: Encodable>(raw: &str) -> Result<E, StoreError> {
    let value: Value = serde_json::from_str(raw)?;
    let Value::Object(mut envelope) = value else {
        return Err(StoreError::decode(format!(
            "stored {} is not a JSON object",
            E::KIND
        )));
    };

    let version = envelope.get("v").and_then(Value::as_u64);
    if version != Some(u64::from(ENCODING_VERSION)) {
        return Err(StoreError::decode(format!(
            "unsupported encoding version {version:?} for {}",
            E::KIND
        )));
    }

    let kind = envelope.get("kind").and_then(Value::as_str);
    if kind != Some(E::KIND.as_str()) {
        return Err(StoreError::decode(format!(
            "expected a stored {}, found {kind:?}",
            E::KIND
        )));
    }

    let Some(Value::Object(data)) = envelope.remove("data") else {
        return Err(StoreError::decode(format!(
            "stored {} has no data object",
            E::KIND
        )));
    };

    if let Some(unknown) = data.keys().find(|name| !E::ATTRIBUTES.contains(&name.as_str())) {
        return Err(StoreError::UnsupportedFieldType {
            entity: E::KIND,
            field: unknown.clone(),
        });
    }
    E::check_attributes(&data)?;

    Ok(serde_json::from_value(Value::Object(data))?)
}

/// Reject unknown attributes inside an embedded policy.
fn check_embedded_policy(entity: EntityKind, data: &Map<String, Value>) -> Result<(), StoreError> {
    if let Some(Value::Object(policy)) = data.get("policy") {
        if let Some(unknown) = policy
            .keys()
            .find(|name| !POLICY_ATTRIBUTES.contains(&name.as_str()))
        {
            return Err(StoreError::UnsupportedFieldType {
                entity,
                field: format!("policy.{unknown}"),
            });
        }
    }
    Ok(())
}

// =========================================================================
// Recipe entries
// =========================================================================

/// Encode one recipe entry as a list element.
///
/// # Errors
///
/// Returns [`StoreError::Decode`] if serialization fails.
pub fn encode_entry(entry: &RecipeEntry) -> Result<String, StoreError> {
    Ok(serde_json::to_string(&(&entry.bag, &entry.filter))?)
}

/// Decode one recipe list element.
///
/// # Errors
///
/// Returns [`StoreError::Decode`] if the element is not a two-element
/// `[string, string|null]` array.
pub fn decode_entry(raw: &str) -> Result<RecipeEntry, StoreError> {
    let (bag, filter): (String, Option<String>) = serde_json::from_str(raw)?;
    Ok(RecipeEntry { bag, filter })
}

// =========================================================================
// Revision pointer
// =========================================================================

/// Encode a current-revision pointer.
pub fn encode_pointer(revision: u64) -> String {
    revision.to_string()
}

/// Decode a current-revision pointer.
///
/// # Errors
///
/// Returns [`StoreError::Decode`] if the value is not a positive integer.
pub fn decode_pointer(raw: &str) -> Result<u64, StoreError> {
    match raw.trim().parse::<u64>() {
        Ok(0) => Err(StoreError::decode("revision pointer is 0")),
        Ok(n) => Ok(n),
        Err(e) => Err(StoreError::decode(format!(
            "revision pointer `{raw}` is not an integer: {e}"
        ))),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeMap;

    use tiddlystore_types::Constraint;

    use super::*;

    fn sample_policy() -> Policy {
        let mut policy = Policy {
            owner: Some("cdent".to_owned()),
            ..Policy::default()
        };
        policy.principals_mut(Constraint::Accept).push("cdent".to_owned());
        policy.principals_mut(Constraint::Read).extend(["R:ADMIN".to_owned(), "fnd".to_owned()]);
        policy
    }

    #[test]
    fn bag_roundtrip() {
        let bag = Bag {
            name: "testone".to_owned(),
            desc: "a bag".to_owned(),
            policy: sample_policy(),
        };
        let decoded: Bag = decode(&encode(&bag).unwrap()).unwrap();
        assert_eq!(decoded, bag);

        let empty = Bag::new("empty");
        let decoded: Bag = decode(&encode(&empty).unwrap()).unwrap();
        assert_eq!(decoded, empty);
    }

    #[test]
    fn revision_roundtrip_with_empty_and_full_collections() {
        let empty = Revision::default();
        let decoded: Revision = decode(&encode(&empty).unwrap()).unwrap();
        assert_eq!(decoded, empty);

        let mut fields = BTreeMap::new();
        fields.insert("field key one".to_owned(), "fieldvalueone".to_owned());
        fields.insert("field key two".to_owned(), String::new());
        let full = Revision {
            text: "cow\nmoo".to_owned(),
            content_type: Some("text/x-markdown".to_owned()),
            tags: vec!["tagtwo".to_owned(), "tagone".to_owned(), "tagtwo".to_owned()],
            fields,
            modifier: Some("cdent".to_owned()),
            modified: 1_201_950_671,
        };
        let decoded: Revision = decode(&encode(&full).unwrap()).unwrap();
        assert_eq!(decoded, full);
    }

    #[test]
    fn user_and_recipe_roundtrip() {
        let mut user = User::new("cdent");
        user.credential = Some("sha256$abc".to_owned());
        user.add_role("ADMIN");
        user.note = Some("A simple programmer of matter".to_owned());
        user.policy = sample_policy();
        let decoded: User = decode(&encode(&user).unwrap()).unwrap();
        assert_eq!(decoded, user);

        let recipe = Recipe::new("cow");
        let record = RecipeRecord::of(&recipe);
        let decoded: RecipeRecord = decode(&encode(&record).unwrap()).unwrap();
        assert_eq!(decoded.into_recipe(Vec::new()), recipe);

        let policy = sample_policy();
        let decoded: Policy = decode(&encode(&policy).unwrap()).unwrap();
        assert_eq!(decoded, policy);
    }

    #[test]
    fn encoding_is_deterministic() {
        let mut a = Revision::default();
        a.fields.insert("b".to_owned(), "2".to_owned());
        a.fields.insert("a".to_owned(), "1".to_owned());
        let mut b = Revision::default();
        b.fields.insert("a".to_owned(), "1".to_owned());
        b.fields.insert("b".to_owned(), "2".to_owned());
        assert_eq!(encode(&a).unwrap(), encode(&b).unwrap());
    }

    #[test]
    fn structurally_invalid_values_are_decode_errors() {
        for raw in [
            "",
            "{\"v\":1,\"kind\":\"bag\"",
            "[1,2]",
            "{\"v\":2,\"kind\":\"bag\",\"data\":{}}",
            "{\"v\":1,\"kind\":\"user\",\"data\":{}}",
            "{\"v\":1,\"kind\":\"bag\",\"data\":[]}",
            "{\"v\":1,\"kind\":\"bag\",\"data\":{\"name\":7}}",
        ] {
            let result: Result<Bag, _> = decode(raw);
            assert!(matches!(result, Err(StoreError::Decode(_))), "{raw}");
        }
    }

    #[test]
    fn unknown_attributes_are_unsupported() {
        let raw = "{\"v\":1,\"kind\":\"bag\",\"data\":{\"name\":\"a\",\"desc\":\"\",\
                   \"policy\":{},\"colour\":\"red\"}}";
        let result: Result<Bag, _> = decode(raw);
        assert!(matches!(
            result,
            Err(StoreError::UnsupportedFieldType { entity: EntityKind::Bag, ref field })
                if field == "colour"
        ));

        let raw = "{\"v\":1,\"kind\":\"bag\",\"data\":{\"name\":\"a\",\"desc\":\"\",\
                   \"policy\":{\"bless\":[]}}}";
        let result: Result<Bag, _> = decode(raw);
        assert!(matches!(
            result,
            Err(StoreError::UnsupportedFieldType { ref field, .. }) if field == "policy.bless"
        ));
    }

    #[test]
    fn non_string_field_values_are_unsupported() {
        let raw = "{\"v\":1,\"kind\":\"revision\",\"data\":{\"text\":\"\",\
                   \"content_type\":null,\"tags\":[],\"fields\":{\"count\":3},\
                   \"modifier\":null,\"modified\":0}}";
        let result: Result<Revision, _> = decode(raw);
        assert!(matches!(
            result,
            Err(StoreError::UnsupportedFieldType { entity: EntityKind::Revision, ref field })
                if field == "fields.count"
        ));
    }

    #[test]
    fn recipe_entries_encode_individually() {
        let filtered = RecipeEntry::filtered("alpha", "select=tag:systemConfig");
        let plain = RecipeEntry::bag("beta");
        assert_eq!(
            encode_entry(&filtered).unwrap(),
            "[\"alpha\",\"select=tag:systemConfig\"]"
        );
        assert_eq!(encode_entry(&plain).unwrap(), "[\"beta\",null]");
        assert_eq!(decode_entry(&encode_entry(&filtered).unwrap()).unwrap(), filtered);
        assert!(matches!(decode_entry("[\"x\"]"), Err(StoreError::Decode(_))));
    }

    #[test]
    fn pointers_must_be_positive_integers() {
        assert_eq!(decode_pointer(&encode_pointer(7)).unwrap(), 7);
        assert!(decode_pointer("0").is_err());
        assert!(decode_pointer("seven").is_err());
    }
}
