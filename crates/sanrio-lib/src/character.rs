//! Character record schema and validation rules.
//!
//! [`CharacterCreate`] is both the request payload for create/update and the
//! document body stored in the index. The store assigns the identity, so the
//! payload never carries an `id`; responses pair the two through [`Character`].
//! Reads go through [`StoredCharacter`], which passes stored documents back
//! as they are.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Franchise recorded when the payload omits one.
pub const DEFAULT_FRANCHISE: &str = "Sanrio";

/// Earliest accepted debut year (inclusive).
pub const DEBUT_YEAR_MIN: i64 = 1900;

/// Latest accepted debut year (inclusive).
pub const DEBUT_YEAR_MAX: i64 = 2100;

/// Payload accepted by the create and update endpoints.
///
/// Deserialization fills defaults (`franchise = "Sanrio"`, empty `tags`);
/// the range and length rules are enforced by [`Validate::validate`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterCreate {
    pub name: String,

    #[serde(default = "default_franchise")]
    pub franchise: Option<String>,

    #[serde(default)]
    pub species: Option<String>,

    #[serde(default)]
    pub debut_year: Option<i64>,

    /// Exact-match keywords; an explicit `null` is read as empty.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub tags: Vec<String>,

    #[serde(default)]
    pub description: Option<String>,
}

fn default_franchise() -> Option<String> {
    Some(DEFAULT_FRANCHISE.to_string())
}

fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<Vec<String>>::deserialize(deserializer).map(Option::unwrap_or_default)
}

impl CharacterCreate {
    /// Build a payload with only a name; every other field takes its default.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            franchise: default_franchise(),
            species: None,
            debut_year: None,
            tags: Vec::new(),
            description: None,
        }
    }

    /// Deserialize and validate in one step.
    pub fn from_json(value: serde_json::Value) -> crate::Result<Self> {
        let payload: Self = serde_json::from_value(value)?;
        payload.validate()?;
        Ok(payload)
    }

    /// The payload as the JSON document written to the store.
    pub fn to_document(&self) -> crate::Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }
}

/// A stored character: the store-assigned identity plus its fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Character {
    pub id: String,

    #[serde(flatten)]
    pub fields: CharacterCreate,
}

impl Character {
    pub fn new(id: impl Into<String>, fields: CharacterCreate) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }
}

/// A character read back from the store: the stored fields plus `id`.
///
/// Documents written outside the API may not satisfy [`CharacterCreate`], so
/// the source is not re-validated. The store id replaces any `id` field the
/// document carries. A non-object source contributes no fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StoredCharacter(Map<String, Value>);

impl StoredCharacter {
    pub fn from_source(id: impl Into<String>, source: Value) -> Self {
        let mut fields = match source {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        fields.insert("id".to_string(), Value::String(id.into()));
        Self(fields)
    }

    pub fn id(&self) -> &str {
        self.0.get("id").and_then(Value::as_str).unwrap_or_default()
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }
}

impl From<Character> for StoredCharacter {
    fn from(character: Character) -> Self {
        let source = serde_json::to_value(&character.fields).unwrap_or(Value::Null);
        Self::from_source(character.id, source)
    }
}

/// A single violated constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Every constraint a payload violated, in field order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValidationErrors(pub Vec<FieldError>);

impl ValidationErrors {
    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self(vec![FieldError::new(field, message)])
    }

    pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.push(FieldError::new(field, message));
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.0
    }

    /// `Ok(())` when nothing was recorded, otherwise `Err(self)`.
    pub fn into_result(self) -> std::result::Result<(), Self> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined = self
            .0
            .iter()
            .map(|e| format!("{}: {}", e.field, e.message))
            .collect::<Vec<_>>()
            .join("; ");
        write!(f, "validation failed: {}", joined)
    }
}

impl std::error::Error for ValidationErrors {}

/// Validation trait for incoming payloads.
///
/// Implementations check every rule and report all violations at once.
pub trait Validate {
    fn validate(&self) -> std::result::Result<(), ValidationErrors>;
}

impl Validate for CharacterCreate {
    fn validate(&self) -> std::result::Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();

        if self.name.is_empty() {
            errors.push("name", "name must contain at least 1 character");
        }

        if let Some(year) = self.debut_year {
            if !(DEBUT_YEAR_MIN..=DEBUT_YEAR_MAX).contains(&year) {
                errors.push(
                    "debut_year",
                    format!(
                        "debut_year must be in range {}-{}",
                        DEBUT_YEAR_MIN, DEBUT_YEAR_MAX
                    ),
                );
            }
        }

        errors.into_result()
    }
}
