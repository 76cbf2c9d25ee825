//! Shared proptest generators.

use proptest::prelude::*;
use serde_json::{Map, Value};

/// Generate secret values, including characters that need escaping.
pub fn secret_value_strategy() -> impl Strategy<Value = String> {
    "[A-Za-z0-9!@#$%^&*\"\\\\]{8,64}"
}

/// Generate login names.
pub fn username_strategy() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_]{3,15}"
}

/// Generate Windows-style domain names.
pub fn domain_strategy() -> impl Strategy<Value = String> {
    "[A-Z]{3,10}"
}

/// Generate Secret Server ids.
pub fn secret_id_strategy() -> impl Strategy<Value = String> {
    (1u32..=u32::MAX).prop_map(|id| id.to_string())
}

/// Generate HashiCorp KV paths without empty segments.
pub fn vault_path_strategy() -> impl Strategy<Value = String> {
    prop::collection::vec("[a-z][a-z0-9_-]{1,10}", 1..4).prop_map(|segments| segments.join("/"))
}

/// Generate spellings that configuration treats as true.
pub fn truthy_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Bool(true)),
        Just(Value::from(1)),
        Just(Value::from("true")),
        Just(Value::from("True")),
        Just(Value::from("yes")),
        Just(Value::from("1")),
        Just(Value::from("on")),
    ]
}

/// Generate spellings that configuration treats as false.
pub fn falsy_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Bool(false)),
        Just(Value::from(0)),
        Just(Value::from("false")),
        Just(Value::from("no")),
        Just(Value::from("")),
        Just(Value::Null),
    ]
}

/// How a credential field appears in a mapping.
#[derive(Debug, Clone)]
pub enum FieldForm {
    /// Key left out
    Missing,
    /// Explicit null
    Null,
    /// Empty or whitespace-only string
    Blank(String),
    /// Real value
    Set(String),
}

impl FieldForm {
    /// Whether the field counts as present.
    #[must_use]
    pub const fn is_present(&self) -> bool {
        matches!(self, Self::Set(_))
    }

    fn insert_into(&self, map: &mut Map<String, Value>, key: &str) {
        match self {
            Self::Missing => {}
            Self::Null => {
                map.insert(key.to_string(), Value::Null);
            }
            Self::Blank(s) | Self::Set(s) => {
                map.insert(key.to_string(), Value::from(s.as_str()));
            }
        }
    }
}

/// Generate one credential field in any of its absent or present forms.
pub fn field_form_strategy(
    value: impl Strategy<Value = String>,
) -> impl Strategy<Value = FieldForm> {
    prop_oneof![
        Just(FieldForm::Missing),
        Just(FieldForm::Null),
        prop_oneof![Just(String::new()), Just(" ".to_string()), Just("\t ".to_string())]
            .prop_map(FieldForm::Blank),
        value.prop_map(FieldForm::Set),
    ]
}

/// A generated credential mapping for a self-hosted vault.
#[derive(Debug, Clone)]
pub struct CredentialMapping {
    /// Username form
    pub username: FieldForm,
    /// Password form
    pub password: FieldForm,
    /// Token form
    pub token: FieldForm,
    /// Domain form
    pub domain: FieldForm,
}

impl CredentialMapping {
    /// The mapping as configuration JSON, with a base URL set.
    #[must_use]
    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        map.insert("base_url".to_string(), Value::from("https://vault.test"));
        self.username.insert_into(&mut map, "username");
        self.password.insert_into(&mut map, "password");
        self.token.insert_into(&mut map, "token");
        self.domain.insert_into(&mut map, "domain");
        Value::Object(map)
    }
}

/// Generate credential mappings covering every combination of present and
/// absent fields.
pub fn credential_mapping_strategy() -> impl Strategy<Value = CredentialMapping> {
    (
        field_form_strategy(username_strategy()),
        field_form_strategy(secret_value_strategy()),
        field_form_strategy(secret_value_strategy()),
        field_form_strategy(domain_strategy()),
    )
        .prop_map(|(username, password, token, domain)| CredentialMapping {
            username,
            password,
            token,
            domain,
        })
}
