//! Secret references, documents and values.

use secrecy::{ExposeSecret, SecretBox, SecretString};
use std::fmt;
use zeroize::Zeroizing;

/// Caller-supplied reference to a secret.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SecretRef {
    /// Registered provider name
    pub provider_name: String,
    /// Vault path (HashiCorp) or numeric id (Secret Server)
    pub path_or_id: String,
    /// Field to extract; the whole document when unset
    pub field: Option<String>,
}

impl SecretRef {
    /// Reference a whole secret document.
    #[must_use]
    pub fn new(provider_name: impl Into<String>, path_or_id: impl Into<String>) -> Self {
        Self {
            provider_name: provider_name.into(),
            path_or_id: path_or_id.into(),
            field: None,
        }
    }

    /// Select one field of the secret.
    #[must_use]
    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }
}

impl fmt::Display for SecretRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.provider_name, self.path_or_id)?;
        if let Some(field) = &self.field {
            write!(f, "#{field}")?;
        }
        Ok(())
    }
}

/// One named value of a secret document.
#[derive(Debug, Clone)]
pub struct SecretField {
    key: String,
    label: Option<String>,
    value: SecretString,
}

impl SecretField {
    /// Field addressed by `key` only.
    #[must_use]
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            label: None,
            value: SecretString::from(value.into()),
        }
    }

    /// Add a display label that also addresses the field.
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Field key.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Field value.
    #[must_use]
    pub const fn value(&self) -> &SecretString {
        &self.value
    }

    fn matches(&self, name: &str) -> bool {
        self.key == name
            || self
                .label
                .as_deref()
                .is_some_and(|label| label.eq_ignore_ascii_case(name))
    }
}

/// All fields of one secret as read from a vault.
#[derive(Debug, Clone, Default)]
pub struct SecretDocument {
    fields: Vec<SecretField>,
}

impl SecretDocument {
    /// Document from its fields.
    #[must_use]
    pub const fn new(fields: Vec<SecretField>) -> Self {
        Self { fields }
    }

    /// Look a field up by key, or by label ignoring case.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&SecretString> {
        self.fields
            .iter()
            .find(|f| f.key == name)
            .or_else(|| self.fields.iter().find(|f| f.matches(name)))
            .map(SecretField::value)
    }

    /// Field keys in vault order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(SecretField::key)
    }

    /// Number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the document has no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// The document as a JSON object of key to value.
    #[must_use]
    pub fn to_json_bytes(&self) -> SecretValue {
        let map: serde_json::Map<String, serde_json::Value> = self
            .fields
            .iter()
            .map(|f| {
                (
                    f.key.clone(),
                    serde_json::Value::String(f.value.expose_secret().to_string()),
                )
            })
            .collect();
        let object = Zeroizing::new(serde_json::Value::Object(map).to_string());
        SecretValue::new(object.as_bytes().to_vec())
    }
}

/// Secret bytes handed to callers. Redacted in `Debug` and zeroed on drop.
pub struct SecretValue {
    bytes: SecretBox<Vec<u8>>,
}

impl SecretValue {
    /// Wrap raw secret bytes.
    #[must_use]
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            bytes: SecretBox::new(Box::new(bytes)),
        }
    }

    /// The secret bytes.
    #[must_use]
    pub fn expose(&self) -> &[u8] {
        self.bytes.expose_secret()
    }

    /// The secret as UTF-8, if it is valid UTF-8.
    #[must_use]
    pub fn expose_str(&self) -> Option<&str> {
        std::str::from_utf8(self.expose()).ok()
    }
}

impl From<&SecretString> for SecretValue {
    fn from(value: &SecretString) -> Self {
        Self::new(value.expose_secret().as_bytes().to_vec())
    }
}

impl fmt::Debug for SecretValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretValue([REDACTED])")
    }
}
