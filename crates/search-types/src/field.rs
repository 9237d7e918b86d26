//! Field paths and declarative update descriptors.
//!
//! A [`FieldPath`] names a (possibly nested) document field using the
//! backend's lowerCamelCase naming. Update descriptors pair a path with the
//! change to apply; the engine compiles them into backend update scripts.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CoreError;

/// Lowercase the first character, leaving the rest untouched.
///
/// `DisplayName` becomes `displayName`, `URL` becomes `uRL`.
pub fn to_lower_camel_case(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Dotted path to a document field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct FieldPath {
    segments: Vec<String>,
}

impl FieldPath {
    /// The document root.
    pub fn root() -> Self {
        Self::default()
    }

    /// Parse a dotted path such as `Document.Title`.
    pub fn parse(dotted: &str) -> Self {
        dotted
            .split('.')
            .filter(|s| !s.is_empty())
            .fold(Self::root(), |path, segment| path.field(segment))
    }

    /// Descend into a member.
    pub fn field(mut self, name: &str) -> Self {
        self.segments.push(to_lower_camel_case(name));
        self
    }

    /// Path segments from the root outward.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// `document.title`
    pub fn dotted(&self) -> String {
        self.segments.join(".")
    }

    /// `.document.title`, the suffix appended to `ctx._source` in scripts.
    pub fn accessor(&self) -> String {
        self.segments.iter().map(|s| format!(".{}", s)).collect()
    }

    /// Path of the containing object, `None` for the root.
    pub fn parent(&self) -> Option<FieldPath> {
        if self.is_root() {
            return None;
        }
        Some(FieldPath {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        })
    }

    /// Last segment.
    pub fn leaf(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    /// Script parameter identifier for the `ordinal`-th descriptor of a
    /// script targeting this path.
    ///
    /// The ordinal prefix keeps keys unique even when two paths join to the
    /// same text (`a.b` and `a_b`) or one path is targeted twice.
    pub fn param_key(&self, ordinal: usize) -> String {
        format!("p{}_{}", ordinal, self.segments.join("_"))
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.dotted())
    }
}

impl From<&str> for FieldPath {
    fn from(dotted: &str) -> Self {
        FieldPath::parse(dotted)
    }
}

impl From<String> for FieldPath {
    fn from(dotted: String) -> Self {
        FieldPath::parse(&dotted)
    }
}

/// New value for a scalar field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Leave the field untouched
    Keep,
    /// Overwrite the field
    SetTo(Value),
    /// Remove the field from the stored document
    Remove,
}

impl FieldValue {
    /// Set to any serializable value.
    pub fn serialized<V: Serialize>(value: &V) -> Result<Self, CoreError> {
        Ok(FieldValue::SetTo(serde_json::to_value(value)?))
    }

    /// `None` removes the field.
    pub fn from_option<V: Into<Value>>(value: Option<V>) -> Self {
        match value {
            Some(v) => FieldValue::SetTo(v.into()),
            None => FieldValue::Remove,
        }
    }

    /// Treat the type's default value as "remove the field".
    pub fn or_remove_default<V: Into<Value> + Default + PartialEq>(value: V) -> Self {
        if value == V::default() {
            FieldValue::Remove
        } else {
            FieldValue::SetTo(value.into())
        }
    }
}

/// How a list-valued field is mutated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum UpdateAction {
    /// Append values not already present
    Add,
    /// Overwrite the whole list
    Replace,
    /// Remove elements matching the values' identity field
    Remove,
}

impl fmt::Display for UpdateAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpdateAction::Add => write!(f, "add"),
            UpdateAction::Replace => write!(f, "replace"),
            UpdateAction::Remove => write!(f, "remove"),
        }
    }
}

impl FromStr for UpdateAction {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "add" => Ok(UpdateAction::Add),
            "replace" => Ok(UpdateAction::Replace),
            "remove" => Ok(UpdateAction::Remove),
            other => Err(CoreError::InvalidInput(format!(
                "unknown update action: {}",
                other
            ))),
        }
    }
}

impl TryFrom<u8> for UpdateAction {
    type Error = CoreError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(UpdateAction::Add),
            1 => Ok(UpdateAction::Replace),
            2 => Ok(UpdateAction::Remove),
            other => Err(CoreError::InvalidInput(format!(
                "unknown update action: {}",
                other
            ))),
        }
    }
}

/// One declarative change to a stored document.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateDescriptor {
    /// Set or remove a scalar field
    FieldSet { path: FieldPath, value: FieldValue },
    /// Mutate a list field
    ListMutate {
        path: FieldPath,
        action: UpdateAction,
        values: Vec<Value>,
    },
}

impl UpdateDescriptor {
    pub fn field(path: impl Into<FieldPath>, value: FieldValue) -> Self {
        UpdateDescriptor::FieldSet {
            path: path.into(),
            value,
        }
    }

    /// Shorthand for [`FieldValue::SetTo`].
    pub fn set(path: impl Into<FieldPath>, value: impl Into<Value>) -> Self {
        Self::field(path, FieldValue::SetTo(value.into()))
    }

    /// Shorthand for [`FieldValue::Remove`].
    pub fn remove(path: impl Into<FieldPath>) -> Self {
        Self::field(path, FieldValue::Remove)
    }

    pub fn list<V: Into<Value>>(
        path: impl Into<FieldPath>,
        action: UpdateAction,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        UpdateDescriptor::ListMutate {
            path: path.into(),
            action,
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// List mutation with structured elements (e.g. `{ "id": .., "name": .. }`).
    pub fn list_serialized<V: Serialize>(
        path: impl Into<FieldPath>,
        action: UpdateAction,
        values: &[V],
    ) -> Result<Self, CoreError> {
        let values = values
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(UpdateDescriptor::ListMutate {
            path: path.into(),
            action,
            values,
        })
    }

    pub fn path(&self) -> &FieldPath {
        match self {
            UpdateDescriptor::FieldSet { path, .. } => path,
            UpdateDescriptor::ListMutate { path, .. } => path,
        }
    }
}
