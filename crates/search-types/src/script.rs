//! Server-side update scripts.
//!
//! A script is a list of typed statements plus a parameter table. The
//! statements render to Painless for HTTP backends and can be applied
//! directly by in-process backends, so both see the same update.

use serde_json::{json, Map, Value};

use crate::field::FieldPath;

/// One script statement. Parameters are referenced by key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptStatement {
    /// `ctx._source.<path> = params.<param>;`
    Set { path: FieldPath, param: String },
    /// Remove the field at `path`
    RemoveField { path: FieldPath },
    /// Append `params.<param>` to the list unless already contained
    AddIfAbsent { path: FieldPath, param: String },
    /// Remove list elements whose `identity` field equals the parameter's
    RemoveMatching {
        path: FieldPath,
        param: String,
        identity: String,
    },
}

impl ScriptStatement {
    /// Append the Painless rendering of this statement.
    pub fn render_into(&self, out: &mut String) {
        match self {
            ScriptStatement::Set { path, param } => {
                out.push_str(&format!("ctx._source{} = params.{};", path.accessor(), param));
            }
            ScriptStatement::RemoveField { path } => {
                let parent = path.parent().unwrap_or_default();
                let leaf = path.leaf().unwrap_or_default();
                out.push_str(&format!(
                    "ctx._source{}.remove('{}');",
                    parent.accessor(),
                    leaf
                ));
            }
            ScriptStatement::AddIfAbsent { path, param } => {
                let target = path.accessor();
                out.push_str(&format!(
                    "if (!ctx._source{target}.contains(params.{param})) {{ctx._source{target}.add(params.{param})}}"
                ));
            }
            ScriptStatement::RemoveMatching {
                path,
                param,
                identity,
            } => {
                out.push_str(&format!(
                    "ctx._source{}.removeIf(item -> item.{id} == params.{}.{id});",
                    path.accessor(),
                    param,
                    id = identity
                ));
            }
        }
    }
}

/// Compiled update script: statements plus named parameters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateScript {
    statements: Vec<ScriptStatement>,
    params: Map<String, Value>,
}

impl UpdateScript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, statement: ScriptStatement) {
        self.statements.push(statement);
    }

    /// Register a parameter. Returns `false` if the key is already taken.
    pub fn insert_param(&mut self, key: impl Into<String>, value: Value) -> bool {
        let key = key.into();
        if self.params.contains_key(&key) {
            return false;
        }
        self.params.insert(key, value);
        true
    }

    pub fn statements(&self) -> &[ScriptStatement] {
        &self.statements
    }

    pub fn params(&self) -> &Map<String, Value> {
        &self.params
    }

    pub fn param(&self, key: &str) -> Option<&Value> {
        self.params.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    /// Painless source for the whole script.
    pub fn source(&self) -> String {
        let mut out = String::new();
        for statement in &self.statements {
            statement.render_into(&mut out);
        }
        out
    }

    /// Request body fragment: `{"source", "lang", "params"}`.
    pub fn to_json(&self) -> Value {
        json!({
            "source": self.source(),
            "lang": "painless",
            "params": Value::Object(self.params.clone()),
        })
    }
}
