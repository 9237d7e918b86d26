//! Compiles update descriptors into backend update scripts.
//!
//! Every value travels as a named parameter; the script source only ever
//! contains field accessors and parameter references. Parameter keys carry
//! the position of their descriptor, so descriptors never share a key.

use serde_json::Value;

use search_types::{
    FieldPath, FieldValue, ScriptStatement, UpdateAction, UpdateDescriptor, UpdateScript,
};

use crate::error::EngineError;

/// Field compared when removing elements from a list of objects.
pub const IDENTITY_FIELD: &str = "id";

/// Accumulates statements and parameters for one update script.
#[derive(Debug, Default)]
pub struct ScriptBuilder {
    script: UpdateScript,
    descriptors: usize,
}

impl ScriptBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile a full descriptor list in order.
    pub fn compile(descriptors: &[UpdateDescriptor]) -> Result<UpdateScript, EngineError> {
        let mut builder = Self::new();
        for descriptor in descriptors {
            builder.descriptor(descriptor)?;
        }
        Ok(builder.build())
    }

    pub fn descriptor(&mut self, descriptor: &UpdateDescriptor) -> Result<&mut Self, EngineError> {
        match descriptor {
            UpdateDescriptor::FieldSet { path, value } => self.field(path, value),
            UpdateDescriptor::ListMutate {
                path,
                action,
                values,
            } => self.list(path, *action, values),
        }
    }

    /// Set or remove a single field. `Keep` contributes nothing.
    pub fn field(&mut self, path: &FieldPath, value: &FieldValue) -> Result<&mut Self, EngineError> {
        require_path(path)?;
        let ordinal = self.next_ordinal();
        match value {
            FieldValue::Keep => {}
            FieldValue::SetTo(v) => {
                let param = path.param_key(ordinal);
                self.param(&param, v.clone())?;
                self.script.push(ScriptStatement::Set {
                    path: path.clone(),
                    param,
                });
            }
            FieldValue::Remove => {
                self.script
                    .push(ScriptStatement::RemoveField { path: path.clone() });
            }
        }
        Ok(self)
    }

    /// Mutate a list field with the given action.
    pub fn list(
        &mut self,
        path: &FieldPath,
        action: UpdateAction,
        values: &[Value],
    ) -> Result<&mut Self, EngineError> {
        require_path(path)?;
        let key = path.param_key(self.next_ordinal());
        match action {
            UpdateAction::Add => {
                for (i, value) in values.iter().enumerate() {
                    let param = format!("{}_{}", key, i);
                    self.param(&param, value.clone())?;
                    self.script.push(ScriptStatement::AddIfAbsent {
                        path: path.clone(),
                        param,
                    });
                }
            }
            UpdateAction::Replace => {
                self.param(&key, Value::Array(values.to_vec()))?;
                self.script.push(ScriptStatement::Set {
                    path: path.clone(),
                    param: key,
                });
            }
            UpdateAction::Remove => {
                for (i, value) in values.iter().enumerate() {
                    let param = format!("{}_{}", key, i);
                    self.param(&param, value.clone())?;
                    self.script.push(ScriptStatement::RemoveMatching {
                        path: path.clone(),
                        param,
                        identity: IDENTITY_FIELD.to_string(),
                    });
                }
            }
            other => {
                return Err(EngineError::InvalidArgument(format!(
                    "unsupported update action: {}",
                    other
                )))
            }
        }
        Ok(self)
    }

    pub fn build(self) -> UpdateScript {
        self.script
    }

    fn next_ordinal(&mut self) -> usize {
        let ordinal = self.descriptors;
        self.descriptors += 1;
        ordinal
    }

    fn param(&mut self, key: &str, value: Value) -> Result<(), EngineError> {
        if self.script.insert_param(key, value) {
            Ok(())
        } else {
            Err(EngineError::InvalidArgument(format!(
                "duplicate script parameter {}",
                key
            )))
        }
    }
}

fn require_path(path: &FieldPath) -> Result<(), EngineError> {
    if path.is_root() {
        return Err(EngineError::InvalidArgument(
            "update target must name a field".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_set_field() {
        let script =
            ScriptBuilder::compile(&[UpdateDescriptor::set("Document.Title", "Q3 report")]).unwrap();
        assert_eq!(
            script.source(),
            "ctx._source.document.title = params.p0_document_title;"
        );
        assert_eq!(script.param("p0_document_title"), Some(&json!("Q3 report")));
    }

    #[test]
    fn test_keep_contributes_nothing() {
        let script = ScriptBuilder::compile(&[UpdateDescriptor::field("Title", FieldValue::Keep)])
            .unwrap();
        assert!(script.is_empty());
        assert!(script.params().is_empty());
    }

    #[test]
    fn test_default_value_removes_field() {
        let script = ScriptBuilder::compile(&[
            UpdateDescriptor::field("Document.Title", FieldValue::or_remove_default(String::new())),
            UpdateDescriptor::field("Size", FieldValue::or_remove_default(0i64)),
        ])
        .unwrap();
        assert_eq!(
            script.source(),
            "ctx._source.document.remove('title');ctx._source.remove('size');"
        );
        assert!(script.params().is_empty());
    }

    #[test]
    fn test_list_add_per_value() {
        let script = ScriptBuilder::compile(&[UpdateDescriptor::list(
            "Tags",
            UpdateAction::Add,
            ["a", "b"],
        )])
        .unwrap();
        assert_eq!(
            script.source(),
            "if (!ctx._source.tags.contains(params.p0_tags_0)) {ctx._source.tags.add(params.p0_tags_0)}\
             if (!ctx._source.tags.contains(params.p0_tags_1)) {ctx._source.tags.add(params.p0_tags_1)}"
        );
        assert_eq!(script.param("p0_tags_1"), Some(&json!("b")));
    }

    #[test]
    fn test_list_replace_whole_list() {
        let script = ScriptBuilder::compile(&[UpdateDescriptor::list(
            "Tags",
            UpdateAction::Replace,
            ["x"],
        )])
        .unwrap();
        assert_eq!(script.source(), "ctx._source.tags = params.p0_tags;");
        assert_eq!(script.param("p0_tags"), Some(&json!(["x"])));
    }

    #[test]
    fn test_list_remove_by_identity() {
        let script = ScriptBuilder::compile(&[UpdateDescriptor::list(
            "Shares",
            UpdateAction::Remove,
            [json!({"id": 4, "name": "ops"})],
        )])
        .unwrap();
        assert_eq!(
            script.source(),
            "ctx._source.shares.removeIf(item -> item.id == params.p0_shares_0.id);"
        );
    }

    #[test]
    fn test_same_field_set_twice_last_wins() {
        let script = ScriptBuilder::compile(&[
            UpdateDescriptor::set("Title", "a"),
            UpdateDescriptor::set("title", "b"),
        ])
        .unwrap();
        assert_eq!(
            script.source(),
            "ctx._source.title = params.p0_title;ctx._source.title = params.p1_title;"
        );
        assert_eq!(script.param("p1_title"), Some(&json!("b")));
    }

    #[test]
    fn test_add_and_remove_on_one_list() {
        let script = ScriptBuilder::compile(&[
            UpdateDescriptor::list("Tags", UpdateAction::Add, ["x"]),
            UpdateDescriptor::list("Tags", UpdateAction::Remove, [json!({"id": 1})]),
        ])
        .unwrap();
        assert_eq!(
            script.source(),
            "if (!ctx._source.tags.contains(params.p0_tags_0)) {ctx._source.tags.add(params.p0_tags_0)}\
             ctx._source.tags.removeIf(item -> item.id == params.p1_tags_0.id);"
        );
        assert_eq!(script.param("p0_tags_0"), Some(&json!("x")));
        assert_eq!(script.param("p1_tags_0"), Some(&json!({"id": 1})));
    }

    #[test]
    fn test_paths_joining_to_same_text_get_distinct_keys() {
        let script = ScriptBuilder::compile(&[
            UpdateDescriptor::set("a.b", 1),
            UpdateDescriptor::set("a_b", 2),
        ])
        .unwrap();
        assert_eq!(script.param("p0_a_b"), Some(&json!(1)));
        assert_eq!(script.param("p1_a_b"), Some(&json!(2)));
        assert_eq!(script.params().len(), 2);
    }

    #[test]
    fn test_root_path_rejected() {
        let err = ScriptBuilder::new()
            .field(&FieldPath::root(), &FieldValue::Remove)
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidArgument(_)));
    }

    #[test]
    fn test_mixed_descriptors_in_order() {
        let script = ScriptBuilder::compile(&[
            UpdateDescriptor::set("Title", "t"),
            UpdateDescriptor::remove("Owner"),
            UpdateDescriptor::list("Tags", UpdateAction::Replace, Vec::<Value>::new()),
        ])
        .unwrap();
        assert_eq!(script.statements().len(), 3);
        assert_eq!(
            script.source(),
            "ctx._source.title = params.p0_title;ctx._source.remove('owner');ctx._source.tags = params.p2_tags;"
        );
    }
}
