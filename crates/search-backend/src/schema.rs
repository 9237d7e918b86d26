//! Index definition sent on creation.
//!
//! Combines the entity's declared field mapping with the generated analyzer
//! set:
//! - one `<tokenizer>custom` analyzer per [`Tokenizer`], lowercase filter
//!   plus the `io` char filter
//! - one `<filter>custom` analyzer per [`CharFilter`] other than `io`,
//!   whitespace tokenizer with char filters `[io, <filter>]`
//! - a `document` analyzer, only for indexes of document types
//!
//! Every index also maps `id` and `tenantId`.

use serde_json::{json, Map, Value};

use search_types::{
    AnalyzerRef, CharFilter, FieldKind, IndexMapping, Tokenizer, TENANT_FIELD,
};

use crate::error::BackendError;

/// Look-alike letters folded by the `io` char filter.
pub const IO_MAPPINGS: [&str; 2] = ["ё => е", "Ё => Е"];

const LOWERCASE: &str = "lowercase";

/// Everything needed to create one backend index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexDefinition {
    name: String,
    mapping: IndexMapping,
    document: bool,
}

impl IndexDefinition {
    pub fn new(name: impl Into<String>, mapping: IndexMapping) -> Self {
        Self {
            name: name.into(),
            mapping,
            document: false,
        }
    }

    /// Mark the index as holding document types (adds the `document` analyzer).
    pub fn with_document_analyzer(mut self, document: bool) -> Self {
        self.document = document;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mapping(&self) -> &IndexMapping {
        &self.mapping
    }

    pub fn is_document(&self) -> bool {
        self.document
    }

    /// Names of every analyzer this definition generates.
    pub fn analyzer_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Tokenizer::ALL
            .iter()
            .map(|t| AnalyzerRef::Tokenizer(*t).name())
            .collect();
        names.extend(
            CharFilter::ALL
                .iter()
                .filter(|c| **c != CharFilter::Io)
                .map(|c| AnalyzerRef::CharFilter(*c).name()),
        );
        if self.document {
            names.push(AnalyzerRef::Document.name());
        }
        names
    }

    /// Reject fields that reference an analyzer this index will not have.
    pub fn validate(&self) -> Result<(), BackendError> {
        check_analyzers(&self.mapping, &self.analyzer_names())
    }

    /// `settings.analysis` body.
    pub fn analysis(&self) -> Value {
        let mut analyzers = Map::new();
        for tokenizer in Tokenizer::ALL {
            analyzers.insert(
                AnalyzerRef::Tokenizer(tokenizer).name(),
                custom_analyzer(tokenizer.name(), &[CharFilter::Io.name()]),
            );
        }
        for filter in CharFilter::ALL {
            if filter == CharFilter::Io {
                continue;
            }
            analyzers.insert(
                AnalyzerRef::CharFilter(filter).name(),
                custom_analyzer(
                    Tokenizer::Whitespace.name(),
                    &[CharFilter::Io.name(), filter.name()],
                ),
            );
        }
        if self.document {
            analyzers.insert(
                AnalyzerRef::Document.name(),
                custom_analyzer(Tokenizer::Whitespace.name(), &[CharFilter::Io.name()]),
            );
        }

        let mut char_filters = Map::new();
        char_filters.insert(
            CharFilter::Html.name().to_string(),
            json!({ "type": "html_strip" }),
        );
        char_filters.insert(
            CharFilter::Io.name().to_string(),
            json!({ "type": "mapping", "mappings": IO_MAPPINGS }),
        );

        json!({
            "analyzer": Value::Object(analyzers),
            "char_filter": Value::Object(char_filters),
        })
    }

    /// `mappings.properties` body, including `id` and `tenantId`.
    pub fn properties(&self) -> Value {
        let mut properties = properties_of(&self.mapping);
        properties
            .entry("id")
            .or_insert_with(|| json!({ "type": "keyword" }));
        properties
            .entry(TENANT_FIELD)
            .or_insert_with(|| json!({ "type": "integer" }));
        Value::Object(properties)
    }

    /// Full create-index request body.
    pub fn to_json(&self) -> Value {
        json!({
            "settings": { "analysis": self.analysis() },
            "mappings": { "properties": self.properties() },
        })
    }
}

fn custom_analyzer(tokenizer: &str, char_filters: &[&str]) -> Value {
    json!({
        "type": "custom",
        "tokenizer": tokenizer,
        "filter": [LOWERCASE],
        "char_filter": char_filters,
    })
}

fn properties_of(mapping: &IndexMapping) -> Map<String, Value> {
    mapping
        .fields()
        .iter()
        .map(|f| (f.name.clone(), kind_to_json(&f.kind)))
        .collect()
}

fn kind_to_json(kind: &FieldKind) -> Value {
    match kind {
        FieldKind::Text { analyzer: None } => json!({ "type": "text" }),
        FieldKind::Text {
            analyzer: Some(analyzer),
        } => json!({ "type": "text", "analyzer": analyzer.name() }),
        FieldKind::Keyword => json!({ "type": "keyword" }),
        FieldKind::Integer => json!({ "type": "integer" }),
        FieldKind::Long => json!({ "type": "long" }),
        FieldKind::Float => json!({ "type": "float" }),
        FieldKind::Boolean => json!({ "type": "boolean" }),
        FieldKind::Date => json!({ "type": "date" }),
        FieldKind::Object(inner) => {
            json!({ "type": "object", "properties": Value::Object(properties_of(inner)) })
        }
        FieldKind::Nested(inner) => {
            json!({ "type": "nested", "properties": Value::Object(properties_of(inner)) })
        }
    }
}

fn check_analyzers(mapping: &IndexMapping, known: &[String]) -> Result<(), BackendError> {
    for field in mapping.fields() {
        match &field.kind {
            FieldKind::Text {
                analyzer: Some(analyzer),
            } => {
                let name = analyzer.name();
                if !known.contains(&name) {
                    return Err(BackendError::Config(format!(
                        "field {} uses undefined analyzer {}",
                        field.name, name
                    )));
                }
            }
            FieldKind::Object(inner) | FieldKind::Nested(inner) => {
                check_analyzers(inner, known)?;
            }
            _ => {}
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn files_mapping() -> IndexMapping {
        IndexMapping::new()
            .text_with("Title", AnalyzerRef::Tokenizer(Tokenizer::Whitespace))
            .keyword("Extension")
            .nested(
                "Shares",
                IndexMapping::new().keyword("Id").text("Name"),
            )
    }

    #[test]
    fn test_analyzer_set() {
        let def = IndexDefinition::new("files", files_mapping());
        assert_eq!(
            def.analyzer_names(),
            vec!["standardcustom", "whitespacecustom", "uax_url_emailcustom", "htmlcustom"]
        );

        let analysis = def.analysis();
        assert_eq!(analysis["analyzer"]["htmlcustom"]["tokenizer"], "whitespace");
        assert_eq!(
            analysis["analyzer"]["htmlcustom"]["char_filter"],
            json!(["io", "html"])
        );
        assert_eq!(
            analysis["analyzer"]["uax_url_emailcustom"]["char_filter"],
            json!(["io"])
        );
        assert!(analysis["analyzer"].get("document").is_none());
        assert_eq!(analysis["char_filter"]["html"]["type"], "html_strip");
        assert_eq!(analysis["char_filter"]["io"]["mappings"], json!(IO_MAPPINGS));
    }

    #[test]
    fn test_document_analyzer_only_for_documents() {
        let def = IndexDefinition::new("files", files_mapping()).with_document_analyzer(true);
        assert!(def.analyzer_names().contains(&"document".to_string()));
        assert_eq!(def.analysis()["analyzer"]["document"]["tokenizer"], "whitespace");
    }

    #[test]
    fn test_properties_include_identity_fields() {
        let def = IndexDefinition::new("files", files_mapping());
        let props = def.properties();
        assert_eq!(props["id"]["type"], "keyword");
        assert_eq!(props["tenantId"]["type"], "integer");
        assert_eq!(props["title"]["analyzer"], "whitespacecustom");
        assert_eq!(props["shares"]["type"], "nested");
        assert_eq!(props["shares"]["properties"]["name"]["type"], "text");
    }

    #[test]
    fn test_declared_id_wins() {
        let def = IndexDefinition::new("users", IndexMapping::new().long("Id"));
        assert_eq!(def.properties()["id"]["type"], "long");
    }

    #[test]
    fn test_validate_rejects_document_analyzer_on_plain_index() {
        let mapping = IndexMapping::new().text_with("Body", AnalyzerRef::Document);
        let plain = IndexDefinition::new("notes", mapping.clone());
        assert!(matches!(plain.validate(), Err(BackendError::Config(_))));

        let docs = IndexDefinition::new("notes", mapping).with_document_analyzer(true);
        assert!(docs.validate().is_ok());
    }
}
