//! Declared field shapes and analyzer references.
//!
//! Entities describe their searchable fields with an [`IndexMapping`]
//! builder; the backend turns it into an index definition on first write.
//!
//! ```
//! use search_types::{AnalyzerRef, IndexMapping, Tokenizer};
//!
//! let mapping = IndexMapping::new()
//!     .text_with("Title", AnalyzerRef::Tokenizer(Tokenizer::Whitespace))
//!     .keyword("Extension")
//!     .long("ContentLength")
//!     .date("LastModifiedOn");
//! assert!(mapping.get("title").is_some());
//! ```

/// Tokenizer variants; each gets a `<name>custom` analyzer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tokenizer {
    Standard,
    Whitespace,
    UaxUrlEmail,
}

impl Tokenizer {
    pub const ALL: [Tokenizer; 3] = [
        Tokenizer::Standard,
        Tokenizer::Whitespace,
        Tokenizer::UaxUrlEmail,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Tokenizer::Standard => "standard",
            Tokenizer::Whitespace => "whitespace",
            Tokenizer::UaxUrlEmail => "uax_url_email",
        }
    }
}

/// Character filter variants.
///
/// `Io` normalizes look-alike letters and is applied by every generated
/// analyzer; every other variant gets its own `<name>custom` analyzer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CharFilter {
    Io,
    Html,
}

impl CharFilter {
    pub const ALL: [CharFilter; 2] = [CharFilter::Io, CharFilter::Html];

    pub fn name(&self) -> &'static str {
        match self {
            CharFilter::Io => "io",
            CharFilter::Html => "html",
        }
    }
}

/// Reference to one of the generated analyzers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnalyzerRef {
    Tokenizer(Tokenizer),
    CharFilter(CharFilter),
    /// Only defined on indexes of document types
    Document,
}

impl AnalyzerRef {
    pub fn name(&self) -> String {
        match self {
            AnalyzerRef::Tokenizer(t) => format!("{}custom", t.name()),
            AnalyzerRef::CharFilter(c) => format!("{}custom", c.name()),
            AnalyzerRef::Document => "document".to_string(),
        }
    }
}

/// Backend type of a mapped field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    Text { analyzer: Option<AnalyzerRef> },
    Keyword,
    Integer,
    Long,
    Float,
    Boolean,
    Date,
    Object(IndexMapping),
    Nested(IndexMapping),
}

/// A named, typed field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMapping {
    pub name: String,
    pub kind: FieldKind,
}

/// Ordered set of field declarations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexMapping {
    fields: Vec<FieldMapping>,
}

impl IndexMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field; a later declaration of the same name replaces the earlier one.
    pub fn field(mut self, name: &str, kind: FieldKind) -> Self {
        let name = crate::field::to_lower_camel_case(name);
        self.fields.retain(|f| f.name != name);
        self.fields.push(FieldMapping { name, kind });
        self
    }

    pub fn text(self, name: &str) -> Self {
        self.field(name, FieldKind::Text { analyzer: None })
    }

    pub fn text_with(self, name: &str, analyzer: AnalyzerRef) -> Self {
        self.field(
            name,
            FieldKind::Text {
                analyzer: Some(analyzer),
            },
        )
    }

    pub fn keyword(self, name: &str) -> Self {
        self.field(name, FieldKind::Keyword)
    }

    pub fn integer(self, name: &str) -> Self {
        self.field(name, FieldKind::Integer)
    }

    pub fn long(self, name: &str) -> Self {
        self.field(name, FieldKind::Long)
    }

    pub fn float(self, name: &str) -> Self {
        self.field(name, FieldKind::Float)
    }

    pub fn boolean(self, name: &str) -> Self {
        self.field(name, FieldKind::Boolean)
    }

    pub fn date(self, name: &str) -> Self {
        self.field(name, FieldKind::Date)
    }

    pub fn object(self, name: &str, inner: IndexMapping) -> Self {
        self.field(name, FieldKind::Object(inner))
    }

    pub fn nested(self, name: &str, inner: IndexMapping) -> Self {
        self.field(name, FieldKind::Nested(inner))
    }

    pub fn fields(&self) -> &[FieldMapping] {
        &self.fields
    }

    pub fn get(&self, name: &str) -> Option<&FieldMapping> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
