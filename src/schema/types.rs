use std::fmt;

use serde_json::Value;

use super::custom::CustomType;

/// Structural kind of a [`Schema`] node.
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaKind {
    String,
    Number,
    Integer,
    Boolean,
    Enum(Vec<Value>),
    Literal(Value),
    Array(Box<Schema>),
    Object(ObjectSchema),
    Nullable(Box<Schema>),
    Optional(Box<Schema>),
    Default(Box<Schema>, Value),
    // Constructible but rejected by the converter.
    Any,
    Null,
    Union(Vec<Schema>),
    Record(Box<Schema>),
}

impl SchemaKind {
    /// Short name used in error messages.
    pub fn name(&self) -> &'static str {
        match self {
            SchemaKind::String => "string",
            SchemaKind::Number => "number",
            SchemaKind::Integer => "integer",
            SchemaKind::Boolean => "boolean",
            SchemaKind::Enum(_) => "enum",
            SchemaKind::Literal(_) => "literal",
            SchemaKind::Array(_) => "array",
            SchemaKind::Object(_) => "object",
            SchemaKind::Nullable(_) => "nullable",
            SchemaKind::Optional(_) => "optional",
            SchemaKind::Default(_, _) => "default",
            SchemaKind::Any => "any",
            SchemaKind::Null => "null",
            SchemaKind::Union(_) => "union",
            SchemaKind::Record(_) => "record",
        }
    }
}

impl fmt::Display for SchemaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An immutable typed-schema node.
///
/// Every combinator consumes the node and returns a new one. The custom-type
/// marker set by [`extend_date`](super::extend_date) and friends survives
/// `describe`, `nullable`, `optional` and `with_default`.
///
/// ```ignore
/// use extend::schema::{self, ObjectSchema};
///
/// let invoice = ObjectSchema::new()
///     .field("number", schema::string().describe("Invoice number"))
///     .field("issued", schema::extend_date().nullable())
///     .field("total", schema::extend_currency());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    pub kind: SchemaKind,
    pub description: Option<String>,
    pub custom: Option<CustomType>,
}

impl Schema {
    pub fn new(kind: SchemaKind) -> Self {
        Self {
            kind,
            description: None,
            custom: None,
        }
    }

    pub(crate) fn with_custom(mut self, custom: CustomType) -> Self {
        self.custom = Some(custom);
        self
    }

    fn wrap(self, kind: impl FnOnce(Box<Schema>) -> SchemaKind) -> Self {
        let custom = self.custom;
        Self {
            kind: kind(Box::new(self)),
            description: None,
            custom,
        }
    }

    /// Attach a description to this node.
    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn nullable(self) -> Self {
        self.wrap(SchemaKind::Nullable)
    }

    pub fn optional(self) -> Self {
        self.wrap(SchemaKind::Optional)
    }

    pub fn with_default(self, value: impl Into<Value>) -> Self {
        let value = value.into();
        self.wrap(|inner| SchemaKind::Default(inner, value))
    }

    pub fn as_object(&self) -> Option<&ObjectSchema> {
        match &self.kind {
            SchemaKind::Object(obj) => Some(obj),
            _ => None,
        }
    }

    /// Whether this node is a nullable/optional/default wrapper.
    pub fn is_modifier(&self) -> bool {
        matches!(
            self.kind,
            SchemaKind::Nullable(_) | SchemaKind::Optional(_) | SchemaKind::Default(_, _)
        )
    }

    pub(crate) fn modifier_inner(&self) -> Option<&Schema> {
        match &self.kind {
            SchemaKind::Nullable(inner)
            | SchemaKind::Optional(inner)
            | SchemaKind::Default(inner, _) => Some(inner),
            _ => None,
        }
    }
}

/// An ordered map of named fields. The root of every convertible schema.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ObjectSchema {
    fields: Vec<(String, Schema)>,
}

impl ObjectSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field. A field with the same name is replaced in place.
    pub fn field(mut self, name: impl Into<String>, schema: Schema) -> Self {
        let name = name.into();
        match self.fields.iter_mut().find(|(existing, _)| *existing == name) {
            Some(slot) => slot.1 = schema,
            None => self.fields.push((name, schema)),
        }
        self
    }

    pub fn get(&self, name: &str) -> Option<&Schema> {
        self.fields
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, schema)| schema)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &Schema)> {
        self.fields.iter().map(|(name, schema)| (name.as_str(), schema))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn into_schema(self) -> Schema {
        Schema::new(SchemaKind::Object(self))
    }
}

impl<K: Into<String>> FromIterator<(K, Schema)> for ObjectSchema {
    fn from_iter<I: IntoIterator<Item = (K, Schema)>>(iter: I) -> Self {
        iter.into_iter()
            .fold(ObjectSchema::new(), |obj, (name, schema)| obj.field(name, schema))
    }
}

impl From<ObjectSchema> for Schema {
    fn from(value: ObjectSchema) -> Self {
        value.into_schema()
    }
}

pub fn string() -> Schema {
    Schema::new(SchemaKind::String)
}

pub fn number() -> Schema {
    Schema::new(SchemaKind::Number)
}

pub fn integer() -> Schema {
    Schema::new(SchemaKind::Integer)
}

pub fn boolean() -> Schema {
    Schema::new(SchemaKind::Boolean)
}

/// String enum.
pub fn enumeration<I, S>(values: I) -> Schema
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    Schema::new(SchemaKind::Enum(
        values.into_iter().map(|v| Value::String(v.into())).collect(),
    ))
}

/// Enum from raw JSON values, `null` included.
pub fn enumeration_values(values: impl IntoIterator<Item = Value>) -> Schema {
    Schema::new(SchemaKind::Enum(values.into_iter().collect()))
}

/// Single-value literal. Only string literals convert.
pub fn literal(value: impl Into<Value>) -> Schema {
    Schema::new(SchemaKind::Literal(value.into()))
}

pub fn array(item: Schema) -> Schema {
    Schema::new(SchemaKind::Array(Box::new(item)))
}

pub fn object<K, I>(fields: I) -> Schema
where
    K: Into<String>,
    I: IntoIterator<Item = (K, Schema)>,
{
    fields.into_iter().collect::<ObjectSchema>().into_schema()
}

pub fn any() -> Schema {
    Schema::new(SchemaKind::Any)
}

pub fn null() -> Schema {
    Schema::new(SchemaKind::Null)
}

pub fn union(variants: impl IntoIterator<Item = Schema>) -> Schema {
    Schema::new(SchemaKind::Union(variants.into_iter().collect()))
}

pub fn record(value: Schema) -> Schema {
    Schema::new(SchemaKind::Record(Box::new(value)))
}
