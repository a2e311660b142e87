//! Typed schema to wire JSON Schema.
//!
//! Wire rules:
//! - every object lists all of its keys in `required` and sets
//!   `additionalProperties: false`; optionality is expressed through `null`
//! - field-level primitives are `[type, "null"]` unions, regardless of
//!   whether the source declared them nullable
//! - array items use a stricter rule: bare primitive types, no enums or literals

use serde_json::{Map, Value};

use super::{
    custom::{
        CustomType, CURRENCY_AMOUNT, CURRENCY_CODE, EXTEND_TYPE_KEY, SIGNATURE_DATE,
        SIGNATURE_IS_SIGNED, SIGNATURE_PRINTED_NAME, SIGNATURE_TITLE_OR_ROLE,
    },
    types::{ObjectSchema, Schema, SchemaKind},
};
use crate::errors::SchemaConversionError;

type Node = Map<String, Value>;

/// Convert an object schema into the wire format.
pub fn convert(schema: &ObjectSchema) -> Result<Value, SchemaConversionError> {
    let mut path = Vec::new();
    convert_object(schema, &mut path).map(Value::Object)
}

/// Convert any schema node whose unwrapped form is a plain object.
pub fn convert_schema(schema: &Schema) -> Result<Value, SchemaConversionError> {
    let unwrapped = Unwrapped::of(schema);
    match (&unwrapped.inner.kind, unwrapped.custom) {
        (SchemaKind::Object(obj), None) => convert(obj),
        (kind, custom) => Err(SchemaConversionError::new(
            &[],
            format!(
                "root schema must be an object, got {}",
                custom.map(|c| c.tag()).unwrap_or_else(|| kind.name())
            ),
        )),
    }
}

/// A node with its nullable/optional/default wrappers peeled off.
struct Unwrapped<'a> {
    inner: &'a Schema,
    description: Option<&'a str>,
    custom: Option<CustomType>,
}

impl<'a> Unwrapped<'a> {
    // Outermost non-empty description wins.
    fn of(schema: &'a Schema) -> Self {
        let mut current = schema;
        let mut description = None;
        let mut custom = None;
        loop {
            if description.is_none() {
                description = current
                    .description
                    .as_deref()
                    .filter(|d| !d.trim().is_empty());
            }
            if custom.is_none() {
                custom = current.custom;
            }
            match current.modifier_inner() {
                Some(inner) => current = inner,
                None => break,
            }
        }
        Self {
            inner: current,
            description,
            custom,
        }
    }

    fn finish(&self, mut node: Node) -> Node {
        if let Some(description) = self.description {
            node.insert("description".into(), Value::String(description.to_string()));
        }
        node
    }
}

fn nullable_type(name: &str) -> Node {
    let mut node = Node::new();
    node.insert("type".into(), Value::from(vec![name, "null"]));
    node
}

fn bare_type(name: &str) -> Node {
    let mut node = Node::new();
    node.insert("type".into(), Value::from(name));
    node
}

fn tagged(mut node: Node, custom: CustomType) -> Node {
    node.insert(EXTEND_TYPE_KEY.into(), Value::from(custom.tag()));
    node
}

fn object_node(properties: Vec<(String, Node)>) -> Node {
    let required = properties
        .iter()
        .map(|(name, _)| Value::String(name.clone()))
        .collect::<Vec<_>>();
    let properties = properties
        .into_iter()
        .map(|(name, node)| (name, Value::Object(node)))
        .collect::<Map<_, _>>();

    let mut node = Node::new();
    node.insert("type".into(), Value::from("object"));
    node.insert("properties".into(), Value::Object(properties));
    node.insert("required".into(), Value::Array(required));
    node.insert("additionalProperties".into(), Value::Bool(false));
    node
}

fn enum_node(values: &[Value]) -> Node {
    let mut members: Vec<Value> = Vec::with_capacity(values.len() + 1);
    for value in values.iter().chain(std::iter::once(&Value::Null)) {
        if !members.contains(value) {
            members.push(value.clone());
        }
    }
    let mut node = Node::new();
    node.insert("enum".into(), Value::Array(members));
    node
}

/// Fixed wire shape of a custom type at field level.
fn custom_node(custom: CustomType) -> Node {
    let node = match custom {
        CustomType::Date => nullable_type("string"),
        CustomType::Currency => object_node(vec![
            (CURRENCY_AMOUNT.into(), nullable_type("number")),
            (CURRENCY_CODE.into(), nullable_type("string")),
        ]),
        CustomType::Signature => object_node(vec![
            (SIGNATURE_PRINTED_NAME.into(), nullable_type("string")),
            (SIGNATURE_DATE.into(), custom_node(CustomType::Date)),
            (SIGNATURE_IS_SIGNED.into(), nullable_type("boolean")),
            (SIGNATURE_TITLE_OR_ROLE.into(), nullable_type("string")),
        ]),
    };
    tagged(node, custom)
}

fn unsupported(path: &[String], what: impl std::fmt::Display) -> SchemaConversionError {
    SchemaConversionError::new(path, format!("unsupported schema type: {what}"))
}

fn convert_object(obj: &ObjectSchema, path: &mut Vec<String>) -> Result<Node, SchemaConversionError> {
    let mut properties = Vec::with_capacity(obj.len());
    for (name, field) in obj.fields() {
        path.push(name.to_string());
        let node = convert_field(field, path)?;
        path.pop();
        properties.push((name.to_string(), node));
    }
    Ok(object_node(properties))
}

fn convert_field(schema: &Schema, path: &mut Vec<String>) -> Result<Node, SchemaConversionError> {
    let unwrapped = Unwrapped::of(schema);
    if let Some(custom) = unwrapped.custom {
        return Ok(unwrapped.finish(custom_node(custom)));
    }

    let node = match &unwrapped.inner.kind {
        SchemaKind::String => nullable_type("string"),
        SchemaKind::Number => nullable_type("number"),
        SchemaKind::Integer => nullable_type("integer"),
        SchemaKind::Boolean => nullable_type("boolean"),
        SchemaKind::Enum(values) => enum_node(values),
        SchemaKind::Literal(value @ Value::String(_)) => enum_node(std::slice::from_ref(value)),
        SchemaKind::Literal(other) => {
            return Err(SchemaConversionError::new(
                path,
                format!("unsupported schema type: non-string literal {other}"),
            ))
        }
        SchemaKind::Array(item) => {
            let items = convert_item(item, path)?;
            let mut node = nullable_type("array");
            node.insert("items".into(), Value::Object(items));
            node
        }
        SchemaKind::Object(obj) => convert_object(obj, path)?,
        other => return Err(unsupported(path, other)),
    };
    Ok(unwrapped.finish(node))
}

// Item errors name the enclosing field; fields inside an item object are
// reported relative to that object.
fn convert_item(schema: &Schema, path: &mut Vec<String>) -> Result<Node, SchemaConversionError> {
    let unwrapped = Unwrapped::of(schema);
    let node = match unwrapped.custom {
        Some(CustomType::Date) => tagged(bare_type("string"), CustomType::Date),
        Some(custom) => custom_node(custom),
        None => match &unwrapped.inner.kind {
            SchemaKind::String => bare_type("string"),
            SchemaKind::Number => bare_type("number"),
            SchemaKind::Integer => bare_type("integer"),
            SchemaKind::Boolean => bare_type("boolean"),
            SchemaKind::Array(inner) => {
                let items = convert_item(inner, path)?;
                let mut node = bare_type("array");
                node.insert("items".into(), Value::Object(items));
                node
            }
            SchemaKind::Object(obj) => convert_object(obj, &mut Vec::new())?,
            kind @ (SchemaKind::Enum(_) | SchemaKind::Literal(_)) => {
                return Err(SchemaConversionError::new(
                    path,
                    format!("{} is not supported as an array item", kind.name()),
                ))
            }
            other => return Err(unsupported(path, other)),
        },
    };
    Ok(unwrapped.finish(node))
}
