//! Build an [`ObjectSchema`] from a Rust type via [`schemars`].
//!
//! ```ignore
//! use schemars::JsonSchema;
//!
//! #[derive(JsonSchema)]
//! struct Invoice {
//!     /// Invoice number as printed.
//!     number: String,
//!     total: Option<f64>,
//!     lines: Vec<Line>,
//! }
//!
//! let schema = extend::schema::schema_for_type::<Invoice>()?;
//! let wire = extend::schema::convert(&schema)?;
//! ```
//!
//! Fields missing from `required` become optional, `Option<T>` becomes
//! nullable and strings with `format: "date"` become [`extend_date`] fields.

use schemars::JsonSchema;
use serde_json::{Map, Value};

use super::{
    custom::extend_date,
    types::{
        any, array, boolean, enumeration, enumeration_values, integer, literal, null, number,
        record, string, union, ObjectSchema, Schema,
    },
};
use crate::errors::SchemaConversionError;

const MAX_REF_DEPTH: usize = 32;

/// Infer the typed schema of `T`. `T` must describe a JSON object.
pub fn schema_for_type<T: JsonSchema>() -> Result<ObjectSchema, SchemaConversionError> {
    let root = serde_json::to_value(schemars::schema_for!(T))
        .map_err(|err| SchemaConversionError::new(&[], format!("invalid generated schema: {err}")))?;
    object_from_json_schema(&root)
}

/// Infer a typed object schema from a JSON Schema document.
pub fn object_from_json_schema(root: &Value) -> Result<ObjectSchema, SchemaConversionError> {
    let inferrer = Inferrer::new(root);
    let mut path = Vec::new();
    let node = inferrer.resolve(root, &path, 0)?;
    match node.get("properties").and_then(Value::as_object) {
        Some(_) => inferrer.object(node, &mut path, 0),
        None => Err(SchemaConversionError::new(
            &path,
            "type does not describe an object with properties",
        )),
    }
}

struct Inferrer<'a> {
    defs: Option<&'a Map<String, Value>>,
    legacy_defs: Option<&'a Map<String, Value>>,
}

impl<'a> Inferrer<'a> {
    fn new(root: &'a Value) -> Self {
        Self {
            defs: root.get("$defs").and_then(Value::as_object),
            legacy_defs: root.get("definitions").and_then(Value::as_object),
        }
    }

    /// Follow `$ref` chains to a concrete node.
    fn resolve(&self, node: &'a Value, path: &[String], depth: usize) -> Result<&'a Value, SchemaConversionError> {
        let Some(reference) = node.get("$ref").and_then(Value::as_str) else {
            return Ok(node);
        };
        if depth >= MAX_REF_DEPTH {
            return Err(SchemaConversionError::new(path, "recursive $ref is not supported"));
        }
        let target = if let Some(name) = reference.strip_prefix("#/$defs/") {
            self.defs.and_then(|defs| defs.get(name))
        } else if let Some(name) = reference.strip_prefix("#/definitions/") {
            self.legacy_defs.and_then(|defs| defs.get(name))
        } else {
            None
        };
        match target {
            Some(target) => self.resolve(target, path, depth + 1),
            None => Err(SchemaConversionError::new(
                path,
                format!("unresolvable $ref {reference}"),
            )),
        }
    }

    fn object(&self, node: &'a Value, path: &mut Vec<String>, depth: usize) -> Result<ObjectSchema, SchemaConversionError> {
        let required: Vec<&str> = node
            .get("required")
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();

        let mut obj = ObjectSchema::new();
        if let Some(properties) = node.get("properties").and_then(Value::as_object) {
            for (name, property) in properties {
                path.push(name.clone());
                let mut field = self.schema(property, path, depth)?;
                path.pop();
                if !required.contains(&name.as_str()) {
                    field = field.optional();
                }
                obj = obj.field(name.clone(), field);
            }
        }
        Ok(obj)
    }

    fn schema(&self, node: &'a Value, path: &mut Vec<String>, depth: usize) -> Result<Schema, SchemaConversionError> {
        // A description next to a $ref belongs to the field, not the target.
        let outer_description = description_of(node);
        let is_ref = node.get("$ref").is_some();
        let resolved = self.resolve(node, path, depth)?;
        let depth = if is_ref { depth + 1 } else { depth };
        if depth > MAX_REF_DEPTH {
            return Err(SchemaConversionError::new(path, "recursive $ref is not supported"));
        }

        let schema = self.shape(resolved, path, depth)?;
        let description = outer_description.or_else(|| description_of(resolved));
        Ok(match description {
            Some(text) => schema.describe(text),
            None => schema,
        })
    }

    fn shape(&self, node: &'a Value, path: &mut Vec<String>, depth: usize) -> Result<Schema, SchemaConversionError> {
        if let Some(value) = node.get("const") {
            return Ok(literal(value.clone()));
        }

        if let Some(values) = node.get("enum").and_then(Value::as_array) {
            let has_null = values.iter().any(Value::is_null);
            let non_null: Vec<Value> = values.iter().filter(|v| !v.is_null()).cloned().collect();
            let schema = if non_null.iter().all(Value::is_string) {
                enumeration(non_null.iter().filter_map(Value::as_str))
            } else {
                enumeration_values(non_null)
            };
            return Ok(if has_null { schema.nullable() } else { schema });
        }

        for key in ["anyOf", "oneOf"] {
            if let Some(variants) = node.get(key).and_then(Value::as_array) {
                return self.variants(variants, path, depth);
            }
        }

        if let Some(parts) = node.get("allOf").and_then(Value::as_array) {
            if let [single] = parts.as_slice() {
                return self.schema(single, path, depth);
            }
            return Ok(union(Vec::new()));
        }

        let (ty, nullable) = match node.get("type") {
            Some(Value::String(ty)) => (Some(ty.as_str()), false),
            Some(Value::Array(types)) => {
                let names: Vec<&str> = types.iter().filter_map(Value::as_str).collect();
                let non_null: Vec<&str> = names.iter().copied().filter(|t| *t != "null").collect();
                match non_null.as_slice() {
                    [] => (Some("null"), false),
                    [single] => (Some(*single), names.len() > 1),
                    _ => return Ok(union(non_null.iter().map(|t| primitive(t)))),
                }
            }
            _ => (None, false),
        };

        let schema = match ty {
            Some("string") if node.get("format").and_then(Value::as_str) == Some("date") => extend_date(),
            Some("string") => string(),
            Some("integer") => integer(),
            Some("number") => number(),
            Some("boolean") => boolean(),
            Some("null") => null(),
            Some("array") => match node.get("items") {
                Some(items) => array(self.schema(items, path, depth)?),
                None => array(any()),
            },
            Some("object") => self.object_shape(node, path, depth)?,
            None if node.get("properties").is_some() => self.object_shape(node, path, depth)?,
            _ => any(),
        };
        Ok(if nullable { schema.nullable() } else { schema })
    }

    fn object_shape(&self, node: &'a Value, path: &mut Vec<String>, depth: usize) -> Result<Schema, SchemaConversionError> {
        if node.get("properties").is_none() {
            if let Some(values @ Value::Object(_)) = node.get("additionalProperties") {
                return Ok(record(self.schema(values, path, depth)?));
            }
        }
        Ok(self.object(node, path, depth)?.into_schema())
    }

    fn variants(&self, variants: &'a [Value], path: &mut Vec<String>, depth: usize) -> Result<Schema, SchemaConversionError> {
        let non_null: Vec<&Value> = variants.iter().filter(|v| !is_null_type(v)).collect();
        let nullable = non_null.len() < variants.len();

        // Unit enums with documented variants arrive as oneOf of string consts.
        let consts: Option<Vec<&str>> = non_null
            .iter()
            .map(|v| v.get("const").and_then(Value::as_str))
            .collect();

        let schema = match (non_null.as_slice(), consts) {
            ([single], _) => self.schema(*single, path, depth)?,
            (_, Some(values)) if !values.is_empty() => enumeration(values),
            _ => {
                let mut inferred = Vec::with_capacity(non_null.len());
                for variant in non_null {
                    inferred.push(self.schema(variant, path, depth)?);
                }
                union(inferred)
            }
        };
        Ok(if nullable { schema.nullable() } else { schema })
    }
}

fn primitive(ty: &str) -> Schema {
    match ty {
        "string" => string(),
        "integer" => integer(),
        "number" => number(),
        "boolean" => boolean(),
        _ => any(),
    }
}

fn is_null_type(node: &Value) -> bool {
    node.get("type").and_then(Value::as_str) == Some("null")
}

fn description_of(node: &Value) -> Option<String> {
    node.get("description")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(str::to_string)
}
