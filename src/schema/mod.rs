//! Typed extraction schemas and their wire representation.
//!
//! Build a schema with the combinators in this module (or infer one with
//! [`schema_for_type`]) and convert it with [`convert`] before embedding it in
//! an extract config.

mod convert;
mod custom;
mod infer;
mod types;

pub use convert::{convert, convert_schema};
pub use custom::{
    extend_currency, extend_date, extend_signature, CustomType, CURRENCY_AMOUNT, CURRENCY_CODE,
    EXTEND_TYPE_KEY, SIGNATURE_DATE, SIGNATURE_IS_SIGNED, SIGNATURE_PRINTED_NAME,
    SIGNATURE_TITLE_OR_ROLE,
};
pub use infer::{object_from_json_schema, schema_for_type};
pub use types::{
    any, array, boolean, enumeration, enumeration_values, integer, literal, null, number, object,
    record, string, union, ObjectSchema, Schema, SchemaKind,
};
