//! Extend-specific field types recognised by the extraction service.

use std::fmt;

use super::types::{boolean, number, string, ObjectSchema, Schema, SchemaKind};

/// Wire key carrying the custom type tag.
pub const EXTEND_TYPE_KEY: &str = "extend:type";

pub const CURRENCY_AMOUNT: &str = "amount";
pub const CURRENCY_CODE: &str = "iso_4217_currency_code";

pub const SIGNATURE_PRINTED_NAME: &str = "printed_name";
pub const SIGNATURE_DATE: &str = "signature_date";
pub const SIGNATURE_IS_SIGNED: &str = "is_signed";
pub const SIGNATURE_TITLE_OR_ROLE: &str = "title_or_role";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CustomType {
    Date,
    Currency,
    Signature,
}

impl CustomType {
    /// Value written under [`EXTEND_TYPE_KEY`].
    pub fn tag(self) -> &'static str {
        match self {
            CustomType::Date => "date",
            CustomType::Currency => "currency",
            CustomType::Signature => "signature",
        }
    }
}

impl fmt::Display for CustomType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// A calendar date, extracted as a string.
pub fn extend_date() -> Schema {
    string().with_custom(CustomType::Date)
}

/// A monetary amount with its ISO 4217 currency code.
pub fn extend_currency() -> Schema {
    Schema::new(SchemaKind::Object(
        ObjectSchema::new()
            .field(CURRENCY_AMOUNT, number())
            .field(CURRENCY_CODE, string()),
    ))
    .with_custom(CustomType::Currency)
}

/// A signature block.
pub fn extend_signature() -> Schema {
    Schema::new(SchemaKind::Object(
        ObjectSchema::new()
            .field(SIGNATURE_PRINTED_NAME, string())
            .field(SIGNATURE_DATE, extend_date())
            .field(SIGNATURE_IS_SIGNED, boolean())
            .field(SIGNATURE_TITLE_OR_ROLE, string()),
    ))
    .with_custom(CustomType::Signature)
}
