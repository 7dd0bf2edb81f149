//! Custom attribute values attached to documents.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A raw attribute buffer as stored upstream, base64 encoded, with its
/// layout tag.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct TypedAttributeValue {
    pub tag: i32,

    /// Base64 text of the raw buffer.
    pub value: String,
}

impl TypedAttributeValue {
    pub fn new(tag: i32, value: impl Into<String>) -> Self {
        Self {
            tag,
            value: value.into(),
        }
    }
}

/// A property row as returned by the record store. The value may be null.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, FromRow)]
pub struct DocumentProperty {
    pub id: i64,
    pub name: String,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub tag: i32,
    pub value: Option<String>,
}

/// A property ready for display.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct RenderedProperty {
    pub id: i64,
    pub name: String,
    pub value: String,
}
