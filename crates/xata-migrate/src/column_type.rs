//! Mapping between logical column types and their PostgreSQL representation.
//!
//! The logical type system is closed: every consumer matches on
//! [`ColumnType`] without a wildcard arm, so adding a variant breaks the
//! build until each mapping below handles it.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{MigrateError, Result};
use crate::schema::LogicalColumn;

/// Maximum length, in characters, of a `string` column.
pub const STRING_MAX_LENGTH: usize = 2048;
/// Maximum size, in bytes, of a `text` column.
pub const TEXT_MAX_OCTETS: usize = 204_800;
/// Upper bound, in bytes, of the joined elements of a `multiple` column.
pub const MULTIPLE_MAX_OCTETS: usize = 65_536;

/// Logical column types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ColumnType {
    /// Boolean.
    Bool,
    /// 64-bit integer.
    Int,
    /// Double precision float.
    Float,
    /// Short string (bounded length).
    String,
    /// Long text (bounded size).
    Text,
    /// Validated email address.
    Email,
    /// Array of strings.
    Multiple,
    /// Reference to a row of another table.
    Link,
    /// Timestamp with time zone.
    Datetime,
    /// Fixed-dimension float vector.
    Vector,
    /// Single file attachment.
    File,
    /// List of file attachments.
    FileArray,
    /// Arbitrary JSON.
    Json,
}

impl ColumnType {
    /// Every logical type, in declaration order.
    pub const ALL: [Self; 13] = [
        Self::Bool,
        Self::Int,
        Self::Float,
        Self::String,
        Self::Text,
        Self::Email,
        Self::Multiple,
        Self::Link,
        Self::Datetime,
        Self::Vector,
        Self::File,
        Self::FileArray,
        Self::Json,
    ];

    /// Returns the wire name of this type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Float => "float",
            Self::String => "string",
            Self::Text => "text",
            Self::Email => "email",
            Self::Multiple => "multiple",
            Self::Link => "link",
            Self::Datetime => "datetime",
            Self::Vector => "vector",
            Self::File => "file",
            Self::FileArray => "file[]",
            Self::Json => "json",
        }
    }

    /// Returns the PostgreSQL type backing this logical type.
    #[must_use]
    pub const fn physical_name(self) -> &'static str {
        match self {
            Self::Bool => "boolean",
            Self::Int => "bigint",
            Self::Float => "double precision",
            Self::String | Self::Text | Self::Email | Self::Link => "text",
            Self::Multiple => "text[]",
            Self::Datetime => "timestamptz",
            Self::Vector => "real[]",
            Self::Json => "jsonb",
            Self::File => "xata.xata_file",
            Self::FileArray => "xata.xata_file_array",
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ColumnType {
    type Err = MigrateError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| MigrateError::UnsupportedType(s.to_string()))
    }
}

/// The `type` of a column: a known logical type, or a physical type name
/// carried through untouched.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TypeName {
    /// A logical type.
    Logical(ColumnType),
    /// Any other name, treated as already physical.
    Physical(String),
}

impl TypeName {
    /// Returns the logical type, if this is one.
    #[must_use]
    pub fn logical(&self) -> Option<ColumnType> {
        match self {
            Self::Logical(t) => Some(*t),
            Self::Physical(_) => None,
        }
    }

    /// Returns the logical type or fails naming the unrecognized type.
    pub fn require_logical(&self) -> Result<ColumnType> {
        match self {
            Self::Logical(t) => Ok(*t),
            Self::Physical(name) => Err(MigrateError::UnsupportedType(name.clone())),
        }
    }
}

impl From<ColumnType> for TypeName {
    fn from(t: ColumnType) -> Self {
        Self::Logical(t)
    }
}

impl From<&str> for TypeName {
    fn from(s: &str) -> Self {
        s.parse::<ColumnType>()
            .map_or_else(|_| Self::Physical(s.to_string()), Self::Logical)
    }
}

impl From<String> for TypeName {
    fn from(s: String) -> Self {
        match s.parse::<ColumnType>() {
            Ok(t) => Self::Logical(t),
            Err(_) => Self::Physical(s),
        }
    }
}

impl From<TypeName> for String {
    fn from(t: TypeName) -> Self {
        t.to_string()
    }
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Logical(t) => f.write_str(t.as_str()),
            Self::Physical(name) => f.write_str(name),
        }
    }
}

/// Metadata stored in a physical column comment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnComment {
    /// Logical type tag for types sharing a physical type.
    #[serde(rename = "xata.type", default, skip_serializing_if = "Option::is_none")]
    pub xata_type: Option<String>,
    /// Target table of a link column.
    #[serde(rename = "xata.link", default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    /// Dimension of a vector column.
    #[serde(
        rename = "xata.search.dimension",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub dimension: Option<u32>,
    /// Default public access of file columns.
    #[serde(rename = "xata.file.dpa", default, skip_serializing_if = "Option::is_none")]
    pub file_default_public_access: Option<bool>,
}

impl ColumnComment {
    /// Parses a column comment. Free-form comments yield `None`.
    #[must_use]
    pub fn parse(comment: &str) -> Option<Self> {
        serde_json::from_str(comment).ok()
    }

    fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// A derived CHECK constraint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CheckConstraint {
    /// Constraint name.
    pub name: String,
    /// Boolean SQL expression.
    pub constraint: String,
}

/// Returns the physical type name for a column type.
#[must_use]
pub fn to_physical_type(type_name: &TypeName) -> String {
    match type_name {
        TypeName::Logical(t) => t.physical_name().to_string(),
        TypeName::Physical(name) => name.clone(),
    }
}

/// Recovers the column type from a physical type and its comment.
///
/// Fails only when the comment carries a `xata.type` tag naming a type
/// this build does not know.
pub fn from_physical_type(physical: &str, comment: Option<&str>) -> Result<TypeName> {
    let meta = comment.and_then(ColumnComment::parse).unwrap_or_default();

    if let Some(tag) = &meta.xata_type {
        return Ok(TypeName::Logical(tag.parse()?));
    }

    let logical = match physical {
        "boolean" | "bool" => ColumnType::Bool,
        "bigint" | "int8" => ColumnType::Int,
        "double precision" | "float8" => ColumnType::Float,
        "text" if meta.link.is_some() => ColumnType::Link,
        "text" => ColumnType::Text,
        "text[]" | "_text" => ColumnType::Multiple,
        "timestamptz" | "timestamp with time zone" => ColumnType::Datetime,
        "real[]" | "_float4" => ColumnType::Vector,
        "jsonb" => ColumnType::Json,
        "xata.xata_file" | "xata_file" => ColumnType::File,
        "xata.xata_file_array" | "xata_file_array" => ColumnType::FileArray,
        other => return Ok(TypeName::Physical(other.to_string())),
    };
    Ok(TypeName::Logical(logical))
}

/// Name of the CHECK constraint derived for a column.
#[must_use]
pub fn constraint_name(table: &str, column: &str, column_type: ColumnType) -> String {
    format!("{table}_xata_{column_type}_length_{column}")
}

/// Derives the length/format CHECK constraint of a column, if its type has one.
#[must_use]
pub fn constraint_for(table: &str, column: &LogicalColumn) -> Option<CheckConstraint> {
    let column_type = column.column_type.logical()?;
    let name = &column.name;
    let expression = match column_type {
        ColumnType::String => format!("LENGTH(\"{name}\") <= {STRING_MAX_LENGTH}"),
        ColumnType::Text => format!("OCTET_LENGTH(\"{name}\") <= {TEXT_MAX_OCTETS}"),
        ColumnType::Multiple => {
            format!("OCTET_LENGTH(ARRAY_TO_STRING(\"{name}\", '')) < {MULTIPLE_MAX_OCTETS}")
        }
        ColumnType::Email => format!("xata_private.is_valid_email(\"{name}\")"),
        ColumnType::Vector => {
            let dimension = column.vector_dimension?;
            format!("ARRAY_LENGTH(\"{name}\", 1) = {dimension}")
        }
        ColumnType::Bool
        | ColumnType::Int
        | ColumnType::Float
        | ColumnType::Link
        | ColumnType::Datetime
        | ColumnType::File
        | ColumnType::FileArray
        | ColumnType::Json => return None,
    };
    Some(CheckConstraint {
        name: constraint_name(table, name, column_type),
        constraint: expression,
    })
}

/// Encodes the metadata the physical schema cannot express as a JSON comment.
#[must_use]
pub fn comment_for(column: &LogicalColumn) -> Option<String> {
    let column_type = column.column_type.logical()?;
    let mut meta = ColumnComment::default();
    match column_type {
        ColumnType::Vector => meta.dimension = column.vector_dimension,
        ColumnType::Link => meta.link = column.link_target(),
        ColumnType::String | ColumnType::Email => {
            meta.xata_type = Some(column_type.as_str().to_string());
        }
        ColumnType::File | ColumnType::FileArray => {
            meta.file_default_public_access =
                Some(column.file_default_public_access.unwrap_or(false));
        }
        ColumnType::Bool
        | ColumnType::Int
        | ColumnType::Float
        | ColumnType::Text
        | ColumnType::Multiple
        | ColumnType::Datetime
        | ColumnType::Json => {}
    }
    if meta.is_empty() {
        return None;
    }
    serde_json::to_string(&meta).ok()
}

/// Returns a SQL literal used to backfill existing rows.
///
/// An explicit default always wins and is quoted as a string literal.
/// Links have no neutral value and backfill with `null`, so a NOT NULL link
/// added to a table that already has rows only succeeds with a default.
#[must_use]
pub fn zero_value_for(type_name: &TypeName, default: Option<&str>) -> String {
    if let Some(value) = default {
        return format!("'{}'", value.replace('\'', "''"));
    }
    match type_name {
        TypeName::Logical(t) => match t {
            ColumnType::Bool => "false",
            ColumnType::Int | ColumnType::Float => "0",
            ColumnType::String | ColumnType::Text | ColumnType::Email => "''",
            ColumnType::Multiple | ColumnType::Vector => "'{}'",
            ColumnType::File | ColumnType::FileArray | ColumnType::Json => "'{}'",
            ColumnType::Link => "null",
            ColumnType::Datetime => "now()",
        }
        .to_string(),
        TypeName::Physical(name) => physical_zero_value(name).to_string(),
    }
}

fn physical_zero_value(name: &str) -> &'static str {
    let name = name.to_ascii_lowercase();
    if name.ends_with("[]") || name.starts_with("json") {
        "'{}'"
    } else if name.starts_with("bool") {
        "false"
    } else if name.starts_with("timestamp") || name == "date" {
        "now()"
    } else if [
        "int", "integer", "bigint", "smallint", "int2", "int4", "int8", "real", "float4",
        "float8", "double precision", "numeric", "decimal", "serial", "bigserial",
    ]
    .iter()
    .any(|n| name == *n || name.starts_with("numeric(") || name.starts_with("decimal("))
    {
        "0"
    } else if name == "text" || name.starts_with("varchar") || name.starts_with("char") {
        "''"
    } else {
        "null"
    }
}

/// Whether adding a column requires an `up` backfill expression.
#[must_use]
pub const fn requires_up_argument(not_null: bool, default: Option<&str>) -> bool {
    not_null && default.is_none()
}
