//! Logical schema snapshots.
//!
//! A [`LogicalSchema`] is the unit the differ compares. Snapshots are plain
//! values: they are fetched or read, diffed, and never mutated in place.
//! Maps are ordered by name so every traversal is deterministic.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::column_type::{ColumnComment, TypeName};

/// Identity column, the target of every link.
pub const ID_COLUMN: &str = "xata_id";

/// Bookkeeping columns maintained by the platform.
pub const INTERNAL_COLUMNS: [&str; 4] = [
    ID_COLUMN,
    "xata_version",
    "xata_createdat",
    "xata_updatedat",
];

/// Returns true for platform-maintained columns that diffing must ignore.
#[must_use]
pub fn is_internal_column(name: &str) -> bool {
    INTERNAL_COLUMNS.contains(&name)
}

/// Target of a link column.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LinkTarget {
    /// Referenced table.
    pub table: String,
}

/// Schema definition for a column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogicalColumn {
    /// Column name.
    pub name: String,
    /// Logical or physical type.
    #[serde(rename = "type")]
    pub column_type: TypeName,
    /// Whether the column allows NULL values.
    #[serde(default = "default_nullable")]
    pub nullable: bool,
    /// Whether the column has a UNIQUE constraint.
    #[serde(default)]
    pub unique: bool,
    /// Default value expression.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    /// Raw column comment, possibly carrying encoded metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    /// Link target for relationship columns.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<LinkTarget>,
    /// Dimension of vector columns.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vector_dimension: Option<u32>,
    /// Whether files are publicly accessible by default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_default_public_access: Option<bool>,
}

const fn default_nullable() -> bool {
    true
}

impl LogicalColumn {
    /// Creates a nullable, non-unique column.
    #[must_use]
    pub fn new(name: impl Into<String>, column_type: impl Into<TypeName>) -> Self {
        Self {
            name: name.into(),
            column_type: column_type.into(),
            nullable: true,
            unique: false,
            default: None,
            comment: None,
            link: None,
            vector_dimension: None,
            file_default_public_access: None,
        }
    }

    /// Sets the column as NOT NULL.
    #[must_use]
    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// Sets the column as unique.
    #[must_use]
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Sets the default value.
    #[must_use]
    pub fn default(mut self, value: impl Into<String>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Sets the raw comment.
    #[must_use]
    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// Points the column at another table.
    #[must_use]
    pub fn link(mut self, table: impl Into<String>) -> Self {
        self.link = Some(LinkTarget {
            table: table.into(),
        });
        self
    }

    /// Sets the vector dimension.
    #[must_use]
    pub fn vector_dimension(mut self, dimension: u32) -> Self {
        self.vector_dimension = Some(dimension);
        self
    }

    /// Sets the default public access of file columns.
    #[must_use]
    pub fn file_default_public_access(mut self, public: bool) -> Self {
        self.file_default_public_access = Some(public);
        self
    }

    /// Returns the linked table, from the explicit target or the comment.
    #[must_use]
    pub fn link_target(&self) -> Option<String> {
        let table = match &self.link {
            Some(link) => Some(link.table.clone()),
            None => self
                .comment
                .as_deref()
                .and_then(ColumnComment::parse)
                .and_then(|meta| meta.link),
        };
        table.filter(|t| !t.is_empty())
    }
}

/// A named unique constraint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UniqueConstraint {
    /// Constraint name.
    pub name: String,
    /// Columns that form the unique constraint.
    pub columns: Vec<String>,
}

/// A named check constraint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CheckConstraintSchema {
    /// Constraint name.
    pub name: String,
    /// Columns involved.
    #[serde(default)]
    pub columns: Vec<String>,
    /// Constraint definition.
    pub definition: String,
}

/// A foreign key as reported by the remote schema.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForeignKeySchema {
    /// Constraint name.
    pub name: String,
    /// Referencing columns.
    pub columns: Vec<String>,
    /// Referenced table.
    pub referenced_table: String,
    /// Referenced columns.
    pub referenced_columns: Vec<String>,
    /// ON DELETE action.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_delete: Option<String>,
}

/// Schema definition for a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogicalTable {
    /// Table name.
    pub name: String,
    /// Columns keyed by name.
    #[serde(default)]
    pub columns: BTreeMap<String, LogicalColumn>,
    /// Table comment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    /// Primary key column(s).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub primary_key: Vec<String>,
    /// Unique constraints keyed by name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub unique_constraints: BTreeMap<String, UniqueConstraint>,
    /// Check constraints keyed by name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub check_constraints: BTreeMap<String, CheckConstraintSchema>,
    /// Foreign keys keyed by name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub foreign_keys: BTreeMap<String, ForeignKeySchema>,
}

impl LogicalTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: BTreeMap::new(),
            comment: None,
            primary_key: Vec::new(),
            unique_constraints: BTreeMap::new(),
            check_constraints: BTreeMap::new(),
            foreign_keys: BTreeMap::new(),
        }
    }

    /// Adds a column, replacing any column with the same name.
    #[must_use]
    pub fn column(mut self, column: LogicalColumn) -> Self {
        self.columns.insert(column.name.clone(), column);
        self
    }

    /// Sets the table comment.
    #[must_use]
    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// Gets a column by name.
    #[must_use]
    pub fn get_column(&self, name: &str) -> Option<&LogicalColumn> {
        self.columns.get(name)
    }

    /// Iterates over user-visible columns, in name order.
    pub fn user_columns(&self) -> impl Iterator<Item = &LogicalColumn> {
        self.columns
            .values()
            .filter(|c| !is_internal_column(&c.name))
    }
}

/// The complete logical schema of a branch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogicalSchema {
    /// Tables keyed by name.
    #[serde(default)]
    pub tables: BTreeMap<String, LogicalTable>,
}

impl LogicalSchema {
    /// Creates an empty schema.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a table, replacing any table with the same name.
    #[must_use]
    pub fn table(mut self, table: LogicalTable) -> Self {
        self.tables.insert(table.name.clone(), table);
        self
    }

    /// Gets a table by name.
    #[must_use]
    pub fn get_table(&self, name: &str) -> Option<&LogicalTable> {
        self.tables.get(name)
    }

    /// Gets a mutable table by name.
    #[must_use]
    pub fn get_table_mut(&mut self, name: &str) -> Option<&mut LogicalTable> {
        self.tables.get_mut(name)
    }

    /// Returns table names in order.
    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column_type::ColumnType;

    #[test]
    fn test_column_builder() {
        let col = LogicalColumn::new("email", ColumnType::Email)
            .not_null()
            .unique()
            .default("a@b.c");

        assert_eq!(col.name, "email");
        assert!(!col.nullable);
        assert!(col.unique);
        assert_eq!(col.default.as_deref(), Some("a@b.c"));
    }

    #[test]
    fn test_internal_columns_are_filtered() {
        let table = LogicalTable::new("users")
            .column(LogicalColumn::new("xata_id", "text").not_null())
            .column(LogicalColumn::new("xata_version", "integer"))
            .column(LogicalColumn::new("name", ColumnType::String));

        let names: Vec<&str> = table.user_columns().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["name"]);
    }

    #[test]
    fn test_link_target_from_comment() {
        let col = LogicalColumn::new("owner", "text").comment(r#"{"xata.link":"users"}"#);
        assert_eq!(col.link_target().as_deref(), Some("users"));

        let col = LogicalColumn::new("owner", ColumnType::Link).link("teams");
        assert_eq!(col.link_target().as_deref(), Some("teams"));

        let col = LogicalColumn::new("owner", "text").comment("just a note");
        assert_eq!(col.link_target(), None);
    }

    #[test]
    fn test_schema_json_shape() {
        let json = r#"{
            "tables": {
                "one": {
                    "name": "one",
                    "columns": {
                        "id": {"name": "id", "type": "integer", "nullable": false, "unique": true, "default": null, "comment": ""},
                        "title": {"name": "title", "type": "string"}
                    },
                    "comment": "",
                    "primaryKey": ["id"],
                    "uniqueConstraints": {},
                    "checkConstraints": {},
                    "foreignKeys": {}
                }
            }
        }"#;

        let schema: LogicalSchema = serde_json::from_str(json).unwrap();
        let one = schema.get_table("one").unwrap();
        assert_eq!(one.primary_key, vec!["id"]);

        let id = one.get_column("id").unwrap();
        assert!(id.unique);
        assert!(!id.nullable);
        assert_eq!(id.column_type, TypeName::Physical("integer".to_string()));

        let title = one.get_column("title").unwrap();
        assert!(title.nullable);
        assert_eq!(title.column_type, TypeName::Logical(ColumnType::String));
    }
}
