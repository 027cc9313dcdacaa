//! Migration operations.
//!
//! The closed vocabulary of schema edits understood by the online migration
//! service. Each operation serializes as a single-key object whose key is the
//! operation kind, e.g. `{"drop_table": {"name": "posts"}}`.

use std::collections::HashSet;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::column_type::{
    comment_for, constraint_for, from_physical_type, requires_up_argument, to_physical_type,
    zero_value_for, CheckConstraint, TypeName,
};
use crate::error::{MigrateError, Result};
use crate::schema::{LogicalColumn, ID_COLUMN};

/// Foreign key attached to a column definition.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ForeignKeyReference {
    /// Constraint name.
    pub name: String,
    /// Referenced table.
    pub table: String,
    /// Referenced column.
    pub column: String,
    /// ON DELETE action.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_delete: Option<String>,
}

impl ForeignKeyReference {
    /// Reference used by link columns: `{column}_link` pointing at the
    /// identity column of `table`, nulled on delete.
    #[must_use]
    pub fn link(column: &str, table: impl Into<String>) -> Self {
        Self {
            name: format!("{column}_link"),
            table: table.into(),
            column: ID_COLUMN.to_string(),
            on_delete: Some("SET NULL".to_string()),
        }
    }
}

/// Physical column definition carried by `create_table` and `add_column`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDefinition {
    /// Column name.
    pub name: String,
    /// Physical type.
    #[serde(rename = "type")]
    pub column_type: String,
    /// Column comment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    /// Whether the column allows NULL values.
    #[serde(default)]
    pub nullable: bool,
    /// Whether the column has a UNIQUE constraint.
    #[serde(default)]
    pub unique: bool,
    /// Default value expression.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    /// CHECK constraint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check: Option<CheckConstraint>,
    /// Foreign key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub references: Option<ForeignKeyReference>,
}

impl ColumnDefinition {
    /// Creates a definition from a logical column, keeping the column's own
    /// comment and nothing derived.
    #[must_use]
    pub fn from_logical(column: &LogicalColumn) -> Self {
        Self {
            name: column.name.clone(),
            column_type: to_physical_type(&column.column_type),
            comment: column.comment.clone(),
            nullable: column.nullable,
            unique: column.unique,
            default: column.default.clone(),
            check: None,
            references: None,
        }
    }

    /// Creates a definition carrying everything the type mapper derives:
    /// the CHECK constraint and the metadata comment.
    #[must_use]
    pub fn derived(table: &str, column: &LogicalColumn) -> Self {
        Self {
            comment: comment_for(column).or_else(|| column.comment.clone()),
            check: constraint_for(table, column),
            ..Self::from_logical(column)
        }
    }

    /// Sets the foreign key.
    #[must_use]
    pub fn references(mut self, references: ForeignKeyReference) -> Self {
        self.references = Some(references);
        self
    }

    /// Best-effort recovery of the column type, for backfill values.
    #[must_use]
    pub fn type_name(&self) -> TypeName {
        from_physical_type(&self.column_type, self.comment.as_deref())
            .unwrap_or_else(|_| TypeName::Physical(self.column_type.clone()))
    }
}

/// Create a new table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateTableOp {
    /// Table name.
    pub name: String,
    /// Table comment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    /// Column definitions.
    pub columns: Vec<ColumnDefinition>,
}

/// Drop a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropTableOp {
    /// Table name.
    pub name: String,
}

/// Rename a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenameTableOp {
    /// Current name.
    pub from: String,
    /// New name.
    pub to: String,
}

/// Add a column to an existing table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddColumnOp {
    /// Table name.
    pub table: String,
    /// Column definition.
    pub column: ColumnDefinition,
    /// Backfill expression for existing rows.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub up: Option<String>,
}

/// Drop a column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropColumnOp {
    /// Table name.
    pub table: String,
    /// Column name.
    pub column: String,
    /// Expression recomputing the column on rollback.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub down: Option<String>,
}

/// Change facets of an existing column. Unset facets are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlterColumnOp {
    /// Table name.
    pub table: String,
    /// Column name.
    pub column: String,
    /// New physical type.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub column_type: Option<String>,
    /// New nullability.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nullable: Option<bool>,
    /// New uniqueness.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unique: Option<bool>,
    /// New column comment. An empty string clears it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    /// Expression converting old values to the new shape.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub up: Option<String>,
    /// Expression converting new values back.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub down: Option<String>,
}

impl AlterColumnOp {
    /// Creates an alteration with no facets set.
    #[must_use]
    pub fn new(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            column: column.into(),
            ..Self::default()
        }
    }

    /// Returns true if no facet changes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.column_type.is_none()
            && self.nullable.is_none()
            && self.unique.is_none()
            && self.comment.is_none()
    }
}

/// Rename a column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenameColumnOp {
    /// Table name.
    pub table: String,
    /// Current name.
    pub from: String,
    /// New name.
    pub to: String,
}

/// Create an index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateIndexOp {
    /// Index name.
    pub name: String,
    /// Table name.
    pub table: String,
    /// Indexed columns.
    pub columns: Vec<String>,
    /// Whether this is a unique index.
    #[serde(default)]
    pub unique: bool,
}

/// Drop an index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropIndexOp {
    /// Index name.
    pub name: String,
}

/// Kind of table constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintType {
    /// UNIQUE over the columns.
    Unique,
    /// CHECK expression.
    Check,
    /// FOREIGN KEY.
    ForeignKey,
}

/// Target of a foreign key constraint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConstraintReferences {
    /// Referenced table.
    pub table: String,
    /// Referenced columns.
    pub columns: Vec<String>,
    /// ON DELETE action.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_delete: Option<String>,
}

/// Add a table constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateConstraintOp {
    /// Table name.
    pub table: String,
    /// Constraint name.
    pub name: String,
    /// Constraint kind.
    #[serde(rename = "type")]
    pub constraint_type: ConstraintType,
    /// Constrained columns.
    pub columns: Vec<String>,
    /// CHECK expression.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check: Option<String>,
    /// Foreign key target.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub references: Option<ConstraintReferences>,
}

/// Drop a table constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropConstraintOp {
    /// Table name.
    pub table: String,
    /// Constraint name.
    pub name: String,
}

/// Raw SQL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SqlOp {
    /// Forward statement(s).
    pub up: String,
    /// Rollback statement(s).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub down: Option<String>,
}

/// A single migration operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    /// Create a new table.
    CreateTable(CreateTableOp),
    /// Drop a table.
    DropTable(DropTableOp),
    /// Rename a table.
    RenameTable(RenameTableOp),
    /// Add a column to a table.
    AddColumn(AddColumnOp),
    /// Drop a column from a table.
    DropColumn(DropColumnOp),
    /// Alter a column's facets.
    AlterColumn(AlterColumnOp),
    /// Rename a column.
    RenameColumn(RenameColumnOp),
    /// Create an index.
    CreateIndex(CreateIndexOp),
    /// Drop an index.
    DropIndex(DropIndexOp),
    /// Add a table constraint.
    CreateConstraint(CreateConstraintOp),
    /// Drop a table constraint.
    DropConstraint(DropConstraintOp),
    /// Run raw SQL.
    Sql(SqlOp),
}

/// Every operation kind, as it appears on the wire.
pub const OPERATION_KINDS: [&str; 12] = [
    "create_table",
    "drop_table",
    "rename_table",
    "add_column",
    "drop_column",
    "alter_column",
    "rename_column",
    "create_index",
    "drop_index",
    "create_constraint",
    "drop_constraint",
    "sql",
];

impl Operation {
    /// Creates a CreateTable operation.
    #[must_use]
    pub fn create_table(
        name: impl Into<String>,
        comment: Option<String>,
        columns: Vec<ColumnDefinition>,
    ) -> Self {
        Self::CreateTable(CreateTableOp {
            name: name.into(),
            comment,
            columns,
        })
    }

    /// Creates a DropTable operation.
    #[must_use]
    pub fn drop_table(name: impl Into<String>) -> Self {
        Self::DropTable(DropTableOp { name: name.into() })
    }

    /// Creates a RenameTable operation.
    #[must_use]
    pub fn rename_table(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self::RenameTable(RenameTableOp {
            from: from.into(),
            to: to.into(),
        })
    }

    /// Creates an AddColumn operation.
    ///
    /// A NOT NULL column without a default gets a backfill `up` expression,
    /// since existing rows need a value before the constraint holds.
    #[must_use]
    pub fn add_column(table: impl Into<String>, column: ColumnDefinition) -> Self {
        let up = requires_up_argument(!column.nullable, column.default.as_deref())
            .then(|| zero_value_for(&column.type_name(), None));
        Self::AddColumn(AddColumnOp {
            table: table.into(),
            column,
            up,
        })
    }

    /// Creates a DropColumn operation.
    #[must_use]
    pub fn drop_column(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self::DropColumn(DropColumnOp {
            table: table.into(),
            column: column.into(),
            down: None,
        })
    }

    /// Creates a RenameColumn operation.
    #[must_use]
    pub fn rename_column(
        table: impl Into<String>,
        from: impl Into<String>,
        to: impl Into<String>,
    ) -> Self {
        Self::RenameColumn(RenameColumnOp {
            table: table.into(),
            from: from.into(),
            to: to.into(),
        })
    }

    /// Creates a CreateIndex operation.
    #[must_use]
    pub fn create_index(
        name: impl Into<String>,
        table: impl Into<String>,
        columns: Vec<String>,
        unique: bool,
    ) -> Self {
        Self::CreateIndex(CreateIndexOp {
            name: name.into(),
            table: table.into(),
            columns,
            unique,
        })
    }

    /// Creates a DropIndex operation.
    #[must_use]
    pub fn drop_index(name: impl Into<String>) -> Self {
        Self::DropIndex(DropIndexOp { name: name.into() })
    }

    /// Creates a CHECK constraint over a single column.
    #[must_use]
    pub fn create_check(
        table: impl Into<String>,
        column: impl Into<String>,
        check: CheckConstraint,
    ) -> Self {
        Self::CreateConstraint(CreateConstraintOp {
            table: table.into(),
            name: check.name,
            constraint_type: ConstraintType::Check,
            columns: vec![column.into()],
            check: Some(check.constraint),
            references: None,
        })
    }

    /// Creates a DropConstraint operation.
    #[must_use]
    pub fn drop_constraint(table: impl Into<String>, name: impl Into<String>) -> Self {
        Self::DropConstraint(DropConstraintOp {
            table: table.into(),
            name: name.into(),
        })
    }

    /// Creates a raw SQL operation.
    #[must_use]
    pub fn sql(up: impl Into<String>, down: Option<String>) -> Self {
        Self::Sql(SqlOp {
            up: up.into(),
            down,
        })
    }

    /// Returns the wire name of this operation.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::CreateTable(_) => "create_table",
            Self::DropTable(_) => "drop_table",
            Self::RenameTable(_) => "rename_table",
            Self::AddColumn(_) => "add_column",
            Self::DropColumn(_) => "drop_column",
            Self::AlterColumn(_) => "alter_column",
            Self::RenameColumn(_) => "rename_column",
            Self::CreateIndex(_) => "create_index",
            Self::DropIndex(_) => "drop_index",
            Self::CreateConstraint(_) => "create_constraint",
            Self::DropConstraint(_) => "drop_constraint",
            Self::Sql(_) => "sql",
        }
    }

    /// Parses and validates an operation from JSON.
    ///
    /// Fails on unknown kinds, missing or mistyped fields and semantically
    /// invalid payloads; nothing is partially accepted.
    pub fn from_value(value: Value) -> Result<Self> {
        let Value::Object(map) = value else {
            return Err(MigrateError::validation(
                "operation",
                "expected an object with a single operation key",
            ));
        };
        if map.len() != 1 {
            let keys: Vec<&str> = map.keys().map(String::as_str).collect();
            return Err(MigrateError::validation(
                "operation",
                format!("expected exactly one operation key, found [{}]", keys.join(", ")),
            ));
        }
        let Some((kind, payload)) = map.into_iter().next() else {
            return Err(MigrateError::validation("operation", "empty operation"));
        };

        let operation = match kind.as_str() {
            "create_table" => Self::CreateTable(payload_of(&kind, payload)?),
            "drop_table" => Self::DropTable(payload_of(&kind, payload)?),
            "rename_table" => Self::RenameTable(payload_of(&kind, payload)?),
            "add_column" => Self::AddColumn(payload_of(&kind, payload)?),
            "drop_column" => Self::DropColumn(payload_of(&kind, payload)?),
            "alter_column" => Self::AlterColumn(payload_of(&kind, payload)?),
            "rename_column" => Self::RenameColumn(payload_of(&kind, payload)?),
            "create_index" => Self::CreateIndex(payload_of(&kind, payload)?),
            "drop_index" => Self::DropIndex(payload_of(&kind, payload)?),
            "create_constraint" => Self::CreateConstraint(payload_of(&kind, payload)?),
            "drop_constraint" => Self::DropConstraint(payload_of(&kind, payload)?),
            "sql" => Self::Sql(payload_of(&kind, payload)?),
            other => {
                return Err(MigrateError::validation(
                    "operation",
                    format!(
                        "unknown operation kind '{other}', expected one of: {}",
                        OPERATION_KINDS.join(", ")
                    ),
                ))
            }
        };
        operation.validate()?;
        Ok(operation)
    }

    /// Checks the semantic rules a well-formed payload must also satisfy.
    pub fn validate(&self) -> Result<()> {
        let kind = self.kind();
        match self {
            Self::CreateTable(op) => {
                // An empty list is fine: the platform adds its own columns.
                require_name(kind, "name", &op.name)?;
                let mut seen = HashSet::new();
                for column in &op.columns {
                    validate_column(kind, column)?;
                    if !seen.insert(column.name.as_str()) {
                        return Err(invalid(
                            kind,
                            "columns",
                            format!("duplicate column '{}'", column.name),
                        ));
                    }
                }
            }
            Self::DropTable(op) => require_name(kind, "name", &op.name)?,
            Self::RenameTable(op) => {
                require_name(kind, "from", &op.from)?;
                require_name(kind, "to", &op.to)?;
            }
            Self::AddColumn(op) => {
                require_name(kind, "table", &op.table)?;
                validate_column(kind, &op.column)?;
                if requires_up_argument(!op.column.nullable, op.column.default.as_deref())
                    && op.up.is_none()
                {
                    return Err(invalid(
                        kind,
                        "up",
                        format!(
                            "column '{}' is NOT NULL without a default and needs a backfill expression",
                            op.column.name
                        ),
                    ));
                }
            }
            Self::DropColumn(op) => {
                require_name(kind, "table", &op.table)?;
                require_name(kind, "column", &op.column)?;
            }
            Self::AlterColumn(op) => {
                require_name(kind, "table", &op.table)?;
                require_name(kind, "column", &op.column)?;
                if op.is_empty() {
                    return Err(invalid(
                        kind,
                        "type",
                        "at least one of type, nullable, unique or comment must be set",
                    ));
                }
                if op.column_type.is_some() && (op.up.is_none() || op.down.is_none()) {
                    return Err(invalid(
                        kind,
                        "up",
                        "a type change needs both up and down expressions",
                    ));
                }
                if op.nullable == Some(false) && op.up.is_none() {
                    return Err(invalid(
                        kind,
                        "up",
                        "setting NOT NULL needs a backfill expression",
                    ));
                }
            }
            Self::RenameColumn(op) => {
                require_name(kind, "table", &op.table)?;
                require_name(kind, "from", &op.from)?;
                require_name(kind, "to", &op.to)?;
            }
            Self::CreateIndex(op) => {
                require_name(kind, "name", &op.name)?;
                require_name(kind, "table", &op.table)?;
                if op.columns.is_empty() {
                    return Err(invalid(kind, "columns", "must not be empty"));
                }
            }
            Self::DropIndex(op) => require_name(kind, "name", &op.name)?,
            Self::CreateConstraint(op) => {
                require_name(kind, "table", &op.table)?;
                require_name(kind, "name", &op.name)?;
                if op.columns.is_empty() {
                    return Err(invalid(kind, "columns", "must not be empty"));
                }
                match op.constraint_type {
                    ConstraintType::Check if op.check.is_none() => {
                        return Err(invalid(kind, "check", "required for check constraints"));
                    }
                    ConstraintType::ForeignKey if op.references.is_none() => {
                        return Err(invalid(kind, "references", "required for foreign keys"));
                    }
                    _ => {}
                }
            }
            Self::DropConstraint(op) => {
                require_name(kind, "table", &op.table)?;
                require_name(kind, "name", &op.name)?;
            }
            Self::Sql(op) => require_name(kind, "up", &op.up)?,
        }
        Ok(())
    }

    /// Returns the table this operation touches, if any.
    #[must_use]
    pub fn table(&self) -> Option<&str> {
        match self {
            Self::CreateTable(op) => Some(&op.name),
            Self::DropTable(op) => Some(&op.name),
            Self::RenameTable(op) => Some(&op.from),
            Self::AddColumn(op) => Some(&op.table),
            Self::DropColumn(op) => Some(&op.table),
            Self::AlterColumn(op) => Some(&op.table),
            Self::RenameColumn(op) => Some(&op.table),
            Self::CreateIndex(op) => Some(&op.table),
            Self::CreateConstraint(op) => Some(&op.table),
            Self::DropConstraint(op) => Some(&op.table),
            Self::DropIndex(_) | Self::Sql(_) => None,
        }
    }

    /// Returns the reverse operation for rollback.
    ///
    /// Returns `None` if the operation is not reversible.
    #[must_use]
    pub fn reverse(&self) -> Option<Self> {
        match self {
            Self::CreateTable(op) => Some(Self::drop_table(op.name.clone())),

            // The dropped definition is gone.
            Self::DropTable(_)
            | Self::DropColumn(_)
            | Self::DropIndex(_)
            | Self::DropConstraint(_) => None,

            Self::RenameTable(op) => Some(Self::rename_table(op.to.clone(), op.from.clone())),

            Self::AddColumn(op) => Some(Self::DropColumn(DropColumnOp {
                table: op.table.clone(),
                column: op.column.name.clone(),
                down: None,
            })),

            Self::AlterColumn(op) => {
                // The previous type and comment are not recorded, only
                // boolean facets flip back.
                if op.column_type.is_some() || op.comment.is_some() {
                    return None;
                }
                // Restoring NOT NULL needs the backfill the forward op kept as `down`.
                if op.nullable == Some(true) && op.down.is_none() {
                    return None;
                }
                Some(Self::AlterColumn(AlterColumnOp {
                    table: op.table.clone(),
                    column: op.column.clone(),
                    column_type: None,
                    nullable: op.nullable.map(|n| !n),
                    unique: op.unique.map(|u| !u),
                    comment: None,
                    up: op.down.clone(),
                    down: op.up.clone(),
                }))
            }

            Self::RenameColumn(op) => Some(Self::rename_column(
                op.table.clone(),
                op.to.clone(),
                op.from.clone(),
            )),

            Self::CreateIndex(op) => Some(Self::drop_index(op.name.clone())),

            Self::CreateConstraint(op) => {
                Some(Self::drop_constraint(op.table.clone(), op.name.clone()))
            }

            Self::Sql(op) => op.down.as_ref().map(|down| Self::Sql(SqlOp {
                up: down.clone(),
                down: Some(op.up.clone()),
            })),
        }
    }

    /// Returns true if this operation can be reversed.
    #[must_use]
    pub fn is_reversible(&self) -> bool {
        match self {
            Self::CreateTable(_)
            | Self::RenameTable(_)
            | Self::AddColumn(_)
            | Self::RenameColumn(_)
            | Self::CreateIndex(_)
            | Self::CreateConstraint(_) => true,
            Self::DropTable(_)
            | Self::DropColumn(_)
            | Self::DropIndex(_)
            | Self::DropConstraint(_) => false,
            Self::AlterColumn(_) => self.reverse().is_some(),
            Self::Sql(op) => op.down.is_some(),
        }
    }

    /// Returns a human-readable description of this operation.
    #[must_use]
    pub fn description(&self) -> String {
        match self {
            Self::CreateTable(op) => format!("Create table '{}'", op.name),
            Self::DropTable(op) => format!("Drop table '{}'", op.name),
            Self::RenameTable(op) => format!("Rename table '{}' to '{}'", op.from, op.to),
            Self::AddColumn(op) => {
                format!("Add column '{}' to table '{}'", op.column.name, op.table)
            }
            Self::DropColumn(op) => {
                format!("Drop column '{}' from table '{}'", op.column, op.table)
            }
            Self::AlterColumn(op) => {
                format!("Alter column '{}' in table '{}'", op.column, op.table)
            }
            Self::RenameColumn(op) => format!(
                "Rename column '{}' to '{}' in table '{}'",
                op.from, op.to, op.table
            ),
            Self::CreateIndex(op) => {
                format!("Create index '{}' on table '{}'", op.name, op.table)
            }
            Self::DropIndex(op) => format!("Drop index '{}'", op.name),
            Self::CreateConstraint(op) => {
                format!("Add constraint '{}' to table '{}'", op.name, op.table)
            }
            Self::DropConstraint(op) => {
                format!("Drop constraint '{}' from table '{}'", op.name, op.table)
            }
            Self::Sql(_) => "Run custom SQL".to_string(),
        }
    }
}

fn payload_of<T: DeserializeOwned>(kind: &str, payload: Value) -> Result<T> {
    serde_json::from_value(payload).map_err(|e| MigrateError::validation(kind, e.to_string()))
}

fn invalid(kind: &str, field: &str, message: impl AsRef<str>) -> MigrateError {
    MigrateError::validation(kind, format!("field '{field}' {}", message.as_ref()))
}

fn require_name(kind: &str, field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(invalid(kind, field, "must not be empty"));
    }
    Ok(())
}

fn validate_column(kind: &str, column: &ColumnDefinition) -> Result<()> {
    require_name(kind, "column.name", &column.name)?;
    require_name(kind, "column.type", &column.column_type)
}
